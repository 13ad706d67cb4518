//! Project-to-venv mapping cache
//!
//! A per-user JSON document (`~/.prime-uve/cache.json`) keyed by canonical
//! project path. Writes go through an exclusive advisory lock on a sidecar
//! file and land atomically via temp-file rename. Reads are lock-free and
//! treat any corruption as an empty cache; the next write repairs the file.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::env_file::{self, ENV_FILE_NAME};
use crate::core::paths::{canonical_project_path, expand_path_variables};

/// Schema version written to every cache document.
pub const CURRENT_VERSION: &str = "1.0";

const LOCK_TIMEOUT_SECS: u64 = 10;
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("could not acquire cache lock within {timeout} seconds: {}", path.display())]
    LockTimeout { path: PathBuf, timeout: u64 },

    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not determine home directory")]
    NoHomeDir,
}

/// One tracked project-to-venv mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    /// Venv location in variable form (`${HOME}/...`), as written to
    /// `.env.uve`.
    pub venv_path: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub path_hash: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_validated: DateTime<Utc>,
    /// Expanded form for display tooling; recomputed on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venv_path_expanded: Option<String>,
}

impl CacheEntry {
    pub fn expanded_venv_path(&self) -> PathBuf {
        expand_path_variables(&self.venv_path)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    /// Absent in pre-1.0 caches; `migrate_if_needed` backfills it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default)]
    venvs: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Orphaned,
    Mismatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub issues: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    pub fn is_orphaned(&self) -> bool {
        self.status == ValidationStatus::Orphaned
    }

    pub fn has_mismatch(&self) -> bool {
        self.status == ValidationStatus::Mismatch
    }
}

/// Held for the duration of a cache mutation; unlocks on drop.
struct CacheLock {
    file: File,
}

impl CacheLock {
    fn acquire_with_timeout(lock_path: &Path, timeout: Duration) -> Result<Self, CacheError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| CacheError::Io {
                path: lock_path.to_path_buf(),
                source: e,
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(CacheLock { file }),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(CacheError::LockTimeout {
                            path: lock_path.to_path_buf(),
                            timeout: timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(CacheError::Io {
                        path: lock_path.to_path_buf(),
                        source: e,
                    })
                }
            }
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Handle to the on-disk cache document.
pub struct Cache {
    cache_path: PathBuf,
    lock_timeout: Duration,
}

impl Cache {
    pub fn new(cache_path: PathBuf) -> Self {
        Cache {
            cache_path,
            lock_timeout: Duration::from_secs(LOCK_TIMEOUT_SECS),
        }
    }

    #[cfg(test)]
    fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// `~/.prime-uve/cache.json`.
    pub fn default_path() -> Result<PathBuf, CacheError> {
        let home = dirs::home_dir().ok_or(CacheError::NoHomeDir)?;
        Ok(home.join(".prime-uve").join("cache.json"))
    }

    pub fn open_default() -> Result<Self, CacheError> {
        Ok(Cache::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    fn lock_path(&self) -> PathBuf {
        let mut os = self.cache_path.clone().into_os_string();
        os.push(".lock");
        PathBuf::from(os)
    }

    /// Parse the document, tolerating a missing, empty, or corrupt file.
    fn load(&self) -> CacheDocument {
        let content = match std::fs::read_to_string(&self.cache_path) {
            Ok(c) => c,
            Err(_) => return CacheDocument::default(),
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomic write: temp file in the same directory, then rename.
    fn store(&self, doc: &mut CacheDocument) -> Result<(), CacheError> {
        doc.version = Some(CURRENT_VERSION.to_string());
        for entry in doc.venvs.values_mut() {
            entry.venv_path_expanded = Some(
                expand_path_variables(&entry.venv_path)
                    .to_string_lossy()
                    .into_owned(),
            );
        }

        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.cache_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| CacheError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &self.cache_path).map_err(|e| CacheError::Io {
            path: self.cache_path.clone(),
            source: e,
        })
    }

    /// Lock, load, mutate, store. The closure's return value is forwarded.
    fn with_document<T>(
        &self,
        f: impl FnOnce(&mut CacheDocument) -> T,
    ) -> Result<T, CacheError> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let _lock = CacheLock::acquire_with_timeout(&self.lock_path(), self.lock_timeout)?;
        let mut doc = self.load();
        let result = f(&mut doc);
        self.store(&mut doc)?;
        Ok(result)
    }

    /// Insert or update a mapping. Preserves `created_at` for an existing
    /// entry; `last_validated` always advances.
    pub fn add_mapping(
        &self,
        project_path: &Path,
        venv_path: &str,
        project_name: &str,
        path_hash: &str,
    ) -> Result<(), CacheError> {
        let key = cache_key(project_path);
        let venv_path = venv_path.to_string();
        let project_name = project_name.to_string();
        let path_hash = path_hash.to_string();

        self.with_document(move |doc| {
            let now = Utc::now();
            let created_at = doc
                .venvs
                .get(&key)
                .map(|existing| existing.created_at)
                .unwrap_or(now);
            doc.venvs.insert(
                key,
                CacheEntry {
                    venv_path,
                    project_name,
                    path_hash,
                    created_at,
                    last_validated: now,
                    venv_path_expanded: None,
                },
            );
        })
    }

    /// Lock-free lookup by canonical project path.
    pub fn get_mapping(&self, project_path: &Path) -> Option<CacheEntry> {
        let key = cache_key(project_path);
        self.load().venvs.remove(&key)
    }

    /// Remove a mapping; returns whether an entry existed.
    pub fn remove_mapping(&self, project_path: &Path) -> Result<bool, CacheError> {
        let key = cache_key(project_path);
        self.with_document(move |doc| doc.venvs.remove(&key).is_some())
    }

    /// Lock-free snapshot of every mapping, keyed by project path.
    pub fn list_all(&self) -> BTreeMap<String, CacheEntry> {
        self.load().venvs
    }

    /// Drop every mapping.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.with_document(|doc| doc.venvs.clear())
    }

    /// Validate one mapping against the filesystem and the project's
    /// `.env.uve`. Refreshes `last_validated` as a side effect.
    ///
    /// Checks in order: project dir exists, expanded venv dir exists,
    /// `.env.uve` exists and its venv path matches the cached one. Any
    /// missing piece makes the entry orphaned; all present but a differing
    /// env-file path is a mismatch. Returns None for untracked projects.
    pub fn validate_mapping(
        &self,
        project_path: &Path,
    ) -> Result<Option<ValidationResult>, CacheError> {
        let key = cache_key(project_path);
        let Some(entry) = self.load().venvs.get(&key).cloned() else {
            return Ok(None);
        };

        let result = validate_entry(&key, &entry);

        self.with_document(move |doc| {
            if let Some(entry) = doc.venvs.get_mut(&key) {
                entry.last_validated = Utc::now();
            }
        })?;

        Ok(Some(result))
    }

    /// Validate every mapping; refreshes all `last_validated` stamps in a
    /// single write.
    ///
    /// Returns the entry alongside its result so callers work from one
    /// consistent snapshot even when a concurrent invocation mutates the
    /// cache between loads.
    pub fn validate_all(
        &self,
    ) -> Result<BTreeMap<String, (CacheEntry, ValidationResult)>, CacheError> {
        let snapshot = self.load().venvs;
        let mut results = BTreeMap::new();
        for (key, entry) in snapshot {
            let result = validate_entry(&key, &entry);
            results.insert(key, (entry, result));
        }

        if !results.is_empty() {
            self.with_document(|doc| {
                let now = Utc::now();
                for entry in doc.venvs.values_mut() {
                    entry.last_validated = now;
                }
            })?;
        }

        Ok(results)
    }

    /// Backfill the schema version on caches written before versioning.
    /// Strict no-op (no write at all) when the document is already current.
    pub fn migrate_if_needed(&self) -> Result<bool, CacheError> {
        let doc = self.load();
        if doc.version.as_deref() == Some(CURRENT_VERSION) {
            return Ok(false);
        }
        if !self.cache_path.exists() {
            return Ok(false);
        }
        self.with_document(|_| ())?;
        Ok(true)
    }
}

/// Canonical project path string used as the cache key.
pub fn cache_key(project_path: &Path) -> String {
    canonical_project_path(project_path)
        .to_string_lossy()
        .into_owned()
}

fn validate_entry(project_path: &str, entry: &CacheEntry) -> ValidationResult {
    let mut issues = Vec::new();
    let mut mismatch = false;

    let project_dir = PathBuf::from(project_path);
    if !project_dir.is_dir() {
        issues.push("Project directory does not exist".to_string());
    }

    if !entry.expanded_venv_path().is_dir() {
        issues.push("Venv directory does not exist".to_string());
    }

    let env_path = project_dir.join(ENV_FILE_NAME);
    match env_file::read_env_file(&env_path) {
        Ok(vars) => match env_file::get_venv_path(&vars) {
            Ok(declared) if declared == entry.venv_path => {}
            Ok(declared) => {
                mismatch = true;
                issues.push(format!(
                    "{} mismatch: cache has {}, {} has {}",
                    ENV_FILE_NAME, entry.venv_path, ENV_FILE_NAME, declared
                ));
            }
            Err(_) => {
                mismatch = true;
                issues.push(format!(
                    "{} does not set {}",
                    ENV_FILE_NAME,
                    env_file::VENV_ENV_KEY
                ));
            }
        },
        Err(env_file::EnvFileError::NotFound(_)) => {
            issues.push(format!("{} file does not exist", ENV_FILE_NAME));
        }
        Err(_) => {
            issues.push(format!("{} file could not be read", ENV_FILE_NAME));
        }
    }

    let status = if mismatch && issues.len() == 1 {
        ValidationStatus::Mismatch
    } else if !issues.is_empty() {
        ValidationStatus::Orphaned
    } else {
        ValidationStatus::Valid
    };

    ValidationResult { status, issues }
}
