//! `prune` - remove venv directories and their cache entries

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::json;

use crate::cli::GlobalOpts;
use crate::core::cache::{Cache, CacheEntry};
use crate::core::paths;
use crate::core::project;
use crate::utils::output;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneMode {
    All,
    Valid,
    Orphan,
    Current,
    Path(PathBuf),
}

impl PruneMode {
    /// Exactly one selection mode must be given.
    pub fn from_flags(
        all: bool,
        valid: bool,
        orphan: bool,
        current: bool,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut modes = Vec::new();
        if all {
            modes.push(PruneMode::All);
        }
        if valid {
            modes.push(PruneMode::Valid);
        }
        if orphan {
            modes.push(PruneMode::Orphan);
        }
        if current {
            modes.push(PruneMode::Current);
        }
        if let Some(p) = path {
            modes.push(PruneMode::Path(p));
        }

        match modes.len() {
            0 => bail!("no prune mode given; pass one of --all, --valid, --orphan, --current, or a venv PATH"),
            1 => Ok(modes.remove(0)),
            _ => bail!("multiple prune modes given; pass exactly one of --all, --valid, --orphan, --current, or a venv PATH"),
        }
    }
}

/// One venv selected for removal.
struct Target {
    /// Cache key of the owning project, when tracked.
    project_key: Option<String>,
    label: String,
    venv_dir: PathBuf,
}

pub fn run_prune(opts: &GlobalOpts, mode: PruneMode) -> Result<()> {
    let cache = Cache::open_default()?;
    cache.migrate_if_needed()?;
    crate::commands::register::auto_register(&cache);

    let targets = select_targets(&cache, &mode)?;

    if targets.is_empty() {
        if opts.json {
            return output::print_json(&json!({ "removed": [], "count": 0 }));
        }
        output::info("nothing to prune");
        return Ok(());
    }

    if opts.dry_run {
        for target in &targets {
            output::info(&format!(
                "would remove {} ({})",
                target.label,
                target.venv_dir.display()
            ));
        }
        if opts.json {
            let listed: Vec<_> = targets
                .iter()
                .map(|t| t.venv_dir.to_string_lossy().into_owned())
                .collect();
            return output::print_json(&json!({
                "would_remove": listed,
                "count": targets.len(),
            }));
        }
        return Ok(());
    }

    let question = format!("remove {} venv(s)?", targets.len());
    if !output::confirm(&question, opts.yes)? {
        output::info("aborted");
        return Ok(());
    }

    let mut removed = Vec::new();
    for target in &targets {
        if target.venv_dir.exists() {
            std::fs::remove_dir_all(&target.venv_dir).with_context(|| {
                format!("failed to remove venv directory {}", target.venv_dir.display())
            })?;
        }
        if let Some(key) = &target.project_key {
            cache.remove_mapping(Path::new(key))?;
        }
        if opts.verbose {
            output::info(&format!("removed {}", target.venv_dir.display()));
        }
        removed.push(target.venv_dir.to_string_lossy().into_owned());
    }

    if opts.json {
        return output::print_json(&json!({
            "removed": removed,
            "count": removed.len(),
        }));
    }

    output::success(&format!("removed {} venv(s)", removed.len()));
    Ok(())
}

fn select_targets(cache: &Cache, mode: &PruneMode) -> Result<Vec<Target>> {
    let tracked = |key: &String, entry: &CacheEntry| -> Target {
        Target {
            project_key: Some(key.clone()),
            label: entry.project_name.clone(),
            venv_dir: entry.expanded_venv_path(),
        }
    };

    match mode {
        PruneMode::All => {
            // Tracked entries plus anything else in the base dir.
            let entries = cache.list_all();
            let mut targets: Vec<Target> = entries
                .iter()
                .map(|(key, entry)| tracked(key, entry))
                .collect();
            let known: Vec<PathBuf> = entries
                .values()
                .map(|entry| entry.expanded_venv_path())
                .collect();
            targets.extend(untracked_targets(&known));
            Ok(targets)
        }

        PruneMode::Valid => {
            let results = cache.validate_all()?;
            Ok(results
                .iter()
                .filter(|(_, (_, result))| result.is_valid())
                .map(|(key, (entry, _))| tracked(key, entry))
                .collect())
        }

        PruneMode::Orphan => {
            let results = cache.validate_all()?;
            let mut targets: Vec<Target> = results
                .iter()
                .filter(|(_, (_, result))| !result.is_valid())
                .map(|(key, (entry, _))| tracked(key, entry))
                .collect();

            // Untracked directories in the base dir count as orphans too.
            let known: Vec<PathBuf> = results
                .values()
                .map(|(entry, _)| entry.expanded_venv_path())
                .collect();
            targets.extend(untracked_targets(&known));
            Ok(targets)
        }

        PruneMode::Current => {
            let root = project::find_project_root(None)
                .context("no pyproject.toml found; run from inside a Python project")?;
            let entry = cache
                .get_mapping(&root)
                .context("current project has no tracked venv")?;
            Ok(vec![Target {
                project_key: Some(crate::core::cache::cache_key(&root)),
                label: entry.project_name.clone(),
                venv_dir: entry.expanded_venv_path(),
            }])
        }

        PruneMode::Path(path) => {
            let base = paths::venvs_base_dir();
            let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !resolved.starts_with(&base) {
                bail!(
                    "refusing to remove {}: not under the venv base directory {}",
                    resolved.display(),
                    base.display()
                );
            }
            let project_key = cache
                .list_all()
                .into_iter()
                .find(|(_, entry)| entry.expanded_venv_path() == resolved)
                .map(|(key, _)| key);
            Ok(vec![Target {
                project_key,
                label: resolved.display().to_string(),
                venv_dir: resolved,
            }])
        }
    }
}

/// Directories in the venv base dir that no cache entry claims.
fn untracked_targets(known: &[PathBuf]) -> Vec<Target> {
    let base = paths::venvs_base_dir();
    let mut targets = Vec::new();
    if let Ok(dir_entries) = std::fs::read_dir(&base) {
        for dir_entry in dir_entries.flatten() {
            let path = dir_entry.path();
            if path.is_dir() && !known.contains(&path) {
                targets.push(Target {
                    project_key: None,
                    label: format!("untracked {}", path.display()),
                    venv_dir: path,
                });
            }
        }
    }
    targets
}
