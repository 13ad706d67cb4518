//! `.env.uve` read/write/update
//!
//! The env file is a plain `KEY=value` file committed alongside the project.
//! Values keep `${VAR}` placeholders verbatim; expansion happens at the
//! point of use, never here.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::paths::expand_path_variables;
use crate::core::project::find_project_root;

/// File name looked up in the project tree.
pub const ENV_FILE_NAME: &str = ".env.uve";

/// The variable `uv` reads to locate the project venv.
pub const VENV_ENV_KEY: &str = "UV_PROJECT_ENVIRONMENT";

#[derive(Debug, Error)]
pub enum EnvFileError {
    #[error("env file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied reading env file: {}", .0.display())]
    ReadPermission(PathBuf),

    #[error("permission denied writing env file: {}", .0.display())]
    WritePermission(PathBuf),

    #[error("failed to read env file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write env file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{VENV_ENV_KEY} not set in env file")]
    MissingVenvKey,

    #[error("{VENV_ENV_KEY} is empty in env file")]
    EmptyVenvKey,

    #[error("no {ENV_FILE_NAME} found starting from {}", .0.display())]
    NotFoundInTree(PathBuf),
}

/// Parse an env file into a sorted map.
///
/// Skips blank lines, `#` comments, lines without `=`, and lines with an
/// empty key. Splits on the first `=` only; whitespace around key and value
/// is trimmed.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, EnvFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EnvFileError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => EnvFileError::ReadPermission(path.to_path_buf()),
        _ => EnvFileError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    Ok(parse_env_content(&content))
}

fn parse_env_content(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), value.trim().to_string());
    }
    vars
}

/// Write the full variable map, one `KEY=value` line per entry, keys sorted.
/// Creates parent directories as needed.
pub fn write_env_file(path: &Path, vars: &BTreeMap<String, String>) -> Result<(), EnvFileError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| EnvFileError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let mut content = String::new();
    for (key, value) in vars {
        content.push_str(key);
        content.push('=');
        content.push_str(value);
        content.push('\n');
    }

    std::fs::write(path, content).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => EnvFileError::WritePermission(path.to_path_buf()),
        _ => EnvFileError::Write {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Merge `updates` into the file, preserving variables not named in the
/// update set. Missing file is treated as empty.
pub fn update_env_file(
    path: &Path,
    updates: &BTreeMap<String, String>,
) -> Result<(), EnvFileError> {
    let mut vars = match read_env_file(path) {
        Ok(vars) => vars,
        Err(EnvFileError::NotFound(_)) => BTreeMap::new(),
        Err(e) => return Err(e),
    };
    for (key, value) in updates {
        vars.insert(key.clone(), value.clone());
    }
    write_env_file(path, &vars)
}

fn locate_env_file(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    let mut current = start.as_path();
    loop {
        let candidate = current.join(ENV_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Nearest `.env.uve` walking up from `start`. When none exists, an empty
/// one is created at the project root (or `start` when no project is found).
pub fn find_env_file(start: &Path) -> Result<PathBuf, EnvFileError> {
    if let Some(found) = locate_env_file(start) {
        return Ok(found);
    }

    let base = find_project_root(Some(start)).unwrap_or_else(|| start.to_path_buf());
    let path = base.join(ENV_FILE_NAME);
    write_env_file(&path, &BTreeMap::new())?;
    Ok(path)
}

/// Nearest `.env.uve` walking up from `start`; errors instead of creating.
pub fn find_env_file_strict(start: &Path) -> Result<PathBuf, EnvFileError> {
    locate_env_file(start).ok_or_else(|| EnvFileError::NotFoundInTree(start.to_path_buf()))
}

/// Raw (unexpanded) venv path from a parsed variable map.
pub fn get_venv_path(vars: &BTreeMap<String, String>) -> Result<&str, EnvFileError> {
    let value = vars
        .get(VENV_ENV_KEY)
        .ok_or(EnvFileError::MissingVenvKey)?
        .trim();
    if value.is_empty() {
        return Err(EnvFileError::EmptyVenvKey);
    }
    Ok(value)
}

/// Expanded venv path from a parsed variable map.
pub fn get_venv_path_expanded(vars: &BTreeMap<String, String>) -> Result<PathBuf, EnvFileError> {
    Ok(expand_path_variables(get_venv_path(vars)?))
}
