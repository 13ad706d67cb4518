//! Path derivation for managed venvs
//!
//! Venv locations are stored in variable form (`${HOME}/prime-uve/venvs/...`)
//! and expanded only at the point of filesystem use, so `.env.uve` files stay
//! portable across machines.

use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::core::project::PYPROJECT_FILE;

/// Variable form of the base directory holding all managed venvs.
pub const VENV_BASE_VAR: &str = "${HOME}/prime-uve/venvs";

/// Canonical (absolute, symlink-resolved) form of a project path.
///
/// Falls back to the path as given when it no longer exists on disk, so
/// cache keys for deleted projects remain stable.
pub fn canonical_project_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Short stable identifier derived from the canonical project path.
///
/// Disambiguates venvs whose projects share a name. Always 8 lowercase
/// hex characters.
pub fn generate_hash(project_path: &Path) -> String {
    let canonical = canonical_project_path(project_path);
    let digest = xxh3_64(canonical.to_string_lossy().as_bytes());
    format!("{:016x}", digest)[..8].to_string()
}

/// Display name for a project.
///
/// Prefers `[project].name` from `pyproject.toml`; falls back to the
/// sanitized directory name.
pub fn get_project_name(project_path: &Path) -> String {
    let pyproject = project_path.join(PYPROJECT_FILE);
    if let Ok(content) = std::fs::read_to_string(&pyproject) {
        if let Ok(value) = content.parse::<toml::Value>() {
            if let Some(name) = value
                .get("project")
                .and_then(|p| p.get("name"))
                .and_then(|n| n.as_str())
            {
                let trimmed = name.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    let dir_name = project_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    sanitize_name(&dir_name)
}

/// Sanitize a directory name into a venv-safe label.
///
/// Lowercases, collapses runs of non-alphanumeric characters into single
/// hyphens, and trims leading/trailing hyphens.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_hyphen = false;

    for ch in name.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_hyphen = false;
        } else if !last_was_hyphen && !out.is_empty() {
            out.push('-');
            last_was_hyphen = true;
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "project".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Venv path for a project, in variable form.
///
/// Format: `${HOME}/prime-uve/venvs/<name>_<hash>`. The `${HOME}` prefix is
/// literal; it is never expanded here.
pub fn generate_venv_path(project_path: &Path) -> String {
    format!(
        "{}/{}_{}",
        VENV_BASE_VAR,
        get_project_name(project_path),
        generate_hash(project_path)
    )
}

/// Expand home-directory placeholders into a concrete absolute path.
///
/// Handles a literal `${HOME}` anywhere in the string and a leading `~`.
pub fn expand_path_variables(path_str: &str) -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    let home_str = home.to_string_lossy();

    let expanded = if path_str.contains("${HOME}") {
        path_str.replace("${HOME}", &home_str)
    } else if let Some(rest) = path_str.strip_prefix("~/") {
        format!("{}/{}", home_str, rest)
    } else {
        path_str.to_string()
    };

    PathBuf::from(expanded)
}

/// Expanded base directory holding all managed venvs.
pub fn venvs_base_dir() -> PathBuf {
    expand_path_variables(VENV_BASE_VAR)
}
