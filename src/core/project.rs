//! Project detection and metadata
//!
//! A "project" is any directory containing a `pyproject.toml`. Detection
//! walks up from the starting directory so commands work from anywhere
//! inside the project tree.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::paths::sanitize_name;

/// Marker file that identifies a Python project root.
pub const PYPROJECT_FILE: &str = "pyproject.toml";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project path does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("project path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Metadata extracted from a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub name: String,
    pub path: PathBuf,
    pub has_pyproject: bool,
    pub python_version: Option<String>,
    pub description: Option<String>,
}

impl ProjectMetadata {
    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn is_valid_python_project(&self) -> bool {
        self.has_pyproject
    }
}

/// Walk up from `start` (default: cwd) to the nearest directory containing
/// `pyproject.toml`. Returns the canonical path, or None if the filesystem
/// root is reached without a match.
pub fn find_project_root(start: Option<&Path>) -> Option<PathBuf> {
    let start = match start {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let start = start.canonicalize().ok()?;

    let mut current = start.as_path();
    loop {
        if current.join(PYPROJECT_FILE).is_file() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Whether `dir` is a directory containing a `pyproject.toml`.
pub fn is_python_project(dir: &Path) -> bool {
    dir.is_dir() && dir.join(PYPROJECT_FILE).is_file()
}

/// Extract metadata for a project directory.
///
/// Malformed or incomplete `pyproject.toml` content falls back to the
/// sanitized directory name rather than failing.
pub fn get_project_metadata(dir: &Path) -> Result<ProjectMetadata, ProjectError> {
    if !dir.exists() {
        return Err(ProjectError::Missing(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ProjectError::NotADirectory(dir.to_path_buf()));
    }

    let path = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let pyproject = path.join(PYPROJECT_FILE);
    let has_pyproject = pyproject.is_file();

    let mut name = None;
    let mut python_version = None;
    let mut description = None;

    if has_pyproject {
        if let Ok(content) = std::fs::read_to_string(&pyproject) {
            if let Ok(value) = content.parse::<toml::Value>() {
                if let Some(project) = value.get("project") {
                    name = project
                        .get("name")
                        .and_then(|n| n.as_str())
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string);
                    python_version = project
                        .get("requires-python")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    description = project
                        .get("description")
                        .and_then(|d| d.as_str())
                        .map(str::to_string);
                }
            }
        }
    }

    let name = name.unwrap_or_else(|| {
        let dir_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        sanitize_name(&dir_name)
    });

    Ok(ProjectMetadata {
        name,
        path,
        has_pyproject,
        python_version,
        description,
    })
}
