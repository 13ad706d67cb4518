//! VS Code workspace file editing
//!
//! Workspace files are JSON-with-comments, so parsing strips `//` and
//! `/* */` comments first (string and escape aware). Settings updates merge
//! into whatever structure already exists.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Settings written into the workspace for the managed interpreter.
pub const INTERPRETER_SETTING: &str = "python.defaultInterpreterPath";
pub const ACTIVATE_ENV_SETTING: &str = "python.terminal.activateEnvironment";
pub const ENV_FILE_SETTING: &str = "python.envFile";

const ENV_FILE_VALUE: &str = "${workspaceFolder}/.env.uve";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("workspace file is not valid JSON: {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to read workspace file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write workspace file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `*.code-workspace` files in `root` and `root/.vscode/`, sorted by path.
pub fn find_workspace_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in [root.to_path_buf(), root.join(".vscode")] {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == "code-workspace")
            {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

/// Remove `//`-to-EOL and `/* ... */` comments without touching string
/// literals.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Read and parse a workspace file, tolerating comments.
pub fn read_workspace(path: &Path) -> Result<Value, WorkspaceError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WorkspaceError::NotFound(path.to_path_buf())
        } else {
            WorkspaceError::Read {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    serde_json::from_str(&strip_json_comments(&content)).map_err(|e| WorkspaceError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a workspace document with 2-space indentation and a trailing
/// newline. Comments from the original file are not preserved.
pub fn write_workspace(path: &Path, data: &Value) -> Result<(), WorkspaceError> {
    let mut content = serde_json::to_string_pretty(data).map_err(|e| WorkspaceError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })?;
    content.push('\n');
    std::fs::write(path, content).map_err(|e| WorkspaceError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Merge the three managed Python settings into a workspace document.
/// A non-object `settings` value is replaced; everything else is kept.
pub fn update_workspace_settings(data: &mut Value, interpreter: &Path) {
    if !data.is_object() {
        *data = Value::Object(Map::new());
    }
    let Value::Object(root) = data else {
        return;
    };

    let settings = root
        .entry("settings")
        .or_insert_with(|| Value::Object(Map::new()));
    if !settings.is_object() {
        *settings = Value::Object(Map::new());
    }
    let Value::Object(settings) = settings else {
        return;
    };

    settings.insert(
        INTERPRETER_SETTING.to_string(),
        json!(interpreter.to_string_lossy()),
    );
    settings.insert(ACTIVATE_ENV_SETTING.to_string(), json!(true));
    settings.insert(ENV_FILE_SETTING.to_string(), json!(ENV_FILE_VALUE));
}

/// Minimal single-folder workspace with the managed settings applied.
pub fn create_default_workspace(interpreter: &Path) -> Value {
    let mut data = json!({ "folders": [ { "path": "." } ] });
    update_workspace_settings(&mut data, interpreter);
    data
}
