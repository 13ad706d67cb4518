//! Shell detection and per-shell command generation
//!
//! Commands printed by `activate` are meant to be eval'd by the user's
//! shell, so quoting rules differ per shell family. POSIX shells keep `$`
//! unescaped so `${HOME}` placeholders stay live at eval time.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Pwsh,
    Cmd,
}

#[derive(Debug, Error)]
#[error("unsupported shell: {0}")]
pub struct UnknownShell(String);

impl FromStr for Shell {
    type Err = UnknownShell;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bash" | "sh" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            "pwsh" | "powershell" => Ok(Shell::Pwsh),
            "cmd" => Ok(Shell::Cmd),
            other => Err(UnknownShell(other.to_string())),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::Pwsh => "pwsh",
            Shell::Cmd => "cmd",
        };
        f.write_str(name)
    }
}

impl Shell {
    pub fn is_posix(&self) -> bool {
        matches!(self, Shell::Bash | Shell::Zsh | Shell::Fish)
    }
}

/// Best-effort detection of the invoking shell.
///
/// Unix: basename of `$SHELL`. Windows: `PSModulePath` set means
/// PowerShell, otherwise cmd. Falls back to bash.
pub fn detect_shell() -> Shell {
    if cfg!(windows) {
        if std::env::var_os("PSModulePath").is_some() {
            return Shell::Pwsh;
        }
        return Shell::Cmd;
    }

    std::env::var("SHELL")
        .ok()
        .and_then(|shell| {
            Path::new(&shell)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .and_then(|name| name.parse().ok())
        .unwrap_or(Shell::Bash)
}

/// Path of the activation script inside a venv for this shell.
pub fn activation_script(shell: Shell, venv: &Path) -> PathBuf {
    match shell {
        Shell::Bash | Shell::Zsh => venv.join("bin").join("activate"),
        Shell::Fish => venv.join("bin").join("activate.fish"),
        Shell::Pwsh => venv.join("Scripts").join("Activate.ps1"),
        Shell::Cmd => venv.join("Scripts").join("activate.bat"),
    }
}

/// Command to set one environment variable in this shell.
pub fn export_command(shell: Shell, key: &str, value: &str) -> String {
    match shell {
        Shell::Bash | Shell::Zsh => {
            format!("export {}=\"{}\"", key, escape_shell_value(shell, value))
        }
        Shell::Fish => format!("set -x {} \"{}\"", key, escape_shell_value(shell, value)),
        Shell::Pwsh => format!("$env:{}=\"{}\"", key, escape_shell_value(shell, value)),
        Shell::Cmd => {
            // cmd has no ${HOME} expansion; translate to %HOME%.
            let value = value.replace("${HOME}", "%HOME%");
            format!("set {}={}", key, value)
        }
    }
}

/// Command to source/run the venv activation script.
pub fn activation_command(shell: Shell, venv: &Path) -> String {
    let script = activation_script(shell, venv);
    match shell {
        Shell::Bash | Shell::Zsh | Shell::Fish => format!("source {}", script.display()),
        Shell::Pwsh => format!("& {}", script.display()),
        Shell::Cmd => format!("call {}", script.display()),
    }
}

/// Escape a value for inclusion inside double quotes for this shell.
///
/// `$` is left alone for POSIX shells so placeholder variables expand at
/// eval time. cmd values are unquoted and escaped elsewhere.
pub fn escape_shell_value(shell: Shell, value: &str) -> String {
    match shell {
        Shell::Bash | Shell::Zsh | Shell::Fish => {
            value.replace('\\', "\\\\").replace('"', "\\\"")
        }
        Shell::Pwsh => value.replace('`', "``").replace('"', "`\""),
        Shell::Cmd => value.to_string(),
    }
}
