//! `shell` - spawn an interactive subshell inside the project's venv

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::cli::GlobalOpts;
use crate::commands::activate::resolve_shell;
use crate::core::env_file;
use crate::core::paths::expand_path_variables;
use crate::utils::output;
use crate::utils::shell::Shell;

pub fn run_shell(opts: &GlobalOpts, shell_name: Option<&str>) -> Result<()> {
    let shell = resolve_shell(shell_name)?;

    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let env_path = env_file::find_env_file_strict(&cwd)
        .context("no .env.uve found; run `prime-uve init` first")?;
    let vars = env_file::read_env_file(&env_path)?;
    let venv = env_file::get_venv_path_expanded(&vars)?;

    if !venv.is_dir() {
        bail!(
            "venv directory {} does not exist; run `uve sync` first",
            venv.display()
        );
    }

    let bin_dir = if cfg!(windows) {
        venv.join("Scripts")
    } else {
        venv.join("bin")
    };
    let path_var = prepend_path(&bin_dir, std::env::var_os("PATH"));

    if opts.dry_run {
        output::info(&format!("would spawn {} with venv {}", shell, venv.display()));
        return Ok(());
    }

    output::info(&format!(
        "entering venv shell ({}); exit to return",
        venv.display()
    ));

    let mut cmd = Command::new(shell_program(shell));
    for (key, value) in &vars {
        cmd.env(key, expand_path_variables(value));
    }
    cmd.env("VIRTUAL_ENV", &venv);
    cmd.env("PATH", path_var);

    let status = cmd
        .status()
        .with_context(|| format!("failed to spawn {}", shell))?;
    std::process::exit(status.code().unwrap_or(1));
}

fn shell_program(shell: Shell) -> &'static str {
    match shell {
        Shell::Bash => "bash",
        Shell::Zsh => "zsh",
        Shell::Fish => "fish",
        Shell::Pwsh => "pwsh",
        Shell::Cmd => "cmd",
    }
}

fn prepend_path(bin_dir: &Path, existing: Option<std::ffi::OsString>) -> std::ffi::OsString {
    match existing {
        Some(existing) => {
            let mut paths = vec![bin_dir.to_path_buf()];
            paths.extend(std::env::split_paths(&existing));
            // Joining only fails on path entries containing the separator;
            // fall back to the bin dir alone in that case.
            std::env::join_paths(paths)
                .unwrap_or_else(|_| bin_dir.as_os_str().to_os_string())
        }
        None => bin_dir.as_os_str().to_os_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_path() {
        let joined = prepend_path(
            Path::new("/venv/bin"),
            Some(std::ffi::OsString::from("/usr/bin:/bin")),
        );
        let parts: Vec<_> = std::env::split_paths(&joined).collect();
        assert_eq!(parts[0], Path::new("/venv/bin"));
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_prepend_path_empty_env() {
        let joined = prepend_path(Path::new("/venv/bin"), None);
        assert_eq!(joined, std::ffi::OsString::from("/venv/bin"));
    }
}
