//! `configure vscode` - point a VS Code workspace at the managed venv

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::json;

use crate::cli::GlobalOpts;
use crate::core::env_file::{self, ENV_FILE_NAME};
use crate::core::paths;
use crate::core::project;
use crate::utils::output;
use crate::utils::vscode::{self, WorkspaceError};

pub fn run_configure_vscode(
    opts: &GlobalOpts,
    workspace: Option<&Path>,
    create: bool,
) -> Result<()> {
    let root = project::find_project_root(None)
        .context("no pyproject.toml found; run from inside a Python project")?;

    let env_path = root.join(ENV_FILE_NAME);
    let vars = env_file::read_env_file(&env_path).with_context(|| {
        format!(
            "no {} in {}; run `prime-uve init` first",
            ENV_FILE_NAME,
            root.display()
        )
    })?;
    let venv = env_file::get_venv_path_expanded(&vars)?;
    let interpreter = interpreter_path(&venv);

    let (workspace_path, creating) = select_workspace(&root, workspace, create)?;

    if opts.dry_run {
        let verb = if creating { "create" } else { "update" };
        output::info(&format!(
            "would {} {} with interpreter {}",
            verb,
            workspace_path.display(),
            interpreter.display()
        ));
        return Ok(());
    }

    let mut backed_up = None;
    let mut data = if creating {
        vscode::create_default_workspace(&interpreter)
    } else {
        match vscode::read_workspace(&workspace_path) {
            Ok(data) => data,
            Err(WorkspaceError::Malformed { .. }) => {
                let backup = backup_path(&workspace_path);
                std::fs::copy(&workspace_path, &backup).with_context(|| {
                    format!("failed to back up workspace to {}", backup.display())
                })?;
                output::warn(&format!(
                    "workspace file was not valid JSON; backed up to {}",
                    backup.display()
                ));
                backed_up = Some(backup);
                vscode::create_default_workspace(&interpreter)
            }
            Err(e) => return Err(e.into()),
        }
    };
    vscode::update_workspace_settings(&mut data, &interpreter);
    vscode::write_workspace(&workspace_path, &data)?;

    if opts.json {
        return output::print_json(&json!({
            "workspace": workspace_path.to_string_lossy(),
            "created": creating,
            "backed_up": backed_up.map(|p| p.to_string_lossy().into_owned()),
            "interpreter": interpreter.to_string_lossy(),
        }));
    }

    if creating {
        output::success(&format!("created {}", workspace_path.display()));
    } else {
        output::success(&format!("updated {}", workspace_path.display()));
    }
    if opts.verbose {
        output::info(&format!("interpreter: {}", interpreter.display()));
    }

    Ok(())
}

fn interpreter_path(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".bak");
    PathBuf::from(os)
}

fn select_workspace(
    root: &Path,
    explicit: Option<&Path>,
    create: bool,
) -> Result<(PathBuf, bool)> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        return Ok((path.clone(), !path.exists()));
    }

    let found = vscode::find_workspace_files(root);
    match found.len() {
        0 => {
            if create {
                let name = paths::get_project_name(root);
                Ok((root.join(format!("{name}.code-workspace")), true))
            } else {
                bail!(
                    "no .code-workspace file found in {}; pass --create to make one",
                    root.display()
                );
            }
        }
        1 => Ok((found.into_iter().next().context("workspace list emptied")?, false)),
        _ => {
            let listed: Vec<String> = found.iter().map(|p| p.display().to_string()).collect();
            bail!(
                "multiple workspace files found; pass --workspace to pick one:\n  {}",
                listed.join("\n  ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_select_explicit_workspace() {
        let temp = tempdir().unwrap();
        let (path, creating) =
            select_workspace(temp.path(), Some(Path::new("my.code-workspace")), false).unwrap();
        assert_eq!(path, temp.path().join("my.code-workspace"));
        assert!(creating);
    }

    #[test]
    fn test_select_single_found() {
        let temp = tempdir().unwrap();
        let ws = temp.path().join("only.code-workspace");
        std::fs::write(&ws, "{}").unwrap();

        let (path, creating) = select_workspace(temp.path(), None, false).unwrap();
        assert_eq!(path, ws);
        assert!(!creating);
    }

    #[test]
    fn test_select_none_without_create_errors() {
        let temp = tempdir().unwrap();
        assert!(select_workspace(temp.path(), None, false).is_err());
    }

    #[test]
    fn test_select_none_with_create() {
        let temp = tempdir().unwrap();
        let (path, creating) = select_workspace(temp.path(), None, true).unwrap();
        assert!(path.extension().is_some_and(|e| e == "code-workspace"));
        assert!(creating);
    }

    #[test]
    fn test_select_multiple_errors() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("a.code-workspace"), "{}").unwrap();
        std::fs::write(temp.path().join("b.code-workspace"), "{}").unwrap();
        assert!(select_workspace(temp.path(), None, false).is_err());
    }
}
