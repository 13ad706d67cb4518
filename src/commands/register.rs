//! `register` - re-add an existing .env.uve mapping to the cache

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::GlobalOpts;
use crate::core::cache::Cache;
use crate::core::env_file::{self, ENV_FILE_NAME};
use crate::core::paths;
use crate::core::project;
use crate::utils::output;

/// Best-effort cache sync used by `list` and `prune`: when run inside a
/// project whose `.env.uve` declares a venv, refresh its mapping. Failures
/// are ignored; those commands must work outside projects too.
pub(crate) fn auto_register(cache: &Cache) {
    let Some(root) = project::find_project_root(None) else {
        return;
    };
    let Ok(vars) = env_file::read_env_file(&root.join(ENV_FILE_NAME)) else {
        return;
    };
    let Ok(venv_path) = env_file::get_venv_path(&vars) else {
        return;
    };
    let name = paths::get_project_name(&root);
    let hash = paths::generate_hash(&root);
    let _ = cache.add_mapping(&root, venv_path, &name, &hash);
}

pub fn run_register(opts: &GlobalOpts) -> Result<()> {
    let root = project::find_project_root(None)
        .context("no pyproject.toml found; run register from inside a Python project")?;

    let env_path = root.join(ENV_FILE_NAME);
    let vars = env_file::read_env_file(&env_path)
        .with_context(|| format!("no {} in {}; run `prime-uve init` first", ENV_FILE_NAME, root.display()))?;
    let venv_path = env_file::get_venv_path(&vars)
        .with_context(|| format!("{} is not usable", env_path.display()))?
        .to_string();

    let name = paths::get_project_name(&root);
    let hash = paths::generate_hash(&root);

    if opts.dry_run {
        output::info(&format!(
            "would register {} -> {} in the cache",
            root.display(),
            venv_path
        ));
        return Ok(());
    }

    let cache = Cache::open_default()?;
    cache.migrate_if_needed()?;
    cache.add_mapping(&root, &venv_path, &name, &hash)?;

    if opts.json {
        return output::print_json(&json!({
            "project": root.to_string_lossy(),
            "project_name": name,
            "path_hash": hash,
            "venv_path": venv_path,
        }));
    }

    output::success(&format!("registered {} -> {}", name, venv_path));
    Ok(())
}
