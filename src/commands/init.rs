//! `init` - set up a managed venv mapping for the current project

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;

use crate::cli::GlobalOpts;
use crate::core::cache::Cache;
use crate::core::env_file::{self, ENV_FILE_NAME, VENV_ENV_KEY};
use crate::core::paths;
use crate::core::project;
use crate::utils::output;

pub fn run_init(opts: &GlobalOpts, force: bool, venv_dir: Option<&Path>) -> Result<()> {
    let root = project::find_project_root(None)
        .context("no pyproject.toml found; run init from inside a Python project")?;

    let env_path = root.join(ENV_FILE_NAME);
    if env_path.exists() && !force {
        let existing = env_file::read_env_file(&env_path).unwrap_or_default();
        if existing.contains_key(VENV_ENV_KEY) {
            bail!(
                "project is already initialized ({} sets {}); use --force to overwrite",
                ENV_FILE_NAME,
                VENV_ENV_KEY
            );
        }
    }

    let name = paths::get_project_name(&root);
    let hash = paths::generate_hash(&root);
    let venv_path = match venv_dir {
        Some(dir) => format!("{}/{}_{}", dir.display(), name, hash),
        None => paths::generate_venv_path(&root),
    };
    let venv_expanded = paths::expand_path_variables(&venv_path);

    if opts.dry_run {
        output::info(&format!(
            "would write {}={} to {}",
            VENV_ENV_KEY,
            venv_path,
            env_path.display()
        ));
        output::info(&format!("would create {}", venv_expanded.display()));
        output::info("would record the mapping in the cache");
        return Ok(());
    }

    let mut updates = BTreeMap::new();
    updates.insert(VENV_ENV_KEY.to_string(), venv_path.clone());
    env_file::update_env_file(&env_path, &updates)
        .with_context(|| format!("failed to update {}", env_path.display()))?;

    std::fs::create_dir_all(&venv_expanded)
        .with_context(|| format!("failed to create venv directory {}", venv_expanded.display()))?;

    let cache = Cache::open_default()?;
    cache.migrate_if_needed()?;
    cache.add_mapping(&root, &venv_path, &name, &hash)?;

    if opts.json {
        return output::print_json(&json!({
            "project": root.to_string_lossy(),
            "project_name": name,
            "path_hash": hash,
            "venv_path": venv_path,
            "venv_path_expanded": venv_expanded.to_string_lossy(),
            "env_file": env_path.to_string_lossy(),
        }));
    }

    output::success(&format!("initialized {} for {}", ENV_FILE_NAME, name));
    if opts.verbose {
        output::info(&format!("venv: {}", venv_path));
        output::info(&format!("expanded: {}", venv_expanded.display()));
    }
    output::info("next steps:");
    output::info("  uve sync                # create the venv and install dependencies");
    output::info(&format!(
        "  git add {}              # commit the mapping with the project",
        ENV_FILE_NAME
    ));

    Ok(())
}
