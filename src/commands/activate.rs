//! `activate` - print shell commands that activate the project's venv

use anyhow::{bail, Context, Result};

use crate::cli::GlobalOpts;
use crate::core::env_file;
use crate::utils::output;
use crate::utils::shell::{self, Shell};

pub fn run_activate(opts: &GlobalOpts, shell_name: Option<&str>) -> Result<()> {
    let shell = resolve_shell(shell_name)?;

    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let env_path = env_file::find_env_file_strict(&cwd)
        .context("no .env.uve found; run `prime-uve init` first")?;
    let vars = env_file::read_env_file(&env_path)?;

    let venv_raw = env_file::get_venv_path(&vars)
        .with_context(|| format!("{} is not usable", env_path.display()))?
        .to_string();
    let venv_expanded = env_file::get_venv_path_expanded(&vars)?;

    if !venv_expanded.is_dir() {
        bail!(
            "venv directory {} does not exist; run `uve sync` first",
            venv_expanded.display()
        );
    }

    if opts.verbose {
        output::info(&format!("env file: {}", env_path.display()));
        output::info(&format!("venv: {}", venv_raw));
        output::info(&format!("shell: {}", shell));
    }

    for (key, value) in &vars {
        println!("{}", shell::export_command(shell, key, value));
    }
    println!("{}", shell::activation_command(shell, &venv_expanded));

    Ok(())
}

pub(crate) fn resolve_shell(name: Option<&str>) -> Result<Shell> {
    match name {
        Some(name) => Ok(name.parse::<Shell>()?),
        None => Ok(shell::detect_shell()),
    }
}
