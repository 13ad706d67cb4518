//! uve - thin wrapper that runs uv with the project's .env.uve applied
//!
//! `uve <args…>` resolves to `uv run --env-file <nearest .env.uve> -- uv
//! <args…>` and forwards the child's exit code, so every uv invocation sees
//! UV_PROJECT_ENVIRONMENT without manual sourcing.

use std::process::Command;

use anyhow::{bail, Context, Result};

use prime_uve::core::env_file;
use prime_uve::utils::output;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let env_path = env_file::find_env_file_strict(&cwd)
        .context("no .env.uve found; run `prime-uve init` first")?;

    if !uv_available() {
        bail!("uv is not on PATH; install it from https://docs.astral.sh/uv/");
    }

    let status = Command::new("uv")
        .arg("run")
        .arg("--env-file")
        .arg(&env_path)
        .arg("--")
        .arg("uv")
        .args(&args)
        .status()
        .context("failed to spawn uv")?;

    Ok(status.code().unwrap_or(1))
}

fn uv_available() -> bool {
    Command::new("uv")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
