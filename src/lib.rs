//! prime-uve - manage Python virtual environments outside project directories
//!
//! prime-uve provides:
//! - Centralized venv storage under ${HOME}/prime-uve/venvs
//! - A per-user JSON cache mapping projects to their venvs
//! - Committed .env.uve files that uv resolves through the uve wrapper
//! - Shell activation, interactive venv shells, and VS Code integration

pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;
