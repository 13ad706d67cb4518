//! Cross-cutting helpers: output, shell command tables, VS Code files

pub mod output;
pub mod shell;
pub mod vscode;
