//! Command handlers, one module per subcommand

pub mod activate;
pub mod configure;
pub mod init;
pub mod list;
pub mod prune;
pub mod register;
pub mod shell;
