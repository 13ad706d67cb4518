//! Core domain logic: cache, env files, paths, project detection

pub mod cache;
pub mod env_file;
pub mod paths;
pub mod project;
