//! `list` - show tracked venvs and their status

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use walkdir::WalkDir;

use crate::cli::GlobalOpts;
use crate::commands::register::auto_register;
use crate::core::cache::Cache;
use crate::utils::output;

pub fn run_list(opts: &GlobalOpts, orphan_only: bool) -> Result<()> {
    let cache = Cache::open_default()?;
    cache.migrate_if_needed()?;
    auto_register(&cache);

    // One snapshot carries both entries and results; a concurrent
    // invocation mutating the cache mid-command cannot desync them.
    let entries = cache.validate_all()?;
    if entries.is_empty() {
        if opts.json {
            return output::print_json(&json!({
                "venvs": [],
                "summary": {
                    "total": 0,
                    "valid": 0,
                    "orphaned": 0,
                    "total_disk_usage_bytes": 0,
                },
            }));
        }
        output::info("no venvs tracked yet; run `prime-uve init` inside a project");
        return Ok(());
    }

    let mut rows = Vec::new();
    let mut valid_count = 0usize;
    let mut total_bytes = 0u64;
    for (project_path, (entry, result)) in &entries {
        total_bytes += dir_size(&entry.expanded_venv_path());
        if result.is_valid() {
            valid_count += 1;
            if orphan_only {
                continue;
            }
        }
        rows.push((project_path, entry, result));
    }
    let orphan_count = entries.len() - valid_count;

    if opts.json {
        let venvs: Vec<_> = rows
            .iter()
            .map(|(project_path, entry, result)| {
                json!({
                    "project_path": project_path,
                    "project_name": entry.project_name,
                    "venv_path": entry.venv_path,
                    "venv_path_expanded": entry.expanded_venv_path().to_string_lossy(),
                    "path_hash": entry.path_hash,
                    "created_at": entry.created_at,
                    "last_validated": entry.last_validated,
                    "status": result.status,
                    "issues": result.issues,
                })
            })
            .collect();
        return output::print_json(&json!({
            "venvs": venvs,
            "summary": {
                "total": entries.len(),
                "valid": valid_count,
                "orphaned": orphan_count,
                "total_disk_usage_bytes": total_bytes,
            },
        }));
    }

    for (project_path, entry, result) in &rows {
        let marker = if result.is_valid() {
            "✓".green()
        } else {
            "✗".red()
        };
        let status = if result.is_valid() {
            "valid".green()
        } else {
            "orphan".red()
        };
        println!("{} {} [{}]", marker, entry.project_name.bold(), status);
        println!("    project: {}", project_path);
        println!("    venv:    {}", entry.venv_path);
        if opts.verbose {
            let expanded = entry.expanded_venv_path();
            println!(
                "    size:    {}",
                output::format_size(dir_size(&expanded))
            );
            println!("    hash:    {}", entry.path_hash);
            println!("    created: {}", entry.created_at.to_rfc3339());
        }
        for issue in &result.issues {
            println!("    {} {}", "!".yellow(), issue);
        }
    }

    println!();
    println!(
        "{} tracked, {} valid, {} orphaned, {} on disk",
        entries.len(),
        valid_count,
        orphan_count,
        output::format_size(total_bytes)
    );
    if orphan_count > 0 {
        output::info("run `prime-uve prune --orphan` to clean up orphaned venvs");
    }

    Ok(())
}

/// Total size of all files under `path`; 0 when it does not exist.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dir_size() {
        let temp = tempdir().unwrap();
        assert_eq!(dir_size(&temp.path().join("missing")), 0);

        std::fs::write(temp.path().join("a"), vec![0u8; 100]).unwrap();
        let sub = temp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("b"), vec![0u8; 50]).unwrap();

        assert_eq!(dir_size(temp.path()), 150);
    }
}
