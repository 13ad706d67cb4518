//! End-to-end CLI tests
//!
//! Every test runs with HOME pointed at a private tempdir so the cache,
//! the venv base dir, and ${HOME} expansion stay isolated per test.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct TestEnv {
    home: TempDir,
    project: PathBuf,
}

impl TestEnv {
    fn new(project_name: &str) -> Self {
        let home = TempDir::new().unwrap();
        let project = home.path().join("work").join(project_name);
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(
            project.join("pyproject.toml"),
            format!("[project]\nname = \"{project_name}\"\nversion = \"0.1.0\"\n"),
        )
        .unwrap();
        TestEnv { home, project }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("prime-uve").unwrap();
        cmd.env("HOME", self.home.path())
            .env("SHELL", "/bin/bash")
            .env_remove("XDG_CONFIG_HOME")
            .current_dir(&self.project);
        cmd
    }

    fn uve(&self) -> Command {
        let mut cmd = Command::cargo_bin("uve").unwrap();
        cmd.env("HOME", self.home.path()).current_dir(&self.project);
        cmd
    }

    fn env_file(&self) -> PathBuf {
        self.project.join(".env.uve")
    }

    fn cache_file(&self) -> PathBuf {
        self.home.path().join(".prime-uve").join("cache.json")
    }

    fn cache_json(&self) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(self.cache_file()).unwrap()).unwrap()
    }
}

fn env_file_venv_path(env_file: &Path) -> String {
    let content = std::fs::read_to_string(env_file).unwrap();
    content
        .lines()
        .find_map(|line| line.strip_prefix("UV_PROJECT_ENVIRONMENT="))
        .unwrap()
        .to_string()
}

#[test]
fn init_creates_env_file_and_cache_entry() {
    let env = TestEnv::new("demo");

    env.cmd().arg("init").assert().success();

    let venv_path = env_file_venv_path(&env.env_file());
    assert!(venv_path.starts_with("${HOME}/prime-uve/venvs/demo_"));

    let cache = env.cache_json();
    assert_eq!(cache["version"], "1.0");
    let venvs = cache["venvs"].as_object().unwrap();
    assert_eq!(venvs.len(), 1);
    let entry = venvs.values().next().unwrap();
    assert_eq!(entry["project_name"], "demo");
    assert_eq!(entry["venv_path"], venv_path);

    // The venv directory is created under the overridden HOME.
    let expanded = entry["venv_path_expanded"].as_str().unwrap();
    assert!(Path::new(expanded).is_dir());
    assert!(expanded.starts_with(env.home.path().to_str().unwrap()));
}

#[test]
fn init_twice_requires_force() {
    let env = TestEnv::new("demo");

    env.cmd().arg("init").assert().success();
    env.cmd()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    env.cmd().args(["init", "--force"]).assert().success();
}

#[test]
fn init_outside_project_fails() {
    let env = TestEnv::new("demo");
    let elsewhere = env.home.path().join("not-a-project");
    std::fs::create_dir(&elsewhere).unwrap();

    env.cmd()
        .current_dir(&elsewhere)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("pyproject.toml"));
}

#[test]
fn init_dry_run_touches_nothing() {
    let env = TestEnv::new("demo");

    env.cmd().args(["--dry-run", "init"]).assert().success();

    assert!(!env.env_file().exists());
    assert!(!env.cache_file().exists());
}

#[test]
fn init_json_output() {
    let env = TestEnv::new("demo");

    let output = env.cmd().args(["--json", "init"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(value["project_name"], "demo");
    assert!(value["venv_path"]
        .as_str()
        .unwrap()
        .starts_with("${HOME}/prime-uve/venvs/demo_"));
}

#[test]
fn list_empty_cache_prints_hint() {
    let env = TestEnv::new("demo");

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("prime-uve init"));
}

#[test]
fn list_json_reports_valid_venv() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    let output = env.cmd().args(["--json", "list"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(value["summary"]["total"], 1);
    assert_eq!(value["summary"]["valid"], 1);
    assert_eq!(value["summary"]["orphaned"], 0);
    assert!(value["summary"]["total_disk_usage_bytes"].is_u64());
    assert_eq!(value["venvs"][0]["project_name"], "demo");
    assert_eq!(value["venvs"][0]["status"], "valid");
}

#[test]
fn list_auto_registers_current_project() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    // Lose the cache; running list inside the project restores the mapping
    // from .env.uve.
    std::fs::remove_file(env.cache_file()).unwrap();

    let output = env.cmd().args(["--json", "list"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(value["summary"]["total"], 1);
    assert_eq!(value["venvs"][0]["project_name"], "demo");

    let cache = env.cache_json();
    assert_eq!(cache["venvs"].as_object().unwrap().len(), 1);
}

#[test]
fn prune_auto_registers_current_project() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    let cache = env.cache_json();
    let entry = cache["venvs"].as_object().unwrap().values().next().unwrap().clone();
    let venv_dir = PathBuf::from(entry["venv_path_expanded"].as_str().unwrap());

    // Even with the cache gone, prune --current finds the venv through the
    // project's .env.uve.
    std::fs::remove_file(env.cache_file()).unwrap();
    env.cmd()
        .args(["--yes", "prune", "--current"])
        .assert()
        .success();

    assert!(!venv_dir.exists());
}

#[test]
fn list_flags_orphan_when_env_file_removed() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();
    std::fs::remove_file(env.env_file()).unwrap();

    let output = env.cmd().args(["--json", "list"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(value["summary"]["orphaned"], 1);
    assert_eq!(value["venvs"][0]["status"], "orphaned");
    let issues = value["venvs"][0]["issues"].as_array().unwrap();
    assert!(issues
        .iter()
        .any(|i| i.as_str().unwrap().contains(".env.uve")));
}

#[test]
fn register_restores_lost_cache_entry() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    std::fs::remove_file(env.cache_file()).unwrap();
    env.cmd().arg("register").assert().success();

    let cache = env.cache_json();
    let venvs = cache["venvs"].as_object().unwrap();
    assert_eq!(venvs.len(), 1);
    assert_eq!(venvs.values().next().unwrap()["project_name"], "demo");
}

#[test]
fn register_without_env_file_fails() {
    let env = TestEnv::new("demo");

    env.cmd()
        .arg("register")
        .assert()
        .failure()
        .stderr(predicate::str::contains("init"));
}

#[test]
fn activate_prints_export_and_source() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    env.cmd()
        .args(["activate", "--shell", "bash"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("export UV_PROJECT_ENVIRONMENT=\"${HOME}/prime-uve/venvs/demo_")
                .and(predicate::str::contains("source "))
                .and(predicate::str::contains("/bin/activate")),
        );
}

#[test]
fn activate_fish_uses_set() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    env.cmd()
        .args(["activate", "--shell", "fish"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("set -x UV_PROJECT_ENVIRONMENT")
                .and(predicate::str::contains("activate.fish")),
        );
}

#[test]
fn activate_without_env_file_fails() {
    let env = TestEnv::new("demo");

    env.cmd()
        .args(["activate", "--shell", "bash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".env.uve"));
}

#[test]
fn activate_unknown_shell_fails() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    env.cmd()
        .args(["activate", "--shell", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported shell"));
}

#[test]
fn prune_requires_exactly_one_mode() {
    let env = TestEnv::new("demo");

    env.cmd()
        .arg("prune")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--orphan"));

    env.cmd()
        .args(["prune", "--all", "--orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly one"));
}

#[test]
fn prune_orphan_removes_orphaned_venv() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    let cache = env.cache_json();
    let entry = cache["venvs"].as_object().unwrap().values().next().unwrap().clone();
    let venv_dir = PathBuf::from(entry["venv_path_expanded"].as_str().unwrap());
    assert!(venv_dir.is_dir());

    // Orphan the mapping, then prune it away.
    std::fs::remove_file(env.env_file()).unwrap();
    env.cmd()
        .args(["--yes", "prune", "--orphan"])
        .assert()
        .success();

    assert!(!venv_dir.exists());
    let cache = env.cache_json();
    assert!(cache["venvs"].as_object().unwrap().is_empty());
}

#[test]
fn prune_orphan_leaves_valid_venvs() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    env.cmd()
        .args(["--yes", "prune", "--orphan"])
        .assert()
        .success();

    let cache = env.cache_json();
    assert_eq!(cache["venvs"].as_object().unwrap().len(), 1);
}

#[test]
fn prune_orphan_sweeps_untracked_dirs() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    let stray = env
        .home
        .path()
        .join("prime-uve")
        .join("venvs")
        .join("stray_00000000");
    std::fs::create_dir_all(&stray).unwrap();

    env.cmd()
        .args(["--yes", "prune", "--orphan"])
        .assert()
        .success();

    assert!(!stray.exists());
}

#[test]
fn prune_dry_run_removes_nothing() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    env.cmd()
        .args(["--dry-run", "prune", "--all"])
        .assert()
        .success();

    let cache = env.cache_json();
    assert_eq!(cache["venvs"].as_object().unwrap().len(), 1);
}

#[test]
fn prune_all_removes_everything() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    env.cmd().args(["--yes", "prune", "--all"]).assert().success();

    let cache = env.cache_json();
    assert!(cache["venvs"].as_object().unwrap().is_empty());
}

#[test]
fn prune_all_removes_untracked_venvs() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    let stray = env
        .home
        .path()
        .join("prime-uve")
        .join("venvs")
        .join("stray_00000000");
    std::fs::create_dir_all(&stray).unwrap();

    env.cmd().args(["--yes", "prune", "--all"]).assert().success();

    assert!(!stray.exists());
    let cache = env.cache_json();
    assert!(cache["venvs"].as_object().unwrap().is_empty());
}

#[test]
fn prune_path_outside_base_dir_refused() {
    let env = TestEnv::new("demo");
    let outside = env.home.path().join("random-dir");
    std::fs::create_dir(&outside).unwrap();

    env.cmd()
        .arg("prune")
        .arg(&outside)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("base directory"));
    assert!(outside.exists());
}

#[test]
fn configure_vscode_creates_workspace() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    env.cmd()
        .args(["configure", "vscode", "--create"])
        .assert()
        .success();

    let ws_path = env.project.join("demo.code-workspace");
    let ws: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&ws_path).unwrap()).unwrap();
    assert_eq!(ws["folders"][0]["path"], ".");
    assert!(ws["settings"]["python.defaultInterpreterPath"]
        .as_str()
        .unwrap()
        .ends_with("python"));
    assert_eq!(ws["settings"]["python.terminal.activateEnvironment"], true);
    assert_eq!(
        ws["settings"]["python.envFile"],
        "${workspaceFolder}/.env.uve"
    );
}

#[test]
fn configure_vscode_updates_existing_workspace() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    let ws_path = env.project.join("demo.code-workspace");
    std::fs::write(
        &ws_path,
        "{\n  // keep my folders\n  \"folders\": [{\"path\": \"src\"}],\n  \"settings\": {\"editor.fontSize\": 14}\n}",
    )
    .unwrap();

    env.cmd().args(["configure", "vscode"]).assert().success();

    let ws: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&ws_path).unwrap()).unwrap();
    assert_eq!(ws["folders"][0]["path"], "src");
    assert_eq!(ws["settings"]["editor.fontSize"], 14);
    assert_eq!(
        ws["settings"]["python.envFile"],
        "${workspaceFolder}/.env.uve"
    );
}

#[test]
fn configure_vscode_backs_up_malformed_workspace() {
    let env = TestEnv::new("demo");
    env.cmd().arg("init").assert().success();

    let ws_path = env.project.join("demo.code-workspace");
    std::fs::write(&ws_path, "{ definitely not json").unwrap();

    env.cmd().args(["configure", "vscode"]).assert().success();

    assert!(env.project.join("demo.code-workspace.bak").exists());
    let ws: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&ws_path).unwrap()).unwrap();
    assert!(ws["settings"]["python.defaultInterpreterPath"].is_string());
}

#[test]
fn configure_vscode_without_init_fails() {
    let env = TestEnv::new("demo");

    env.cmd()
        .args(["configure", "vscode", "--create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("init"));
}

#[test]
fn uve_without_env_file_fails() {
    let env = TestEnv::new("demo");

    env.uve()
        .arg("--version")
        .assert()
        .failure()
        .stderr(predicate::str::contains(".env.uve"));
}

#[test]
fn corrupt_cache_is_recovered_on_next_write() {
    let env = TestEnv::new("demo");
    std::fs::create_dir_all(env.cache_file().parent().unwrap()).unwrap();
    std::fs::write(env.cache_file(), "garbage{{{").unwrap();

    env.cmd().arg("init").assert().success();

    let cache = env.cache_json();
    assert_eq!(cache["version"], "1.0");
    assert_eq!(cache["venvs"].as_object().unwrap().len(), 1);
}
