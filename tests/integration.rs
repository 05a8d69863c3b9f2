use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PROJECT: &str = "11a3492b-cd32-0054-51d2-8234ec4244a6";

fn csync_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("csync");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[project]
id = "{}"
languages = ["en", "cz"]
item_types = ["article"]

[delivery]
base_url = "http://127.0.0.1:9"
timeout_secs = 2

[db]
path = "{}/data/nodes.sqlite"

[server]
bind = "127.0.0.1:7340"
"#,
        PROJECT,
        root.display()
    );

    let config_path = config_dir.join("csync.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_csync(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(csync_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute csync");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_csync(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized"));
    assert!(tmp.path().join("data/nodes.sqlite").exists());

    // Idempotent
    let (_, stderr, success) = run_csync(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_nodes_on_empty_database() {
    let (_tmp, config_path) = setup_test_env();
    run_csync(&config_path, &["init"]);
    let (stdout, stderr, success) = run_csync(&config_path, &["nodes"]);
    assert!(success, "nodes failed: {}", stderr);
    assert!(stdout.contains("0 nodes"));
}

#[test]
fn test_replay_ignores_foreign_project_without_fetching() {
    let (tmp, config_path) = setup_test_env();
    let payload = tmp.path().join("webhook.json");
    fs::write(
        &payload,
        r#"{
  "data": { "items": [ { "id": "f4b3fc05-e988-4dae-9ac1-a94aba566474", "language": "en" } ] },
  "message": {
    "api_name": "delivery_preview",
    "operation": "upsert",
    "project_id": "00000000-0000-0000-0000-000000000000",
    "type": "content_item_variant"
  }
}"#,
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_csync(&config_path, &["replay", payload.to_str().unwrap()]);
    assert!(success, "replay failed: {}", stderr);
    assert!(stdout.contains("ignored (unsupported)"), "stdout: {}", stdout);
}

#[test]
fn test_replay_ignores_malformed_payload() {
    let (tmp, config_path) = setup_test_env();
    let payload = tmp.path().join("webhook.json");
    fs::write(&payload, r#"{ "data": { "items": [ { "language": "en" } ] } }"#).unwrap();

    let (stdout, stderr, success) =
        run_csync(&config_path, &["replay", payload.to_str().unwrap()]);
    assert!(success, "replay failed: {}", stderr);
    assert!(stdout.contains("ignored (not a webhook)"), "stdout: {}", stdout);
}

#[test]
fn test_replay_fails_when_remote_is_unreachable() {
    let (tmp, config_path) = setup_test_env();
    let payload = tmp.path().join("webhook.json");
    fs::write(
        &payload,
        format!(
            r#"{{
  "data": {{ "items": [ {{ "id": "f4b3fc05-e988-4dae-9ac1-a94aba566474", "language": "en" }} ] }},
  "message": {{
    "api_name": "delivery_preview",
    "operation": "upsert",
    "project_id": "{}",
    "type": "content_item_variant"
  }}
}}"#,
            PROJECT
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_csync(&config_path, &["replay", payload.to_str().unwrap()]);
    assert!(!success, "replay should fail when the Delivery API is unreachable");
    assert!(stderr.contains("failed to fetch item"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("csync.toml");
    fs::write(
        &config_path,
        r#"[project]
id = "p"
languages = []
item_types = ["article"]

[db]
path = "nodes.sqlite"

[server]
bind = "127.0.0.1:7340"
"#,
    )
    .unwrap();

    let (_, stderr, success) = run_csync(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("project.languages"), "stderr: {}", stderr);
}
