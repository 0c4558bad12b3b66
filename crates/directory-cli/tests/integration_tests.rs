//! Integration tests for the directory CLI binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Test context with its own database and configuration
struct TestContext {
    temp_dir: TempDir,
}

fn data(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(
            temp_dir.path().join("directory.toml"),
            "artifacts_base_url = \"https://artifacts.example.com\"\ndefault_page_size = 10\n",
        )
        .expect("failed to write config");
        Self { temp_dir }
    }

    fn directory_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_directory"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("DIRECTORY_ARTIFACTS_BASE_URL");
        cmd.env("DIRECTORY_CONFIG", self.temp_dir.path().join("directory.toml"));
        cmd.env("DIRECTORY_DATABASE", self.temp_dir.path().join("directory.db"));
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.directory_cmd()
            .args(args)
            .output()
            .expect("failed to run directory")
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let mut all = vec!["--json"];
        all.extend_from_slice(args);
        let output = self.run(&all);
        assert!(
            output.status.success(),
            "command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }

    fn consume_fixture(&self) -> Output {
        let events = data("events.jsonl");
        self.run(&["consume", events.to_str().unwrap()])
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("download-info"));
}

#[test]
fn test_consume_confirms_and_dead_letters() {
    let ctx = TestContext::new();
    let output = ctx.consume_fixture();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let confirmations: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0]["type"], "app_published");
    assert_eq!(confirmations[0]["app"]["app_id"], "app.accrescent.client");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("app ID is missing but required"));
    assert!(stderr.contains("malformed event"));
}

#[test]
fn test_queries_after_consume() {
    let ctx = TestContext::new();
    assert!(ctx.consume_fixture().status.success());
    let device = data("pixel_emulator.json");
    let device = device.to_str().unwrap();

    let listing = ctx.json(&["listing", "app.accrescent.client", "--device", device]);
    assert_eq!(listing["listing"]["language"], "de");
    assert_eq!(listing["listing"]["version_name"], "0.25.0");
    assert_eq!(
        listing["listing"]["download_size"]["uncompressed_total"],
        4_648_720
    );

    let english = ctx.json(&["listing", "app.accrescent.client", "--language", "en"]);
    assert_eq!(english["listing"]["language"], "en");

    let download = ctx.json(&["download-info", "app.accrescent.client", "--device", device]);
    assert_eq!(download["app_download_info"]["download_size"], 4_648_720);
    assert_eq!(
        download["app_download_info"]["split_download_info"]
            .as_array()
            .unwrap()
            .len(),
        3
    );

    let update = ctx.json(&[
        "update-info",
        "app.accrescent.client",
        "--base-version-code",
        "48",
        "--device",
        device,
    ]);
    assert_eq!(update["update_info"]["compatibility"]["level"], "compatible");

    let page = ctx.json(&["list", "--full"]);
    assert_eq!(page["listings"].as_array().unwrap().len(), 1);
    assert!(page["next_page_token"].is_string());

    let stats = ctx.json(&["stats"]);
    assert_eq!(stats.as_array().unwrap().len(), 3);
}

#[test]
fn test_publish_single_event() {
    let ctx = TestContext::new();
    let event = data("publication.json");
    let output = ctx.run(&["publish", event.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Published app.accrescent.client"));
}

#[test]
fn test_unknown_app_fails() {
    let ctx = TestContext::new();
    let output = ctx.run(&["listing", "com.example.missing"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NOT_FOUND"));
}
