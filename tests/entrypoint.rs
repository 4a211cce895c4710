// SPDX-License-Identifier: GPL-3.0-only
#![cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_steam-downloader");

struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    fn quoted(&self, name: &str) -> String {
        toml_string(&self.path(name))
    }

    /// Writes a config whose check and server are shell snippets
    fn write_config(&self, check: &str, server: &str) -> PathBuf {
        let config = format!(
            r#"
download_dir = {downloads}
steamcmd_dir = {steamcmd}
log_dir = {logs}
cache_dir = {cache}
log_level = "error"
stale_files = [{stale}]
check_command = ["/bin/sh", "-c", {check}]
server_command = ["/bin/sh", "-c", {server}]

[preflight]
min_memory_gb = 0.0
min_disk_gb = 0.0
connectivity_enabled = false
"#,
            downloads = self.quoted("data/downloads"),
            steamcmd = self.quoted("app/steamcmd"),
            logs = self.quoted("app/logs"),
            cache = self.quoted("app/cache"),
            stale = self.quoted("app/logging.py"),
            check = toml_str(check),
            server = toml_str(server),
        );
        let path = self.path("config.toml");
        std::fs::write(&path, config).unwrap();
        path
    }

    fn run(&self, config: &Path, args: &[&str]) -> Output {
        Command::new(BIN)
            .args(args)
            .env("STEAM_DOWNLOADER_CONFIG", config)
            .env_remove("STEAM_DOWNLOAD_PATH")
            .env_remove("STEAMCMD_DIR")
            .env_remove("LOG_DIR")
            .env_remove("CACHE_DIR")
            .env_remove("HOST")
            .env_remove("PORT")
            .env_remove("LOG_LEVEL")
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn toml_str(value: &str) -> String {
    format!("{:?}", value)
}

fn toml_string(path: &Path) -> String {
    toml_str(&path.to_string_lossy())
}

#[test]
fn failed_check_never_starts_server() {
    let fixture = Fixture::new();
    let marker = fixture.path("server-started");
    let config = fixture.write_config(
        "exit 1",
        &format!("touch '{}'", marker.display()),
    );

    let output = fixture.run(&config, &["entrypoint"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!marker.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Initialization checks failed"));
}

#[test]
fn passing_check_hands_off_to_server() {
    let fixture = Fixture::new();
    let marker = fixture.path("server-started");
    let config = fixture.write_config(
        "exit 0",
        &format!("touch '{}'; exit 7", marker.display()),
    );

    let output = fixture.run(&config, &["entrypoint"]);

    // The server's exit status is the process's exit status after exec
    assert_eq!(output.status.code(), Some(7));
    assert!(marker.exists());
}

#[test]
fn stale_file_removed_before_check() {
    let fixture = Fixture::new();
    let stale = fixture.path("app/logging.py");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "import logging\n").unwrap();

    // The check itself fails if the stale file is still there
    let config = fixture.write_config(
        &format!("test ! -e '{}'", stale.display()),
        "exit 0",
    );

    let output = fixture.run(&config, &["entrypoint"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(!stale.exists());
}

#[test]
fn directories_created_with_mode_755() {
    let fixture = Fixture::new();
    let config = fixture.write_config("exit 1", "exit 0");

    fixture.run(&config, &["entrypoint"]);

    for dir in ["data/downloads", "app/steamcmd", "app/logs", "app/cache"] {
        let meta = std::fs::metadata(fixture.path(dir)).unwrap();
        assert!(meta.is_dir(), "{} missing", dir);
        assert_eq!(meta.permissions().mode() & 0o777, 0o755, "{} mode", dir);
    }
}

#[test]
fn check_command_passes_on_prepared_layout() {
    let fixture = Fixture::new();
    let config = fixture.write_config("exit 0", "exit 0");
    for dir in ["data/downloads", "app/steamcmd", "app/logs", "app/cache"] {
        std::fs::create_dir_all(fixture.path(dir)).unwrap();
    }

    let output = fixture.run(&config, &["check"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[PASS] File permissions"));
    assert!(!fixture.path("app/cache/.permission_test").exists());
}

#[test]
fn check_command_fails_on_unwritable_directory() {
    let fixture = Fixture::new();
    let config = fixture.write_config("exit 0", "exit 0");
    // A regular file where the cache directory's parent should be
    std::fs::write(fixture.path("app"), "not a directory").unwrap();

    let output = fixture.run(&config, &["check"]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn probe_against_closed_port_is_unhealthy() {
    let fixture = Fixture::new();
    let config = fixture.write_config("exit 0", "exit 0");
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{}/api/health", addr);
    let output = fixture.run(&config, &["probe", "--url", &url, "--timeout-secs", "2"]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn explicit_missing_config_file_is_fatal() {
    let fixture = Fixture::new();
    let config = fixture.write_config("exit 0", "exit 0");
    let missing = fixture.path("typo.toml");

    let output = fixture.run(&config, &["--config", &missing.to_string_lossy(), "check"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("typo.toml"), "{}", stderr);
}
