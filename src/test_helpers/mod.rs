// SPDX-License-Identifier: GPL-3.0-only
use std::path::Path;
use crate::config::Config;

/// Create a test configuration rooted in a temporary directory
///
/// Thresholds are zeroed and connectivity is disabled so the pre-flight
/// checks only depend on the filesystem.
pub fn create_test_config(root: &Path) -> Config {
    let mut config = Config {
        download_dir: root.join("data/downloads"),
        steamcmd_dir: root.join("app/steamcmd"),
        log_dir: root.join("app/logs"),
        cache_dir: root.join("app/cache"),
        host: "127.0.0.1".to_string(),
        port: 0, // Use port 0 to auto-assign
        log_level: "error".to_string(), // Reduce log noise in tests
        stale_files: vec![root.join("app/logging.py")],
        ..Config::default()
    };
    config.preflight.connectivity_enabled = false;
    config.preflight.min_memory_gb = 0.0;
    config.preflight.min_disk_gb = 0.0;
    config
}

/// Create a temporary directory for tests
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("Failed to create temp directory")
}
