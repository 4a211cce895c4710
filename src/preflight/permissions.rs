// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::preflight::traits::{Check, CheckReport};

const NAME: &str = "File permissions";
const PROBE_FILE: &str = ".permission_test";

/// Each directory must be creatable and writable
pub struct PermissionCheck {
    dirs: Vec<PathBuf>,
}

impl PermissionCheck {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    async fn probe(dir: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let probe = dir.join(PROBE_FILE);
        tokio::fs::write(&probe, b"").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}

#[async_trait]
impl Check for PermissionCheck {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> CheckReport {
        for dir in &self.dirs {
            if let Err(e) = Self::probe(dir).await {
                return CheckReport::fail(
                    NAME,
                    format!("Permission error for {}: {}", dir.display(), e),
                );
            }
        }

        CheckReport::pass(NAME, "File system permissions OK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writable_dirs_pass_and_leave_no_probe() {
        let root = TempDir::new().unwrap();
        let dirs = vec![root.path().join("downloads"), root.path().join("logs")];

        let report = PermissionCheck::new(dirs.clone()).run().await;

        assert!(report.passed, "{}", report.detail);
        for dir in dirs {
            assert!(dir.is_dir());
            assert!(!dir.join(PROBE_FILE).exists());
        }
    }

    #[tokio::test]
    async fn test_dir_under_regular_file_fails() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let report = PermissionCheck::new(vec![file.join("downloads")]).run().await;

        assert!(!report.passed);
        assert!(report.detail.contains("Permission error"));
    }
}
