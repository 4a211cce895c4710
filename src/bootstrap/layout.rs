// SPDX-License-Identifier: GPL-3.0-only
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::bootstrap::BootstrapError;
use crate::config::Config;

/// Permission bits applied to every required directory
pub const DIR_MODE: u32 = 0o755;

/// Filesystem state the server expects before it starts
#[derive(Debug, Clone)]
pub struct Layout {
    pub dirs: Vec<PathBuf>,
    pub stale_files: Vec<PathBuf>,
}

impl Layout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dirs: config.required_dirs(),
            stale_files: config.stale_files.clone(),
        }
    }

    /// Delete leftover files that would shadow modules of the server.
    /// Returns the paths that were actually removed.
    pub async fn remove_stale_files(&self) -> Result<Vec<PathBuf>, BootstrapError> {
        let mut removed = Vec::new();

        for path in &self.stale_files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    info!(path = %path.display(), "Removed stale file");
                    removed.push(path.clone());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Stale file not present");
                }
                Err(e) => {
                    return Err(BootstrapError::RemoveStale {
                        path: path.clone(),
                        source: e,
                    });
                }
            }
        }

        Ok(removed)
    }

    /// Create every required directory with [`DIR_MODE`].
    ///
    /// Existing directories are not an error; their mode is reset to
    /// [`DIR_MODE`] so reruns converge on the same state.
    pub async fn ensure_directories(&self) -> Result<(), BootstrapError> {
        for dir in &self.dirs {
            let mut builder = tokio::fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(DIR_MODE);

            builder
                .create(dir)
                .await
                .map_err(|e| BootstrapError::Directory {
                    path: dir.clone(),
                    source: e,
                })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))
                    .await
                    .map_err(|e| BootstrapError::Directory {
                        path: dir.clone(),
                        source: e,
                    })?;
            }

            debug!(path = %dir.display(), "Directory ready");
        }

        info!(count = self.dirs.len(), "Application directories ready");
        Ok(())
    }
}
