// SPDX-License-Identifier: GPL-3.0-only
use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    #[error("Failed to remove stale file {path}: {source}")]
    RemoveStale {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to prepare directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to locate the current executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to exec {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: io::Error,
    },
}
