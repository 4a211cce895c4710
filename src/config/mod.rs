// SPDX-License-Identifier: GPL-3.0-only
#[allow(clippy::module_inception)]
pub mod config;

pub use config::{APP_NAME, CONFIG_PATH_VAR, Config, SupervisorConfig};
