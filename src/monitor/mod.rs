// SPDX-License-Identifier: GPL-3.0-only
pub mod host;
pub mod sampler;

pub use host::{disk_space_for, total_memory_gb};
pub use sampler::{ResourceMonitor, ResourceSnapshot, SharedSnapshot};
