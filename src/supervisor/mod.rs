// SPDX-License-Identifier: GPL-3.0-only
pub mod health;
pub mod policy;
pub mod probe;
pub mod process;

pub use health::{HealthState, HealthTracker, HealthcheckSpec};
pub use policy::{ExitReason, RestartBackoff, RestartPolicy};
pub use probe::{HttpProbe, ProbeError};
pub use process::Supervisor;
