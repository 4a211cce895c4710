// SPDX-License-Identifier: GPL-3.0-only
pub mod connectivity;
pub mod permissions;
pub mod resources;
pub mod runner;
pub mod traits;

pub use connectivity::ConnectivityCheck;
pub use permissions::PermissionCheck;
pub use resources::ResourceCheck;
pub use runner::PreflightRunner;
pub use traits::{Check, CheckReport};
