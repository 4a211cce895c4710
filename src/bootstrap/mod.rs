// SPDX-License-Identifier: GPL-3.0-only
pub mod command;
pub mod entrypoint;
pub mod error;
pub mod layout;

pub use command::CommandSpec;
pub use entrypoint::Entrypoint;
pub use error::BootstrapError;
pub use layout::Layout;
