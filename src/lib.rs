//! Resolution of declarative storage layouts against a snapshot of the
//! system's block devices.

pub mod cli;
pub mod input;
pub mod inventory;
pub mod issues;
mod logging;
pub mod model;
pub mod resolver;
pub mod solver_settings;
pub mod space_policy;
pub mod validation;

pub use inventory::build_inventory;
pub use logging::{file_log::FileLog, multilog::MultiLogger};
pub use model::build_model;
pub use resolver::{resolve_config, Resolution};
pub use solver_settings::build_settings;

pub const DISKPLAN_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) fn is_false(b: &bool) -> bool {
    !b
}
