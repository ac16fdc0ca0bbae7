//! Command handlers.

mod config_path;
mod fetch;

pub use config_path::run_config_path;
pub use fetch::run_fetch;
