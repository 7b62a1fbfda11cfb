//! Foundation crate for hark: the shared error taxonomy, external command
//! execution, host platform detection, on-disk layout and configuration.

pub mod command;
pub mod config;
pub mod error;
pub mod platform;
pub mod user_paths;

pub use command::{run_all, Command, CommandOutput, CommandRunner, SystemRunner};
pub use config::HarkConfig;
pub use error::{HarkError, Result};
pub use platform::{check_environment, Os};
