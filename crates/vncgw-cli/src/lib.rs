//! Gateway flags, the application-side init hook and the `vncgw` command.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by main.rs binary
use dotenvy as _;

// Only the unix runner tests write fake applications
#[cfg(all(test, not(unix)))]
use tempfile as _;

pub mod error;
pub mod flags;
pub mod hook;
pub mod logging;
pub mod runner;

// Re-export primary types for convenient access
pub use error::CliError;
pub use flags::{FlagError, GatewayFlags, parse_duration, parse_gateway_flags};
pub use hook::{Init, init};
pub use logging::init_logging;
pub use runner::run;
