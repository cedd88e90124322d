//! Subprocess supervision.
//!
//! - `ProcessLauncher` / `LaunchSpec` - start a command with an environment
//!   overlay and optional stdout capture
//! - `ManagedProcess` - owned handle with a one-shot `cancel_and_reap`
//! - `shutdown_child` - SIGTERM → SIGKILL escalation with reaping

mod launcher;
pub mod shutdown;

pub use launcher::{LaunchSpec, ManagedProcess, ProcessLauncher};
pub use shutdown::shutdown_child;
