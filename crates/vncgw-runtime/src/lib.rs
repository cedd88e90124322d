//! Process runtime for the vncgw gateway.
//!
//! Owns everything that touches the OS: display number allocation against
//! on-disk lock files, helper process launch and teardown, the client-count
//! probe, and the session lifecycle built on top of them.
#![deny(unsafe_code)]

pub mod display;
mod gateway;
pub mod helpers;
pub mod ids;
mod poller;
pub mod probe;
pub mod process;
pub mod registry;
pub mod session;

#[cfg(all(test, unix))]
mod test_support;

pub use display::DisplayAllocator;
pub use gateway::{Gateway, SessionOutcome};
pub use ids::IdGenerator;
pub use probe::CaptureClientProbe;
pub use process::{LaunchSpec, ManagedProcess, ProcessLauncher, shutdown_child};
pub use registry::{LockedSession, SessionRegistry};
pub use session::{Session, SessionDeps, SessionPhase, SessionState};
