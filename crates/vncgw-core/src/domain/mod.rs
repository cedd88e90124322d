//! Domain types for the gateway.
//!
//! These are pure value types with no infrastructure dependencies.

mod client;
mod display;
mod viewer;

pub use client::{ClientId, ConnectRequest, Viewport, is_mobile_user_agent, parse_session_path};
pub use display::DisplayNumber;
pub use viewer::{PortPlan, ViewerContext};
