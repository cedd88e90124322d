//! Core domain types and port definitions for the vncgw remote-display gateway.
//!
//! This crate has no process, filesystem-scanning or HTTP concerns. It defines
//! the vocabulary shared by the runtime (`vncgw-runtime`), the HTTP adapter
//! (`vncgw-axum`) and the application-side hook (`vncgw-cli`):
//!
//! - [`config`] - immutable gateway configuration and its defaults
//! - [`domain`] - client identifiers, display numbers, viewports, port plans
//! - [`handshake`] - parsers for the line-oriented helper protocols
//! - [`instance`] - the environment contract between gateway and application
//! - [`ports`] - error taxonomy and the traits adapters implement
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod handshake;
pub mod instance;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{
    AppCommand, ConfigError, DEFAULT_DEPTH, DEFAULT_MAX_DISPLAY, DEFAULT_POLL_INTERVAL,
    DEFAULT_POLL_VARIANCE, DEFAULT_PORT, DEFAULT_QUALITY, GatewayConfig, HelperPaths,
    MOBILE_SCALE_ENV, validate_config,
};
pub use domain::{ClientId, ConnectRequest, DisplayNumber, PortPlan, ViewerContext, Viewport};
pub use handshake::{parse_client_count, parse_port_line};
pub use instance::InstanceEnv;
pub use ports::{ClientProbe, GatewayError, ProcessError, ViewerPage};

// Silence unused dev-dependency warnings; mockall is used via automock
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tokio as _;
