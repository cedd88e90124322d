//! Port definitions and the error taxonomy shared across adapters.
//!
//! Ports are traits implemented by the runtime or by the HTTP adapter.
//! Errors here are semantic; adapters map them to their own surfaces
//! (HTTP status codes, CLI exit codes).

mod client_probe;
mod viewer_page;

pub use client_probe::ClientProbe;
pub use viewer_page::ViewerPage;

#[cfg(test)]
pub use client_probe::MockClientProbe;

use std::time::Duration;

use thiserror::Error;

/// Errors raised while starting, talking to or stopping a helper process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable could not be found or started.
    #[error("failed to spawn {name}: {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper started but did not report what it was expected to.
    #[error("{name} handshake failed: {reason}")]
    Handshake { name: String, reason: String },

    /// A line of helper output did not match the expected format.
    #[error("malformed helper output: {0:?}")]
    MalformedOutput(String),

    /// A bounded read or wait ran out of time.
    #[error("{name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// An out-of-band query exited unsuccessfully.
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Errors surfaced by the gateway to its front end.
///
/// Each variant corresponds to one response class: `ResourceExhausted`
/// (429), `SpawnFailed` (424), `TemplateRenderFailed` (500),
/// `InvalidRequest` (400).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No free display number below the configured ceiling.
    #[error("no free display number below {max_display}")]
    ResourceExhausted { max_display: u32 },

    /// One of the four per-session processes failed to start.
    #[error("failed to start {helper}: {source}")]
    SpawnFailed {
        helper: &'static str,
        #[source]
        source: ProcessError,
    },

    /// The viewer page could not be rendered.
    #[error("failed to render viewer page: {0}")]
    TemplateRenderFailed(String),

    /// Malformed request path or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub const fn spawn_failed(helper: &'static str, source: ProcessError) -> Self {
        Self::SpawnFailed { helper, source }
    }
}
