//! Axum HTTP front end for the vncgw gateway.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings; used by integration tests
#[cfg(test)]
use http_body_util as _;

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod templates;

// Re-export primary types
pub use bootstrap::{AxumContext, bootstrap, serve, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
pub use templates::{HtmlViewerPage, redirect_page};
