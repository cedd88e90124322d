//! Route definitions and router construction.
//!
//! # Path Parameter Syntax
//! Axum 0.8 uses brace syntax for path parameters: `{session}`

use axum::Router;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the gateway router.
///
/// - `GET /` redirect page with a fresh client id
/// - `GET /{id}_{width}_{height}` session start (or redirect)
/// - `GET /{session}/...` rejected as a malformed session path
/// - `GET /favicon*` files at the root of the assets directory
/// - `GET /core/*`, `/vendor/*` viewer assets
pub fn create_router(state: AppState) -> Router {
    let core = ServeDir::new(state.assets_dir.join("core"));
    let vendor = ServeDir::new(state.assets_dir.join("vendor"));

    Router::new()
        .route("/", get(handlers::index))
        .route("/{session}", get(handlers::session))
        .route("/{session}/{*rest}", get(handlers::malformed_session))
        .nest_service("/core", core)
        .nest_service("/vendor", vendor)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
