//! Request handlers.

use std::convert::Infallible;

use axum::extract::{Path, Request, State};
use axum::http::header::USER_AGENT;
use axum::response::{Html, IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::debug;
use vncgw_core::domain::{is_mobile_user_agent, parse_session_path};
use vncgw_core::ConnectRequest;
use vncgw_runtime::SessionOutcome;

use crate::error::HttpError;
use crate::state::AppState;
use crate::templates::redirect_page;

/// `GET /`: hand out a fresh client id.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(redirect_page(&state.gateway.new_client_id()))
}

/// `GET /{id}_{width}_{height}`: start the session or send the browser back
/// through the redirect page.
pub async fn session(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    request: Request,
) -> Result<Response, HttpError> {
    if segment.starts_with("favicon") {
        return Ok(serve_asset(&state, request).await);
    }

    let (id, viewport) = parse_session_path(&segment)?;
    let mobile = request
        .headers()
        .get(USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .is_some_and(is_mobile_user_agent);

    let outcome = state
        .gateway
        .open_session(&id, &ConnectRequest::new(viewport, mobile))
        .await?;

    Ok(match outcome {
        SessionOutcome::Viewer(page) => Html(page).into_response(),
        SessionOutcome::Redirect => {
            debug!(client_id = %id, "Redirecting to a fresh session");
            Html(redirect_page(&state.gateway.new_client_id())).into_response()
        }
    })
}

/// Session paths are a single segment; anything deeper is malformed.
pub async fn malformed_session(request: Request) -> HttpError {
    HttpError::BadRequest(format!("malformed session path {}", request.uri().path()))
}

pub async fn not_found(request: Request) -> HttpError {
    HttpError::NotFound(request.uri().path().to_string())
}

/// Serve a file from the root of the assets directory.
async fn serve_asset(state: &AppState, request: Request) -> Response {
    let result: Result<_, Infallible> = ServeDir::new(&state.assets_dir).oneshot(request).await;
    match result {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
