//! Viewer page rendering port.

use super::GatewayError;
use crate::domain::ViewerContext;

/// Renders the HTML page served to a browser once its session is started.
///
/// Rendering happens inside the connect sequence, before the application is
/// launched, so a failure here still tears down the helpers.
pub trait ViewerPage: Send + Sync {
    fn render(&self, ctx: &ViewerContext) -> Result<String, GatewayError>;
}
