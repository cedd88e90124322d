//! Client identifiers, viewports and the per-request connect parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ports::GatewayError;

/// Maximum accepted length of a client identifier.
const MAX_ID_LEN: usize = 32;

/// Largest accepted viewport edge, in pixels.
pub const MAX_VIEWPORT_EDGE: u32 = 16384;

/// Opaque token correlating a browser's requests to one session.
///
/// Identifiers are capacity tokens, not secrets: they only need to be
/// unique over the gateway's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Parse an identifier taken from a request path.
    ///
    /// Accepts 1 to 32 ASCII alphanumeric characters.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        if raw.is_empty() || raw.len() > MAX_ID_LEN {
            return Err(GatewayError::InvalidRequest(format!(
                "client id must be 1-{MAX_ID_LEN} characters"
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(GatewayError::InvalidRequest(format!(
                "client id contains invalid characters: {raw}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Render a generated 32-bit token as a fixed-width hex identifier.
    pub fn from_token(token: u32) -> Self {
        Self(format!("{token:08x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Browser viewport size measured client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, GatewayError> {
        if width == 0 || height == 0 || width > MAX_VIEWPORT_EDGE || height > MAX_VIEWPORT_EDGE {
            return Err(GatewayError::InvalidRequest(format!(
                "viewport {width}x{height} out of range"
            )));
        }
        Ok(Self { width, height })
    }
}

/// Parse the `{id}_{width}_{height}` path segment.
pub fn parse_session_path(segment: &str) -> Result<(ClientId, Viewport), GatewayError> {
    let parts: Vec<&str> = segment.split('_').collect();
    let [id, width, height] = parts.as_slice() else {
        return Err(GatewayError::InvalidRequest(format!(
            "expected id_width_height, got {segment}"
        )));
    };

    let parse_edge = |raw: &str| {
        raw.parse::<u32>()
            .map_err(|_| GatewayError::InvalidRequest(format!("invalid viewport edge: {raw}")))
    };

    let id = ClientId::parse(id)?;
    let viewport = Viewport::new(parse_edge(width)?, parse_edge(height)?)?;
    Ok((id, viewport))
}

/// Whether a `User-Agent` header belongs to a phone or tablet browser.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    ["Mobi", "Android", "iPhone", "iPad"]
        .iter()
        .any(|marker| user_agent.contains(marker))
}

/// Per-request parameters of a session's connect sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub viewport: Viewport,
    /// The requesting browser was detected as mobile.
    pub mobile: bool,
}

impl ConnectRequest {
    pub const fn new(viewport: Viewport, mobile: bool) -> Self {
        Self { viewport, mobile }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_path() {
        let (id, viewport) = parse_session_path("abc_800_600").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(viewport, Viewport::new(800, 600).unwrap());
    }

    #[test]
    fn test_parse_session_path_wrong_arity() {
        assert!(parse_session_path("abc_800").is_err());
        assert!(parse_session_path("abc_800_600_1").is_err());
        assert!(parse_session_path("").is_err());
    }

    #[test]
    fn test_parse_session_path_bad_numbers() {
        assert!(parse_session_path("abc_wide_600").is_err());
        assert!(parse_session_path("abc_-1_600").is_err());
        assert!(parse_session_path("abc_0_600").is_err());
        assert!(parse_session_path("abc_800_99999").is_err());
    }

    #[test]
    fn test_client_id_rejects_punctuation() {
        assert!(ClientId::parse("a.b").is_err());
        assert!(ClientId::parse("../x").is_err());
        assert!(ClientId::parse(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_client_id_from_token_is_fixed_width() {
        assert_eq!(ClientId::from_token(0x2a).as_str(), "0000002a");
        assert!(ClientId::parse(ClientId::from_token(u32::MAX).as_str()).is_ok());
    }

    #[test]
    fn test_mobile_user_agents() {
        assert!(is_mobile_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148"
        ));
        assert!(is_mobile_user_agent(
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0"
        ));
        assert!(!is_mobile_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0"
        ));
    }
}
