//! Environment contract between the gateway and the application instances it
//! launches.
//!
//! The gateway builds an [`InstanceEnv`] per session and passes it to the
//! application as an environment overlay. The application side reads it back
//! with [`InstanceEnv::from_env`] during initialisation.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{DisplayNumber, Viewport};

/// Marker set on every instance running under the gateway.
pub const ENV_GATEWAY: &str = "VNCGW";
/// Set to `1` when the requesting browser is a mobile client.
pub const ENV_MOBILE: &str = "VNCGW_MOBILE";
/// Scale override for mobile clients.
pub const ENV_SCALE: &str = "VNCGW_SCALE";
/// The X display the instance must connect to.
pub const ENV_DISPLAY: &str = "DISPLAY";
pub const ENV_WIDTH: &str = "VNCGW_WIDTH";
pub const ENV_HEIGHT: &str = "VNCGW_HEIGHT";
pub const ENV_DEPTH: &str = "VNCGW_DEPTH";
/// Wall-clock time the instance was launched, in Unix milliseconds.
pub const ENV_START_MS: &str = "VNCGW_START_MS";
/// Modification time of the gateway binary at launch, in Unix milliseconds.
pub const ENV_SERVER_MTIME_MS: &str = "VNCGW_SERVER_MTIME_MS";

/// Per-instance environment handed to an application launched by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceEnv {
    pub display: DisplayNumber,
    pub viewport: Viewport,
    pub depth: u8,
    pub mobile: bool,
    pub scale: Option<String>,
    pub started_at_ms: i64,
    pub server_mtime_ms: i64,
}

impl InstanceEnv {
    /// Environment overlay to apply on top of the gateway's own environment.
    pub fn to_overlay(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            (ENV_GATEWAY.to_string(), "1".to_string()),
            (ENV_DISPLAY.to_string(), self.display.as_display_string()),
            (ENV_WIDTH.to_string(), self.viewport.width.to_string()),
            (ENV_HEIGHT.to_string(), self.viewport.height.to_string()),
            (ENV_DEPTH.to_string(), self.depth.to_string()),
            (ENV_START_MS.to_string(), self.started_at_ms.to_string()),
            (
                ENV_SERVER_MTIME_MS.to_string(),
                self.server_mtime_ms.to_string(),
            ),
        ];
        if self.mobile {
            vars.push((ENV_MOBILE.to_string(), "1".to_string()));
            if let Some(scale) = &self.scale {
                vars.push((ENV_SCALE.to_string(), scale.clone()));
            }
        }
        vars
    }

    /// Read the contract from the current process environment.
    ///
    /// Returns `None` when the process is not running under the gateway.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the contract through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        if lookup(ENV_GATEWAY).as_deref() != Some("1") {
            return None;
        }

        let number = |key: &str| -> Option<i64> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    debug!(key, value = %raw, "Ignoring unparseable gateway variable");
                    None
                }
            }
        };

        let display = lookup(ENV_DISPLAY)?
            .trim()
            .strip_prefix(':')?
            .parse()
            .ok()
            .map(DisplayNumber::new)?;
        let width = u32::try_from(number(ENV_WIDTH)?).ok()?;
        let height = u32::try_from(number(ENV_HEIGHT)?).ok()?;
        let viewport = Viewport::new(width, height).ok()?;
        let mobile = lookup(ENV_MOBILE).as_deref() == Some("1");

        Some(Self {
            display,
            viewport,
            depth: number(ENV_DEPTH)
                .and_then(|d| u8::try_from(d).ok())
                .unwrap_or(crate::config::DEFAULT_DEPTH),
            mobile,
            scale: lookup(ENV_SCALE).filter(|_| mobile),
            started_at_ms: number(ENV_START_MS).unwrap_or(0),
            server_mtime_ms: number(ENV_SERVER_MTIME_MS).unwrap_or(0),
        })
    }

    /// Whether the gateway binary was replaced after this instance started.
    ///
    /// Compares the recorded modification time with the binary's current one.
    /// Returns `false` if the binary cannot be inspected.
    pub fn server_upgraded(&self, server_binary: &Path) -> bool {
        modified_millis(server_binary)
            .is_some_and(|current| current != self.server_mtime_ms)
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Modification time of a file in Unix milliseconds.
pub fn modified_millis(path: &Path) -> Option<i64> {
    let modified: SystemTime = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).timestamp_millis())
}
