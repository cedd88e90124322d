//! Gateway configuration types and validation.
//!
//! `GatewayConfig` is built once at startup (from flags, see `vncgw-cli`)
//! and is immutable afterwards. Sessions hold it behind an `Arc`.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Default HTTP listening port for the gateway front end.
pub const DEFAULT_PORT: u16 = 1221;

/// Default base interval between liveness polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default upper bound of the random jitter added to each poll interval.
pub const DEFAULT_POLL_VARIANCE: Duration = Duration::from_secs(60);

/// Default capture quality hint handed to the viewer (0-9).
pub const DEFAULT_QUALITY: u8 = 6;

/// Exclusive ceiling for virtual display numbers.
pub const DEFAULT_MAX_DISPLAY: u32 = 75;

/// Default colour depth of the headless display.
pub const DEFAULT_DEPTH: u8 = 24;

/// Default bound on reading the capture server's `PORT=<n>` line.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on one client-count query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default grace period between SIGTERM and SIGKILL.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Environment variable the gateway reads its mobile scale override from.
pub const MOBILE_SCALE_ENV: &str = "VNCGW_MOBILE_SCALE";

/// Highest accepted quality hint.
pub const MAX_QUALITY: u8 = 9;

/// Paths of the three external helper executables.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HelperPaths {
    /// Headless display server (Xvfb).
    pub display_server: PathBuf,
    /// Capture / remote-framebuffer server (x11vnc).
    pub capture_server: PathBuf,
    /// VNC-to-websocket bridge (websockify).
    pub bridge: PathBuf,
}

impl Default for HelperPaths {
    fn default() -> Self {
        Self {
            display_server: PathBuf::from("Xvfb"),
            capture_server: PathBuf::from("x11vnc"),
            bridge: PathBuf::from("websockify"),
        }
    }
}

/// The application binary launched once per session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppCommand {
    pub program: PathBuf,
    /// Arguments passed through unchanged (gateway flags already removed).
    pub args: Vec<String>,
}

impl AppCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Display name used as the viewer page title.
    pub fn title(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| "vncgw".to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Immutable gateway configuration.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayConfig {
    /// HTTP listening port.
    pub port: u16,
    /// Base interval between liveness polls.
    pub poll_interval: Duration,
    /// Upper bound of the uniform jitter added to `poll_interval`.
    pub poll_variance: Duration,
    /// Capture quality hint (0-9) rendered into the viewer page.
    pub quality: u8,
    /// Whether the capture server requires its VNC password.
    pub password_required: bool,
    /// Inherit helper output and log at debug level.
    pub verbose: bool,
    /// Run as gateway instead of running the application directly.
    pub serve: bool,
    /// Exclusive ceiling for display numbers.
    pub max_display: u32,
    /// Colour depth of each headless display.
    pub depth: u8,
    /// Title shown on the viewer page. Defaults to the application name.
    pub title: String,
    pub helpers: HelperPaths,
    pub app: AppCommand,
    /// Directory scanned for `.X<n>-lock` artifacts.
    pub lock_dir: PathBuf,
    /// Root of the static viewer assets (`core/`, `vendor/`, favicons).
    pub assets_dir: PathBuf,
    /// Non-loopback address the bridge binds, reusing the capture port.
    /// When unset the bridge gets its own port on all interfaces.
    pub bridge_host: Option<IpAddr>,
    pub handshake_timeout: Duration,
    pub query_timeout: Duration,
    pub shutdown_grace: Duration,
    /// Scale override forwarded to instances serving mobile browsers.
    pub mobile_scale: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let app = AppCommand::new("vncgw-app", Vec::new());
        Self {
            port: DEFAULT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_variance: DEFAULT_POLL_VARIANCE,
            quality: DEFAULT_QUALITY,
            password_required: false,
            verbose: false,
            serve: false,
            max_display: DEFAULT_MAX_DISPLAY,
            depth: DEFAULT_DEPTH,
            title: app.title(),
            helpers: HelperPaths::default(),
            app,
            lock_dir: std::env::temp_dir(),
            assets_dir: PathBuf::from("/usr/share/novnc"),
            bridge_host: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            mobile_scale: None,
        }
    }
}

impl GatewayConfig {
    /// Set the application launched per session; also resets the title.
    #[must_use]
    pub fn with_app(mut self, app: AppCommand) -> Self {
        self.title = app.title();
        self.app = app;
        self
    }

    #[must_use]
    pub fn with_helpers(mut self, helpers: HelperPaths) -> Self {
        self.helpers = helpers;
        self
    }

    #[must_use]
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    #[must_use]
    pub const fn with_bridge_host(mut self, host: Option<IpAddr>) -> Self {
        self.bridge_host = host;
        self
    }

    #[must_use]
    pub const fn with_poll(mut self, interval: Duration, variance: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_variance = variance;
        self
    }

    #[must_use]
    pub const fn with_max_display(mut self, max_display: u32) -> Self {
        self.max_display = max_display;
        self
    }

    /// Read the mobile scale override from the gateway's own environment.
    #[must_use]
    pub fn with_mobile_scale_from_env(mut self) -> Self {
        self.mobile_scale = std::env::var(MOBILE_SCALE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        self
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("quality must be between 0 and {MAX_QUALITY}, got {0}")]
    InvalidQuality(u8),

    #[error("max display must be at least 2, got {0}")]
    InvalidMaxDisplay(u32),

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("unsupported colour depth {0} (expected 8, 16, 24 or 32)")]
    InvalidDepth(u8),

    #[error("bridge host {0} must be a specific non-loopback address")]
    InvalidBridgeHost(IpAddr),
}

/// Validate a configuration before the gateway starts.
pub fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.quality > MAX_QUALITY {
        return Err(ConfigError::InvalidQuality(config.quality));
    }
    if config.max_display < 2 {
        return Err(ConfigError::InvalidMaxDisplay(config.max_display));
    }
    if config.poll_interval.is_zero() {
        return Err(ConfigError::ZeroPollInterval);
    }
    if !matches!(config.depth, 8 | 16 | 24 | 32) {
        return Err(ConfigError::InvalidDepth(config.depth));
    }
    // The capture server already holds the port on loopback
    if let Some(host) = config.bridge_host {
        if host.is_loopback() || host.is_unspecified() {
            return Err(ConfigError::InvalidBridgeHost(host));
        }
    }
    Ok(())
}
