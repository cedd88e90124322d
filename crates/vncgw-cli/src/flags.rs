//! Gateway flag parsing.
//!
//! Gateway flags share the process argument vector with the application's
//! own flags. Every `-vnc.*` token (also `--vnc.*`, with or without `=value`)
//! is pulled out and parsed with clap; everything else is returned in its
//! original order for the application to parse. A bare `--` ends flag
//! extraction.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, CommandFactory, Parser};
use thiserror::Error;
use vncgw_core::config::MAX_QUALITY;
use vncgw_core::{DEFAULT_MAX_DISPLAY, DEFAULT_PORT, DEFAULT_QUALITY, GatewayConfig};

/// Namespace shared by all gateway flags.
const FLAG_NAMESPACE: &str = "vnc.";

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("invalid gateway flags: {0}")]
    Invalid(#[from] clap::Error),
}

impl FlagError {
    /// `-vnc.help` was requested; the error carries the rendered help.
    pub fn is_help(&self) -> bool {
        match self {
            Self::Invalid(e) => e.kind() == clap::error::ErrorKind::DisplayHelp,
        }
    }

    /// Print the clap-formatted message (help to stdout, errors to stderr).
    pub fn print(&self) -> std::io::Result<()> {
        match self {
            Self::Invalid(e) => e.print(),
        }
    }
}

/// Flags understood by the gateway.
#[derive(Debug, Clone, Parser)]
#[command(name = "vncgw")]
#[command(about = "Serve a graphical application to browsers, one virtual display per tab")]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct GatewayFlags {
    /// HTTP port of the gateway front end
    #[arg(long = "vnc.port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Base interval between client-count polls (e.g. 30s, 1m30s)
    #[arg(long = "vnc.poll.interval", default_value = "30s", value_parser = parse_duration)]
    pub poll_interval: Duration,

    /// Upper bound of the random jitter added to each poll interval
    #[arg(long = "vnc.poll.variance", default_value = "1m", value_parser = parse_duration)]
    pub poll_variance: Duration,

    /// Capture quality hint passed to the viewer (0-9)
    #[arg(
        long = "vnc.quality",
        default_value_t = DEFAULT_QUALITY,
        value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_QUALITY))
    )]
    pub quality: u8,

    /// Do not require a VNC password (default)
    #[arg(long = "vnc.nopw", conflicts_with = "usepw")]
    pub nopw: bool,

    /// Require the capture server's VNC password
    #[arg(long = "vnc.usepw")]
    pub usepw: bool,

    /// Run the gateway instead of the application
    #[arg(long = "vnc.serve")]
    pub serve: bool,

    /// Log at debug level and show helper output
    #[arg(long = "vnc.verbose")]
    pub verbose: bool,

    /// Exclusive ceiling for virtual display numbers
    #[arg(long = "vnc.maxdisplay", default_value_t = DEFAULT_MAX_DISPLAY)]
    pub max_display: u32,

    /// Directory holding the display servers' lock files
    #[arg(long = "vnc.lockdir", env = "VNCGW_LOCK_DIR")]
    pub lock_dir: Option<PathBuf>,

    /// Directory holding the viewer assets (core/, vendor/, favicons)
    #[arg(long = "vnc.assets", env = "VNCGW_ASSETS")]
    pub assets_dir: Option<PathBuf>,

    /// Headless display server executable
    #[arg(long = "vnc.xvfb", env = "VNCGW_XVFB")]
    pub display_server: Option<PathBuf>,

    /// Capture server executable
    #[arg(long = "vnc.x11vnc", env = "VNCGW_X11VNC")]
    pub capture_server: Option<PathBuf>,

    /// Websocket bridge executable
    #[arg(long = "vnc.websockify", env = "VNCGW_WEBSOCKIFY")]
    pub bridge: Option<PathBuf>,

    /// Non-loopback address the bridge listens on, reusing the capture port.
    /// Without it the bridge gets its own port on all interfaces.
    #[arg(long = "vnc.host", env = "VNCGW_HOST")]
    pub bridge_host: Option<IpAddr>,

    /// Print gateway flag help
    #[arg(long = "vnc.help", action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl GatewayFlags {
    /// Overlay the parsed flags on `config`.
    pub fn apply(&self, mut config: GatewayConfig) -> GatewayConfig {
        config.port = self.port;
        config.poll_interval = self.poll_interval;
        config.poll_variance = self.poll_variance;
        config.quality = self.quality;
        config.password_required = self.usepw;
        config.serve = self.serve;
        config.verbose = self.verbose;
        config.max_display = self.max_display;
        config.bridge_host = self.bridge_host;

        if let Some(dir) = &self.lock_dir {
            config.lock_dir.clone_from(dir);
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir.clone_from(dir);
        }
        if let Some(path) = &self.display_server {
            config.helpers.display_server.clone_from(path);
        }
        if let Some(path) = &self.capture_server {
            config.helpers.capture_server.clone_from(path);
        }
        if let Some(path) = &self.bridge {
            config.helpers.bridge.clone_from(path);
        }
        config
    }
}

/// Parse gateway flags out of `args`, returning the flags and the remaining
/// arguments in their original order.
///
/// `args` must not include the program name.
pub fn parse_gateway_flags<I>(args: I) -> Result<(GatewayFlags, Vec<String>), FlagError>
where
    I: IntoIterator<Item = String>,
{
    let (flags, rest) = split_args(args);
    let parsed = GatewayFlags::try_parse_from(flags)?;
    Ok((parsed, rest))
}

/// Separate gateway flag tokens from application arguments.
///
/// Gateway tokens are normalised to `--vnc.name[=value]`. A value-taking
/// flag given as `-vnc.name value` consumes the next token. Boolean flags
/// accept `=true`/`=false`.
fn split_args<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let command = GatewayFlags::command();
    let takes_value = |name: &str| {
        command
            .get_arguments()
            .any(|arg| arg.get_long() == Some(name) && arg.get_action().takes_values())
    };

    let mut flags = Vec::new();
    let mut rest = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--" {
            rest.push(arg);
            rest.extend(args);
            break;
        }
        let Some(body) = gateway_flag_body(&arg) else {
            rest.push(arg);
            continue;
        };

        match body.split_once('=') {
            Some((name, value)) if !takes_value(name) => match value.parse::<bool>() {
                Ok(true) => flags.push(format!("--{name}")),
                Ok(false) => {}
                // Let clap report the stray value
                Err(_) => flags.push(format!("--{body}")),
            },
            Some(_) => flags.push(format!("--{body}")),
            None if takes_value(body) => match args.next() {
                Some(value) => flags.push(format!("--{body}={value}")),
                None => flags.push(format!("--{body}")),
            },
            None => flags.push(format!("--{body}")),
        }
    }

    (flags, rest)
}

/// `vnc.name[=value]` if `arg` is a gateway flag in single- or double-dash
/// form.
fn gateway_flag_body(arg: &str) -> Option<&str> {
    arg.strip_prefix("--")
        .or_else(|| arg.strip_prefix('-'))
        .filter(|body| body.starts_with(FLAG_NAMESPACE))
}

/// Parse a duration such as `30s`, `1m`, `1m30s`, `250ms` or `1.5h`.
///
/// A bare `0` is accepted; any other number needs a unit.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let input = raw.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration {raw:?}: expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let nanos_per_unit: u64 = match unit {
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            "" => return Err(format!("invalid duration {raw:?}: missing unit")),
            other => return Err(format!("invalid duration {raw:?}: unknown unit {other:?}")),
        };

        let nanos = if let Ok(whole) = number.parse::<u64>() {
            whole.checked_mul(nanos_per_unit)
        } else {
            let value: f64 = number
                .parse()
                .map_err(|_| format!("invalid duration {raw:?}: bad number {number:?}"))?;
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let nanos = (value * nanos_per_unit as f64).round();
            (nanos < u64::MAX as f64).then(|| nanos as u64)
        };
        let nanos = nanos.ok_or_else(|| format!("invalid duration {raw:?}: out of range"))?;
        total = total
            .checked_add(Duration::from_nanos(nanos))
            .ok_or_else(|| format!("invalid duration {raw:?}: out of range"))?;
        rest = next;
    }
    Ok(total)
}
