//! Command lines for the per-session helper processes and the capture
//! server's port handshake.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::debug;
use vncgw_core::handshake::{is_port_line, parse_port_line};
use vncgw_core::{DisplayNumber, GatewayConfig, InstanceEnv, PortPlan, ProcessError, Viewport};

use crate::process::LaunchSpec;

pub const DISPLAY_SERVER: &str = "display server";
pub const CAPTURE_SERVER: &str = "capture server";
pub const BRIDGE: &str = "bridge";
pub const APPLICATION: &str = "application";

/// Headless X server for `display` sized to the browser viewport.
pub fn display_server(
    config: &GatewayConfig,
    display: DisplayNumber,
    viewport: Viewport,
) -> LaunchSpec {
    LaunchSpec::new(DISPLAY_SERVER, &config.helpers.display_server).args([
        display.as_display_string(),
        "-screen".to_string(),
        "0".to_string(),
        format!("{}x{}x{}", viewport.width, viewport.height, config.depth),
        "-nolisten".to_string(),
        "tcp".to_string(),
    ])
}

/// Capture server scraping `display`, bound to loopback. Announces its port
/// on stdout, which is captured.
pub fn capture_server(config: &GatewayConfig, display: DisplayNumber) -> LaunchSpec {
    let password_flag = if config.password_required {
        "-usepw"
    } else {
        "-nopw"
    };
    LaunchSpec::new(CAPTURE_SERVER, &config.helpers.capture_server)
        .args([
            "-display".to_string(),
            display.as_display_string(),
            "-localhost".to_string(),
            "-forever".to_string(),
            "-shared".to_string(),
            password_flag.to_string(),
        ])
        .args(if config.verbose { None } else { Some("-quiet") })
        .capture_stdout()
}

/// Websocket bridge from `ports.bridge_port` to the capture server.
pub fn bridge(config: &GatewayConfig, ports: PortPlan) -> LaunchSpec {
    LaunchSpec::new(BRIDGE, &config.helpers.bridge).args([
        ports.bridge_listen(),
        format!("127.0.0.1:{}", ports.capture_port),
    ])
}

/// Decide where the bridge listens for a capture server on `capture_port`.
///
/// With a configured bridge host the capture port number is reused on that
/// address. Otherwise a free port is picked on all interfaces; the port is
/// released again right before the bridge binds it.
pub async fn plan_ports(
    config: &GatewayConfig,
    capture_port: u16,
) -> Result<PortPlan, ProcessError> {
    if let Some(host) = config.bridge_host {
        return Ok(PortPlan::shared(capture_port, host));
    }

    let reserve = |source| ProcessError::SpawnFailed {
        name: format!("{BRIDGE} port reservation"),
        source,
    };
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(reserve)?;
    let bridge_port = listener.local_addr().map_err(reserve)?.port();
    drop(listener);

    Ok(PortPlan::separate(capture_port, bridge_port))
}

/// The application instance itself.
pub fn application(config: &GatewayConfig, env: &InstanceEnv) -> LaunchSpec {
    LaunchSpec::new(APPLICATION, &config.app.program)
        .args(config.app.args.iter().cloned())
        .env_overlay(env.to_overlay())
}

/// Arguments for the short-lived client-count query against `display`.
pub fn client_count_query_args(display: DisplayNumber) -> Vec<String> {
    vec![
        "-display".to_string(),
        display.as_display_string(),
        "-query".to_string(),
        "client_count".to_string(),
    ]
}

/// Read the capture server's `PORT=<n>` announcement from `stdout`.
///
/// Lines before the announcement are skipped. After it, the rest of the
/// stream is drained on a background task so the helper never blocks on a
/// full pipe.
pub async fn read_port_handshake<R>(stdout: R, limit: Duration) -> Result<u16, ProcessError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stdout).lines();

    let port = timeout(limit, async {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if is_port_line(&line) => return parse_port_line(&line),
                Ok(Some(line)) => debug!(line = %line, "Skipping capture server output"),
                Ok(None) => {
                    return Err(ProcessError::Handshake {
                        name: CAPTURE_SERVER.to_string(),
                        reason: "stdout closed before PORT line".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ProcessError::Handshake {
                        name: CAPTURE_SERVER.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    })
    .await
    .map_err(|_| ProcessError::Timeout {
        name: CAPTURE_SERVER.to_string(),
        timeout: limit,
    })??;

    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(port, line = %line, "capture server stdout");
        }
    });

    Ok(port)
}
