//! Values handed to the viewer page and the bridge helper.

use std::net::{IpAddr, SocketAddr};

use serde::Serialize;

/// Ports used by one session's capture/bridge pipeline.
///
/// The capture server picks its own port and binds it on loopback only. A
/// wildcard listener cannot share a port number with a loopback listener, so
/// the bridge either gets a port of its own on all interfaces or reuses the
/// capture port on one specific non-loopback address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortPlan {
    /// Loopback port of the capture server.
    pub capture_port: u16,
    /// Browser-facing websocket port of the bridge.
    pub bridge_port: u16,
    /// Address the bridge binds. `None` means all interfaces.
    pub bridge_host: Option<IpAddr>,
}

impl PortPlan {
    /// Bridge listens on `host` with the capture server's port number.
    pub const fn shared(capture_port: u16, host: IpAddr) -> Self {
        Self {
            capture_port,
            bridge_port: capture_port,
            bridge_host: Some(host),
        }
    }

    /// Bridge listens on all interfaces on its own `bridge_port`.
    pub const fn separate(capture_port: u16, bridge_port: u16) -> Self {
        Self {
            capture_port,
            bridge_port,
            bridge_host: None,
        }
    }

    /// Listen argument for the bridge: `host:port`, or just `port` for all
    /// interfaces.
    pub fn bridge_listen(&self) -> String {
        match self.bridge_host {
            Some(host) => SocketAddr::new(host, self.bridge_port).to_string(),
            None => self.bridge_port.to_string(),
        }
    }
}

/// Data rendered into the viewer page for one connected session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerContext {
    /// Port the browser opens its websocket to.
    pub port: u16,
    /// Capture quality hint (0-9).
    pub quality: u8,
    /// Application title.
    pub title: String,
    /// Whether the viewer should prompt for the VNC password.
    pub password_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_shared_plan_binds_specific_host() {
        let plan = PortPlan::shared(5901, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(plan.bridge_port, 5901);
        assert_eq!(plan.bridge_listen(), "10.0.0.7:5901");
    }

    #[test]
    fn test_separate_plan_binds_all_interfaces() {
        let plan = PortPlan::separate(5901, 6080);
        assert_eq!(plan.capture_port, 5901);
        assert_eq!(plan.bridge_listen(), "6080");
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let plan = PortPlan::shared(5901, "fd00::2".parse().unwrap());
        assert_eq!(plan.bridge_listen(), "[fd00::2]:5901");
    }
}
