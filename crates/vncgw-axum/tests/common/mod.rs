//! Fake helper executables for router tests.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use vncgw_core::{AppCommand, GatewayConfig, HelperPaths};

/// Documentation-range address handed to the fake bridge, so viewer pages
/// carry the capture port.
pub const BRIDGE_HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

/// Temp directory with fake Xvfb, x11vnc, websockify and application
/// scripts, a lock directory and an assets directory.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let sandbox = Self {
            dir: TempDir::new().unwrap(),
        };
        std::fs::create_dir(sandbox.lock_dir()).unwrap();
        std::fs::create_dir_all(sandbox.assets_dir().join("core")).unwrap();
        std::fs::write(
            sandbox.assets_dir().join("core/rfb.js"),
            "export default class RFB {}\n",
        )
        .unwrap();
        std::fs::write(sandbox.assets_dir().join("favicon.ico"), b"ico").unwrap();
        sandbox
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.dir.path().join("locks")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.dir.path().join("assets")
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Config whose capture server announces `port`.
    pub fn config(&self, port: u16) -> GatewayConfig {
        let root = self.root().display().to_string();
        let lock_dir = self.lock_dir().display().to_string();

        let helpers = HelperPaths {
            display_server: self.script(
                "Xvfb",
                &format!("touch \"{lock_dir}/.X${{1#:}}-lock\"\nexec sleep 30"),
            ),
            capture_server: self.script(
                "x11vnc",
                &format!(
                    "case \"$*\" in *-query*) echo ans=client_count:1; exit 0;; esac\n\
                     echo \"PORT={port}\"\n\
                     exec sleep 30"
                ),
            ),
            bridge: self.script("websockify", "exec sleep 30"),
        };
        let app = self.script(
            "demo-app",
            &format!(
                "env > {root}/app.env.tmp && mv {root}/app.env.tmp {root}/app.env\n\
                 exec sleep 30"
            ),
        );

        GatewayConfig::default()
            .with_helpers(helpers)
            .with_app(AppCommand::new(app, Vec::new()))
            .with_lock_dir(self.lock_dir())
            .with_assets_dir(self.assets_dir())
            .with_poll(Duration::from_secs(30), Duration::ZERO)
            .with_bridge_host(Some(BRIDGE_HOST))
    }

    pub async fn app_env(&self) -> String {
        let path = self.root().join("app.env");
        for _ in 0..100 {
            if let Ok(env) = std::fs::read_to_string(&path) {
                return env;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("application never started");
    }
}
