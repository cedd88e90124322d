//! Shell-script stand-ins for the external helpers, used by unit tests.

use std::net::{IpAddr, Ipv4Addr};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use vncgw_core::{
    AppCommand, GatewayConfig, GatewayError, HelperPaths, ViewerContext, ViewerPage,
};

use crate::session::SessionDeps;

/// Documentation-range address the fake bridge "binds", so pages carry the
/// capture port.
pub const FAKE_BRIDGE_HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

/// A temp directory holding fake `Xvfb`, `x11vnc`, `websockify` and
/// application scripts plus a lock directory.
///
/// The fake display server touches its lock file, the fake capture server
/// announces `port` and answers client-count queries from the `clients` file,
/// and the fake application dumps its environment to `app.env`.
pub struct FakeHelpers {
    dir: TempDir,
    port: u16,
}

impl FakeHelpers {
    pub fn new(port: u16) -> Self {
        let fake = Self {
            dir: TempDir::new().unwrap(),
            port,
        };
        std::fs::create_dir(fake.lock_dir()).unwrap();
        fake.set_clients(1);
        fake
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.dir.path().join("locks")
    }

    pub fn bridge_args_path(&self) -> PathBuf {
        self.dir.path().join("bridge.args")
    }

    pub fn app_env_path(&self) -> PathBuf {
        self.dir.path().join("app.env")
    }

    pub fn set_clients(&self, count: u32) {
        std::fs::write(self.dir.path().join("clients"), count.to_string()).unwrap();
    }

    /// Write an executable `#!/bin/sh` script into the temp directory.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn config(&self) -> GatewayConfig {
        let root = self.dir.path().display().to_string();
        let lock_dir = self.lock_dir().display().to_string();

        let helpers = HelperPaths {
            display_server: self.script(
                "Xvfb",
                &format!("touch \"{lock_dir}/.X${{1#:}}-lock\"\nexec sleep 30"),
            ),
            capture_server: self.script(
                "x11vnc",
                &format!(
                    "case \"$*\" in\n\
                     *-query*) echo \"ans=client_count:$(cat {root}/clients)\"; exit 0;;\n\
                     esac\n\
                     echo \"x11vnc starting\"\n\
                     echo \"PORT={}\"\n\
                     exec sleep 30",
                    self.port
                ),
            ),
            bridge: self.script(
                "websockify",
                &format!(
                    "echo \"$@\" > {root}/bridge.args.tmp\n\
                     mv {root}/bridge.args.tmp {root}/bridge.args\n\
                     exec sleep 30"
                ),
            ),
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
            .with_poll(Duration::from_millis(50), Duration::ZERO)
            .with_bridge_host(Some(FAKE_BRIDGE_HOST))
    }

    pub fn deps(&self, page: Arc<dyn ViewerPage>) -> SessionDeps {
        SessionDeps::new(Arc::new(self.config()), page)
    }

    pub async fn wait_for_file(&self, path: &Path) {
        for _ in 0..100 {
            if path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{} never appeared", path.display());
    }

    pub async fn wait_for_app_env(&self) -> String {
        let path = self.app_env_path();
        self.wait_for_file(&path).await;
        std::fs::read_to_string(path).unwrap()
    }
}

/// Viewer page that echoes the values it was given.
pub struct StaticPage;

impl ViewerPage for StaticPage {
    fn render(&self, ctx: &ViewerContext) -> Result<String, GatewayError> {
        Ok(format!(
            "title={} port={} quality={}",
            ctx.title, ctx.port, ctx.quality
        ))
    }
}

pub struct FailingPage;

impl ViewerPage for FailingPage {
    fn render(&self, _ctx: &ViewerContext) -> Result<String, GatewayError> {
        Err(GatewayError::TemplateRenderFailed("broken template".to_string()))
    }
}
