//! One browser tab's pipeline: a display number, three helper processes and
//! one application instance.
//!
//! A session moves `Idle → Connected → Disconnected`. All transitions happen
//! while holding the session's own lock; `Disconnected` is terminal and is
//! entered at most once.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vncgw_core::instance::{modified_millis, now_millis};
use vncgw_core::{
    ClientId, ConnectRequest, DisplayNumber, GatewayConfig, GatewayError, InstanceEnv, PortPlan,
    ProcessError, ViewerContext, ViewerPage,
};

use crate::display::DisplayAllocator;
use crate::helpers::{self, APPLICATION, BRIDGE, CAPTURE_SERVER, DISPLAY_SERVER};
use crate::process::{ManagedProcess, ProcessLauncher};

/// Everything a session needs to connect and tear down, shared by all
/// sessions of one gateway.
pub struct SessionDeps {
    pub config: Arc<GatewayConfig>,
    pub allocator: Arc<DisplayAllocator>,
    pub launcher: ProcessLauncher,
    pub page: Arc<dyn ViewerPage>,
    /// Modification time of the running gateway binary, recorded at startup.
    server_mtime_ms: i64,
}

impl SessionDeps {
    pub fn new(config: Arc<GatewayConfig>, page: Arc<dyn ViewerPage>) -> Self {
        let allocator = Arc::new(DisplayAllocator::new(
            config.lock_dir.clone(),
            config.max_display,
        ));
        let launcher = ProcessLauncher::new(config.verbose, config.shutdown_grace);
        let server_mtime_ms = std::env::current_exe()
            .ok()
            .and_then(|exe| modified_millis(&exe))
            .unwrap_or(0);

        Self {
            config,
            allocator,
            launcher,
            page,
            server_mtime_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Registered, nothing started.
    Idle,
    /// All four processes running; a poller is attached.
    Connected,
    /// Torn down. Terminal.
    Disconnected,
}

/// Registry entry for one client identifier.
#[derive(Debug)]
pub struct Session {
    id: ClientId,
    state: Arc<Mutex<SessionState>>,
    closed: CancellationToken,
}

impl Session {
    pub(crate) fn new(id: ClientId) -> Self {
        let closed = CancellationToken::new();
        let state = SessionState {
            id: id.clone(),
            phase: SessionPhase::Idle,
            display: None,
            ports: None,
            processes: Vec::new(),
            closed: closed.clone(),
        };
        Self {
            id,
            state: Arc::new(Mutex::new(state)),
            closed,
        }
    }

    pub const fn id(&self) -> &ClientId {
        &self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub(crate) fn try_lock_owned(&self) -> Option<OwnedMutexGuard<SessionState>> {
        Arc::clone(&self.state).try_lock_owned().ok()
    }

    pub(crate) async fn lock_owned(&self) -> OwnedMutexGuard<SessionState> {
        Arc::clone(&self.state).lock_owned().await
    }

    /// Resolves once the session has been disconnected.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Mutable session fields, only reachable through the session lock.
#[derive(Debug)]
pub struct SessionState {
    id: ClientId,
    phase: SessionPhase,
    display: Option<DisplayNumber>,
    ports: Option<PortPlan>,
    /// Started processes in start order.
    processes: Vec<ManagedProcess>,
    closed: CancellationToken,
}

impl SessionState {
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub const fn display(&self) -> Option<DisplayNumber> {
        self.display
    }

    pub const fn ports(&self) -> Option<PortPlan> {
        self.ports
    }

    /// Labels of the running processes, in start order.
    pub fn process_names(&self) -> Vec<&'static str> {
        self.processes.iter().map(ManagedProcess::name).collect()
    }

    /// Run the connect sequence and return the rendered viewer page.
    ///
    /// On failure every process started so far is cancelled and the session
    /// stays `Idle`.
    pub async fn connect(
        &mut self,
        deps: &SessionDeps,
        request: &ConnectRequest,
    ) -> Result<String, GatewayError> {
        if self.phase != SessionPhase::Idle {
            return Err(GatewayError::Internal(format!(
                "session {} is {:?}, cannot connect",
                self.id, self.phase
            )));
        }

        let display_num = deps.allocator.allocate()?;
        debug!(
            client_id = %self.id,
            display = %display_num,
            viewport = ?request.viewport,
            "Connecting session"
        );

        let mut started = Vec::with_capacity(4);
        match start_pipeline(deps, request, display_num, &mut started).await {
            Ok((ports, page)) => {
                self.display = Some(display_num);
                self.ports = Some(ports);
                self.processes = started;
                self.phase = SessionPhase::Connected;
                info!(
                    client_id = %self.id,
                    display = %display_num,
                    capture_port = ports.capture_port,
                    bridge_port = ports.bridge_port,
                    "Session connected"
                );
                Ok(page)
            }
            Err(e) => {
                warn!(
                    client_id = %self.id,
                    display = %display_num,
                    error = %e,
                    "Session connect failed"
                );
                let display_started = !started.is_empty();
                teardown(started, display_num, deps, display_started);
                Err(e)
            }
        }
    }

    /// Tear the session down. Returns `None` if it was already disconnected.
    ///
    /// Cancels all processes (best effort), removes the display's lock file
    /// and wakes anything waiting on [`Session::closed`]. The returned handle
    /// resolves once every process has been reaped and the display number is
    /// back in the pool.
    pub fn disconnect(&mut self, deps: &SessionDeps) -> Option<JoinHandle<()>> {
        if self.phase == SessionPhase::Disconnected {
            return None;
        }

        let processes = std::mem::take(&mut self.processes);
        let reaped = match self.display {
            Some(display_num) => teardown(processes, display_num, deps, true),
            None => {
                let reapers = cancel_in_reverse(processes);
                tokio::spawn(await_reapers(reapers))
            }
        };

        self.phase = SessionPhase::Disconnected;
        self.closed.cancel();
        info!(client_id = %self.id, display = ?self.display, "Session disconnected");
        Some(reaped)
    }

    #[cfg(test)]
    pub(crate) const fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }
}

/// Steps 2-6 of the connect sequence. Each started process is pushed to
/// `started` so the caller can unwind on failure.
async fn start_pipeline(
    deps: &SessionDeps,
    request: &ConnectRequest,
    display: DisplayNumber,
    started: &mut Vec<ManagedProcess>,
) -> Result<(PortPlan, String), GatewayError> {
    let config = &deps.config;
    let launcher = &deps.launcher;

    started.push(
        launcher
            .start(helpers::display_server(config, display, request.viewport))
            .map_err(|e| GatewayError::spawn_failed(DISPLAY_SERVER, e))?,
    );

    let mut capture = launcher
        .start(helpers::capture_server(config, display))
        .map_err(|e| GatewayError::spawn_failed(CAPTURE_SERVER, e))?;
    let stdout = capture.take_stdout();
    started.push(capture);

    let stdout = stdout.ok_or_else(|| {
        GatewayError::spawn_failed(
            CAPTURE_SERVER,
            ProcessError::Handshake {
                name: CAPTURE_SERVER.to_string(),
                reason: "stdout was not captured".to_string(),
            },
        )
    })?;
    let capture_port = helpers::read_port_handshake(stdout, config.handshake_timeout)
        .await
        .map_err(|e| GatewayError::spawn_failed(CAPTURE_SERVER, e))?;
    let ports = helpers::plan_ports(config, capture_port)
        .await
        .map_err(|e| GatewayError::spawn_failed(BRIDGE, e))?;

    started.push(
        launcher
            .start(helpers::bridge(config, ports))
            .map_err(|e| GatewayError::spawn_failed(BRIDGE, e))?,
    );

    let page = deps
        .page
        .render(&ViewerContext {
            port: ports.bridge_port,
            quality: config.quality,
            title: config.title.clone(),
            password_required: config.password_required,
        })
        .map_err(|e| match e {
            GatewayError::TemplateRenderFailed(_) => e,
            other => GatewayError::TemplateRenderFailed(other.to_string()),
        })?;

    let env = InstanceEnv {
        display,
        viewport: request.viewport,
        depth: config.depth,
        mobile: request.mobile,
        scale: config.mobile_scale.clone().filter(|_| request.mobile),
        started_at_ms: now_millis(),
        server_mtime_ms: deps.server_mtime_ms,
    };
    started.push(
        launcher
            .start(helpers::application(config, &env))
            .map_err(|e| GatewayError::spawn_failed(APPLICATION, e))?,
    );

    Ok((ports, page))
}

/// Cancel `processes` in reverse start order, optionally remove the display's
/// lock file, and return the display number to the pool once every process
/// has been reaped.
fn teardown(
    processes: Vec<ManagedProcess>,
    display_num: DisplayNumber,
    deps: &SessionDeps,
    remove_lock: bool,
) -> JoinHandle<()> {
    let reapers = cancel_in_reverse(processes);

    if remove_lock {
        match deps.allocator.remove_lock_file(display_num) {
            Ok(true) => debug!(display = %display_num, "Removed display lock file"),
            Ok(false) => {}
            Err(e) => warn!(
                display = %display_num,
                error = %e,
                "Failed to remove display lock file"
            ),
        }
    }

    let allocator = Arc::clone(&deps.allocator);
    tokio::spawn(async move {
        await_reapers(reapers).await;
        allocator.release(display_num);
    })
}

fn cancel_in_reverse(processes: Vec<ManagedProcess>) -> Vec<JoinHandle<()>> {
    processes
        .into_iter()
        .rev()
        .map(ManagedProcess::cancel_and_reap)
        .collect()
}

async fn await_reapers(reapers: Vec<JoinHandle<()>>) {
    for reaper in reapers {
        if let Err(e) = reaper.await {
            warn!(error = %e, "Process reaper task failed");
        }
    }
}
