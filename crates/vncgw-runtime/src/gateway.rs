//! The gateway object shared by all HTTP handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};
use vncgw_core::{ClientId, ClientProbe, ConnectRequest, GatewayConfig, GatewayError, ViewerPage};

use crate::ids::IdGenerator;
use crate::poller::Poller;
use crate::probe::CaptureClientProbe;
use crate::registry::SessionRegistry;
use crate::session::{SessionDeps, SessionPhase};

/// Extra time after the grace period for SIGKILLed processes to be reaped.
const SHUTDOWN_KILL_MARGIN: Duration = Duration::from_secs(1);

/// What the front end should send back for a session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The session was connected by this request; the rendered viewer page.
    Viewer(String),
    /// The session was already connected or finished. The browser must be
    /// sent back through the root redirect to get a fresh identifier.
    Redirect,
}

/// Owns the registry, display allocator and identifier generator.
pub struct Gateway {
    registry: Arc<SessionRegistry>,
    deps: Arc<SessionDeps>,
    probe: Arc<dyn ClientProbe>,
    ids: Arc<IdGenerator>,
}

impl Gateway {
    /// Build a gateway that probes client counts through the configured
    /// capture server.
    pub fn new(config: GatewayConfig, page: Arc<dyn ViewerPage>) -> Self {
        let probe = Arc::new(CaptureClientProbe::new(
            config.helpers.capture_server.clone(),
            config.query_timeout,
        ));
        Self {
            registry: Arc::new(SessionRegistry::new()),
            deps: Arc::new(SessionDeps::new(Arc::new(config), page)),
            probe,
            ids: Arc::new(IdGenerator::new()),
        }
    }

    /// Replace the client-count probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ClientProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.deps.config
    }

    pub fn new_client_id(&self) -> ClientId {
        self.ids.next_client_id()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Handle a request for session `id`.
    ///
    /// An idle session is connected and gets a poller; any other state
    /// short-circuits to [`SessionOutcome::Redirect`]. A failed connect
    /// unregisters the session, so a retry with the same id starts over
    /// with a fresh one.
    pub async fn open_session(
        &self,
        id: &ClientId,
        request: &ConnectRequest,
    ) -> Result<SessionOutcome, GatewayError> {
        let mut locked = self.registry.get(id).await;
        match locked.phase() {
            SessionPhase::Connected | SessionPhase::Disconnected => {
                debug!(client_id = %id, phase = ?locked.phase(), "Session not idle, redirecting");
                return Ok(SessionOutcome::Redirect);
            }
            SessionPhase::Idle => {}
        }

        match locked.connect(&self.deps, request).await {
            Ok(page) => {
                self.poller().spawn(Arc::clone(locked.session()));
                Ok(SessionOutcome::Viewer(page))
            }
            Err(e) => {
                // Unregister while still locked; waiters look the id up again
                self.registry.remove_if_same(id, locked.session());
                Err(e)
            }
        }
    }

    /// Disconnect every registered session and wait for its processes to be
    /// reaped.
    ///
    /// The wait is bounded: each process gets `shutdown_grace` after SIGTERM
    /// before it is killed, plus a second for the kill to land.
    pub async fn shutdown(&self) {
        let sessions = self.registry.drain();
        info!(sessions = sessions.len(), "Shutting down gateway sessions");

        let mut reaped = Vec::with_capacity(sessions.len());
        for session in sessions {
            reaped.extend(session.lock().await.disconnect(&self.deps));
        }

        let limit = self.deps.config.shutdown_grace + SHUTDOWN_KILL_MARGIN;
        let all = async {
            for handle in reaped {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Session teardown task failed");
                }
            }
        };
        if timeout(limit, all).await.is_err() {
            warn!(?limit, "Timed out waiting for session processes to exit");
        }
    }

    fn poller(&self) -> Poller {
        Poller {
            registry: Arc::clone(&self.registry),
            deps: Arc::clone(&self.deps),
            probe: Arc::clone(&self.probe),
            ids: Arc::clone(&self.ids),
        }
    }
}
