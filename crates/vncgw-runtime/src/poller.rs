//! Per-session liveness poller.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use vncgw_core::ClientProbe;

use crate::ids::IdGenerator;
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionDeps, SessionPhase};

/// Shared handles every poller task needs.
#[derive(Clone)]
pub(crate) struct Poller {
    pub registry: Arc<SessionRegistry>,
    pub deps: Arc<SessionDeps>,
    pub probe: Arc<dyn ClientProbe>,
    pub ids: Arc<IdGenerator>,
}

impl Poller {
    /// Watch `session` until it is disconnected, then drop it from the
    /// registry.
    ///
    /// Each tick waits `poll_interval + uniform(0, poll_variance)`. A client
    /// count of zero disconnects the session; a failed query is retried on
    /// the next tick.
    pub fn spawn(&self, session: Arc<Session>) -> JoinHandle<()> {
        let poller = self.clone();
        tokio::spawn(async move {
            poller.run(&session).await;
            poller.registry.remove_if_same(session.id(), &session);
            debug!(client_id = %session.id(), "Poller stopped");
        })
    }

    async fn run(&self, session: &Session) {
        let config = &self.deps.config;
        loop {
            let wait = config.poll_interval + self.ids.jitter(config.poll_variance);
            tokio::select! {
                () = session.closed() => return,
                () = sleep(wait) => {}
            }

            let mut state = session.lock().await;
            if state.phase() != SessionPhase::Connected {
                return;
            }
            let Some(display_num) = state.display() else {
                return;
            };

            match self.probe.client_count(display_num).await {
                Ok(0) => {
                    info!(
                        client_id = %session.id(),
                        display = %display_num,
                        "No clients left, disconnecting"
                    );
                    state.disconnect(&self.deps);
                    return;
                }
                Ok(clients) => debug!(
                    client_id = %session.id(),
                    display = %display_num,
                    clients,
                    "Session alive"
                ),
                Err(e) => warn!(
                    client_id = %session.id(),
                    display = %display_num,
                    error = %e,
                    "Client count query failed, retrying next tick"
                ),
            }
        }
    }
}
