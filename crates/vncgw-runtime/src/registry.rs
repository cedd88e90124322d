//! Client identifier → session map.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use vncgw_core::ClientId;

use crate::session::{Session, SessionPhase, SessionState};

/// A session handed back by [`SessionRegistry::get`] with its lock held.
pub struct LockedSession {
    session: Arc<Session>,
    guard: OwnedMutexGuard<SessionState>,
}

impl LockedSession {
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Deref for LockedSession {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        &self.guard
    }
}

impl DerefMut for LockedSession {
    fn deref_mut(&mut self) -> &mut SessionState {
        &mut self.guard
    }
}

/// Lazily populated session map.
///
/// The map mutex is never held while waiting on a session lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ClientId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `id`, creating an idle session if absent, and return it locked.
    ///
    /// A new session is locked before it becomes visible in the map, so its
    /// creator is always the first caller to see it. Concurrent callers for
    /// the same id wait on the session lock and observe whatever state the
    /// creator left behind. If the creator's connect failed and the session
    /// was unregistered meanwhile, the lookup starts over.
    pub async fn get(&self, id: &ClientId) -> LockedSession {
        loop {
            let session = {
                let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(existing) = sessions.get(id) {
                    Arc::clone(existing)
                } else {
                    let session = Arc::new(Session::new(id.clone()));
                    let fresh_guard = session.try_lock_owned();
                    sessions.insert(id.clone(), Arc::clone(&session));
                    debug!(client_id = %id, sessions = sessions.len(), "Registered session");
                    if let Some(guard) = fresh_guard {
                        return LockedSession { session, guard };
                    }
                    session
                }
            };

            let guard = session.lock_owned().await;
            if guard.phase() == SessionPhase::Idle && !self.is_registered(id, &session) {
                debug!(
                    client_id = %id,
                    "Session dropped after a failed connect, looking up again"
                );
                continue;
            }
            return LockedSession { session, guard };
        }
    }

    /// Whether `id` currently maps to `session`.
    pub fn is_registered(&self, id: &ClientId, session: &Arc<Session>) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
    }

    /// Remove `id` from the map.
    pub fn delete(&self, id: &ClientId) -> Option<Arc<Session>> {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed.is_some() {
            debug!(client_id = %id, "Removed session");
        }
        removed
    }

    /// Remove `id` only if it still maps to `session`.
    pub fn remove_if_same(&self, id: &ClientId, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(id) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(id);
                debug!(client_id = %id, "Removed session");
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the map and return everything that was in it.
    pub fn drain(&self) -> Vec<Arc<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, session)| session)
            .collect()
    }
}
