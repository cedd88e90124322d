//! Out-of-band query for the number of viewers attached to a session.

use async_trait::async_trait;

use super::ProcessError;
use crate::domain::DisplayNumber;

/// Asks a session's capture server how many viewers are connected.
///
/// The liveness poller disconnects a session when this returns `Ok(0)`.
/// Errors are treated as transient and retried on the next poll.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientProbe: Send + Sync {
    async fn client_count(&self, display: DisplayNumber) -> Result<u32, ProcessError>;
}
