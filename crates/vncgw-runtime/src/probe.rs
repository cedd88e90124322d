//! Client-count probe backed by the capture server's remote-control query.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;
use vncgw_core::{ClientProbe, DisplayNumber, ProcessError, parse_client_count};

use crate::helpers::client_count_query_args;

/// Runs `<capture-server> -display :N -query client_count` and parses the
/// trailing `:<n>` of its answer.
#[derive(Debug, Clone)]
pub struct CaptureClientProbe {
    program: PathBuf,
    limit: Duration,
}

impl CaptureClientProbe {
    pub fn new(program: impl Into<PathBuf>, limit: Duration) -> Self {
        Self {
            program: program.into(),
            limit,
        }
    }
}

#[async_trait]
impl ClientProbe for CaptureClientProbe {
    async fn client_count(&self, display_num: DisplayNumber) -> Result<u32, ProcessError> {
        let output = Command::new(&self.program)
            .args(client_count_query_args(display_num))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = timeout(self.limit, output)
            .await
            .map_err(|_| ProcessError::Timeout {
                name: "client count query".to_string(),
                timeout: self.limit,
            })?
            .map_err(|source| ProcessError::SpawnFailed {
                name: format!("client count query ({})", self.program.display()),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(
            display = %display_num,
            status = %output.status,
            answer = %stdout.trim(),
            "Client count query finished"
        );

        match parse_client_count(&stdout) {
            Ok(count) => Ok(count),
            Err(_) if !output.status.success() => Err(ProcessError::QueryFailed(format!(
                "query for {display_num} exited with {}",
                output.status
            ))),
            Err(e) => Err(e),
        }
    }
}
