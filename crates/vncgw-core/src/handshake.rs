//! Parsers for the line-oriented protocols spoken by the capture server.
//!
//! The capture server announces its listening port as a `PORT=<n>` line on
//! stdout, and answers a client-count query with a single line ending in
//! `:<n>` (for example `ans=client_count:1`).

use crate::ports::ProcessError;

const PORT_PREFIX: &str = "PORT=";

/// Parse a `PORT=<n>` announcement.
///
/// Port 0 is rejected: it means the server failed to bind.
pub fn parse_port_line(line: &str) -> Result<u16, ProcessError> {
    let value = line
        .trim()
        .strip_prefix(PORT_PREFIX)
        .ok_or_else(|| ProcessError::MalformedOutput(line.to_string()))?;

    match value.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ProcessError::MalformedOutput(line.to_string())),
        Ok(port) => Ok(port),
    }
}

/// Whether a line is a port announcement at all (as opposed to log noise).
pub fn is_port_line(line: &str) -> bool {
    line.trim_start().starts_with(PORT_PREFIX)
}

/// Parse the trailing `:<n>` of a client-count answer.
///
/// Only the last non-empty line is considered.
pub fn parse_client_count(output: &str) -> Result<u32, ProcessError> {
    let line = output
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .ok_or_else(|| ProcessError::MalformedOutput(output.to_string()))?;

    let (_, count) = line
        .rsplit_once(':')
        .ok_or_else(|| ProcessError::MalformedOutput(line.to_string()))?;

    count
        .trim()
        .parse::<u32>()
        .map_err(|_| ProcessError::MalformedOutput(line.to_string()))
}
