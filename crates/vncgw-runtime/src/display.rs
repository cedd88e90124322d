//! Virtual display number allocation.
//!
//! Lock files written by X servers (`<tmp>/.X<n>-lock`) are the source of
//! truth for which displays are taken. Scanning them on every allocation
//! means displays started outside the gateway are respected too. The
//! in-memory reservation set only covers the window between handing a
//! number out and the display server creating its lock file.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};
use vncgw_core::{DisplayNumber, GatewayError};

/// Hands out display numbers in `[1, max_display)`.
#[derive(Debug)]
pub struct DisplayAllocator {
    lock_dir: PathBuf,
    max_display: u32,
    /// Numbers handed out and not yet released. Held across scan-then-pick.
    reserved: Mutex<HashSet<u32>>,
}

impl DisplayAllocator {
    pub fn new(lock_dir: impl Into<PathBuf>, max_display: u32) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            max_display,
            reserved: Mutex::new(HashSet::new()),
        }
    }

    /// Pick the smallest display number that is neither locked on disk nor
    /// reserved by another session.
    pub fn allocate(&self) -> Result<DisplayNumber, GatewayError> {
        let mut reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);

        let in_use = scan_lock_files(&self.lock_dir).map_err(|e| {
            warn!(
                lock_dir = %self.lock_dir.display(),
                error = %e,
                "Failed to scan display lock files"
            );
            GatewayError::Internal(format!(
                "cannot scan {} for display locks: {e}",
                self.lock_dir.display()
            ))
        })?;

        let free = (1..self.max_display).find(|n| !in_use.contains(n) && !reserved.contains(n));
        let Some(n) = free else {
            debug!(
                max_display = self.max_display,
                locked = in_use.len(),
                reserved = reserved.len(),
                "Display pool exhausted"
            );
            return Err(GatewayError::ResourceExhausted {
                max_display: self.max_display,
            });
        };

        reserved.insert(n);
        debug!(display = n, "Allocated display");
        Ok(DisplayNumber::new(n))
    }

    /// Return a number to the pool. Its lock file, if any, still blocks reuse.
    pub fn release(&self, display: DisplayNumber) {
        let mut reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);
        reserved.remove(&display.get());
    }

    /// Path of the lock artifact for a display.
    pub fn lock_path(&self, display: DisplayNumber) -> PathBuf {
        self.lock_dir.join(display.lock_file_name())
    }

    /// Remove a display's stale lock file. Returns whether a file was removed.
    pub fn remove_lock_file(&self, display: DisplayNumber) -> io::Result<bool> {
        match std::fs::remove_file(self.lock_path(display)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Collect display numbers that have a lock file in `dir`. Display 0 is
/// always treated as taken.
fn scan_lock_files(dir: &Path) -> io::Result<HashSet<u32>> {
    let mut in_use = HashSet::from([0]);
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(display) = name.to_str().and_then(DisplayNumber::from_lock_file_name) {
            in_use.insert(display.get());
        }
    }
    Ok(in_use)
}
