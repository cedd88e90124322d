//! Virtual display numbers and their on-disk lock artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of the lock file a headless X server writes for its display.
const LOCK_PREFIX: &str = ".X";

/// Suffix of the lock file a headless X server writes for its display.
const LOCK_SUFFIX: &str = "-lock";

/// A virtual display number (`:N`).
///
/// Display 0 is reserved for the host's own display and is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayNumber(u32);

impl DisplayNumber {
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// The value used for `DISPLAY` and helper `-display` arguments.
    pub fn as_display_string(self) -> String {
        format!(":{}", self.0)
    }

    /// File name of the lock artifact for this display (`.X<n>-lock`).
    pub fn lock_file_name(self) -> String {
        format!("{LOCK_PREFIX}{}{LOCK_SUFFIX}", self.0)
    }

    /// Recognise a lock artifact name and extract its display number.
    pub fn from_lock_file_name(name: &str) -> Option<Self> {
        let digits = name.strip_prefix(LOCK_PREFIX)?.strip_suffix(LOCK_SUFFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for DisplayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_file_name_roundtrip() {
        let display = DisplayNumber::new(12);
        assert_eq!(display.lock_file_name(), ".X12-lock");
        assert_eq!(
            DisplayNumber::from_lock_file_name(".X12-lock"),
            Some(display)
        );
    }

    #[test]
    fn test_from_lock_file_name_rejects_other_files() {
        assert_eq!(DisplayNumber::from_lock_file_name(".X11-unix"), None);
        assert_eq!(DisplayNumber::from_lock_file_name(".X-lock"), None);
        assert_eq!(DisplayNumber::from_lock_file_name(".X+3-lock"), None);
        assert_eq!(DisplayNumber::from_lock_file_name("X3-lock"), None);
        assert_eq!(DisplayNumber::from_lock_file_name(".X3-lock.tmp"), None);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(DisplayNumber::new(3).as_display_string(), ":3");
        assert_eq!(DisplayNumber::new(3).to_string(), ":3");
    }
}
