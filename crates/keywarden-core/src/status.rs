//! Device status words
//!
//! Every command exchanged with the device ends with a 2-byte status word.
//! A small closed set of words is meaningful to the manager; everything
//! else is passed through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 2-byte status word returned by the device after each exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// Command succeeded.
    pub const OK: StatusWord = StatusWord(0x9000);
    /// Application is already installed.
    pub const APP_ALREADY_INSTALLED: StatusWord = StatusWord(0x6a80);
    /// Application is already installed (alternate code on older firmware).
    pub const APP_ALREADY_INSTALLED_ALT: StatusWord = StatusWord(0x6a81);
    /// Device is PIN-locked.
    pub const DEVICE_LOCKED: StatusWord = StatusWord(0x6982);
    /// Another application depends on the one being touched.
    pub const APP_DEPENDENCY: StatusWord = StatusWord(0x6a83);
    /// Not enough space left on the device.
    pub const NOT_ENOUGH_SPACE: StatusWord = StatusWord(0x6a84);
    /// Not enough space, or a refused firmware update depending on the flow.
    pub const NOT_ENOUGH_SPACE_ALT: StatusWord = StatusWord(0x6a85);
    /// User refused the operation on the device.
    pub const USER_REFUSED: StatusWord = StatusWord(0x6985);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Recover a status word from the trailing 4 hex digits of a free-text
    /// device error. Devices that only report text append the word there.
    pub fn from_trailing_hex(message: &str) -> Option<StatusWord> {
        let tail = message.get(message.len().checked_sub(4)?..)?;
        tail.parse().ok()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl FromStr for StatusWord {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u16::from_str_radix(s, 16).map(StatusWord)
    }
}

impl From<u16> for StatusWord {
    fn from(raw: u16) -> Self {
        StatusWord(raw)
    }
}
