//! Transport-level and semantic manager errors

use crate::status::StatusWord;
use thiserror::Error;

/// Low-level failure surfaced by the exchange transport.
///
/// Transports that speak the framed protocol set `status` directly.
/// `from_message` exists for devices that only return free text, where the
/// status word has to be recovered from the trailing 4 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Free-text device or transport message.
    pub message: String,
    /// Status word, when the transport could determine one.
    pub status: Option<StatusWord>,
    /// Socket-level interruption (connection dropped), as opposed to a
    /// failure reported by the device itself.
    pub disconnected: bool,
}

impl TransportError {
    /// Structured constructor for transports that know the status word.
    pub fn with_status(message: impl Into<String>, status: StatusWord) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            disconnected: false,
        }
    }

    /// Free-text fallback; parses a trailing 4-hex-digit status word if any.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let status = StatusWord::from_trailing_hex(&message);
        Self {
            message,
            status,
            disconnected: false,
        }
    }

    /// A benign socket-level disconnect.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            disconnected: true,
        }
    }
}

/// Semantic failures of manager operations.
///
/// Messages are meant to be actionable for the host application on their
/// own; the raw status word never needs to be inspected by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error("device is not on its dashboard, quit the running application first")]
    DeviceOnDashboardExpected,
    #[error("this application is already installed on the device")]
    AppAlreadyInstalled,
    #[error("device is locked, unlock it to continue")]
    DeviceLocked,
    #[error("this application depends on the Bitcoin application, install it first")]
    AppRelyOnBtc,
    #[error("cannot uninstall, another installed application depends on this one")]
    UninstallBtcDep,
    #[error("not enough space left on the device, uninstall an application first")]
    NotEnoughSpace,
    #[error("the firmware update was refused on the device")]
    UserRefusedFirmwareUpdate,
    #[error("manager access was refused on the device")]
    UserRefusedAllowManager,
    #[error("there is no next mcu version to install")]
    LatestMcuInstalled,
    /// Unrecognized low-level failure, passed through unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
