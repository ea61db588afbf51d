//! Context-sensitive remapping of raw device failures
//!
//! This is the single point where low-level exchange failures become
//! semantic [`ManagerError`]s. A handful of status words mean different
//! things depending on which flow issued the command, so the calling flow
//! passes its context tag along.

use crate::error::{ManagerError, TransportError};
use crate::status::StatusWord;
use std::str::FromStr;
use tracing::debug;

/// Flow that issued the failing command.
///
/// Only flows that change the meaning of a status word are listed; every
/// other flow passes `None` and gets the default column of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowContext {
    Firmware,
    Mcu,
    UninstallApp,
}

impl FromStr for FlowContext {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firmware" => Ok(FlowContext::Firmware),
            "mcu" => Ok(FlowContext::Mcu),
            "uninstall-app" => Ok(FlowContext::UninstallApp),
            _ => Err(()),
        }
    }
}

/// The secure channel script fails with this prefix when it cannot parse
/// the first device response, which in practice means the device is not on
/// its home screen. A string heuristic, kept for wire compatibility.
const DASHBOARD_PARSE_PREFIX: &str = "invalid literal";

/// Map a transport failure to a semantic error for the given flow.
///
/// Total and side-effect free: unknown status words (or errors without
/// one) pass the original error through unchanged.
pub fn remap(context: Option<FlowContext>, err: TransportError) -> ManagerError {
    if err.message.starts_with(DASHBOARD_PARSE_PREFIX) {
        return ManagerError::DeviceOnDashboardExpected;
    }
    let status = match err.status {
        Some(status) => status,
        None => return ManagerError::Transport(err),
    };
    debug!(status = %status, context = ?context, "remapping device status");
    match status {
        StatusWord::APP_ALREADY_INSTALLED | StatusWord::APP_ALREADY_INSTALLED_ALT => {
            ManagerError::AppAlreadyInstalled
        }
        StatusWord::DEVICE_LOCKED => ManagerError::DeviceLocked,
        StatusWord::APP_DEPENDENCY => match context {
            Some(FlowContext::UninstallApp) => ManagerError::UninstallBtcDep,
            _ => ManagerError::AppRelyOnBtc,
        },
        StatusWord::NOT_ENOUGH_SPACE => ManagerError::NotEnoughSpace,
        StatusWord::NOT_ENOUGH_SPACE_ALT | StatusWord::USER_REFUSED => match context {
            Some(FlowContext::Firmware) | Some(FlowContext::Mcu) => {
                ManagerError::UserRefusedFirmwareUpdate
            }
            _ => ManagerError::NotEnoughSpace,
        },
        _ => ManagerError::Transport(err),
    }
}
