//! Catalog value records
//!
//! Immutable records returned verbatim by the remote catalog service.
//! Keywarden never interprets their fields beyond shuttling identifiers
//! between calls (a `FinalFirmware` id feeds an application-version query,
//! and so on), so most fields are optional with service-side defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog entity identifier.
pub type Id = i64;

/// A hardware model/revision entry, resolved from a target id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceVersion {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub device: Option<Id>,
    #[serde(default)]
    pub providers: Vec<Id>,
    #[serde(default)]
    pub mcu_versions: Vec<Id>,
    #[serde(default)]
    pub se_firmware_final_versions: Vec<Id>,
    #[serde(default)]
    pub osu_versions: Vec<Id>,
    #[serde(default)]
    pub application_versions: Vec<Id>,
    #[serde(default)]
    pub date_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
}

/// An OSU ("firmware updater") image, installed before the final firmware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsuFirmware {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub perso: String,
    #[serde(default)]
    pub firmware: String,
    #[serde(default)]
    pub firmware_key: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub next_se_firmware_final_version: Option<Id>,
    #[serde(default)]
    pub previous_se_firmware_final_version: Vec<Id>,
    #[serde(default)]
    pub device_versions: Vec<Id>,
    #[serde(default)]
    pub providers: Vec<Id>,
    #[serde(default)]
    pub date_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
}

/// A final secure-element firmware image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalFirmware {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub se_firmware: Option<Id>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub perso: String,
    #[serde(default)]
    pub firmware: String,
    #[serde(default)]
    pub firmware_key: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub osu_versions: Vec<Id>,
    #[serde(default)]
    pub mcu_versions: Vec<Id>,
    #[serde(default)]
    pub device_versions: Vec<Id>,
    #[serde(default)]
    pub providers: Vec<Id>,
    #[serde(default)]
    pub date_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
}

/// A bootloader/MCU firmware version, on its own update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McuVersion {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub mcu: Option<Id>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub providers: Vec<Id>,
    #[serde(default)]
    pub from_bootloader_version: Option<String>,
    #[serde(default)]
    pub device_versions: Vec<Id>,
    #[serde(default)]
    pub se_firmware_final_versions: Vec<Id>,
    #[serde(default)]
    pub date_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
}

/// One installable version of an application.
///
/// The `firmware`/`firmware_key` pair references the install payload on the
/// secure channel server; `delete`/`delete_key` reference the uninstall
/// payload for the same version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationVersion {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub app: Option<Id>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub perso: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub firmware: String,
    #[serde(default)]
    pub firmware_key: String,
    #[serde(default)]
    pub delete: String,
    #[serde(default)]
    pub delete_key: String,
    #[serde(default)]
    pub device_versions: Vec<Id>,
    #[serde(default)]
    pub se_firmware_final_versions: Vec<Id>,
    #[serde(default)]
    pub providers: Vec<Id>,
    #[serde(default)]
    pub date_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
}

/// An application listing with all of its published versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<Id>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub application_versions: Vec<ApplicationVersion>,
    #[serde(default)]
    pub date_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
}

/// An application category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub providers: Vec<Id>,
    #[serde(default)]
    pub applications: Vec<Id>,
    #[serde(default)]
    pub date_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
}
