//! Keywarden Core - Core types for the device manager
//!
//! This crate provides the foundational pieces shared by the Keywarden
//! catalog client and device protocol:
//! - Catalog value records returned by the remote manager service
//! - The 2-byte status-word taxonomy reported by the device
//! - The semantic manager error taxonomy
//! - The context-sensitive remapping of raw transport failures

pub mod error;
pub mod remap;
pub mod status;
pub mod types;

pub use error::{ManagerError, TransportError};
pub use remap::{remap, FlowContext};
pub use status::StatusWord;
pub use types::{
    Application, ApplicationVersion, Category, DeviceVersion, FinalFirmware, Id, McuVersion,
    OsuFirmware,
};
