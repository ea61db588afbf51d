//! Keywarden Protocol - Command exchanges with the hardware device
//!
//! This crate drives sequences of command/response exchanges over an
//! abstract secure transport for three flows: application install (and
//! uninstall), MCU firmware flash, and device genuineness verification.
//! Transport failures are remapped to semantic errors before they reach
//! the caller; the genuine-check flow additionally detects, through a
//! debounce timer, whether the device is blocked on a physical user
//! confirmation.

pub mod event;
pub mod exchange;
pub mod genuine;
pub mod manager;
pub mod transport;

pub use event::ExchangeEvent;
pub use exchange::{ExchangeOptions, FlowState, ManagedExchange};
pub use genuine::{GenuineCheck, GenuineCheckEvent, ALLOW_MANAGER_DEBOUNCE};
pub use manager::{DeviceManager, InstallParams};
pub use transport::{ExchangeSession, ExchangeTransport, SessionRequest};
