//! Keywarden Catalog - Remote catalog service client
//!
//! This crate talks to the manager catalog service (applications,
//! firmware, MCU versions, device identification) and memoizes every
//! read-only lookup through a generic request cache:
//! - At most one in-flight fetch per logical request
//! - Successful results are retained; failures are never cached
//! - Every request carries the client version for service-side
//!   compatibility negotiation

pub mod cache;
pub mod client;
pub mod config;

pub use cache::RequestCache;
pub use client::{CatalogClient, CatalogError};
pub use config::CatalogConfig;
