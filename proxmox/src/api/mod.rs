//! Proxmox VE REST API client
//!
//! `Client` performs the HTTP calls. Typed sub-APIs borrow it:
//! `client.cluster().sdn()`, `client.cluster().acme()`, `client.pools()`
//! and `client.nodes()`.

pub mod client;
pub mod cluster;
pub mod common;
pub mod error;
pub mod nodes;
pub mod pool;
pub mod pools;
pub mod version;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{Client, RetryConfig};
pub use common::{ApiErrorDetails, ApiQueryParams};
pub use error::ApiError;
pub use version::VersionInfo;
