//! Resource implementations

pub(crate) mod common;

pub mod acme;
pub mod network;
pub mod pools;
pub mod sdn;

pub use acme::{AcmeAccountResource, AcmeDnsPluginResource};
pub use network::LinuxBridgeResource;
pub use pools::{PoolMembershipResource, PoolResource};
pub use sdn::{FabricNodeResource, FabricProtocol, FabricResource, SdnApplierResource};
