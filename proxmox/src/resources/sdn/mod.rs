//! SDN fabric, fabric node and applier resources
//!
//! OSPF and OpenFabric share one controller per object kind. The protocol
//! enum selects the attribute set, the API field mapping and the type name.

mod resource_applier;
mod resource_fabric;
mod resource_fabric_node;

pub use resource_applier::SdnApplierResource;
pub use resource_fabric::FabricResource;
pub use resource_fabric_node::{fabric_node_id, parse_fabric_node_id, FabricNodeResource};

pub(crate) use resource_fabric::fetch_fabric;
pub(crate) use resource_fabric_node::fetch_fabric_node;

use crate::api::cluster::sdn::{PROTOCOL_OPENFABRIC, PROTOCOL_OSPF};
use crate::api::ApiError;
use tfplug::types::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FabricProtocol {
    Ospf,
    OpenFabric,
}

impl FabricProtocol {
    pub fn api_name(self) -> &'static str {
        match self {
            FabricProtocol::Ospf => PROTOCOL_OSPF,
            FabricProtocol::OpenFabric => PROTOCOL_OPENFABRIC,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FabricProtocol::Ospf => "OSPF",
            FabricProtocol::OpenFabric => "OpenFabric",
        }
    }

    pub fn fabric_type_name(self) -> &'static str {
        match self {
            FabricProtocol::Ospf => "proxmox_virtual_environment_sdn_fabric_ospf",
            FabricProtocol::OpenFabric => "proxmox_virtual_environment_sdn_fabric_openfabric",
        }
    }

    pub fn node_type_name(self) -> &'static str {
        match self {
            FabricProtocol::Ospf => "proxmox_virtual_environment_sdn_fabric_node_ospf",
            FabricProtocol::OpenFabric => "proxmox_virtual_environment_sdn_fabric_node_openfabric",
        }
    }

    /// Errors when the server reports a different protocol for the object
    pub(crate) fn check_reported(self, object: &str, reported: Option<&str>) -> Result<(), Diagnostic> {
        match reported {
            Some(reported) if reported != self.api_name() => Err(Diagnostic::error(
                "SDN Fabric Protocol Mismatch",
                format!(
                    "{} is managed as {} but the server reports protocol '{}'",
                    object,
                    self.api_name(),
                    reported
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// Failure of a read that also verifies the reported protocol
pub(crate) enum ReadFailure {
    Api(ApiError),
    Diagnostic(Diagnostic),
}

impl ReadFailure {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, ReadFailure::Api(e) if e.is_not_found())
    }

    pub(crate) fn into_diagnostic(self, summary: &str) -> Diagnostic {
        match self {
            ReadFailure::Api(e) => Diagnostic::error(summary, format!("API error: {}", e)),
            ReadFailure::Diagnostic(diag) => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_mismatch_is_an_error() {
        assert!(FabricProtocol::Ospf
            .check_reported("fabric fab1", Some("ospf"))
            .is_ok());
        assert!(FabricProtocol::Ospf.check_reported("fabric fab1", None).is_ok());

        let diag = FabricProtocol::Ospf
            .check_reported("fabric fab1", Some("openfabric"))
            .unwrap_err();
        assert!(diag.detail.contains("openfabric"));
    }
}
