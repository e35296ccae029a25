//! SDN configuration: fabrics, fabric nodes and the cluster wide apply

use crate::api::common::ApiQueryParams;
use crate::api::{error::ApiError, Client};
use serde::de::DeserializeOwned;

mod fabric_nodes;
mod fabrics;

pub use fabric_nodes::{FabricNode, FabricNodeData, FabricNodeUpdate, FabricNodesApi};
pub use fabrics::{Fabric, FabricData, FabricUpdate, FabricsApi};

pub const PROTOCOL_OSPF: &str = "ospf";
pub const PROTOCOL_OPENFABRIC: &str = "openfabric";

/// Marker the server uses in `pending` for a value that will be removed
pub const DELETED_MARKER: &str = "deleted";

pub struct SdnApi<'a> {
    client: &'a Client,
}

impl<'a> SdnApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn fabrics(&self, protocol: &str) -> FabricsApi<'a> {
        FabricsApi::new(self.client, protocol)
    }

    pub fn fabric_nodes(&self, fabric_id: &str, protocol: &str) -> FabricNodesApi<'a> {
        FabricNodesApi::new(self.client, fabric_id, protocol)
    }

    /// PUT /api2/json/cluster/sdn, returning the reload task if one was started
    pub async fn apply(&self) -> Result<Option<String>, ApiError> {
        let upid: Option<String> = self
            .client
            .put("/api2/json/cluster/sdn", &serde_json::json!({}))
            .await?;
        tracing::info!("Applied SDN configuration");
        Ok(upid)
    }
}

/// Overlays the `pending` object onto the running values.
///
/// A pending value of `deleted` removes the key.
pub fn merge_pending(value: serde_json::Value) -> serde_json::Value {
    let serde_json::Value::Object(mut object) = value else {
        return value;
    };

    if let Some(serde_json::Value::Object(pending)) = object.remove("pending") {
        for (key, pending_value) in pending {
            if pending_value.as_str() == Some(DELETED_MARKER) {
                object.remove(&key);
            } else {
                object.insert(key, pending_value);
            }
        }
    }

    serde_json::Value::Object(object)
}

/// GET an SDN object, merging staged changes when `pending` is requested
pub(crate) async fn get_sdn_object<T: DeserializeOwned>(
    client: &Client,
    path: &str,
    pending: bool,
) -> Result<T, ApiError> {
    let raw: serde_json::Value = if pending {
        client.get_with_params(path, &ApiQueryParams::pending()).await?
    } else {
        client.get(path).await?
    };

    if raw.is_null() {
        return Err(ApiError::ResourceDoesNotExist(path.to_string()));
    }

    serde_json::from_value(merge_pending(raw))
        .map_err(|e| ApiError::ParseError(format!("Failed to decode {}: {}", path, e)))
}
