//! Resource pools

use crate::api::common::{comma_list, ProxmoxBool};
use crate::api::{error::ApiError, Client};
use serde::{Deserialize, Serialize};

const POOLS_PATH: &str = "/api2/json/pools";

#[derive(Debug, Clone, Deserialize)]
pub struct PoolListEntry {
    pub poolid: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolMember {
    pub id: String,
    pub node: Option<String>,
    /// Datastore of storage members
    pub storage: Option<String>,
    #[serde(rename = "type")]
    pub member_type: String,
    pub vmid: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pool {
    pub comment: Option<String>,
    #[serde(default)]
    pub members: Vec<PoolMember>,
}

impl Pool {
    pub fn has_vm(&self, vm_id: u64) -> bool {
        self.members.iter().any(|m| m.vmid == Some(vm_id))
    }

    pub fn has_storage(&self, storage_id: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.storage.as_deref() == Some(storage_id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolCreate {
    pub poolid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Body of `PUT pools/{id}`; `delete` removes the listed members instead of adding them
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "allow-move", skip_serializing_if = "Option::is_none")]
    pub allow_move: Option<ProxmoxBool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<ProxmoxBool>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_list::serialize"
    )]
    pub vms: Vec<String>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_list::serialize"
    )]
    pub storage: Vec<String>,
}

pub struct PoolsApi<'a> {
    client: &'a Client,
}

impl<'a> PoolsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn pool_path(id: &str) -> String {
        format!("{}/{}", POOLS_PATH, urlencoding::encode(id))
    }

    /// GET /api2/json/pools
    pub async fn list(&self) -> Result<Vec<PoolListEntry>, ApiError> {
        self.client.get(POOLS_PATH).await
    }

    /// GET /api2/json/pools/{id}
    pub async fn get(&self, id: &str) -> Result<Pool, ApiError> {
        self.client.get(&Self::pool_path(id)).await
    }

    /// POST /api2/json/pools
    pub async fn create(&self, request: &PoolCreate) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.post(POOLS_PATH, request).await?;
        tracing::info!("Created pool {}", request.poolid);
        Ok(())
    }

    /// PUT /api2/json/pools/{id}
    pub async fn update(&self, id: &str, request: &PoolUpdate) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.put(&Self::pool_path(id), request).await?;
        tracing::info!("Updated pool {}", id);
        Ok(())
    }

    /// DELETE /api2/json/pools/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.delete(&Self::pool_path(id)).await?;
        tracing::info!("Deleted pool {}", id);
        Ok(())
    }
}
