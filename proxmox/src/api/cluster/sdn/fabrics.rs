//! SDN fabrics

use super::get_sdn_object;
use crate::api::common::{comma_list, string_or_u64};
use crate::api::{error::ApiError, Client};
use serde::{Deserialize, Serialize};

const FABRIC_PATH: &str = "/api2/json/cluster/sdn/fabrics/fabric";

/// Fabric as read back from the server, staged changes already merged
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FabricData {
    pub id: String,
    pub protocol: Option<String>,
    /// `new`, `changed` or `deleted` while changes are staged
    pub state: Option<String>,
    pub area: Option<String>,
    pub ip_prefix: Option<String>,
    pub ip6_prefix: Option<String>,
    #[serde(default, with = "string_or_u64")]
    pub csnp_interval: Option<u64>,
    #[serde(default, with = "string_or_u64")]
    pub hello_interval: Option<u64>,
}

/// Create body; protocol specific fields stay unset when not used
#[derive(Debug, Clone, Default, Serialize)]
pub struct Fabric {
    pub id: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip6_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csnp_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hello_interval: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FabricUpdate {
    #[serde(flatten)]
    pub fabric: Fabric,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_list::serialize"
    )]
    pub delete: Vec<String>,
}

pub struct FabricsApi<'a> {
    client: &'a Client,
    protocol: String,
}

impl<'a> FabricsApi<'a> {
    pub fn new(client: &'a Client, protocol: &str) -> Self {
        Self {
            client,
            protocol: protocol.to_string(),
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    fn fabric_path(id: &str) -> String {
        format!("{}/{}", FABRIC_PATH, urlencoding::encode(id))
    }

    /// GET /api2/json/cluster/sdn/fabrics/fabric/{id}
    pub async fn get(&self, id: &str, pending: bool) -> Result<FabricData, ApiError> {
        get_sdn_object(self.client, &Self::fabric_path(id), pending).await
    }

    /// POST /api2/json/cluster/sdn/fabrics/fabric
    pub async fn create(&self, fabric: &Fabric) -> Result<(), ApiError> {
        let body = Fabric {
            protocol: self.protocol.clone(),
            ..fabric.clone()
        };
        let _: Option<serde_json::Value> = self.client.post(FABRIC_PATH, &body).await?;
        tracing::info!("Created SDN fabric {} ({})", body.id, self.protocol);
        Ok(())
    }

    /// PUT /api2/json/cluster/sdn/fabrics/fabric/{id}
    pub async fn update(&self, update: &FabricUpdate) -> Result<(), ApiError> {
        let mut body = update.clone();
        body.fabric.protocol = self.protocol.clone();
        let path = Self::fabric_path(&body.fabric.id);
        let _: Option<serde_json::Value> = self.client.put(&path, &body).await?;
        tracing::info!("Updated SDN fabric {}", body.fabric.id);
        Ok(())
    }

    /// DELETE /api2/json/cluster/sdn/fabrics/fabric/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.delete(&Self::fabric_path(id)).await?;
        tracing::info!("Deleted SDN fabric {}", id);
        Ok(())
    }
}
