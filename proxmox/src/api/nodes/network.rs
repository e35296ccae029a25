//! Node network interface configuration

use super::tasks::{TaskWaitOptions, TasksApi};
use crate::api::common::{comma_list, deserialize_proxmox_bool_option, string_or_u64, ProxmoxBool};
use crate::api::{error::ApiError, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tfplug::Context;

const RELOAD_ATTEMPTS: u32 = 3;
const RELOAD_TIMEOUT: Duration = Duration::from_secs(5);
const RELOAD_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Interface entry as returned by `GET nodes/{node}/network`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub iface: String,
    #[serde(rename = "type")]
    pub iface_type: String,
    #[serde(default, deserialize_with = "deserialize_proxmox_bool_option")]
    pub active: Option<bool>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_proxmox_bool_option")]
    pub autostart: Option<bool>,
    pub bridge_ports: Option<String>,
    #[serde(default, deserialize_with = "deserialize_proxmox_bool_option")]
    pub bridge_vlan_aware: Option<bool>,
    pub cidr: Option<String>,
    pub cidr6: Option<String>,
    pub comments: Option<String>,
    pub gateway: Option<String>,
    pub gateway6: Option<String>,
    #[serde(default, with = "string_or_u64")]
    pub mtu: Option<u64>,
    #[serde(default)]
    pub priority: i64,
}

/// Body of interface create and update calls
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkInterfaceRequest {
    pub iface: String,
    #[serde(rename = "type")]
    pub iface_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autostart: Option<ProxmoxBool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_ports: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_vlan_aware: Option<ProxmoxBool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u64>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_list::serialize"
    )]
    pub delete: Vec<String>,
}

pub struct NetworkApi<'a> {
    client: &'a Client,
    node: String,
}

impl<'a> NetworkApi<'a> {
    pub fn new(client: &'a Client, node: &str) -> Self {
        Self {
            client,
            node: node.to_string(),
        }
    }

    fn base_path(&self) -> String {
        format!("/api2/json/nodes/{}/network", self.node)
    }

    fn iface_path(&self, iface: &str) -> String {
        format!("{}/{}", self.base_path(), urlencoding::encode(iface))
    }

    /// GET /api2/json/nodes/{node}/network, ordered by priority
    pub async fn list(&self) -> Result<Vec<NetworkInterface>, ApiError> {
        let mut ifaces: Vec<NetworkInterface> = self.client.get(&self.base_path()).await?;
        ifaces.sort_by_key(|i| i.priority);
        Ok(ifaces)
    }

    /// POST /api2/json/nodes/{node}/network
    pub async fn create(&self, request: &NetworkInterfaceRequest) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.post(&self.base_path(), request).await?;
        tracing::info!("Created network interface {} on {}", request.iface, self.node);
        Ok(())
    }

    /// PUT /api2/json/nodes/{node}/network/{iface}
    pub async fn update(&self, iface: &str, request: &NetworkInterfaceRequest) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.put(&self.iface_path(iface), request).await?;
        tracing::info!("Updated network interface {} on {}", iface, self.node);
        Ok(())
    }

    /// DELETE /api2/json/nodes/{node}/network/{iface}
    pub async fn delete(&self, iface: &str) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.delete(&self.iface_path(iface)).await?;
        tracing::info!("Deleted network interface {} on {}", iface, self.node);
        Ok(())
    }

    /// DELETE /api2/json/nodes/{node}/network, dropping pending changes
    pub async fn revert(&self) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.delete(&self.base_path()).await?;
        Ok(())
    }

    /// PUT /api2/json/nodes/{node}/network and wait for the reload task.
    ///
    /// Reloads through one client never overlap. An `ifreload` failing with
    /// exit code 89 is retried.
    pub async fn reload(&self, ctx: &Context) -> Result<(), ApiError> {
        let _guard = self.client.network_reload_lock().lock().await;
        let options = TaskWaitOptions {
            timeout: RELOAD_TIMEOUT,
            ..TaskWaitOptions::default()
        };

        let mut attempt = 1;
        loop {
            match self.reload_once(ctx, &options).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < RELOAD_ATTEMPTS && e.to_string().contains("exit code 89") => {
                    tracing::warn!(
                        "Network reload on {} failed (attempt {}): {}",
                        self.node,
                        attempt,
                        e
                    );
                    if !ctx.sleep(RELOAD_RETRY_DELAY).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn reload_once(&self, ctx: &Context, options: &TaskWaitOptions) -> Result<(), ApiError> {
        let upid: Option<String> = self
            .client
            .put(&self.base_path(), &serde_json::json!({}))
            .await?;
        let upid = upid.ok_or_else(|| {
            ApiError::ParseError("network reload returned no task id".to_string())
        })?;
        TasksApi::new(self.client)
            .wait_for_task(ctx, &upid, options)
            .await
    }
}
