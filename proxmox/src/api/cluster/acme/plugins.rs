//! ACME challenge plugins

use crate::api::common::{comma_list, deserialize_proxmox_bool_option, ProxmoxBool};
use crate::api::{error::ApiError, Client};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

const PLUGINS_PATH: &str = "/api2/json/cluster/acme/plugins";

/// DNS plugin credentials.
///
/// Sent as base64 of newline separated `key=value` lines, read back as the
/// plain newline separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginData(pub BTreeMap<String, String>);

impl PluginData {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut entries = BTreeMap::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| format!("invalid DNS plugin data: {}", line))?;
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(Self(entries))
    }

    pub fn encode(&self) -> String {
        let lines: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        STANDARD.encode(lines.join("\n"))
    }
}

impl Serialize for PluginData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for PluginData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PluginData::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcmePlugin {
    pub plugin: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub api: Option<String>,
    pub data: Option<PluginData>,
    pub digest: Option<String>,
    #[serde(default, deserialize_with = "deserialize_proxmox_bool_option")]
    pub disable: Option<bool>,
    #[serde(rename = "validation-delay")]
    pub validation_delay: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AcmePluginCreate {
    #[serde(rename = "id")]
    pub plugin: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PluginData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<ProxmoxBool>,
    #[serde(rename = "validation-delay", skip_serializing_if = "Option::is_none")]
    pub validation_delay: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AcmePluginUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PluginData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<ProxmoxBool>,
    #[serde(rename = "validation-delay", skip_serializing_if = "Option::is_none")]
    pub validation_delay: Option<u64>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_list::serialize"
    )]
    pub delete: Vec<String>,
}

pub struct AcmePluginsApi<'a> {
    client: &'a Client,
}

impl<'a> AcmePluginsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn plugin_path(id: &str) -> String {
        format!("{}/{}", PLUGINS_PATH, urlencoding::encode(id))
    }

    /// GET /api2/json/cluster/acme/plugins
    pub async fn list(&self) -> Result<Vec<AcmePlugin>, ApiError> {
        self.client.get(PLUGINS_PATH).await
    }

    /// GET /api2/json/cluster/acme/plugins/{id}
    pub async fn get(&self, id: &str) -> Result<AcmePlugin, ApiError> {
        self.client.get(&Self::plugin_path(id)).await
    }

    /// POST /api2/json/cluster/acme/plugins
    pub async fn create(&self, request: &AcmePluginCreate) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.post(PLUGINS_PATH, request).await?;
        tracing::info!("Created ACME plugin {}", request.plugin);
        Ok(())
    }

    /// PUT /api2/json/cluster/acme/plugins/{id}
    pub async fn update(&self, id: &str, request: &AcmePluginUpdate) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.put(&Self::plugin_path(id), request).await?;
        tracing::info!("Updated ACME plugin {}", id);
        Ok(())
    }

    /// DELETE /api2/json/cluster/acme/plugins/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.delete(&Self::plugin_path(id)).await?;
        tracing::info!("Deleted ACME plugin {}", id);
        Ok(())
    }
}
