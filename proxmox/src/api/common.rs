//! Common types and utilities for Proxmox API

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Error body returned next to a non-2xx status
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Option<HashMap<String, String>>,
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: message={message:?}, errors={errors:?}")]
pub struct ApiErrorDetails {
    pub errors: Option<HashMap<String, String>>,
    pub message: Option<String>,
}

impl ApiErrorDetails {
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.as_deref().is_some_and(|m| m.contains(needle))
            || self
                .errors
                .as_ref()
                .is_some_and(|errs| errs.values().any(|v| v.contains(needle)))
    }

    /// "field: reason" pairs sorted by field name
    pub fn field_summary(&self) -> Option<String> {
        let errors = self.errors.as_ref()?;
        let mut pairs: Vec<_> = errors
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v.trim_end()))
            .collect();
        pairs.sort();
        Some(pairs.join(" - "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxmoxBool(pub bool);

impl ProxmoxBool {
    pub fn as_bool(&self) -> bool {
        self.0
    }
}

impl From<bool> for ProxmoxBool {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl Serialize for ProxmoxBool {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(u8::from(self.0))
    }
}

impl<'de> Deserialize<'de> for ProxmoxBool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum BoolOrIntOrString {
            Bool(bool),
            Int(u8),
            String(String),
        }

        match BoolOrIntOrString::deserialize(deserializer)? {
            BoolOrIntOrString::Bool(b) => Ok(ProxmoxBool(b)),
            BoolOrIntOrString::Int(0) => Ok(ProxmoxBool(false)),
            BoolOrIntOrString::Int(1) => Ok(ProxmoxBool(true)),
            BoolOrIntOrString::String(s) if s == "0" => Ok(ProxmoxBool(false)),
            BoolOrIntOrString::String(s) if s == "1" => Ok(ProxmoxBool(true)),
            _ => Err(serde::de::Error::custom("expected 0 or 1")),
        }
    }
}

pub fn deserialize_proxmox_bool_option<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ProxmoxBool>::deserialize(deserializer)?.map(|b| b.0))
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the staged SDN configuration instead of the running one
    pub fn pending() -> Self {
        Self::new().add("pending", 1)
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Flattens a request body into form fields
///
/// Booleans become 1/0, arrays repeat their key and nulls are dropped.
/// Nested objects are rejected since Proxmox forms are flat.
pub fn to_form_pairs<B: Serialize>(body: &B) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(body).map_err(|e| ApiError::EncodeError(e.to_string()))?;
    let object = match value {
        serde_json::Value::Object(object) => object,
        serde_json::Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ApiError::EncodeError(format!(
                "expected an object body, got {}",
                other
            )))
        }
    };

    let mut pairs = Vec::new();
    for (key, value) in object {
        match value {
            serde_json::Value::Null => {}
            serde_json::Value::Array(items) => {
                for item in items {
                    if let Some(encoded) = scalar_to_form(&key, item)? {
                        pairs.push((key.clone(), encoded));
                    }
                }
            }
            other => {
                if let Some(encoded) = scalar_to_form(&key, other)? {
                    pairs.push((key, encoded));
                }
            }
        }
    }
    Ok(pairs)
}

fn scalar_to_form(key: &str, value: serde_json::Value) -> Result<Option<String>, ApiError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Bool(b) => Ok(Some(if b { "1" } else { "0" }.to_string())),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Err(ApiError::EncodeError(format!(
            "field '{}' holds a nested value",
            key
        ))),
    }
}

/// Serializes a list of field names as the comma-joined `delete` parameter
pub mod comma_list {
    use serde::Serializer;

    pub fn serialize<S>(value: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.join(","))
    }
}

pub mod string_or_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrU64 {
            String(String),
            U64(u64),
        }

        match Option::<StringOrU64>::deserialize(deserializer)? {
            Some(StringOrU64::String(s)) if s.is_empty() => Ok(None),
            Some(StringOrU64::String(s)) => {
                s.parse::<u64>().map(Some).map_err(serde::de::Error::custom)
            }
            Some(StringOrU64::U64(u)) => Ok(Some(u)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Body {
        iface: String,
        autostart: bool,
        mtu: Option<u64>,
        gateway: Option<String>,
        interfaces: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty", with = "comma_list")]
        delete: Vec<String>,
    }

    #[test]
    fn form_pairs_flatten_scalars_and_lists() {
        let body = Body {
            iface: "vmbr0".to_string(),
            autostart: true,
            mtu: Some(1500),
            gateway: None,
            interfaces: vec!["name=eth0".to_string(), "name=eth1".to_string()],
            delete: vec!["gateway".to_string(), "mtu".to_string()],
        };

        let pairs = to_form_pairs(&body).unwrap();

        assert!(pairs.contains(&("iface".to_string(), "vmbr0".to_string())));
        assert!(pairs.contains(&("autostart".to_string(), "1".to_string())));
        assert!(pairs.contains(&("mtu".to_string(), "1500".to_string())));
        assert!(pairs.contains(&("delete".to_string(), "gateway,mtu".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "gateway"));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "interfaces").count(), 2);
    }

    #[test]
    fn form_pairs_reject_nested_objects() {
        let body = serde_json::json!({ "outer": { "inner": 1 } });
        assert!(matches!(
            to_form_pairs(&body),
            Err(ApiError::EncodeError(_))
        ));
    }

    #[test]
    fn proxmox_bool_accepts_string_digits() {
        let parsed: ProxmoxBool = serde_json::from_str("\"1\"").unwrap();
        assert!(parsed.as_bool());
        let parsed: ProxmoxBool = serde_json::from_str("0").unwrap();
        assert!(!parsed.as_bool());
    }

    #[test]
    fn query_params_encode_values() {
        let query = ApiQueryParams::pending().add("type", "bridge").to_query_string();
        assert_eq!(query, "?pending=1&type=bridge");

        let query = ApiQueryParams::new()
            .add_optional("opt", None::<String>)
            .add("upid", "UPID:pve:1")
            .to_query_string();
        assert_eq!(query, "?upid=UPID%3Apve%3A1");
    }

    #[test]
    fn field_summary_sorts_fields() {
        let details = ApiErrorDetails {
            errors: Some(HashMap::from([
                ("ip".to_string(), "invalid format\n".to_string()),
                ("area".to_string(), "missing".to_string()),
            ])),
            message: None,
        };
        assert_eq!(
            details.field_summary().unwrap(),
            "area: missing - ip: invalid format"
        );
    }
}
