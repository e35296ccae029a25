//! Default value providers for attributes
//!
//! Defaults are applied during planning by `Schema::apply_defaults` when an
//! optional attribute is absent or null in configuration.

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;

/// StaticDefault provides a fixed value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Box<dyn Default> {
        Self::create(Dynamic::List(values))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EnvKind {
    String,
    Bool,
}

/// EnvDefault reads the value from an environment variable
/// Unset or unparsable variables fall back to `fallback`, or null without one
pub struct EnvDefault {
    env_var: String,
    kind: EnvKind,
    fallback: Dynamic,
}

impl EnvDefault {
    pub fn string(env_var: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            kind: EnvKind::String,
            fallback: Dynamic::Null,
        })
    }

    /// Accepts true/false/1/0 in any case
    pub fn bool(env_var: &str, fallback: bool) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            kind: EnvKind::Bool,
            fallback: Dynamic::Bool(fallback),
        })
    }

    fn parse(&self, raw: &str) -> Option<Dynamic> {
        match self.kind {
            EnvKind::String if !raw.is_empty() => Some(Dynamic::String(raw.to_string())),
            EnvKind::String => None,
            EnvKind::Bool => parse_bool(raw).map(Dynamic::Bool),
        }
    }
}

/// Parses the boolean spellings accepted in environment variables
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        format!("default from environment variable {}", self.env_var)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = env::var(&self.env_var)
            .ok()
            .and_then(|raw| self.parse(&raw))
            .unwrap_or_else(|| self.fallback.clone());

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}
