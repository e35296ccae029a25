//! Core type system for tfplug
//!
//! This module provides the core types used throughout the framework,
//! including Dynamic values, type definitions, and utility types.

use crate::error::{Result, TfplugError};
use std::collections::HashMap;

/// Dynamic represents Terraform values that can be of any type
/// This is the core type for all configuration and state data
/// IMPORTANT: Always use type-safe accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List of values (ordered, allows duplicates)
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

/// Config, plan and state values exchanged with resources and data sources
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    pub fn unknown() -> Self {
        Self {
            value: Dynamic::Unknown,
        }
    }

    /// Type-safe accessors - ALWAYS use these instead of pattern matching
    /// These handle path navigation and type checking
    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::String(s) => Ok(s.clone()),
            _ => Err(TfplugError::TypeMismatch {
                expected: "string".to_string(),
                actual: self.type_name(value),
            }),
        }
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::Number(n) => Ok(*n),
            _ => Err(TfplugError::TypeMismatch {
                expected: "number".to_string(),
                actual: self.type_name(value),
            }),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::Bool(b) => Ok(*b),
            _ => Err(TfplugError::TypeMismatch {
                expected: "bool".to_string(),
                actual: self.type_name(value),
            }),
        }
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::List(l) => Ok(l.clone()),
            _ => Err(TfplugError::TypeMismatch {
                expected: "list".to_string(),
                actual: self.type_name(value),
            }),
        }
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::Map(m) => Ok(m.clone()),
            _ => Err(TfplugError::TypeMismatch {
                expected: "map".to_string(),
                actual: self.type_name(value),
            }),
        }
    }

    /// Type-safe setters - Use for building state/config objects
    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set_value(path, Dynamic::Number(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::List(value))
    }

    pub fn set_map(&mut self, path: &AttributePath, value: HashMap<String, Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::Map(value))
    }

    /// Helpers for handling unknown values during planning
    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.value, Dynamic::Unknown)
    }

    /// Mark computed values as unknown during planning
    pub fn mark_unknown(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Unknown)
    }

    /// Write an explicit null, used for optional attributes the remote side does not report
    pub fn set_null(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Null)
    }

    pub fn set_optional_string(&mut self, path: &AttributePath, value: Option<String>) -> Result<()> {
        match value {
            Some(v) => self.set_string(path, v),
            None => self.set_null(path),
        }
    }

    pub fn set_optional_number(&mut self, path: &AttributePath, value: Option<f64>) -> Result<()> {
        match value {
            Some(v) => self.set_number(path, v),
            None => self.set_null(path),
        }
    }

    pub fn set_optional_bool(&mut self, path: &AttributePath, value: Option<bool>) -> Result<()> {
        match value {
            Some(v) => self.set_bool(path, v),
            None => self.set_null(path),
        }
    }

    /// Returns None for missing, null and unknown attributes
    pub fn get_optional_string(&self, path: &AttributePath) -> Option<String> {
        self.get_string(path).ok()
    }

    pub fn get_optional_number(&self, path: &AttributePath) -> Option<f64> {
        self.get_number(path).ok()
    }

    pub fn get_optional_bool(&self, path: &AttributePath) -> Option<bool> {
        self.get_bool(path).ok()
    }

    /// Reads a list or set of strings, skipping non-string elements
    pub fn get_string_list(&self, path: &AttributePath) -> Result<Vec<String>> {
        Ok(self
            .get_list(path)?
            .into_iter()
            .filter_map(|item| match item {
                Dynamic::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }

    pub fn get_string_map(&self, path: &AttributePath) -> Result<HashMap<String, String>> {
        Ok(self
            .get_map(path)?
            .into_iter()
            .filter_map(|(k, v)| match v {
                Dynamic::String(s) => Some((k, s)),
                _ => None,
            })
            .collect())
    }

    /// True when the attribute is absent or explicitly null
    pub fn is_attribute_null(&self, path: &AttributePath) -> bool {
        matches!(self.navigate_path(path), Err(_) | Ok(Dynamic::Null))
    }

    pub fn is_attribute_unknown(&self, path: &AttributePath) -> bool {
        matches!(self.navigate_path(path), Ok(Dynamic::Unknown))
    }

    /// Writes a raw value at the path
    pub fn set_value_at(&mut self, path: &AttributePath, value: Dynamic) -> Result<()> {
        self.set_value(path, value)
    }

    /// Raw access to an attribute value
    pub fn get_value(&self, path: &AttributePath) -> Option<&Dynamic> {
        self.navigate_path(path).ok()
    }

    // Private helper methods
    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name)) => {
                    m.get(name).ok_or_else(|| {
                        TfplugError::Custom(format!("attribute '{}' not found", name))
                    })?
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    let idx = *idx as usize;
                    l.get(idx).ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds", idx))
                    })?
                }
                _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
            };
        }

        Ok(current)
    }

    fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        if path.steps.is_empty() {
            self.value = new_value;
            return Ok(());
        }

        // For non-empty paths, ensure we have a map at the root
        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        let last_idx = path.steps.len() - 1;

        for (idx, step) in path.steps.iter().enumerate() {
            if idx == last_idx {
                // Set the final value
                match (current, step) {
                    (Dynamic::Map(m), AttributePathStep::AttributeName(name)) => {
                        m.insert(name.clone(), new_value);
                        return Ok(());
                    }
                    (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                        let idx = *idx as usize;
                        if idx < l.len() {
                            l[idx] = new_value;
                            return Ok(());
                        }
                        return Err(TfplugError::Custom(format!(
                            "list index {} out of bounds",
                            idx
                        )));
                    }
                    _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
                }
            } else {
                // Navigate to the next level
                current = match (current, step) {
                    (Dynamic::Map(m), AttributePathStep::AttributeName(name)) => {
                        m.entry(name.clone()).or_insert_with(|| {
                            // Determine what to insert based on next step
                            if let Some(next_step) = path.steps.get(idx + 1) {
                                match next_step {
                                    AttributePathStep::AttributeName(_) => {
                                        Dynamic::Map(HashMap::new())
                                    }
                                    AttributePathStep::ElementKeyInt(_) => {
                                        Dynamic::List(Vec::new())
                                    }
                                    AttributePathStep::ElementKeyString(_) => {
                                        Dynamic::Map(HashMap::new())
                                    }
                                }
                            } else {
                                Dynamic::Null
                            }
                        })
                    }
                    (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                        let idx = *idx as usize;
                        if idx >= l.len() {
                            return Err(TfplugError::Custom(format!(
                                "list index {} out of bounds",
                                idx
                            )));
                        }
                        &mut l[idx]
                    }
                    _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
                };
            }
        }

        Err(TfplugError::Custom("failed to set value".to_string()))
    }

    fn type_name(&self, value: &Dynamic) -> String {
        match value {
            Dynamic::Null => "null".to_string(),
            Dynamic::Bool(_) => "bool".to_string(),
            Dynamic::Number(_) => "number".to_string(),
            Dynamic::String(_) => "string".to_string(),
            Dynamic::List(_) => "list".to_string(),
            Dynamic::Map(_) => "map".to_string(),
            Dynamic::Unknown => "unknown".to_string(),
        }
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if idx == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                AttributePathStep::ElementKeyInt(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    /// Access attribute by name in object/map
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// True when any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Invalid,
    Error,
    Warning,
}

/// ServerCapabilities indicates provider capabilities
#[derive(Debug, Clone)]
pub struct ServerCapabilities {
    pub plan_destroy: bool,
    pub get_provider_schema_optional: bool,
    pub move_resource_state: bool,
}

/// ClientCapabilities indicates Terraform client capabilities
#[derive(Debug, Clone, Default)]
pub struct ClientCapabilities {
    pub deferral_allowed: bool,
    pub write_only_attributes_allowed: bool,
}

/// Deferred indicates a deferred change
#[derive(Debug, Clone)]
pub struct Deferred {
    pub reason: DeferredReason,
}

/// Reason for deferring a change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredReason {
    Unknown,
    ResourceConfigUnknown,
    ProviderConfigUnknown,
    AbsentPrereq,
}

/// ResourceIdentityData contains actual identity data
#[derive(Debug, Clone)]
pub struct ResourceIdentityData {
    pub identity_data: DynamicValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_value_string_access() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        dv.set_string(&AttributePath::new("name"), "test".to_string())
            .unwrap();

        let result = dv.get_string(&AttributePath::new("name")).unwrap();
        assert_eq!(result, "test");
    }

    #[test]
    fn dynamic_value_nested_access() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        let path = AttributePath::new("config").attribute("endpoint");
        dv.set_string(&path, "https://example.com".to_string())
            .unwrap();

        let result = dv.get_string(&path).unwrap();
        assert_eq!(result, "https://example.com");
    }

    #[test]
    fn optional_setters_write_nulls() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        dv.set_optional_string(&AttributePath::new("gateway"), None)
            .unwrap();
        dv.set_optional_number(&AttributePath::new("mtu"), Some(1500.0))
            .unwrap();

        assert!(dv.is_attribute_null(&AttributePath::new("gateway")));
        assert!(dv.is_attribute_null(&AttributePath::new("missing")));
        assert_eq!(dv.get_optional_number(&AttributePath::new("mtu")), Some(1500.0));
        assert_eq!(dv.get_optional_string(&AttributePath::new("gateway")), None);
    }

    #[test]
    fn string_list_skips_other_elements() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        dv.set_list(
            &AttributePath::new("ports"),
            vec![
                Dynamic::String("eth0".to_string()),
                Dynamic::Null,
                Dynamic::String("eth1".to_string()),
            ],
        )
        .unwrap();

        let ports = dv.get_string_list(&AttributePath::new("ports")).unwrap();
        assert_eq!(ports, vec!["eth0".to_string(), "eth1".to_string()]);
    }
}
