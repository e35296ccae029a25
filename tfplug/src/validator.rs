//! Attribute and configuration validators
//!
//! Attribute validators implement `schema::Validator` and receive a single
//! attribute value. Config validators look across attributes of the whole
//! configuration, for rules like "exactly one of".

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use regex::Regex;

fn known_string(value: &DynamicValue) -> Option<&str> {
    match &value.value {
        Dynamic::String(s) => Some(s.as_str()),
        _ => None,
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Box<Self> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn at_least(min: usize) -> Box<Self> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = known_string(&request.config_value) {
            let len = s.chars().count();
            let too_short = self.min.is_some_and(|min| len < min);
            let too_long = self.max.is_some_and(|max| len > max);
            if too_short || too_long {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid length for {}", request.path),
                        format!("{}, got {}", self.description(), len),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct StringPatternValidator {
    pub pattern: Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: Regex, description: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            pattern,
            description: description.into(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("value must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = known_string(&request.config_value) {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!("'{}' must match {}", s, self.description),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct StringOneOfValidator {
    pub allowed: Vec<String>,
}

impl StringOneOfValidator {
    pub fn new(allowed: &[&str]) -> Box<Self> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = known_string(&request.config_value) {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!("'{}' is not allowed, {}", s, self.description()),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Box<Self> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {} and {}", min, max),
            (Some(min), None) => format!("value must be at least {}", min),
            (None, Some(max)) => format!("value must be at most {}", max),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::Number(n) = request.config_value.value {
            let out_of_range =
                self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max);
            if out_of_range {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Value out of range for {}", request.path),
                        format!("{}, got {}", self.description(), n),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Validates every element of a string list or set with a string pattern
pub struct ListElementsMatchValidator {
    pub pattern: Regex,
    pub description: String,
}

impl ListElementsMatchValidator {
    pub fn new(pattern: Regex, description: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            pattern,
            description: description.into(),
        })
    }
}

impl Validator for ListElementsMatchValidator {
    fn description(&self) -> String {
        format!("every element must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::List(items) = &request.config_value.value {
            for (idx, item) in items.iter().enumerate() {
                if let Dynamic::String(s) = item {
                    if !self.pattern.is_match(s) {
                        diagnostics.push(
                            Diagnostic::error(
                                format!("Invalid element in {}", request.path),
                                format!("'{}' must match {}", s, self.description),
                            )
                            .with_attribute(request.path.clone().index(idx as i64)),
                        );
                    }
                }
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Validates relationships between attributes of a whole configuration
pub trait ConfigValidator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic>;
}

fn set_attributes<'a>(config: &DynamicValue, names: &'a [String]) -> Vec<&'a str> {
    names
        .iter()
        .filter(|name| !config.is_attribute_null(&AttributePath::new(name)))
        .map(String::as_str)
        .collect()
}

fn any_unknown(config: &DynamicValue, names: &[String]) -> bool {
    names
        .iter()
        .any(|name| config.is_attribute_unknown(&AttributePath::new(name)))
}

fn names(attributes: &[&str]) -> Vec<String> {
    attributes.iter().map(|s| s.to_string()).collect()
}

pub struct AtLeastOneOf {
    pub attributes: Vec<String>,
}

impl AtLeastOneOf {
    pub fn new(attributes: &[&str]) -> Box<Self> {
        Box::new(Self {
            attributes: names(attributes),
        })
    }
}

impl ConfigValidator for AtLeastOneOf {
    fn description(&self) -> String {
        format!("at least one of [{}] must be set", self.attributes.join(", "))
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        if any_unknown(config, &self.attributes) || !set_attributes(config, &self.attributes).is_empty()
        {
            return Vec::new();
        }
        vec![Diagnostic::error("Missing attribute configuration", self.description())]
    }
}

pub struct ExactlyOneOf {
    pub attributes: Vec<String>,
}

impl ExactlyOneOf {
    pub fn new(attributes: &[&str]) -> Box<Self> {
        Box::new(Self {
            attributes: names(attributes),
        })
    }
}

impl ConfigValidator for ExactlyOneOf {
    fn description(&self) -> String {
        format!("exactly one of [{}] must be set", self.attributes.join(", "))
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        if any_unknown(config, &self.attributes) {
            return Vec::new();
        }
        match set_attributes(config, &self.attributes).as_slice() {
            [_] => Vec::new(),
            [] => vec![Diagnostic::error("Missing attribute configuration", self.description())],
            set => vec![Diagnostic::error(
                "Invalid attribute combination",
                format!("{}, got [{}]", self.description(), set.join(", ")),
            )],
        }
    }
}

/// When `attribute` is set none of `conflicts` may be set
pub struct ConflictsWith {
    pub attribute: String,
    pub conflicts: Vec<String>,
}

impl ConflictsWith {
    pub fn new(attribute: &str, conflicts: &[&str]) -> Box<Self> {
        Box::new(Self {
            attribute: attribute.to_string(),
            conflicts: names(conflicts),
        })
    }
}

impl ConfigValidator for ConflictsWith {
    fn description(&self) -> String {
        format!(
            "{} cannot be combined with [{}]",
            self.attribute,
            self.conflicts.join(", ")
        )
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let path = AttributePath::new(&self.attribute);
        if config.is_attribute_null(&path) {
            return Vec::new();
        }
        set_attributes(config, &self.conflicts)
            .into_iter()
            .map(|other| {
                Diagnostic::error(
                    "Invalid attribute combination",
                    format!("{} cannot be set together with {}", self.attribute, other),
                )
                .with_attribute(path.clone())
            })
            .collect()
    }
}

/// When `attribute` is set all of `required` must be set as well
pub struct AlsoRequires {
    pub attribute: String,
    pub required: Vec<String>,
}

impl AlsoRequires {
    pub fn new(attribute: &str, required: &[&str]) -> Box<Self> {
        Box::new(Self {
            attribute: attribute.to_string(),
            required: names(required),
        })
    }
}

impl ConfigValidator for AlsoRequires {
    fn description(&self) -> String {
        format!("{} requires [{}]", self.attribute, self.required.join(", "))
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let path = AttributePath::new(&self.attribute);
        if config.is_attribute_null(&path) || any_unknown(config, &self.required) {
            return Vec::new();
        }
        let set = set_attributes(config, &self.required);
        self.required
            .iter()
            .filter(|name| !set.contains(&name.as_str()))
            .map(|missing| {
                Diagnostic::error(
                    "Missing attribute configuration",
                    format!("{} must be set when {} is set", missing, self.attribute),
                )
                .with_attribute(path.clone())
            })
            .collect()
    }
}

/// Runs every config validator against the configuration
pub fn validate_config(validators: &[Box<dyn ConfigValidator>], config: &DynamicValue) -> Vec<Diagnostic> {
    validators.iter().flat_map(|v| v.validate(config)).collect()
}
