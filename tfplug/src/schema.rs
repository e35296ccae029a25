//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas, including attribute types, blocks, and validation.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

/// Attribute represents a single configuration attribute
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub default: Option<Box<dyn Default>>,
    pub nested_type: Option<NestedType>,
    pub deprecated: bool,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .field("nested_type", &self.nested_type)
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

// Manual Clone implementation
impl Clone for Attribute {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            r#type: self.r#type.clone(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            validators: vec![],
            plan_modifiers: vec![],
            default: None,
            nested_type: self.nested_type.clone(),
            deprecated: self.deprecated,
        }
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

/// NestedType for attributes with nested structures
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: ObjectNestingMode,
}

/// ObjectNestingMode for nested attribute objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectNestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validator performs validation on attribute values during planning
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Perform validation
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

/// Request for validators
pub struct ValidatorRequest {
    pub config_value: crate::types::DynamicValue,
    pub path: AttributePath,
}

/// Response from validators
pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers
pub struct PlanModifierRequest {
    pub config_value: crate::types::DynamicValue,
    pub state_value: crate::types::DynamicValue,
    pub plan_value: crate::types::DynamicValue,
    pub path: AttributePath,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: crate::types::DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default provides default values for optional attributes
/// Called when attribute is not set in configuration
pub trait Default: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// Request for default values
pub struct DefaultRequest {
    pub path: AttributePath,
}

/// Response with default value
pub struct DefaultResponse {
    pub value: crate::types::DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                nested_type: None,
                deprecated: false,
            },
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Add validator
    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    /// Add plan modifier
    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    /// Set default
    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    /// Set nested type
    pub fn nested_type(mut self, nested: NestedType) -> Self {
        self.attribute.nested_type = Some(nested);
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    block_types: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Add nested block
    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Set description kind
    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of planning a resource change against its schema
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// Checks required attributes, rejects computed-only attributes set in
    /// configuration and runs every attribute validator
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            let value = config.get_value(&path).cloned().unwrap_or(Dynamic::Null);

            if matches!(value, Dynamic::Null) {
                if attr.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required, but no definition was found.", attr.name),
                        )
                        .with_attribute(path),
                    );
                }
                continue;
            }

            if attr.computed && !attr.optional && !attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid configuration",
                        format!("\"{}\" is computed and cannot be set in configuration", attr.name),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(value.clone()),
                    path: path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }
        diagnostics
    }

    /// Fills absent optional attributes from their defaults
    pub fn apply_defaults(&self, config: &DynamicValue, plan: &mut DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for attr in &self.block.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let path = AttributePath::new(&attr.name);
            if !config.is_attribute_null(&path) {
                continue;
            }
            let response = default.default_value(DefaultRequest { path: path.clone() });
            if let Err(e) = plan.set_value_at(&path, response.value.value) {
                diagnostics.push(
                    Diagnostic::error("Failed to apply default", e.to_string()).with_attribute(path),
                );
            }
        }
        diagnostics
    }

    /// Plans an update or create: applies defaults, marks unset computed
    /// attributes unknown when the resource changes, then runs plan modifiers
    pub fn plan_changes(
        &self,
        config: &DynamicValue,
        prior_state: &DynamicValue,
        proposed_new_state: &DynamicValue,
    ) -> PlannedChange {
        let mut planned_state = proposed_new_state.clone();
        let mut requires_replace = Vec::new();

        if proposed_new_state.is_null() {
            return PlannedChange {
                planned_state,
                requires_replace,
                diagnostics: Vec::new(),
            };
        }

        let mut diagnostics = self.apply_defaults(config, &mut planned_state);
        let changing = prior_state.is_null() || planned_state != *prior_state;

        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            if changing && attr.computed && attr.default.is_none() && config.is_attribute_null(&path) {
                if let Err(e) = planned_state.mark_unknown(&path) {
                    diagnostics.push(Diagnostic::error("Failed to plan attribute", e.to_string()));
                }
            }

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: DynamicValue::new(
                        config.get_value(&path).cloned().unwrap_or(Dynamic::Null),
                    ),
                    state_value: DynamicValue::new(
                        prior_state.get_value(&path).cloned().unwrap_or(Dynamic::Null),
                    ),
                    plan_value: DynamicValue::new(
                        planned_state.get_value(&path).cloned().unwrap_or(Dynamic::Null),
                    ),
                    path: path.clone(),
                });
                diagnostics.extend(response.diagnostics);
                if response.requires_replace && !requires_replace.contains(&path) {
                    tracing::debug!(attribute = %path, "attribute change forces replacement");
                    requires_replace.push(path.clone());
                }
                if let Err(e) = planned_state.set_value_at(&path, response.plan_value.value) {
                    diagnostics.push(Diagnostic::error("Failed to plan attribute", e.to_string()));
                }
            }
        }

        PlannedChange {
            planned_state,
            requires_replace,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn schema_builder_creates_schema_with_attributes() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 2);
        assert_eq!(schema.block.description, "Test resource schema");
    }

    #[test]
    fn nested_attribute_type() {
        let object_type = AttributeType::Object(HashMap::from([
            ("host".to_string(), AttributeType::String),
            ("port".to_string(), AttributeType::Number),
        ]));

        let attr = AttributeBuilder::new("config", object_type)
            .optional()
            .build();

        assert!(attr.optional);
        if let AttributeType::Object(fields) = &attr.r#type {
            assert_eq!(fields.len(), 2);
            assert!(matches!(fields.get("host"), Some(AttributeType::String)));
            assert!(matches!(fields.get("port"), Some(AttributeType::Number)));
        } else {
            panic!("Expected Object type");
        }
    }

    fn fabric_like_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .required()
                    .validator(crate::validator::StringLengthValidator::between(1, 8))
                    .plan_modifier(crate::plan_modifier::RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mtu", AttributeType::Number)
                    .optional()
                    .default(crate::defaults::StaticDefault::number(1500.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("digest", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn map(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ))
    }

    #[test]
    fn validate_config_reports_missing_and_computed() {
        let schema = fabric_like_schema();
        let diags = schema.validate_config(&map(&[(
            "digest",
            Dynamic::String("abc".to_string()),
        )]));
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].summary, "Missing required argument");
        assert_eq!(diags[1].summary, "Invalid configuration");
    }

    #[test]
    fn validate_config_runs_attribute_validators() {
        let schema = fabric_like_schema();
        let diags = schema.validate_config(&map(&[(
            "id",
            Dynamic::String("waytoolongname".to_string()),
        )]));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("id"));
    }

    #[test]
    fn plan_changes_applies_defaults_and_marks_computed_unknown() {
        let schema = fabric_like_schema();
        let config = map(&[("id", Dynamic::String("fab1".to_string()))]);
        let planned = schema.plan_changes(&config, &DynamicValue::null(), &config);

        assert_eq!(
            planned.planned_state.get_number(&AttributePath::new("mtu")).unwrap(),
            1500.0
        );
        assert!(planned
            .planned_state
            .is_attribute_unknown(&AttributePath::new("digest")));
        assert!(planned.requires_replace.is_empty());
    }

    #[test]
    fn plan_changes_flags_replacement() {
        let schema = fabric_like_schema();
        let prior = map(&[
            ("id", Dynamic::String("fab1".to_string())),
            ("mtu", Dynamic::Number(1500.0)),
            ("digest", Dynamic::String("abc".to_string())),
        ]);
        let config = map(&[("id", Dynamic::String("fab2".to_string()))]);
        let planned = schema.plan_changes(&config, &prior, &config);

        assert_eq!(planned.requires_replace, vec![AttributePath::new("id")]);
    }
}
