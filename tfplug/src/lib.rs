//! tfplug - Terraform Plugin Framework for Rust
//!
//! Provider, resource and data source traits with the schema, value and
//! planning helpers needed to implement a Terraform provider in Rust.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::{import_state_composite_id, import_state_passthrough_id};
pub use provider::{
    DataSourceFactory, Provider, ProviderMetadataRequest, ProviderMetadataResponse,
    ResourceFactory,
};
pub use resource::{
    Resource, ResourceWithConfigure, ResourceWithImportState, ResourceWithModifyPlan,
};
pub use schema::{AttributeBuilder, AttributeType, PlannedChange, Schema, SchemaBuilder};
pub use types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
