//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Sets the import ID to a single attribute in state
///
/// Example: ID "tank" -> state.id = "tank"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    push_imported(request, response, state);
}

/// Splits a composite import ID into several attributes
///
/// Example: ID "fab1/pve1" with attributes ["fabric_id", "node_id"]
/// -> state.fabric_id = "fab1", state.node_id = "pve1"
pub fn import_state_composite_id(
    _ctx: &Context,
    attributes: &[&str],
    separator: char,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let parts: Vec<&str> = request.id.split(separator).collect();
    if parts.len() != attributes.len() || parts.iter().any(|p| p.is_empty()) {
        response.diagnostics.push(Diagnostic::error(
            "Invalid import ID",
            format!(
                "Expected import ID in the form '{}', got '{}'",
                attributes.join(&separator.to_string()),
                request.id
            ),
        ));
        return;
    }

    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
    for (name, part) in attributes.iter().zip(parts) {
        if let Err(e) = state.set_string(&AttributePath::new(name), part.to_string()) {
            response.diagnostics.push(Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}'", name),
            ));
            return;
        }
    }

    push_imported(request, response, state);
}

fn push_imported(
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
    state: DynamicValue,
) {
    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}
