//! SDN fabric node resource
//!
//! A node's membership in a fabric, addressed as `<fabric_id>/<node_id>`.
//! Interfaces travel as `name=<iface>` property strings.

use super::{FabricProtocol, ReadFailure};
use crate::api::cluster::sdn::{FabricNode, FabricNodeData, FabricNodeUpdate};
use crate::api::Client;
use crate::resources::common::{
    empty_state, not_configured, provider_data_from, removed_fields, with_pattern, SDN_ID_PATTERN,
};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{validate_config, AtLeastOneOf, ConfigValidator};

const DELETABLE: &[(&str, &str)] = &[
    ("ip", "ip"),
    ("ip6", "ip6"),
    ("interface_names", "interfaces"),
];

pub fn fabric_node_id(fabric_id: &str, node_id: &str) -> String {
    format!("{}/{}", fabric_id, node_id)
}

/// Splits `<fabric_id>/<node_id>`
pub fn parse_fabric_node_id(id: &str) -> Result<(String, String), Diagnostic> {
    match id.split_once('/') {
        Some((fabric_id, node_id)) if !fabric_id.is_empty() && !node_id.is_empty() => {
            Ok((fabric_id.to_string(), node_id.to_string()))
        }
        _ => Err(Diagnostic::error(
            "Unexpected SDN Fabric Node ID Format",
            format!(
                "Expected SDN Fabric Node ID to be in the format <fabric_id>/<node_id>, got: {}",
                id
            ),
        )),
    }
}

/// Extracts interface names from property strings, ignoring keys other than `name`
pub(crate) fn interface_names(interfaces: &[String]) -> Result<Vec<String>, Diagnostic> {
    let mut names = Vec::new();
    for entry in interfaces {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            Diagnostic::error(
                "Unexpected SDN Fabric Node Interface Format",
                format!("Expected interface in the format name=<iface>, got: {}", entry),
            )
        })?;
        if key == "name" {
            names.push(value.to_string());
        }
    }
    names.sort();
    Ok(names)
}

pub struct FabricNodeResource {
    protocol: FabricProtocol,
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl FabricNodeResource {
    pub fn new(protocol: FabricProtocol) -> Self {
        Self {
            protocol,
            provider_data: None,
        }
    }

    pub fn ospf() -> Self {
        Self::new(FabricProtocol::Ospf)
    }

    pub fn openfabric() -> Self {
        Self::new(FabricProtocol::OpenFabric)
    }
}

pub(crate) fn fabric_node_schema(protocol: FabricProtocol) -> Schema {
    let fabric_id = with_pattern(
        AttributeBuilder::new("fabric_id", AttributeType::String)
            .description("The SDN fabric the node belongs to")
            .required()
            .plan_modifier(RequiresReplace::create()),
        SDN_ID_PATTERN,
        "a letter followed by up to 7 letters or digits",
    );

    let builder = SchemaBuilder::new()
        .version(0)
        .description(&format!("Manages a node of an {} SDN fabric", protocol.label()))
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The fabric node ID, <fabric_id>/<node_id>")
                .computed()
                .build(),
        )
        .attribute(fabric_id.build())
        .attribute(
            AttributeBuilder::new("node_id", AttributeType::String)
                .description("The cluster node name")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "interface_names",
                AttributeType::Set(Box::new(AttributeType::String)),
            )
            .description("Interfaces of the node that take part in the fabric")
            .required()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("state", AttributeType::String)
                .description("Pending state of the node: new, changed or deleted until applied")
                .computed()
                .build(),
        );

    match protocol {
        FabricProtocol::Ospf => builder
            .attribute(
                AttributeBuilder::new("ip", AttributeType::String)
                    .description("IPv4 router ID of the node")
                    .required()
                    .build(),
            )
            .build(),
        FabricProtocol::OpenFabric => builder
            .attribute(
                AttributeBuilder::new("ip", AttributeType::String)
                    .description("IPv4 address of the node")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip6", AttributeType::String)
                    .description("IPv6 address of the node")
                    .optional()
                    .build(),
            )
            .build(),
    }
}

fn config_validators(protocol: FabricProtocol) -> Vec<Box<dyn ConfigValidator>> {
    match protocol {
        FabricProtocol::Ospf => vec![],
        FabricProtocol::OpenFabric => vec![AtLeastOneOf::new(&["ip", "ip6"])],
    }
}

fn node_from_plan(protocol: FabricProtocol, plan: &DynamicValue) -> Result<FabricNode, Diagnostic> {
    let fabric_id = plan
        .get_string(&AttributePath::new("fabric_id"))
        .map_err(|_| Diagnostic::error("Missing fabric_id", "The 'fabric_id' attribute is required"))?;
    let node_id = plan
        .get_string(&AttributePath::new("node_id"))
        .map_err(|_| Diagnostic::error("Missing node_id", "The 'node_id' attribute is required"))?;

    let interfaces = plan
        .get_string_list(&AttributePath::new("interface_names"))
        .unwrap_or_default()
        .into_iter()
        .map(|name| format!("name={}", name))
        .collect();

    Ok(FabricNode {
        node_id,
        fabric_id,
        protocol: protocol.api_name().to_string(),
        ip: plan.get_optional_string(&AttributePath::new("ip")),
        ip6: match protocol {
            FabricProtocol::Ospf => None,
            FabricProtocol::OpenFabric => plan.get_optional_string(&AttributePath::new("ip6")),
        },
        interfaces,
    })
}

pub(crate) fn fabric_node_state(
    protocol: FabricProtocol,
    fabric_id: &str,
    data: FabricNodeData,
) -> Result<DynamicValue, Diagnostic> {
    let names = interface_names(&data.interfaces)?;
    let fabric_id = data.fabric_id.unwrap_or_else(|| fabric_id.to_string());

    let mut state = empty_state();
    let _ = state.set_string(
        &AttributePath::new("id"),
        fabric_node_id(&fabric_id, &data.node_id),
    );
    let _ = state.set_string(&AttributePath::new("fabric_id"), fabric_id);
    let _ = state.set_string(&AttributePath::new("node_id"), data.node_id);
    let _ = state.set_list(
        &AttributePath::new("interface_names"),
        names.into_iter().map(Dynamic::String).collect(),
    );
    let _ = state.set_optional_string(&AttributePath::new("state"), data.state);
    let _ = state.set_optional_string(&AttributePath::new("ip"), data.ip);
    if protocol == FabricProtocol::OpenFabric {
        let _ = state.set_optional_string(&AttributePath::new("ip6"), data.ip6);
    }

    Ok(state)
}

/// Reads a fabric node and checks the server reports `protocol` for it
pub(crate) async fn fetch_fabric_node(
    client: &Client,
    protocol: FabricProtocol,
    fabric_id: &str,
    node_id: &str,
    pending: bool,
) -> Result<DynamicValue, ReadFailure> {
    let data = client
        .cluster()
        .sdn()
        .fabric_nodes(fabric_id, protocol.api_name())
        .get(node_id, pending)
        .await
        .map_err(ReadFailure::Api)?;

    protocol
        .check_reported(
            &format!("SDN fabric node '{}'", fabric_node_id(fabric_id, node_id)),
            data.protocol.as_deref(),
        )
        .map_err(ReadFailure::Diagnostic)?;

    fabric_node_state(protocol, fabric_id, data).map_err(ReadFailure::Diagnostic)
}

impl FabricNodeResource {
    async fn read_node(
        &self,
        fabric_id: &str,
        node_id: &str,
        pending: bool,
    ) -> Result<DynamicValue, ReadFailure> {
        let provider_data = self
            .provider_data
            .as_ref()
            .ok_or_else(|| ReadFailure::Diagnostic(not_configured()))?;
        fetch_fabric_node(&provider_data.client, self.protocol, fabric_id, node_id, pending).await
    }
}

#[async_trait]
impl Resource for FabricNodeResource {
    fn type_name(&self) -> &str {
        self.protocol.node_type_name()
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: fabric_node_schema(self.protocol),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = fabric_node_schema(self.protocol).validate_config(&request.config);
        diagnostics.extend(validate_config(
            &config_validators(self.protocol),
            &request.config,
        ));
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };

        let node = match node_from_plan(self.protocol, &request.planned_state) {
            Ok(node) => node,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = provider_data
            .client
            .cluster()
            .sdn()
            .fabric_nodes(&node.fabric_id, self.protocol.api_name())
            .create(&node)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Unable to Create SDN Fabric Node",
                format!("API error: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        match self.read_node(&node.fabric_id, &node.node_id, true).await {
            Ok(state) => CreateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics,
            },
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic("Unable to Read SDN Fabric Node"));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let ids = (
            request
                .current_state
                .get_string(&AttributePath::new("fabric_id")),
            request
                .current_state
                .get_string(&AttributePath::new("node_id")),
        );
        let (Ok(fabric_id), Ok(node_id)) = ids else {
            return ReadResourceResponse::removed(request.private);
        };

        match self.read_node(&fabric_id, &node_id, true).await {
            Ok(state) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
                private: request.private,
                deferred: None,
                new_identity: None,
            },
            Err(failure) if failure.is_not_found() => {
                tracing::warn!(
                    "SDN fabric node {} no longer exists, removing from state",
                    fabric_node_id(&fabric_id, &node_id)
                );
                ReadResourceResponse::removed(request.private)
            }
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic("Unable to Read SDN Fabric Node"));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
                new_identity: None,
            };
        };

        let node = match node_from_plan(self.protocol, &request.planned_state) {
            Ok(node) => node,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let update = FabricNodeUpdate {
            delete: removed_fields(&request.prior_state, &request.planned_state, DELETABLE),
            node,
        };

        if let Err(e) = provider_data
            .client
            .cluster()
            .sdn()
            .fabric_nodes(&update.node.fabric_id, self.protocol.api_name())
            .update(&update)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Unable to Update SDN Fabric Node",
                format!("API error: {}", e),
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
                new_identity: None,
            };
        }

        match self
            .read_node(&update.node.fabric_id, &update.node.node_id, true)
            .await
        {
            Ok(state) => UpdateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics,
                new_identity: None,
            },
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic("Unable to Read SDN Fabric Node"));
                UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                }
            }
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let ids = (
            request.prior_state.get_string(&AttributePath::new("fabric_id")),
            request.prior_state.get_string(&AttributePath::new("node_id")),
        );
        let (Ok(fabric_id), Ok(node_id)) = ids else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .cluster()
            .sdn()
            .fabric_nodes(&fabric_id, self.protocol.api_name())
            .delete(&node_id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "SDN fabric node {} already deleted",
                    fabric_node_id(&fabric_id, &node_id)
                );
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                "Unable to Delete SDN Fabric Node",
                format!("API error: {}", e),
            )),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for FabricNodeResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let (provider_data, diagnostics) = provider_data_from(request.provider_data);
        self.provider_data = provider_data;
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for FabricNodeResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned = fabric_node_schema(self.protocol).plan_changes(
            &request.config,
            &request.prior_state,
            &request.proposed_new_state,
        );

        if !planned.planned_state.is_null() {
            let ids = (
                request.config.get_string(&AttributePath::new("fabric_id")),
                request.config.get_string(&AttributePath::new("node_id")),
            );
            if let (Ok(fabric_id), Ok(node_id)) = ids {
                let _ = planned.planned_state.set_string(
                    &AttributePath::new("id"),
                    fabric_node_id(&fabric_id, &node_id),
                );
            }
        }

        ModifyPlanResponse {
            planned_state: planned.planned_state,
            requires_replace: planned.requires_replace,
            planned_private: request.prior_private,
            diagnostics: planned.diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for FabricNodeResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };

        let (fabric_id, node_id) = match parse_fabric_node_id(&request.id) {
            Ok(ids) => ids,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };

        match self.read_node(&fabric_id, &node_id, false).await {
            Ok(state) => response.imported_resources.push(ImportedResource {
                type_name: request.type_name,
                state,
                private: vec![],
                identity: request.identity,
            }),
            Err(ReadFailure::Api(e)) if e.is_not_found() => {
                response.diagnostics.push(Diagnostic::error(
                    format!("Fabric node {} does not exist", request.id),
                    format!("API error: {}", e),
                ));
            }
            Err(failure) => {
                response.diagnostics.push(failure.into_diagnostic(&format!(
                    "Unable to Import SDN Fabric node {}",
                    request.id
                )));
            }
        }

        response
    }
}

#[cfg(test)]
#[path = "resource_fabric_node_test.rs"]
mod resource_fabric_node_test;
