//! Linux bridge interface on a node
//!
//! Every change is staged by the API and only takes effect after a network
//! reload, which this resource triggers after create, update and delete.

use crate::api::nodes::{NetworkInterface, NetworkInterfaceRequest};
use crate::api::{ApiError, Client};
use crate::resources::common::{get_optional_u64, not_configured, provider_data_from, with_pattern};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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

const BRIDGE_NAME_PATTERN: &str = r"^vmbr(\d{1,4})$";

pub fn bridge_id(node_name: &str, iface: &str) -> String {
    format!("{}:{}", node_name, iface)
}

/// Splits `node_name:iface`
pub fn parse_bridge_id(id: &str) -> Result<(String, String), Diagnostic> {
    let parts: Vec<&str> = id.split(':').collect();
    match parts.as_slice() {
        [node_name, iface] if !node_name.is_empty() && !iface.is_empty() => {
            Ok((node_name.to_string(), iface.to_string()))
        }
        _ => Err(Diagnostic::error(
            "Unexpected Import Identifier",
            format!(
                "Expected import identifier with format: `node_name:iface`. Got: {:?}",
                id
            ),
        )),
    }
}

/// Trims, drops empty entries, sorts and space-joins the ports
fn bridge_ports(ports: &[String]) -> Option<String> {
    let mut ports: Vec<&str> = ports
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    ports.sort_unstable();
    (!ports.is_empty()).then(|| ports.join(" "))
}

fn bridge_request(plan: &DynamicValue) -> NetworkInterfaceRequest {
    let ports = plan
        .get_string_list(&AttributePath::new("ports"))
        .unwrap_or_default();

    NetworkInterfaceRequest {
        iface: plan
            .get_optional_string(&AttributePath::new("name"))
            .unwrap_or_default(),
        iface_type: "bridge".to_string(),
        autostart: Some(
            plan.get_optional_bool(&AttributePath::new("autostart"))
                .unwrap_or(true)
                .into(),
        ),
        bridge_ports: bridge_ports(&ports),
        bridge_vlan_aware: plan
            .get_optional_bool(&AttributePath::new("vlan_aware"))
            .filter(|aware| *aware)
            .map(Into::into),
        cidr: plan.get_optional_string(&AttributePath::new("address")),
        cidr6: plan.get_optional_string(&AttributePath::new("address6")),
        comments: plan.get_optional_string(&AttributePath::new("comment")),
        gateway: plan.get_optional_string(&AttributePath::new("gateway")),
        gateway6: plan.get_optional_string(&AttributePath::new("gateway6")),
        mtu: get_optional_u64(plan, "mtu"),
        delete: vec![],
    }
}

/// Fields that were set in `prior` and are cleared by `plan`
fn cleared_fields(prior: &DynamicValue, plan: &DynamicValue) -> Vec<String> {
    let mut delete = Vec::new();

    if get_optional_u64(plan, "mtu").unwrap_or(0) == 0 && get_optional_u64(prior, "mtu").unwrap_or(0) != 0 {
        delete.push("mtu".to_string());
    }
    for attr in ["gateway", "gateway6"] {
        let path = AttributePath::new(attr);
        let planned = plan.get_optional_string(&path).unwrap_or_default();
        let previous = prior.get_optional_string(&path).unwrap_or_default();
        if planned.is_empty() && !previous.is_empty() {
            delete.push(attr.to_string());
        }
    }
    let vlan_aware = AttributePath::new("vlan_aware");
    if !plan.get_optional_bool(&vlan_aware).unwrap_or(false)
        && prior.get_optional_bool(&vlan_aware).unwrap_or(false)
    {
        delete.push("bridge_vlan_aware".to_string());
    }

    delete
}

/// Copies the interface as the API reports it onto `state`
fn apply_interface(state: &mut DynamicValue, iface: NetworkInterface) {
    let _ = state.set_optional_string(&AttributePath::new("address"), iface.cidr);
    let _ = state.set_optional_string(&AttributePath::new("gateway"), iface.gateway);
    let _ = state.set_optional_string(&AttributePath::new("address6"), iface.cidr6);
    let _ = state.set_optional_string(&AttributePath::new("gateway6"), iface.gateway6);
    let _ = state.set_bool(
        &AttributePath::new("autostart"),
        iface.autostart.unwrap_or(false),
    );
    let _ = state.set_optional_number(&AttributePath::new("mtu"), iface.mtu.map(|m| m as f64));
    if let Some(comments) = iface.comments {
        let _ = state.set_string(&AttributePath::new("comment"), comments.trim().to_string());
    }
    let _ = state.set_bool(
        &AttributePath::new("vlan_aware"),
        iface.bridge_vlan_aware.unwrap_or(false),
    );
    if let Some(ports) = iface.bridge_ports.filter(|p| !p.is_empty()) {
        let ports = ports
            .split(' ')
            .map(|p| Dynamic::String(p.to_string()))
            .collect();
        let _ = state.set_list(&AttributePath::new("ports"), ports);
    }
}

async fn find_bridge(
    client: &Client,
    node_name: &str,
    iface: &str,
) -> Result<Option<NetworkInterface>, ApiError> {
    let ifaces = client.nodes().network(node_name).list().await?;
    Ok(ifaces.into_iter().find(|i| i.iface == iface))
}

/// Refreshes `state` from the node's interface list
async fn read_into(client: &Client, state: &mut DynamicValue) -> Result<bool, Diagnostic> {
    let node_name = state
        .get_optional_string(&AttributePath::new("node_name"))
        .unwrap_or_default();
    let name = state
        .get_optional_string(&AttributePath::new("name"))
        .unwrap_or_default();

    let iface = find_bridge(client, &node_name, &name).await.map_err(|e| {
        Diagnostic::error(
            "Error listing network interfaces",
            format!("Could not list network interfaces, unexpected error: {}", e),
        )
    })?;

    match iface {
        Some(iface) => {
            apply_interface(state, iface);
            Ok(true)
        }
        None => Ok(false),
    }
}

fn reload_error(node_name: &str, e: ApiError) -> Diagnostic {
    Diagnostic::error(
        "Error reloading network configuration",
        format!(
            "Could not reload network configuration on node '{}', unexpected error: {}",
            node_name, e
        ),
    )
}

fn bridge_schema() -> Schema {
    let name = with_pattern(
        AttributeBuilder::new("name", AttributeType::String)
            .description("The interface name. Must be vmbrN, where N is a number between 0 and 9999")
            .required()
            .plan_modifier(RequiresReplace::create()),
        BRIDGE_NAME_PATTERN,
        r#"must be "vmbrN", where N is a number between 0 and 9999"#,
    );

    SchemaBuilder::new()
        .version(0)
        .description("Manages a Linux Bridge network interface in a Proxmox VE node")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("A unique identifier with format <node name>:<iface>")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("node_name", AttributeType::String)
                .description("The name of the node")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(name.build())
        .attribute(
            AttributeBuilder::new("address", AttributeType::String)
                .description("The interface IPv4/CIDR address")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("gateway", AttributeType::String)
                .description("Default gateway address")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("address6", AttributeType::String)
                .description("The interface IPv6/CIDR address")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("gateway6", AttributeType::String)
                .description("Default IPv6 gateway address")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autostart", AttributeType::Bool)
                .description("Automatically start interface on boot (defaults to true)")
                .optional()
                .computed()
                .default(StaticDefault::bool(true))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("mtu", AttributeType::Number)
                .description("The interface MTU")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("comment", AttributeType::String)
                .description("Comment for the interface")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("ports", AttributeType::List(Box::new(AttributeType::String)))
                .description("The interface bridge ports")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("vlan_aware", AttributeType::Bool)
                .description("Whether the interface bridge is VLAN aware (defaults to false)")
                .optional()
                .computed()
                .build(),
        )
        .build()
}

#[derive(Default)]
pub struct LinuxBridgeResource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl LinuxBridgeResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for LinuxBridgeResource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_network_linux_bridge"
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
            schema: bridge_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: bridge_schema().validate_config(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };
        let client = &provider_data.client;

        let mut new_state = request.planned_state;
        let node_name = new_state
            .get_optional_string(&AttributePath::new("node_name"))
            .unwrap_or_default();
        let body = bridge_request(&new_state);

        if let Err(e) = client.nodes().network(&node_name).create(&body).await {
            return CreateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Error creating Linux Bridge interface",
                    format!("Could not create Linux Bridge, unexpected error: {}", e),
                )],
            };
        }

        let _ = new_state.set_string(&AttributePath::new("id"), bridge_id(&node_name, &body.iface));
        let mut diagnostics = vec![];
        if let Err(diag) = read_into(client, &mut new_state).await {
            diagnostics.push(diag);
        }

        if let Err(e) = client.nodes().network(&node_name).reload(&ctx).await {
            diagnostics.push(reload_error(&node_name, e));
        }

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
                private: request.private,
                deferred: None,
                new_identity: None,
            };
        };

        let mut new_state = request.current_state.clone();
        match read_into(&provider_data.client, &mut new_state).await {
            Ok(true) => ReadResourceResponse {
                new_state: Some(new_state),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
                new_identity: None,
            },
            Ok(false) => {
                tracing::warn!(
                    "Linux bridge {} no longer exists, removing from state",
                    new_state
                        .get_optional_string(&AttributePath::new("id"))
                        .unwrap_or_default()
                );
                ReadResourceResponse::removed(request.private)
            }
            Err(diag) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
                private: request.private,
                deferred: None,
                new_identity: None,
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![not_configured()],
                new_identity: None,
            };
        };
        let client = &provider_data.client;

        let mut new_state = request.planned_state;
        let node_name = new_state
            .get_optional_string(&AttributePath::new("node_name"))
            .unwrap_or_default();

        let mut body = bridge_request(&new_state);
        body.delete = cleared_fields(&request.prior_state, &new_state);
        for field in &body.delete {
            match field.as_str() {
                "mtu" => body.mtu = None,
                "gateway" => body.gateway = None,
                "gateway6" => body.gateway6 = None,
                "bridge_vlan_aware" => body.bridge_vlan_aware = None,
                _ => {}
            }
        }

        if let Err(e) = client
            .nodes()
            .network(&node_name)
            .update(&body.iface, &body)
            .await
        {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Error updating Linux Bridge interface",
                    format!("Could not update Linux Bridge, unexpected error: {}", e),
                )],
                new_identity: None,
            };
        }

        let mut diagnostics = vec![];
        if let Err(diag) = read_into(client, &mut new_state).await {
            diagnostics.push(diag);
        }

        if let Err(e) = client.nodes().network(&node_name).reload(&ctx).await {
            diagnostics.push(reload_error(&node_name, e));
        }

        UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
            new_identity: None,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };
        let client = &provider_data.client;

        let node_name = request
            .prior_state
            .get_optional_string(&AttributePath::new("node_name"))
            .unwrap_or_default();
        let name = request
            .prior_state
            .get_optional_string(&AttributePath::new("name"))
            .unwrap_or_default();

        match client.nodes().network(&node_name).delete(&name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                return DeleteResourceResponse {
                    diagnostics: vec![Diagnostic::warning(
                        "Linux Bridge interface does not exist",
                        format!(
                            "Could not delete Linux Bridge '{}', interface does not exist, \
                             or has already been deleted outside of Terraform.",
                            name
                        ),
                    )],
                };
            }
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Error deleting Linux Bridge interface",
                        format!(
                            "Could not delete Linux Bridge '{}', unexpected error: {}",
                            name, e
                        ),
                    )],
                };
            }
        }

        DeleteResourceResponse {
            diagnostics: client
                .nodes()
                .network(&node_name)
                .reload(&ctx)
                .await
                .err()
                .map(|e| reload_error(&node_name, e))
                .into_iter()
                .collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for LinuxBridgeResource {
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
impl ResourceWithModifyPlan for LinuxBridgeResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned = bridge_schema().plan_changes(
            &request.config,
            &request.prior_state,
            &request.proposed_new_state,
        );

        if !planned.planned_state.is_null() {
            let names = (
                request.config.get_string(&AttributePath::new("node_name")),
                request.config.get_string(&AttributePath::new("name")),
            );
            if let (Ok(node_name), Ok(name)) = names {
                let _ = planned
                    .planned_state
                    .set_string(&AttributePath::new("id"), bridge_id(&node_name, &name));
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
impl ResourceWithImportState for LinuxBridgeResource {
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

        let (node_name, iface) = match parse_bridge_id(&request.id) {
            Ok(parts) => parts,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };

        let Some(provider_data) = &self.provider_data else {
            response.diagnostics.push(not_configured());
            return response;
        };

        let mut state = crate::resources::common::empty_state();
        let _ = state.set_string(&AttributePath::new("id"), request.id.clone());
        let _ = state.set_string(&AttributePath::new("node_name"), node_name);
        let _ = state.set_string(&AttributePath::new("name"), iface.clone());

        match read_into(&provider_data.client, &mut state).await {
            Ok(true) => response.imported_resources.push(ImportedResource {
                type_name: request.type_name,
                state,
                private: vec![],
                identity: request.identity,
            }),
            Ok(false) => response.diagnostics.push(Diagnostic::error(
                "Linux Bridge interface does not exist",
                format!("Interface {} was not found on the node", request.id),
            )),
            Err(diag) => response.diagnostics.push(diag),
        }

        response
    }
}

#[cfg(test)]
#[path = "resource_linux_bridge_test.rs"]
mod resource_linux_bridge_test;
