//! SDN fabric resource, one type per routing protocol

use super::{FabricProtocol, ReadFailure};
use crate::api::cluster::sdn::{Fabric, FabricData, FabricUpdate};
use crate::api::Client;
use crate::resources::common::{
    empty_state, get_optional_u64, not_configured, provider_data_from, removed_fields,
    with_pattern, SDN_ID_PATTERN,
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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{validate_config, AtLeastOneOf, ConfigValidator};

const OSPF_DELETABLE: &[(&str, &str)] = &[("ip_prefix", "ip_prefix"), ("area", "area")];

const OPENFABRIC_DELETABLE: &[(&str, &str)] = &[
    ("ip_prefix", "ip_prefix"),
    ("ip6_prefix", "ip6_prefix"),
    ("csnp_interval", "csnp_interval"),
    ("hello_interval", "hello_interval"),
];

pub struct FabricResource {
    protocol: FabricProtocol,
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl FabricResource {
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

pub(crate) fn fabric_schema(protocol: FabricProtocol) -> Schema {
    let id = with_pattern(
        AttributeBuilder::new("id", AttributeType::String)
            .description("The SDN fabric identifier")
            .required()
            .plan_modifier(RequiresReplace::create()),
        SDN_ID_PATTERN,
        "a letter followed by up to 7 letters or digits",
    );

    let builder = SchemaBuilder::new()
        .version(0)
        .description(&format!("Manages an {} SDN fabric", protocol.label()))
        .attribute(id.build())
        .attribute(
            AttributeBuilder::new("state", AttributeType::String)
                .description("Pending state of the fabric: new, changed or deleted until applied")
                .computed()
                .build(),
        );

    match protocol {
        FabricProtocol::Ospf => builder
            .attribute(
                AttributeBuilder::new("area", AttributeType::String)
                    .description("OSPF area, either an IPv4 address or a 32 bit number")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip_prefix", AttributeType::String)
                    .description("IPv4 prefix the router IDs are taken from")
                    .required()
                    .build(),
            )
            .build(),
        FabricProtocol::OpenFabric => builder
            .attribute(
                AttributeBuilder::new("ip_prefix", AttributeType::String)
                    .description("IPv4 prefix of the fabric")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip6_prefix", AttributeType::String)
                    .description("IPv6 prefix of the fabric")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("csnp_interval", AttributeType::Number)
                    .description("CSNP interval in seconds")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("hello_interval", AttributeType::Number)
                    .description("Hello interval in seconds")
                    .optional()
                    .build(),
            )
            .build(),
    }
}

fn config_validators(protocol: FabricProtocol) -> Vec<Box<dyn ConfigValidator>> {
    match protocol {
        FabricProtocol::Ospf => vec![],
        FabricProtocol::OpenFabric => vec![AtLeastOneOf::new(&["ip_prefix", "ip6_prefix"])],
    }
}

fn deletable(protocol: FabricProtocol) -> &'static [(&'static str, &'static str)] {
    match protocol {
        FabricProtocol::Ospf => OSPF_DELETABLE,
        FabricProtocol::OpenFabric => OPENFABRIC_DELETABLE,
    }
}

fn fabric_from_plan(protocol: FabricProtocol, plan: &DynamicValue) -> Result<Fabric, Diagnostic> {
    let id = plan
        .get_string(&AttributePath::new("id"))
        .map_err(|_| Diagnostic::error("Missing id", "The 'id' attribute is required"))?;

    let mut fabric = Fabric {
        id,
        protocol: protocol.api_name().to_string(),
        ip_prefix: plan.get_optional_string(&AttributePath::new("ip_prefix")),
        ..Default::default()
    };

    match protocol {
        FabricProtocol::Ospf => {
            fabric.area = plan.get_optional_string(&AttributePath::new("area"));
        }
        FabricProtocol::OpenFabric => {
            fabric.ip6_prefix = plan.get_optional_string(&AttributePath::new("ip6_prefix"));
            fabric.csnp_interval = get_optional_u64(plan, "csnp_interval");
            fabric.hello_interval = get_optional_u64(plan, "hello_interval");
        }
    }

    Ok(fabric)
}

/// Builds state from the server's view; attributes of the other protocol are never set
pub(crate) fn fabric_state(protocol: FabricProtocol, data: FabricData) -> DynamicValue {
    let mut state = empty_state();
    let _ = state.set_string(&AttributePath::new("id"), data.id);
    let _ = state.set_optional_string(&AttributePath::new("state"), data.state);
    let _ = state.set_optional_string(&AttributePath::new("ip_prefix"), data.ip_prefix);

    match protocol {
        FabricProtocol::Ospf => {
            let _ = state.set_optional_string(&AttributePath::new("area"), data.area);
        }
        FabricProtocol::OpenFabric => {
            let _ = state.set_optional_string(&AttributePath::new("ip6_prefix"), data.ip6_prefix);
            let _ = state.set_optional_number(
                &AttributePath::new("csnp_interval"),
                data.csnp_interval.map(|v| v as f64),
            );
            let _ = state.set_optional_number(
                &AttributePath::new("hello_interval"),
                data.hello_interval.map(|v| v as f64),
            );
        }
    }

    state
}

/// Reads a fabric and checks the server reports `protocol` for it
pub(crate) async fn fetch_fabric(
    client: &Client,
    protocol: FabricProtocol,
    id: &str,
    pending: bool,
) -> Result<DynamicValue, ReadFailure> {
    let data = client
        .cluster()
        .sdn()
        .fabrics(protocol.api_name())
        .get(id, pending)
        .await
        .map_err(ReadFailure::Api)?;

    protocol
        .check_reported(&format!("SDN fabric '{}'", id), data.protocol.as_deref())
        .map_err(ReadFailure::Diagnostic)?;

    Ok(fabric_state(protocol, data))
}

impl FabricResource {
    async fn read_fabric(&self, id: &str, pending: bool) -> Result<DynamicValue, ReadFailure> {
        let provider_data = self
            .provider_data
            .as_ref()
            .ok_or_else(|| ReadFailure::Diagnostic(not_configured()))?;
        fetch_fabric(&provider_data.client, self.protocol, id, pending).await
    }
}

#[async_trait]
impl Resource for FabricResource {
    fn type_name(&self) -> &str {
        self.protocol.fabric_type_name()
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
            schema: fabric_schema(self.protocol),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = fabric_schema(self.protocol).validate_config(&request.config);
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

        let fabric = match fabric_from_plan(self.protocol, &request.planned_state) {
            Ok(fabric) => fabric,
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
            .fabrics(self.protocol.api_name())
            .create(&fabric)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Unable to Create SDN Fabric",
                format!("API error: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        match self.read_fabric(&fabric.id, true).await {
            Ok(state) => CreateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics,
            },
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic("Unable to Read SDN Fabric After Creation"));
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

        let Ok(id) = request.current_state.get_string(&AttributePath::new("id")) else {
            return ReadResourceResponse::removed(request.private);
        };

        match self.read_fabric(&id, true).await {
            Ok(state) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
                private: request.private,
                deferred: None,
                new_identity: None,
            },
            Err(ReadFailure::Api(e)) if e.is_not_found() => {
                tracing::warn!("SDN fabric {} no longer exists, removing from state", id);
                ReadResourceResponse::removed(request.private)
            }
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic("Unable to Read SDN Fabric"));
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

        let fabric = match fabric_from_plan(self.protocol, &request.planned_state) {
            Ok(fabric) => fabric,
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

        let update = FabricUpdate {
            delete: removed_fields(
                &request.prior_state,
                &request.planned_state,
                deletable(self.protocol),
            ),
            fabric,
        };

        if let Err(e) = provider_data
            .client
            .cluster()
            .sdn()
            .fabrics(self.protocol.api_name())
            .update(&update)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Unable to Update SDN Fabric",
                format!("API error: {}", e),
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
                new_identity: None,
            };
        }

        match self.read_fabric(&update.fabric.id, true).await {
            Ok(state) => UpdateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics,
                new_identity: None,
            },
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic("Unable to Read SDN Fabric After Update"));
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

        let Ok(id) = request.prior_state.get_string(&AttributePath::new("id")) else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .cluster()
            .sdn()
            .fabrics(self.protocol.api_name())
            .delete(&id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("SDN fabric {} already deleted", id);
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                "Unable to Delete SDN Fabric",
                format!("API error: {}", e),
            )),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for FabricResource {
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
impl ResourceWithModifyPlan for FabricResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let planned = fabric_schema(self.protocol).plan_changes(
            &request.config,
            &request.prior_state,
            &request.proposed_new_state,
        );
        ModifyPlanResponse {
            planned_state: planned.planned_state,
            requires_replace: planned.requires_replace,
            planned_private: request.prior_private,
            diagnostics: planned.diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for FabricResource {
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

        match self.read_fabric(&request.id, false).await {
            Ok(state) => response.imported_resources.push(ImportedResource {
                type_name: request.type_name,
                state,
                private: vec![],
                identity: request.identity,
            }),
            Err(ReadFailure::Api(e)) if e.is_not_found() => {
                response.diagnostics.push(Diagnostic::error(
                    format!("Fabric {} does not exist", request.id),
                    format!("API error: {}", e),
                ));
            }
            Err(failure) => {
                response.diagnostics.push(
                    failure.into_diagnostic(&format!("Unable to Import SDN Fabric {}", request.id)),
                );
            }
        }

        response
    }
}

#[cfg(test)]
#[path = "resource_fabric_test.rs"]
mod resource_fabric_test;
