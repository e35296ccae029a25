//! ACME DNS challenge plugin resource

use crate::api::cluster::acme::{AcmePlugin, AcmePluginCreate, AcmePluginUpdate, PluginData};
use crate::resources::common::{get_optional_u64, not_configured, provider_data_from};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

const DEFAULT_VALIDATION_DELAY: f64 = 30.0;
const MAX_VALIDATION_DELAY: f64 = 172_800.0;

#[derive(Default)]
pub struct AcmeDnsPluginResource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl AcmeDnsPluginResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn plugin_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages an ACME DNS challenge plugin in a Proxmox VE cluster")
        .attribute(
            AttributeBuilder::new("plugin", AttributeType::String)
                .description("ACME plugin ID")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("api", AttributeType::String)
                .description("DNS API plugin name, e.g. cf")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("data", AttributeType::Map(Box::new(AttributeType::String)))
                .description("DNS plugin credentials and settings")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("digest", AttributeType::String)
                .description(
                    "SHA1 digest of the current configuration; updates fail if it no longer matches",
                )
                .optional()
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("disable", AttributeType::Bool)
                .description("Disable the plugin configuration")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("validation_delay", AttributeType::Number)
                .description("Seconds to wait before requesting validation (0 - 172800)")
                .optional()
                .computed()
                .default(StaticDefault::number(DEFAULT_VALIDATION_DELAY))
                .validator(NumberRangeValidator::between(0.0, MAX_VALIDATION_DELAY))
                .build(),
        )
        .build()
}

fn plugin_data(value: &DynamicValue) -> Option<PluginData> {
    value
        .get_string_map(&AttributePath::new("data"))
        .ok()
        .map(|entries| PluginData(entries.into_iter().collect::<BTreeMap<_, _>>()))
}

/// Copies the server's view onto `state`
fn apply_plugin(state: &mut DynamicValue, plugin: AcmePlugin) {
    let _ = state.set_optional_string(&AttributePath::new("api"), plugin.api);
    let _ = state.set_optional_string(&AttributePath::new("digest"), plugin.digest);
    let _ = state.set_optional_number(
        &AttributePath::new("validation_delay"),
        Some(
            plugin
                .validation_delay
                .map(|v| v as f64)
                .unwrap_or(DEFAULT_VALIDATION_DELAY),
        ),
    );
    if let Some(data) = plugin.data {
        let entries: HashMap<String, Dynamic> = data
            .0
            .into_iter()
            .map(|(k, v)| (k, Dynamic::String(v)))
            .collect();
        let _ = state.set_map(&AttributePath::new("data"), entries);
    }
    if let Some(disable) = plugin.disable {
        let _ = state.set_bool(&AttributePath::new("disable"), disable);
    }
}

/// Builds the update body; cleared attributes go to the delete list
fn plugin_update(prior: &DynamicValue, plan: &DynamicValue) -> AcmePluginUpdate {
    let mut update = AcmePluginUpdate {
        api: plan.get_optional_string(&AttributePath::new("api")),
        digest: plan.get_optional_string(&AttributePath::new("digest")),
        ..Default::default()
    };

    let data = AttributePath::new("data");
    if plan.is_attribute_null(&data) && !prior.is_attribute_null(&data) {
        update.delete.push("data".to_string());
    } else {
        update.data = plugin_data(plan);
    }

    let disable = AttributePath::new("disable");
    if plan.get_optional_bool(&disable) == Some(true) {
        update.disable = Some(true.into());
    } else if !prior.is_attribute_null(&disable) {
        update.delete.push("disable".to_string());
    }

    let validation_delay = AttributePath::new("validation_delay");
    if plan.is_attribute_null(&validation_delay) && !prior.is_attribute_null(&validation_delay) {
        update.delete.push("validation-delay".to_string());
    } else {
        update.validation_delay = get_optional_u64(plan, "validation_delay");
    }

    update
}

impl AcmeDnsPluginResource {
    /// Fetches the plugin and merges it into `state`
    async fn refresh(&self, plugin_id: &str, mut state: DynamicValue) -> (DynamicValue, Vec<Diagnostic>) {
        let Some(provider_data) = &self.provider_data else {
            return (state, vec![not_configured()]);
        };

        match provider_data.client.cluster().acme().plugins().get(plugin_id).await {
            Ok(plugin) => {
                apply_plugin(&mut state, plugin);
                (state, vec![])
            }
            Err(e) => (
                state,
                vec![Diagnostic::error(
                    "Unable to read ACME plugin",
                    format!("API error: {}", e),
                )],
            ),
        }
    }
}

#[async_trait]
impl Resource for AcmeDnsPluginResource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_acme_dns_plugin"
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
            schema: plugin_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: plugin_schema().validate_config(&request.config),
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let plan = &request.planned_state;
        let Ok(plugin_id) = plan.get_string(&AttributePath::new("plugin")) else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Missing plugin",
                    "The 'plugin' attribute is required",
                )],
            };
        };

        let create_request = AcmePluginCreate {
            plugin: plugin_id.clone(),
            plugin_type: "dns".to_string(),
            api: plan.get_optional_string(&AttributePath::new("api")),
            data: plugin_data(plan),
            disable: plan
                .get_optional_bool(&AttributePath::new("disable"))
                .filter(|disable| *disable)
                .map(Into::into),
            validation_delay: get_optional_u64(plan, "validation_delay"),
        };

        if let Err(e) = provider_data
            .client
            .cluster()
            .acme()
            .plugins()
            .create(&create_request)
            .await
        {
            let summary = if e.is_already_exists() {
                format!("ACME plugin '{}' already exists", plugin_id)
            } else {
                format!("Unable to create ACME plugin '{}'", plugin_id)
            };
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(summary, format!("API error: {}", e))],
            };
        }

        let (new_state, diagnostics) = self.refresh(&plugin_id, request.planned_state).await;
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

        let Ok(plugin_id) = request
            .current_state
            .get_string(&AttributePath::new("plugin"))
        else {
            return ReadResourceResponse::removed(request.private);
        };

        match provider_data
            .client
            .cluster()
            .acme()
            .plugins()
            .get(&plugin_id)
            .await
        {
            Ok(plugin) => {
                let mut new_state = request.current_state;
                apply_plugin(&mut new_state, plugin);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("ACME plugin {} no longer exists, removing from state", plugin_id);
                ReadResourceResponse::removed(request.private)
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![Diagnostic::error(
                    "Unable to read ACME plugin",
                    format!("API error: {}", e),
                )],
                private: request.private,
                deferred: None,
                new_identity: None,
            },
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![not_configured()],
                new_identity: None,
            };
        };

        let plugin_id = request
            .planned_state
            .get_optional_string(&AttributePath::new("plugin"))
            .unwrap_or_default();
        let update = plugin_update(&request.prior_state, &request.planned_state);

        if let Err(e) = provider_data
            .client
            .cluster()
            .acme()
            .plugins()
            .update(&plugin_id, &update)
            .await
        {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    format!("Unable to update ACME plugin '{}'", plugin_id),
                    format!("API error: {}", e),
                )],
                new_identity: None,
            };
        }

        let (new_state, diagnostics) = self.refresh(&plugin_id, request.planned_state).await;
        UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
            new_identity: None,
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let Ok(plugin_id) = request.prior_state.get_string(&AttributePath::new("plugin")) else {
            return DeleteResourceResponse {
                diagnostics: vec![],
            };
        };

        let diagnostics = match provider_data
            .client
            .cluster()
            .acme()
            .plugins()
            .delete(&plugin_id)
            .await
        {
            Ok(()) => vec![],
            Err(e) if e.is_not_found() => {
                tracing::warn!("ACME plugin {} already deleted", plugin_id);
                vec![]
            }
            Err(e) => vec![Diagnostic::error(
                format!("Unable to delete ACME plugin '{}'", plugin_id),
                format!("API error: {}", e),
            )],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for AcmeDnsPluginResource {
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
impl ResourceWithModifyPlan for AcmeDnsPluginResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let planned = plugin_schema().plan_changes(
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
impl ResourceWithImportState for AcmeDnsPluginResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_passthrough_id(&ctx, AttributePath::new("plugin"), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "resource_dns_plugin_test.rs"]
mod resource_dns_plugin_test;
