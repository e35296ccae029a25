//! ACME account resource
//!
//! Registration, contact updates and deactivation each run as a task on
//! the node; the client waits for those tasks before the state is written.

use crate::api::cluster::acme::{AcmeAccount, AcmeAccountCreate};
use crate::api::ApiError;
use crate::resources::common::{not_configured, provider_data_from, with_pattern};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::RequiresReplace;
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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

const DEFAULT_ACCOUNT_NAME: &str = "default";

#[derive(Default)]
pub struct AcmeAccountResource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl AcmeAccountResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn account_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages an ACME account in a Proxmox VE cluster. Requires root@pam.")
        .attribute(
            AttributeBuilder::new("contact", AttributeType::String)
                .description("Contact email address")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("created_at", AttributeType::String)
                .description("Timestamp of the account registration")
                .computed()
                .build(),
        )
        .attribute(
            with_pattern(
                AttributeBuilder::new("directory", AttributeType::String)
                    .description("URL of the ACME CA directory endpoint")
                    .optional(),
                r"^https?://.*$",
                "a valid URL",
            )
            .build(),
        )
        .attribute(
            AttributeBuilder::new("eab_hmac_key", AttributeType::String)
                .description("HMAC key for External Account Binding")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("eab_kid", AttributeType::String)
                .description("Key identifier for External Account Binding")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("location", AttributeType::String)
                .description("Location of the account at the CA")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("ACME account config file name")
                .optional()
                .computed()
                .default(StaticDefault::string(DEFAULT_ACCOUNT_NAME))
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tos", AttributeType::String)
                .description("URL of the CA terms of service; setting it indicates agreement")
                .optional()
                .build(),
        )
        .build()
}

fn account_name(value: &DynamicValue) -> String {
    value
        .get_optional_string(&AttributePath::new("name"))
        .unwrap_or_else(|| DEFAULT_ACCOUNT_NAME.to_string())
}

/// Copies the server's view onto `state`; EAB credentials are never returned and stay as planned
fn apply_account(state: &mut DynamicValue, account: &AcmeAccount) {
    let _ = state.set_string(
        &AttributePath::new("contact"),
        account.primary_contact().unwrap_or_default(),
    );
    let _ = state.set_optional_string(&AttributePath::new("directory"), account.directory.clone());
    let _ = state.set_optional_string(&AttributePath::new("tos"), account.tos.clone());
    let _ = state.set_optional_string(&AttributePath::new("location"), account.location.clone());
    let _ = state.set_optional_string(
        &AttributePath::new("created_at"),
        account.account.created_at.clone(),
    );
}

impl AcmeAccountResource {
    /// Reads the account, `Ok(None)` when it does not exist
    async fn read_account(&self, name: &str) -> Result<Option<AcmeAccount>, Diagnostic> {
        let provider_data = self.provider_data.as_ref().ok_or_else(not_configured)?;

        match provider_data.client.cluster().acme().accounts().get(name).await {
            Ok(account) => Ok(Some(account)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(Diagnostic::error(
                format!("Unable to read ACME account '{}'", name),
                format!("API error: {}", e),
            )),
        }
    }

    /// Reads back after a write; a missing account is an error here
    async fn read_back(&self, mut state: DynamicValue) -> (DynamicValue, Vec<Diagnostic>) {
        let name = account_name(&state);
        match self.read_account(&name).await {
            Ok(Some(account)) => {
                let _ = state.set_string(&AttributePath::new("name"), name);
                apply_account(&mut state, &account);
                (state, vec![])
            }
            Ok(None) => (
                state,
                vec![Diagnostic::error(
                    format!("ACME account '{}' not found after update", name),
                    "Failed to find ACME account when trying to read back the updated ACME account's data.",
                )],
            ),
            Err(diag) => (state, vec![diag]),
        }
    }
}

fn create_error(name: &str, error: &ApiError) -> Diagnostic {
    if error.is_already_exists() {
        Diagnostic::error(
            format!("ACME account '{}' already exists", name),
            format!("API error: {}", error),
        )
    } else {
        Diagnostic::error(
            format!("Unable to create ACME account '{}'", name),
            format!("API error: {}", error),
        )
    }
}

#[async_trait]
impl Resource for AcmeAccountResource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_acme_account"
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
            schema: account_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: account_schema().validate_config(&request.config),
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

        let plan = &request.planned_state;
        let name = account_name(plan);
        let Ok(contact) = plan.get_string(&AttributePath::new("contact")) else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Missing contact",
                    "The 'contact' attribute is required",
                )],
            };
        };

        let create_request = AcmeAccountCreate {
            name: name.clone(),
            contact,
            directory: plan.get_optional_string(&AttributePath::new("directory")),
            eab_hmac_key: plan.get_optional_string(&AttributePath::new("eab_hmac_key")),
            eab_kid: plan.get_optional_string(&AttributePath::new("eab_kid")),
            tos: plan.get_optional_string(&AttributePath::new("tos")),
        };

        if let Err(e) = provider_data
            .client
            .cluster()
            .acme()
            .accounts()
            .create(&ctx, &create_request)
            .await
        {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![create_error(&name, &e)],
            };
        }

        let (new_state, diagnostics) = self.read_back(request.planned_state).await;
        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let name = account_name(&request.current_state);

        match self.read_account(&name).await {
            Ok(Some(account)) => {
                let mut new_state = request.current_state;
                let _ = new_state.set_string(&AttributePath::new("name"), name);
                apply_account(&mut new_state, &account);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
            Ok(None) => {
                tracing::warn!("ACME account {} no longer exists, removing from state", name);
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

        let name = account_name(&request.planned_state);
        let contact = request
            .planned_state
            .get_optional_string(&AttributePath::new("contact"))
            .unwrap_or_default();

        if let Err(e) = provider_data
            .client
            .cluster()
            .acme()
            .accounts()
            .update(&ctx, &name, &contact)
            .await
        {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    format!("Unable to update ACME account '{}'", name),
                    format!("API error: {}", e),
                )],
                new_identity: None,
            };
        }

        let (new_state, diagnostics) = self.read_back(request.planned_state).await;
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

        let name = account_name(&request.prior_state);
        let diagnostics = match provider_data
            .client
            .cluster()
            .acme()
            .accounts()
            .delete(&ctx, &name)
            .await
        {
            Ok(()) => vec![],
            Err(e) if e.is_not_found() => {
                tracing::warn!("ACME account {} already deregistered", name);
                vec![]
            }
            Err(e) => vec![Diagnostic::error(
                format!("Unable to delete ACME account '{}'", name),
                format!("API error: {}", e),
            )],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for AcmeAccountResource {
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
impl ResourceWithModifyPlan for AcmeAccountResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let planned = account_schema().plan_changes(
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
impl ResourceWithImportState for AcmeAccountResource {
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
        import_state_passthrough_id(&ctx, AttributePath::new("name"), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "resource_account_test.rs"]
mod resource_account_test;
