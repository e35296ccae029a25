//! Resource pool

use crate::api::pools::{Pool, PoolCreate, PoolUpdate};
use crate::resources::common::{not_configured, provider_data_from};
use async_trait::async_trait;
use std::collections::HashMap;
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Element type of the computed `members` list
pub(crate) fn member_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("datastore_id".to_string(), AttributeType::String),
        ("id".to_string(), AttributeType::String),
        ("node_name".to_string(), AttributeType::String),
        ("type".to_string(), AttributeType::String),
        ("vm_id".to_string(), AttributeType::Number),
    ]))
}

/// Writes `comment` and `members`; absent fields become empty values
pub(crate) fn apply_pool(state: &mut DynamicValue, pool: Pool) {
    let _ = state.set_string(
        &AttributePath::new("comment"),
        pool.comment.unwrap_or_default(),
    );

    let members = pool
        .members
        .into_iter()
        .map(|member| {
            Dynamic::Map(HashMap::from([
                (
                    "datastore_id".to_string(),
                    Dynamic::String(member.storage.unwrap_or_default()),
                ),
                ("id".to_string(), Dynamic::String(member.id)),
                (
                    "node_name".to_string(),
                    Dynamic::String(member.node.unwrap_or_default()),
                ),
                ("type".to_string(), Dynamic::String(member.member_type)),
                (
                    "vm_id".to_string(),
                    Dynamic::Number(member.vmid.unwrap_or_default() as f64),
                ),
            ]))
        })
        .collect();
    let _ = state.set_list(&AttributePath::new("members"), members);
}

fn pool_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a resource pool")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The pool ID")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("pool_id", AttributeType::String)
                .description("The pool id")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("comment", AttributeType::String)
                .description("The pool comment")
                .optional()
                .computed()
                .default(StaticDefault::string(""))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("members", AttributeType::List(Box::new(member_type())))
                .description("The pool members")
                .computed()
                .build(),
        )
        .build()
}

#[derive(Default)]
pub struct PoolResource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl PoolResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_back(&self, pool_id: &str, mut state: DynamicValue) -> (DynamicValue, Vec<Diagnostic>) {
        let Some(provider_data) = &self.provider_data else {
            return (state, vec![not_configured()]);
        };

        match provider_data.client.pools().get(pool_id).await {
            Ok(pool) => {
                let _ = state.set_string(&AttributePath::new("id"), pool_id.to_string());
                apply_pool(&mut state, pool);
                (state, vec![])
            }
            Err(e) => (
                state,
                vec![Diagnostic::error(
                    format!("Unable to read pool '{}'", pool_id),
                    format!("API error: {}", e),
                )],
            ),
        }
    }
}

#[async_trait]
impl Resource for PoolResource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_pool"
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
            schema: pool_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: pool_schema().validate_config(&request.config),
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
        let Ok(pool_id) = plan.get_string(&AttributePath::new("pool_id")) else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Missing pool_id",
                    "The 'pool_id' attribute is required",
                )],
            };
        };

        let create_request = PoolCreate {
            poolid: pool_id.clone(),
            comment: plan.get_optional_string(&AttributePath::new("comment")),
        };

        if let Err(e) = provider_data.client.pools().create(&create_request).await {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    format!("Unable to create pool '{}'", pool_id),
                    format!("API error: {}", e),
                )],
            };
        }

        let (new_state, diagnostics) = self.read_back(&pool_id, request.planned_state).await;
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

        let Ok(pool_id) = request
            .current_state
            .get_string(&AttributePath::new("pool_id"))
        else {
            return ReadResourceResponse::removed(request.private);
        };

        match provider_data.client.pools().get(&pool_id).await {
            Ok(pool) => {
                let mut new_state = request.current_state;
                let _ = new_state.set_string(&AttributePath::new("id"), pool_id);
                apply_pool(&mut new_state, pool);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Pool {} no longer exists, removing from state", pool_id);
                ReadResourceResponse::removed(request.private)
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![Diagnostic::error(
                    format!("Unable to read pool '{}'", pool_id),
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

        let pool_id = request
            .planned_state
            .get_optional_string(&AttributePath::new("pool_id"))
            .unwrap_or_default();
        let update = PoolUpdate {
            comment: Some(
                request
                    .planned_state
                    .get_optional_string(&AttributePath::new("comment"))
                    .unwrap_or_default(),
            ),
            ..Default::default()
        };

        if let Err(e) = provider_data.client.pools().update(&pool_id, &update).await {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    format!("Unable to update pool '{}'", pool_id),
                    format!("API error: {}", e),
                )],
                new_identity: None,
            };
        }

        let (new_state, diagnostics) = self.read_back(&pool_id, request.planned_state).await;
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

        let Ok(pool_id) = request.prior_state.get_string(&AttributePath::new("pool_id")) else {
            return DeleteResourceResponse {
                diagnostics: vec![],
            };
        };

        let diagnostics = match provider_data.client.pools().delete(&pool_id).await {
            Ok(()) => vec![],
            Err(e) if e.is_not_found() => {
                tracing::warn!("Pool {} already deleted", pool_id);
                vec![]
            }
            Err(e) => vec![Diagnostic::error(
                format!("Unable to delete pool '{}'", pool_id),
                format!("API error: {}", e),
            )],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for PoolResource {
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
impl ResourceWithModifyPlan for PoolResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned = pool_schema().plan_changes(
            &request.config,
            &request.prior_state,
            &request.proposed_new_state,
        );

        if !planned.planned_state.is_null() {
            if let Ok(pool_id) = request.config.get_string(&AttributePath::new("pool_id")) {
                let _ = planned
                    .planned_state
                    .set_string(&AttributePath::new("id"), pool_id);
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
impl ResourceWithImportState for PoolResource {
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
        import_state_passthrough_id(&ctx, AttributePath::new("pool_id"), &request, &mut response);
        if let Some(imported) = response.imported_resources.first_mut() {
            let _ = imported
                .state
                .set_string(&AttributePath::new("id"), request.id.clone());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use crate::ProxmoxProviderData;
    use mockito::{Matcher, Server};
    use std::any::Any;
    use std::sync::Arc;
    use tfplug::types::ClientCapabilities;

    const POOL_BODY: &str = r#"{"data":{"comment":"lab","members":[
        {"id":"qemu/100","node":"pve1","type":"qemu","vmid":100},
        {"id":"storage/pve1/local","node":"pve1","type":"storage","storage":"local"}
    ]}}"#;

    fn state(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ))
    }

    async fn configured(url: &str) -> PoolResource {
        let mut resource = PoolResource::new();
        let client = Client::new(url, "test@pam!test=secret", true).unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(ProxmoxProviderData::new(client));
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;
        resource
    }

    #[test]
    fn members_fill_missing_fields_with_empty_values() {
        let mut value = state(&[]);
        let pool: Pool = serde_json::from_str(
            r#"{"members":[{"id":"storage/pve1/local","node":"pve1","type":"storage","storage":"local"}]}"#,
        )
        .unwrap();
        apply_pool(&mut value, pool);

        assert_eq!(
            value.get_string(&AttributePath::new("comment")).unwrap(),
            ""
        );
        let members = value.get_list(&AttributePath::new("members")).unwrap();
        let Dynamic::Map(member) = &members[0] else {
            panic!("member is not an object");
        };
        assert_eq!(member["vm_id"], Dynamic::Number(0.0));
        assert_eq!(member["datastore_id"], Dynamic::String("local".into()));
    }

    #[tokio::test]
    async fn create_then_reads_members() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api2/json/pools")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("poolid".into(), "tank".into()),
                Matcher::UrlEncoded("comment".into(), "lab".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;
        let _read = server
            .mock("GET", "/api2/json/pools/tank")
            .with_status(200)
            .with_body(POOL_BODY)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let planned = state(&[
            ("id", Dynamic::String("tank".into())),
            ("pool_id", Dynamic::String("tank".into())),
            ("comment", Dynamic::String("lab".into())),
            ("members", Dynamic::Unknown),
        ]);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        create.assert_async().await;
        assert_eq!(
            response
                .new_state
                .get_list(&AttributePath::new("members"))
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn read_of_missing_pool_removes_it() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/pools/tank")
            .with_status(500)
            .with_body(r#"{"data":null,"message":"pool 'tank' does not exist\n"}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: resource.type_name().to_string(),
                    current_state: state(&[("pool_id", Dynamic::String("tank".into()))]),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                    current_identity: None,
                },
            )
            .await;

        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_sets_pool_id() {
        let resource = PoolResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: resource.type_name().to_string(),
                    id: "tank".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;

        let imported = &response.imported_resources[0].state;
        assert_eq!(
            imported.get_string(&AttributePath::new("pool_id")).unwrap(),
            "tank"
        );
        assert_eq!(imported.get_string(&AttributePath::new("id")).unwrap(), "tank");
    }
}
