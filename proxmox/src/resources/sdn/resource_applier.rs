//! Applies staged SDN configuration cluster wide

use crate::api::nodes::TaskWaitOptions;
use crate::api::{ApiError, Client};
use crate::resources::common::{empty_state, not_configured, provider_data_from};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

#[derive(Default)]
pub struct SdnApplierResource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl SdnApplierResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the apply and waits for the reload task when the server starts one
    async fn apply(&self, ctx: &Context) -> Result<DynamicValue, Diagnostic> {
        let provider_data = self.provider_data.as_ref().ok_or_else(not_configured)?;

        apply_and_wait(ctx, &provider_data.client)
            .await
            .map_err(|e| {
                Diagnostic::error(
                    "Unable to Apply SDN Configuration",
                    format!("API error: {}", e),
                )
            })?;

        let mut state = empty_state();
        let _ = state.set_string(
            &AttributePath::new("id"),
            chrono::Utc::now().timestamp_millis().to_string(),
        );
        Ok(state)
    }
}

async fn apply_and_wait(ctx: &Context, client: &Client) -> Result<(), ApiError> {
    if let Some(upid) = client.cluster().sdn().apply().await? {
        client
            .nodes()
            .tasks()
            .wait_for_task(ctx, &upid, &TaskWaitOptions::default())
            .await?;
    }
    Ok(())
}

fn applier_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description(
            "Applies pending SDN configuration cluster wide. Pair with replace_triggered_by \
             so it runs after SDN objects change.",
        )
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("Unix time in milliseconds of the last apply")
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for SdnApplierResource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_sdn_applier"
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
            schema: applier_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: applier_schema().validate_config(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.apply(&ctx).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![],
            private: request.private,
            deferred: None,
            new_identity: None,
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self.apply(&ctx).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
                new_identity: None,
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![diag],
                new_identity: None,
            },
        }
    }

    async fn delete(&self, ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: self.apply(&ctx).await.err().into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for SdnApplierResource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProxmoxProviderData;
    use mockito::Server;
    use std::any::Any;
    use std::sync::Arc;

    const UPID: &str = "UPID:pve1:00001234:00005678:6710ABCD:reloadnetworkall::root@pam:";

    async fn configured(url: &str) -> SdnApplierResource {
        let mut resource = SdnApplierResource::new();
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

    #[tokio::test]
    async fn create_applies_and_waits_for_reload() {
        let mut server = Server::new_async().await;
        let apply = server
            .mock("PUT", "/api2/json/cluster/sdn")
            .with_status(200)
            .with_body(format!(r#"{{"data":"{}"}}"#, UPID))
            .create_async()
            .await;
        let status = server
            .mock(
                "GET",
                format!("/api2/json/nodes/pve1/tasks/{}/status", urlencoding::encode(UPID)).as_str(),
            )
            .with_status(200)
            .with_body(r#"{"data":{"status":"stopped","exitstatus":"OK"}}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    planned_state: DynamicValue::unknown(),
                    config: empty_state(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        apply.assert_async().await;
        status.assert_async().await;
        let id = response
            .new_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        assert!(id.parse::<i64>().unwrap() > 0);
    }

    #[tokio::test]
    async fn failed_apply_is_reported() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("PUT", "/api2/json/cluster/sdn")
            .with_status(500)
            .with_body(r#"{"data":null,"message":"pending configuration is invalid"}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: empty_state(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "Unable to Apply SDN Configuration"
        );
    }
}
