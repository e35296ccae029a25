//! Resource pool data source

use crate::resources::common::{not_configured, provider_data_from};
use crate::resources::pools::{apply_pool, member_type};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};

#[derive(Default)]
pub struct PoolDataSource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl PoolDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn data_source_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Retrieves a resource pool and its members")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The pool identifier")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("pool_id", AttributeType::String)
                .description("The pool to read")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("comment", AttributeType::String)
                .description("The pool comment")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("members", AttributeType::List(Box::new(member_type())))
                .description("Guests and storages in the pool")
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl DataSource for PoolDataSource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_pool"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: data_source_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: data_source_schema().validate_config(&request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut state = request.config;
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(state, not_configured());
        };

        let Ok(pool_id) = state.get_string(&AttributePath::new("pool_id")) else {
            return ReadDataSourceResponse::failed(
                state,
                Diagnostic::error("Missing pool_id", "The 'pool_id' attribute is required"),
            );
        };

        match provider_data.client.pools().get(&pool_id).await {
            Ok(pool) => {
                let _ = state.set_string(&AttributePath::new("id"), pool_id);
                apply_pool(&mut state, pool);
                ReadDataSourceResponse::from_state(state)
            }
            Err(e) => ReadDataSourceResponse::failed(
                state,
                Diagnostic::error(
                    format!("Unable to read pool '{}'", pool_id),
                    format!("API error: {}", e),
                ),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for PoolDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let (provider_data, diagnostics) = provider_data_from(request.provider_data);
        self.provider_data = provider_data;
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use crate::ProxmoxProviderData;
    use mockito::Server;
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};

    async fn configured(url: &str) -> PoolDataSource {
        let mut data_source = PoolDataSource::new();
        let client = Client::new(url, "test@pam!test=secret", true).unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(ProxmoxProviderData::new(client));
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;
        data_source
    }

    fn read_request(pool_id: &str) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: "proxmox_virtual_environment_pool".to_string(),
            config: DynamicValue::new(Dynamic::Map(HashMap::from([(
                "pool_id".to_string(),
                Dynamic::String(pool_id.to_string()),
            )]))),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test]
    async fn reads_members() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/pools/tank")
            .with_status(200)
            .with_body(
                r#"{"data":{"members":[
                    {"id":"qemu/100","node":"pve1","type":"qemu","vmid":100},
                    {"id":"storage/pve1/local","node":"pve1","type":"storage","storage":"local"}
                ]}}"#,
            )
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let response = data_source.read(Context::new(), read_request("tank")).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "tank");
        assert_eq!(state.get_string(&AttributePath::new("comment")).unwrap(), "");
        let members = state.get_list(&AttributePath::new("members")).unwrap();
        assert_eq!(members.len(), 2);
        let Dynamic::Map(storage) = &members[1] else {
            panic!("member is not an object");
        };
        assert_eq!(storage["datastore_id"], Dynamic::String("local".into()));
        assert_eq!(storage["vm_id"], Dynamic::Number(0.0));
    }

    #[tokio::test]
    async fn missing_pool_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/pools/nope")
            .with_status(500)
            .with_body(r#"{"data":null,"message":"pool 'nope' does not exist\n"}"#)
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let response = data_source.read(Context::new(), read_request("nope")).await;
        assert_eq!(response.diagnostics[0].summary, "Unable to read pool 'nope'");
    }
}
