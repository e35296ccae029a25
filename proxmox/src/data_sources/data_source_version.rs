//! Version data source

use crate::resources::common::{empty_state, not_configured, provider_data_from};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};

#[derive(Default)]
pub struct VersionDataSource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl VersionDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for VersionDataSource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_version"
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
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Retrieves API version details")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Placeholder identifier, always 'version'")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("version", AttributeType::String)
                    .description("The full pve-manager package version")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("release", AttributeType::String)
                    .description("The current Proxmox VE point release")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("repository_id", AttributeType::String)
                    .description("The short git revision the packages were built from")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(request.config, not_configured());
        };

        match provider_data.client.version().await {
            Ok(info) => {
                tracing::debug!("Proxmox VE version {} ({})", info.version, info.repoid);
                let mut state = empty_state();
                let _ = state.set_string(&AttributePath::new("id"), "version".to_string());
                let _ = state.set_string(&AttributePath::new("version"), info.version);
                let _ = state.set_string(&AttributePath::new("release"), info.release);
                let _ = state.set_string(&AttributePath::new("repository_id"), info.repoid);

                ReadDataSourceResponse::from_state(state)
            }
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                Diagnostic::error(
                    "Unable to read data source",
                    format!("Unable to retrieve the version: {}", e),
                ),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for VersionDataSource {
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
    use std::sync::Arc;
    use tfplug::types::{ClientCapabilities, DynamicValue};

    async fn configured(url: &str) -> VersionDataSource {
        let mut data_source = VersionDataSource::new();
        let client = Client::new(url, "test@pam!test=secret", true).unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(ProxmoxProviderData::new(client));
        let response = data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        data_source
    }

    fn read_request() -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: "proxmox_virtual_environment_version".to_string(),
            config: empty_state(),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test]
    async fn read_maps_repoid_to_repository_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/version")
            .with_status(200)
            .with_body(r#"{"data":{"version":"9.0.3","release":"9.0","repoid":"025864202ebb6109"}}"#)
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let response = data_source.read(Context::new(), read_request()).await;

        assert!(response.diagnostics.is_empty());
        let state: DynamicValue = response.state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "version");
        assert_eq!(state.get_string(&AttributePath::new("release")).unwrap(), "9.0");
        assert_eq!(
            state
                .get_string(&AttributePath::new("repository_id"))
                .unwrap(),
            "025864202ebb6109"
        );
    }

    #[tokio::test]
    async fn read_without_configuration_fails() {
        let data_source = VersionDataSource::new();
        let response = data_source.read(Context::new(), read_request()).await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn api_errors_are_reported() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/version")
            .with_status(401)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let response = data_source.read(Context::new(), read_request()).await;
        assert_eq!(response.diagnostics[0].summary, "Unable to read data source");
    }
}
