//! Single ACME plugin data source

use super::data_source_acme_plugins::{plugin_attribute_types, plugin_attributes};
use crate::resources::common::{not_configured, provider_data_from};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};

#[derive(Default)]
pub struct AcmePluginDataSource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl AcmePluginDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn data_source_schema() -> Schema {
    let mut attributes: Vec<_> = plugin_attribute_types().into_iter().collect();
    attributes.sort_by(|a, b| a.0.cmp(&b.0));

    attributes
        .into_iter()
        .fold(
            SchemaBuilder::new()
                .version(0)
                .description("Retrieves a single ACME plugin"),
            |builder, (name, attribute_type)| {
                let attribute = AttributeBuilder::new(&name, attribute_type);
                let attribute = if name == "plugin" {
                    attribute.description("ACME plugin ID name").required()
                } else {
                    attribute.computed()
                };
                builder.attribute(attribute.build())
            },
        )
        .build()
}

#[async_trait]
impl DataSource for AcmePluginDataSource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_acme_plugin"
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

        let Ok(id) = state.get_string(&AttributePath::new("plugin")) else {
            return ReadDataSourceResponse::failed(
                state,
                Diagnostic::error("Missing plugin", "The 'plugin' attribute is required"),
            );
        };

        match provider_data.client.cluster().acme().plugins().get(&id).await {
            Ok(plugin) => {
                for (name, value) in plugin_attributes(plugin) {
                    let _ = state.set_value_at(&AttributePath::new(&name), value);
                }
                ReadDataSourceResponse::from_state(state)
            }
            Err(e) => ReadDataSourceResponse::failed(
                state,
                Diagnostic::error("Unable to read ACME plugin", e.to_string()),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AcmePluginDataSource {
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
