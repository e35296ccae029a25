//! ACME plugin list data source

use crate::api::cluster::acme::AcmePlugin;
use crate::resources::common::{not_configured, provider_data_from};
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};

/// Attribute types shared by the plugin list entries and the single plugin read
pub(super) fn plugin_attribute_types() -> HashMap<String, AttributeType> {
    HashMap::from([
        ("api".to_string(), AttributeType::String),
        (
            "data".to_string(),
            AttributeType::Map(Box::new(AttributeType::String)),
        ),
        ("digest".to_string(), AttributeType::String),
        ("plugin".to_string(), AttributeType::String),
        ("type".to_string(), AttributeType::String),
        ("validation_delay".to_string(), AttributeType::Number),
    ])
}

/// Absent fields are null
pub(super) fn plugin_attributes(plugin: AcmePlugin) -> HashMap<String, Dynamic> {
    let data = plugin.data.map_or(Dynamic::Null, |data| {
        Dynamic::Map(
            data.0
                .into_iter()
                .map(|(k, v)| (k, Dynamic::String(v)))
                .collect(),
        )
    });

    HashMap::from([
        (
            "api".to_string(),
            plugin.api.map_or(Dynamic::Null, Dynamic::String),
        ),
        ("data".to_string(), data),
        (
            "digest".to_string(),
            plugin.digest.map_or(Dynamic::Null, Dynamic::String),
        ),
        ("plugin".to_string(), Dynamic::String(plugin.plugin)),
        ("type".to_string(), Dynamic::String(plugin.plugin_type)),
        (
            "validation_delay".to_string(),
            plugin
                .validation_delay
                .map_or(Dynamic::Null, |v| Dynamic::Number(v as f64)),
        ),
    ])
}

#[derive(Default)]
pub struct AcmePluginsDataSource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl AcmePluginsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for AcmePluginsDataSource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_acme_plugins"
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
            .description("Retrieves the list of ACME plugins")
            .attribute(
                AttributeBuilder::new(
                    "plugins",
                    AttributeType::List(Box::new(AttributeType::Object(plugin_attribute_types()))),
                )
                .description("The configured ACME plugins, ordered by plugin id")
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
        let mut state = request.config;
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(state, not_configured());
        };

        match provider_data.client.cluster().acme().plugins().list().await {
            Ok(mut plugins) => {
                plugins.sort_by(|a, b| a.plugin.cmp(&b.plugin));
                let _ = state.set_list(
                    &AttributePath::new("plugins"),
                    plugins
                        .into_iter()
                        .map(|plugin| Dynamic::Map(plugin_attributes(plugin)))
                        .collect(),
                );
                ReadDataSourceResponse::from_state(state)
            }
            Err(e) => ReadDataSourceResponse::failed(
                state,
                Diagnostic::error("Unable to read ACME plugins", e.to_string()),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AcmePluginsDataSource {
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
    use crate::resources::common::empty_state;
    use crate::ProxmoxProviderData;
    use mockito::Server;
    use std::any::Any;
    use std::sync::Arc;
    use tfplug::types::ClientCapabilities;

    #[tokio::test]
    async fn lists_plugins_with_data() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/cluster/acme/plugins")
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"plugin":"standalone","type":"standalone"},
                    {"plugin":"cf","type":"dns","api":"cf","data":"CF_Token=abc\nCF_Account_ID=42","digest":"d1","validation-delay":60}
                ]}"#,
            )
            .create_async()
            .await;

        let mut data_source = AcmePluginsDataSource::new();
        let client = Client::new(&server.url(), "test@pam!test=secret", true).unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(ProxmoxProviderData::new(client));
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: data_source.type_name().to_string(),
                    config: empty_state(),
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let plugins = response
            .state
            .get_list(&AttributePath::new("plugins"))
            .unwrap();
        assert_eq!(plugins.len(), 2);

        let Dynamic::Map(cf) = &plugins[0] else {
            panic!("plugin is not an object");
        };
        assert_eq!(cf["plugin"], Dynamic::String("cf".into()));
        assert_eq!(cf["validation_delay"], Dynamic::Number(60.0));
        let Dynamic::Map(data) = &cf["data"] else {
            panic!("data is not a map");
        };
        assert_eq!(data["CF_Token"], Dynamic::String("abc".into()));
        assert_eq!(data["CF_Account_ID"], Dynamic::String("42".into()));

        let Dynamic::Map(standalone) = &plugins[1] else {
            panic!("plugin is not an object");
        };
        assert_eq!(standalone["type"], Dynamic::String("standalone".into()));
        assert_eq!(standalone["data"], Dynamic::Null);
    }
}
