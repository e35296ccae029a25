//! Terraform provider for Proxmox VE
//!
//! Covers SDN fabrics, ACME, resource pools and node networking. The
//! provider builds one API client in `configure` and hands it to every
//! resource and data source as [`ProxmoxProviderData`].

pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::ProxmoxProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, DataSourceWithConfigure};
use tfplug::defaults::parse_bool;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{Resource, ResourceWithConfigure};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue, ServerCapabilities};

use data_sources::{
    AcmeAccountDataSource, AcmeAccountsDataSource, AcmePluginDataSource, AcmePluginsDataSource,
    FabricDataSource, FabricNodeDataSource, PoolDataSource, VersionDataSource,
};
use resources::{
    AcmeAccountResource, AcmeDnsPluginResource, FabricNodeResource, FabricResource,
    LinuxBridgeResource, PoolMembershipResource, PoolResource, SdnApplierResource,
};

pub const ENV_ENDPOINT: &str = "PROXMOX_ENDPOINT";
pub const ENV_API_TOKEN: &str = "PROXMOX_API_TOKEN";
pub const ENV_INSECURE: &str = "PROXMOX_INSECURE";

#[derive(Default)]
pub struct ProxmoxProvider {
    provider_data: Option<ProxmoxProviderData>,
}

impl ProxmoxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.provider_data.is_some()
    }
}

fn provider_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages Proxmox VE through its REST API")
        .attribute(
            AttributeBuilder::new("endpoint", AttributeType::String)
                .description("API endpoint, e.g. https://pve.example.com:8006. Falls back to PROXMOX_ENDPOINT")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("api_token", AttributeType::String)
                .description("API token in the form user@realm!tokenid=secret. Falls back to PROXMOX_API_TOKEN")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("insecure", AttributeType::Bool)
                .description("Skip TLS certificate verification. Falls back to PROXMOX_INSECURE")
                .optional()
                .build(),
        )
        .build()
}

/// Settings resolved from the provider block, then the environment
struct Settings {
    endpoint: Option<String>,
    api_token: Option<String>,
    insecure: bool,
}

impl Settings {
    fn resolve(config: &DynamicValue) -> Self {
        let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let endpoint = config
            .get_optional_string(&AttributePath::new("endpoint"))
            .filter(|v| !v.is_empty())
            .or_else(|| from_env(ENV_ENDPOINT));
        let api_token = config
            .get_optional_string(&AttributePath::new("api_token"))
            .filter(|v| !v.is_empty())
            .or_else(|| from_env(ENV_API_TOKEN));
        let insecure = config
            .get_optional_bool(&AttributePath::new("insecure"))
            .or_else(|| from_env(ENV_INSECURE).and_then(|v| parse_bool(&v)))
            .unwrap_or(false);

        Self {
            endpoint,
            api_token,
            insecure,
        }
    }
}

fn register_resource<R, F>(factories: &mut HashMap<String, ResourceFactory>, make: F)
where
    R: ResourceWithConfigure + 'static,
    F: Fn() -> R + Send + Sync + 'static,
{
    let type_name = make().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(move || Box::new(make()) as Box<dyn ResourceWithConfigure>),
    );
}

fn register_data_source<D, F>(factories: &mut HashMap<String, DataSourceFactory>, make: F)
where
    D: DataSourceWithConfigure + 'static,
    F: Fn() -> D + Send + Sync + 'static,
{
    let type_name = make().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(move || Box::new(make()) as Box<dyn DataSourceWithConfigure>),
    );
}

#[async_trait]
impl Provider for ProxmoxProvider {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: false,
                move_resource_state: false,
            },
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: provider_schema(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let settings = Settings::resolve(&request.config);
        let mut diagnostics = vec![];

        if settings.endpoint.is_none() {
            diagnostics.push(Diagnostic::error(
                "Missing endpoint",
                format!(
                    "endpoint is required (set it in the provider block or the {} environment variable)",
                    ENV_ENDPOINT
                ),
            ));
        }
        if settings.api_token.is_none() {
            diagnostics.push(Diagnostic::error(
                "Missing api_token",
                format!(
                    "api_token is required (set it in the provider block or the {} environment variable)",
                    ENV_API_TOKEN
                ),
            ));
        }

        let (Some(endpoint), Some(api_token)) = (settings.endpoint, settings.api_token) else {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        };

        match api::Client::new(&endpoint, &api_token, settings.insecure) {
            Ok(client) => {
                tracing::info!(
                    "Configured Proxmox VE provider for {} (insecure: {})",
                    endpoint,
                    settings.insecure
                );
                let provider_data = ProxmoxProviderData::new(client);
                self.provider_data = Some(provider_data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(provider_data.into_any()),
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to create API client",
                    format!("Failed to create API client: {}", e),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: provider_schema().validate_config(&request.config),
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources = HashMap::new();
        register_resource(&mut resources, FabricResource::ospf);
        register_resource(&mut resources, FabricResource::openfabric);
        register_resource(&mut resources, FabricNodeResource::ospf);
        register_resource(&mut resources, FabricNodeResource::openfabric);
        register_resource(&mut resources, SdnApplierResource::new);
        register_resource(&mut resources, AcmeAccountResource::new);
        register_resource(&mut resources, AcmeDnsPluginResource::new);
        register_resource(&mut resources, PoolResource::new);
        register_resource(&mut resources, PoolMembershipResource::new);
        register_resource(&mut resources, LinuxBridgeResource::new);
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources = HashMap::new();
        register_data_source(&mut data_sources, FabricDataSource::ospf);
        register_data_source(&mut data_sources, FabricDataSource::openfabric);
        register_data_source(&mut data_sources, FabricNodeDataSource::ospf);
        register_data_source(&mut data_sources, FabricNodeDataSource::openfabric);
        register_data_source(&mut data_sources, AcmeAccountDataSource::new);
        register_data_source(&mut data_sources, AcmeAccountsDataSource::new);
        register_data_source(&mut data_sources, AcmePluginDataSource::new);
        register_data_source(&mut data_sources, AcmePluginsDataSource::new);
        register_data_source(&mut data_sources, PoolDataSource::new);
        register_data_source(&mut data_sources, VersionDataSource::new);
        data_sources
    }
}
