//! ACME accounts data source

use crate::resources::common::{not_configured, provider_data_from};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};

#[derive(Default)]
pub struct AcmeAccountsDataSource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl AcmeAccountsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for AcmeAccountsDataSource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_acme_accounts"
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
            .description("Retrieves the list of registered ACME accounts")
            .attribute(
                AttributeBuilder::new("accounts", AttributeType::Set(Box::new(AttributeType::String)))
                    .description("The names of the ACME accounts")
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

        match provider_data.client.cluster().acme().accounts().list().await {
            Ok(accounts) => {
                let mut names: Vec<String> = accounts.into_iter().map(|a| a.name).collect();
                names.sort();
                let _ = state.set_list(
                    &AttributePath::new("accounts"),
                    names.into_iter().map(Dynamic::String).collect(),
                );
                ReadDataSourceResponse::from_state(state)
            }
            Err(e) => ReadDataSourceResponse::failed(
                state,
                Diagnostic::error(
                    "Unable to read data source",
                    format!("Unable to list ACME accounts: {}", e),
                ),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AcmeAccountsDataSource {
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
