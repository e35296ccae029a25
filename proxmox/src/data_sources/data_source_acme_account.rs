//! Single ACME account data source

use crate::api::cluster::acme::AcmeAccount;
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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

#[derive(Default)]
pub struct AcmeAccountDataSource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl AcmeAccountDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn data_source_schema() -> Schema {
    let account_type = AttributeType::Object(HashMap::from([
        (
            "contact".to_string(),
            AttributeType::List(Box::new(AttributeType::String)),
        ),
        ("created_at".to_string(), AttributeType::String),
        ("status".to_string(), AttributeType::String),
    ]));

    SchemaBuilder::new()
        .version(0)
        .description("Retrieves information about a specific ACME account")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("The ACME account config file name")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("account", account_type)
                .description("Contacts, creation time and status ('valid', 'deactivated' or 'revoked')")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("directory", AttributeType::String)
                .description("The directory URL of the ACME account")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("location", AttributeType::String)
                .description("The location URL of the ACME account")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tos", AttributeType::String)
                .description("The terms of service URL of the ACME account")
                .computed()
                .build(),
        )
        .build()
}

fn apply_account(state: &mut DynamicValue, account: AcmeAccount) {
    let details = account.account;
    let _ = state.set_map(
        &AttributePath::new("account"),
        HashMap::from([
            (
                "contact".to_string(),
                Dynamic::List(details.contact.into_iter().map(Dynamic::String).collect()),
            ),
            (
                "created_at".to_string(),
                details.created_at.map_or(Dynamic::Null, Dynamic::String),
            ),
            (
                "status".to_string(),
                details.status.map_or(Dynamic::Null, Dynamic::String),
            ),
        ]),
    );
    let _ = state.set_optional_string(&AttributePath::new("directory"), account.directory);
    let _ = state.set_optional_string(&AttributePath::new("location"), account.location);
    let _ = state.set_optional_string(&AttributePath::new("tos"), account.tos);
}

#[async_trait]
impl DataSource for AcmeAccountDataSource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_acme_account"
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

        let Ok(name) = state.get_string(&AttributePath::new("name")) else {
            return ReadDataSourceResponse::failed(
                state,
                Diagnostic::error("Missing name", "The 'name' attribute is required"),
            );
        };

        match provider_data.client.cluster().acme().accounts().get(&name).await {
            Ok(account) => {
                apply_account(&mut state, account);
                ReadDataSourceResponse::from_state(state)
            }
            Err(e) => ReadDataSourceResponse::failed(
                state,
                Diagnostic::error(
                    format!("Unable to read ACME account '{}'", name),
                    e.to_string(),
                ),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AcmeAccountDataSource {
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
