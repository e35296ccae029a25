//! SDN fabric data source, one type per routing protocol

use crate::resources::common::{not_configured, provider_data_from, with_pattern, SDN_ID_PATTERN};
use crate::resources::sdn::{fetch_fabric, FabricProtocol};
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

pub struct FabricDataSource {
    protocol: FabricProtocol,
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl FabricDataSource {
    pub fn new(protocol: FabricProtocol) -> Self {
        Self {
            protocol,
            provider_data: None,
        }
    }

    pub fn ospf() -> Self {
        Self::new(FabricProtocol::Ospf)
    }

    pub fn openfabric() -> Self {
        Self::new(FabricProtocol::OpenFabric)
    }
}

fn computed(name: &str, attr_type: AttributeType, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, attr_type)
        .description(description)
        .computed()
        .build()
}

fn data_source_schema(protocol: FabricProtocol) -> Schema {
    let id = with_pattern(
        AttributeBuilder::new("id", AttributeType::String)
            .description("The SDN fabric identifier")
            .required(),
        SDN_ID_PATTERN,
        "a letter followed by up to 7 letters or digits",
    );

    let builder = SchemaBuilder::new()
        .version(0)
        .description(&format!("Retrieves an {} SDN fabric", protocol.label()))
        .attribute(id.build())
        .attribute(computed(
            "state",
            AttributeType::String,
            "Pending state of the fabric",
        ))
        .attribute(computed(
            "ip_prefix",
            AttributeType::String,
            "IPv4 prefix of the fabric",
        ));

    match protocol {
        FabricProtocol::Ospf => builder
            .attribute(computed("area", AttributeType::String, "OSPF area"))
            .build(),
        FabricProtocol::OpenFabric => builder
            .attribute(computed(
                "ip6_prefix",
                AttributeType::String,
                "IPv6 prefix of the fabric",
            ))
            .attribute(computed(
                "csnp_interval",
                AttributeType::Number,
                "CSNP interval in seconds",
            ))
            .attribute(computed(
                "hello_interval",
                AttributeType::Number,
                "Hello interval in seconds",
            ))
            .build(),
    }
}

#[async_trait]
impl DataSource for FabricDataSource {
    fn type_name(&self) -> &str {
        self.protocol.fabric_type_name()
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
            schema: data_source_schema(self.protocol),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: data_source_schema(self.protocol).validate_config(&request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(request.config, not_configured());
        };

        let Ok(id) = request.config.get_string(&AttributePath::new("id")) else {
            return ReadDataSourceResponse::failed(
                request.config,
                Diagnostic::error("Missing id", "The 'id' attribute is required"),
            );
        };

        match fetch_fabric(&provider_data.client, self.protocol, &id, true).await {
            Ok(state) => ReadDataSourceResponse::from_state(state),
            Err(e) if e.is_not_found() => ReadDataSourceResponse::failed(
                request.config,
                Diagnostic::error(
                    "SDN Fabric Not Found",
                    format!("No {} SDN fabric with ID '{}' exists", self.protocol.label(), id),
                ),
            ),
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                e.into_diagnostic(&format!("Unable to read SDN fabric '{}'", id)),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for FabricDataSource {
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
    use mockito::{Matcher, Server};
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::{has_errors, ClientCapabilities, Dynamic, DynamicValue};

    async fn configured(url: &str, protocol: FabricProtocol) -> FabricDataSource {
        let mut data_source = FabricDataSource::new(protocol);
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

    fn config(id: &str) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::from([(
            "id".to_string(),
            Dynamic::String(id.to_string()),
        )])))
    }

    fn read_request(id: &str) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: String::new(),
            config: config(id),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test]
    async fn reads_pending_openfabric_fabric() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/cluster/sdn/fabrics/fabric/fab1")
            .match_query(Matcher::UrlEncoded("pending".into(), "1".into()))
            .with_status(200)
            .with_body(
                r#"{"data":{"id":"fab1","protocol":"openfabric","ip_prefix":"10.0.0.0/16",
                    "hello_interval":3,"state":"new"}}"#,
            )
            .create_async()
            .await;

        let data_source = configured(&server.url(), FabricProtocol::OpenFabric).await;
        let response = data_source.read(Context::new(), read_request("fab1")).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response
                .state
                .get_number(&AttributePath::new("hello_interval"))
                .unwrap(),
            3.0
        );
        assert_eq!(
            response.state.get_string(&AttributePath::new("state")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn missing_fabric_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/cluster/sdn/fabrics/fabric/fab1")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"data":null,"message":"fabric 'fab1' does not exist\n"}"#)
            .create_async()
            .await;

        let data_source = configured(&server.url(), FabricProtocol::Ospf).await;
        let response = data_source.read(Context::new(), read_request("fab1")).await;
        assert_eq!(response.diagnostics[0].summary, "SDN Fabric Not Found");
    }

    #[tokio::test]
    async fn protocol_mismatch_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/cluster/sdn/fabrics/fabric/fab1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":{"id":"fab1","protocol":"openfabric"}}"#)
            .create_async()
            .await;

        let data_source = configured(&server.url(), FabricProtocol::Ospf).await;
        let response = data_source.read(Context::new(), read_request("fab1")).await;
        assert_eq!(response.diagnostics[0].summary, "SDN Fabric Protocol Mismatch");
    }

    #[tokio::test]
    async fn invalid_id_fails_validation() {
        let data_source = FabricDataSource::ospf();
        let response = data_source
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: data_source.type_name().to_string(),
                    config: config("1fabric"),
                },
            )
            .await;
        assert!(has_errors(&response.diagnostics));
    }
}
