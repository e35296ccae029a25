//! SDN fabric node data source, one type per routing protocol

use crate::resources::common::{not_configured, provider_data_from, with_pattern, SDN_ID_PATTERN};
use crate::resources::sdn::{fabric_node_id, fetch_fabric_node, FabricProtocol};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

pub struct FabricNodeDataSource {
    protocol: FabricProtocol,
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl FabricNodeDataSource {
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

fn data_source_schema(protocol: FabricProtocol) -> Schema {
    let fabric_id = with_pattern(
        AttributeBuilder::new("fabric_id", AttributeType::String)
            .description("The SDN fabric the node belongs to")
            .required(),
        SDN_ID_PATTERN,
        "a letter followed by up to 7 letters or digits",
    );

    let builder = SchemaBuilder::new()
        .version(0)
        .description(&format!("Retrieves a node of an {} SDN fabric", protocol.label()))
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The fabric node ID, <fabric_id>/<node_id>")
                .computed()
                .build(),
        )
        .attribute(fabric_id.build())
        .attribute(
            AttributeBuilder::new("node_id", AttributeType::String)
                .description("The cluster node name")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "interface_names",
                AttributeType::Set(Box::new(AttributeType::String)),
            )
            .description("Interfaces of the node that take part in the fabric")
            .computed()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("state", AttributeType::String)
                .description("Pending state of the node")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("ip", AttributeType::String)
                .description("IPv4 address of the node")
                .computed()
                .build(),
        );

    match protocol {
        FabricProtocol::Ospf => builder.build(),
        FabricProtocol::OpenFabric => builder
            .attribute(
                AttributeBuilder::new("ip6", AttributeType::String)
                    .description("IPv6 address of the node")
                    .computed()
                    .build(),
            )
            .build(),
    }
}

fn required_string(config: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    config.get_string(&AttributePath::new(name)).map_err(|_| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
    })
}

#[async_trait]
impl DataSource for FabricNodeDataSource {
    fn type_name(&self) -> &str {
        self.protocol.node_type_name()
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

        let ids = required_string(&request.config, "fabric_id")
            .and_then(|fabric_id| Ok((fabric_id, required_string(&request.config, "node_id")?)));
        let (fabric_id, node_id) = match ids {
            Ok(ids) => ids,
            Err(diag) => return ReadDataSourceResponse::failed(request.config, diag),
        };
        let id = fabric_node_id(&fabric_id, &node_id);

        match fetch_fabric_node(&provider_data.client, self.protocol, &fabric_id, &node_id, true)
            .await
        {
            Ok(state) => ReadDataSourceResponse::from_state(state),
            Err(e) if e.is_not_found() => ReadDataSourceResponse::failed(
                request.config,
                Diagnostic::error(
                    "SDN Fabric Node Not Found",
                    format!("No {} SDN fabric node '{}' exists", self.protocol.label(), id),
                ),
            ),
            Err(e) => ReadDataSourceResponse::failed(
                request.config,
                e.into_diagnostic(&format!("Unable to read SDN fabric node '{}'", id)),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for FabricNodeDataSource {
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
