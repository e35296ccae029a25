//! SDN fabric nodes, scoped to one fabric

use super::get_sdn_object;
use crate::api::common::comma_list;
use crate::api::{error::ApiError, Client};
use serde::{Deserialize, Serialize};

const NODE_PATH: &str = "/api2/json/cluster/sdn/fabrics/node";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FabricNodeData {
    pub node_id: String,
    pub fabric_id: Option<String>,
    pub protocol: Option<String>,
    pub state: Option<String>,
    pub ip: Option<String>,
    pub ip6: Option<String>,
    /// Property strings such as `name=eth0`
    #[serde(default)]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FabricNode {
    pub node_id: String,
    pub fabric_id: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip6: Option<String>,
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FabricNodeUpdate {
    #[serde(flatten)]
    pub node: FabricNode,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "comma_list::serialize"
    )]
    pub delete: Vec<String>,
}

pub struct FabricNodesApi<'a> {
    client: &'a Client,
    fabric_id: String,
    protocol: String,
}

impl<'a> FabricNodesApi<'a> {
    pub fn new(client: &'a Client, fabric_id: &str, protocol: &str) -> Self {
        Self {
            client,
            fabric_id: fabric_id.to_string(),
            protocol: protocol.to_string(),
        }
    }

    fn fabric_path(&self) -> String {
        format!("{}/{}", NODE_PATH, urlencoding::encode(&self.fabric_id))
    }

    fn node_path(&self, node_id: &str) -> String {
        format!("{}/{}", self.fabric_path(), urlencoding::encode(node_id))
    }

    /// GET /api2/json/cluster/sdn/fabrics/node/{fabric_id}/{node_id}
    pub async fn get(&self, node_id: &str, pending: bool) -> Result<FabricNodeData, ApiError> {
        get_sdn_object(self.client, &self.node_path(node_id), pending).await
    }

    /// POST /api2/json/cluster/sdn/fabrics/node/{fabric_id}
    pub async fn create(&self, node: &FabricNode) -> Result<(), ApiError> {
        let body = FabricNode {
            fabric_id: self.fabric_id.clone(),
            protocol: self.protocol.clone(),
            ..node.clone()
        };
        let _: Option<serde_json::Value> = self.client.post(&self.fabric_path(), &body).await?;
        tracing::info!("Created SDN fabric node {}/{}", self.fabric_id, body.node_id);
        Ok(())
    }

    /// PUT /api2/json/cluster/sdn/fabrics/node/{fabric_id}/{node_id}
    pub async fn update(&self, update: &FabricNodeUpdate) -> Result<(), ApiError> {
        let mut body = update.clone();
        body.node.fabric_id = self.fabric_id.clone();
        body.node.protocol = self.protocol.clone();
        let path = self.node_path(&body.node.node_id);
        let _: Option<serde_json::Value> = self.client.put(&path, &body).await?;
        tracing::info!("Updated SDN fabric node {}/{}", self.fabric_id, body.node.node_id);
        Ok(())
    }

    /// DELETE /api2/json/cluster/sdn/fabrics/node/{fabric_id}/{node_id}
    pub async fn delete(&self, node_id: &str) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.client.delete(&self.node_path(node_id)).await?;
        tracing::info!("Deleted SDN fabric node {}/{}", self.fabric_id, node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::cluster::sdn::PROTOCOL_OSPF;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn create_posts_under_fabric() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api2/json/cluster/sdn/fabrics/node/fab1")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("node_id".into(), "pve1".into()),
                Matcher::UrlEncoded("fabric_id".into(), "fab1".into()),
                Matcher::UrlEncoded("protocol".into(), "ospf".into()),
                Matcher::UrlEncoded("ip".into(), "10.0.0.1".into()),
                Matcher::UrlEncoded("interfaces".into(), "name=ens19".into()),
                Matcher::UrlEncoded("interfaces".into(), "name=ens20".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let node = FabricNode {
            node_id: "pve1".to_string(),
            ip: Some("10.0.0.1".to_string()),
            interfaces: vec!["name=ens19".to_string(), "name=ens20".to_string()],
            ..Default::default()
        };
        client
            .cluster()
            .sdn()
            .fabric_nodes("fab1", PROTOCOL_OSPF)
            .create(&node)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_stamps_fabric_and_protocol() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api2/json/cluster/sdn/fabrics/node/fab1/pve1")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("fabric_id".into(), "fab1".into()),
                Matcher::UrlEncoded("protocol".into(), "ospf".into()),
                Matcher::UrlEncoded("delete".into(), "ip6".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let update = FabricNodeUpdate {
            node: FabricNode {
                node_id: "pve1".to_string(),
                ip: Some("10.0.0.1".to_string()),
                interfaces: vec!["name=ens19".to_string()],
                ..Default::default()
            },
            delete: vec!["ip6".to_string()],
        };
        client
            .cluster()
            .sdn()
            .fabric_nodes("fab1", PROTOCOL_OSPF)
            .update(&update)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_reads_interfaces() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/cluster/sdn/fabrics/node/fab1/pve1")
            .with_status(200)
            .with_body(
                r#"{"data":{"node_id":"pve1","fabric_id":"fab1","protocol":"ospf",
                    "ip":"10.0.0.1","interfaces":["name=ens19"]}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let node = client
            .cluster()
            .sdn()
            .fabric_nodes("fab1", PROTOCOL_OSPF)
            .get("pve1", false)
            .await
            .unwrap();

        assert_eq!(node.interfaces, vec!["name=ens19".to_string()]);
        assert_eq!(node.protocol.as_deref(), Some("ospf"));
    }
}
