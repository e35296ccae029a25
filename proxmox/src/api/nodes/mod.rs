//! Nodes API module for node scoped endpoints

use crate::api::client::Client;

mod network;
mod tasks;

pub use network::{NetworkApi, NetworkInterface, NetworkInterfaceRequest};
pub use tasks::{parse_upid_node, TaskStatus, TaskWaitOptions, TasksApi};

pub struct NodesApi<'a> {
    client: &'a Client,
}

impl<'a> NodesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn network(&self, node: &str) -> NetworkApi<'a> {
        NetworkApi::new(self.client, node)
    }

    /// Task polling; the node is taken from each UPID
    pub fn tasks(&self) -> TasksApi<'a> {
        TasksApi::new(self.client)
    }
}
