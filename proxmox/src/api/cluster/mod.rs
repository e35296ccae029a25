//! Cluster scoped endpoints

use crate::api::client::Client;

pub mod acme;
pub mod sdn;

pub struct ClusterApi<'a> {
    client: &'a Client,
}

impl<'a> ClusterApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn sdn(&self) -> sdn::SdnApi<'a> {
        sdn::SdnApi::new(self.client)
    }

    pub fn acme(&self) -> acme::AcmeApi<'a> {
        acme::AcmeApi::new(self.client)
    }
}
