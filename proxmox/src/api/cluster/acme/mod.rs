//! ACME accounts and challenge plugins

use crate::api::client::Client;

mod account;
mod plugins;

pub use account::{
    AcmeAccount, AcmeAccountCreate, AcmeAccountDetails, AcmeAccountListEntry, AcmeAccountsApi,
};
pub use plugins::{AcmePlugin, AcmePluginCreate, AcmePluginUpdate, AcmePluginsApi, PluginData};

pub struct AcmeApi<'a> {
    client: &'a Client,
}

impl<'a> AcmeApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn accounts(&self) -> AcmeAccountsApi<'a> {
        AcmeAccountsApi::new(self.client)
    }

    pub fn plugins(&self) -> AcmePluginsApi<'a> {
        AcmePluginsApi::new(self.client)
    }
}
