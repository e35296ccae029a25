mod data_source_acme_account;
mod data_source_acme_accounts;
mod data_source_acme_plugin;
mod data_source_acme_plugins;
mod data_source_pool;
mod data_source_sdn_fabric;
mod data_source_sdn_fabric_node;
mod data_source_version;

pub use data_source_acme_account::AcmeAccountDataSource;
pub use data_source_acme_accounts::AcmeAccountsDataSource;
pub use data_source_acme_plugin::AcmePluginDataSource;
pub use data_source_acme_plugins::AcmePluginsDataSource;
pub use data_source_pool::PoolDataSource;
pub use data_source_sdn_fabric::FabricDataSource;
pub use data_source_sdn_fabric_node::FabricNodeDataSource;
pub use data_source_version::VersionDataSource;
