//! ACME account and DNS challenge plugin resources

mod resource_account;
mod resource_dns_plugin;

pub use resource_account::AcmeAccountResource;
pub use resource_dns_plugin::AcmeDnsPluginResource;
