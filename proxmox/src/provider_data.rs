//! Shared API client handed from the provider to each resource and data source

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

/// Cloned into every resource and data source; clones share one client,
/// its connection statistics and its network reload lock
#[derive(Clone)]
pub struct ProxmoxProviderData {
    pub client: Arc<Client>,
}

impl ProxmoxProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Wraps the data for `ConfigureResourceRequest::provider_data`
    pub fn into_any(self) -> Arc<dyn Any + Send + Sync> {
        Arc::new(self)
    }
}

/// Extracts the provider data handed over by `configure`.
///
/// Terraform may call configure before the provider itself is configured;
/// that case yields no data and no diagnostics.
pub(crate) fn provider_data_from(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> (Option<ProxmoxProviderData>, Vec<Diagnostic>) {
    let Some(data) = provider_data else {
        return (None, vec![]);
    };

    match data.downcast_ref::<ProxmoxProviderData>() {
        Some(provider_data) => (Some(provider_data.clone()), vec![]),
        None => (
            None,
            vec![Diagnostic::error(
                "Invalid provider data",
                "Failed to extract ProxmoxProviderData from provider data",
            )],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_data_shares_the_client() {
        let data = ProxmoxProviderData::new(
            Client::new("https://pve.example.com:8006", "test@pam!test=secret", true).unwrap(),
        );
        let (extracted, diagnostics) = provider_data_from(Some(data.clone().into_any()));

        assert!(diagnostics.is_empty());
        let extracted = extracted.unwrap();
        assert!(Arc::ptr_eq(&extracted.client, &data.client));
    }

    #[test]
    fn foreign_provider_data_is_rejected() {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(42_u32);
        let (provider_data, diagnostics) = provider_data_from(Some(data));
        assert!(provider_data.is_none());
        assert_eq!(diagnostics[0].summary, "Invalid provider data");

        let (provider_data, diagnostics) = provider_data_from(None);
        assert!(provider_data.is_none());
        assert!(diagnostics.is_empty());
    }
}
