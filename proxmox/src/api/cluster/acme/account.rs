//! ACME account registration
//!
//! Register, update and deactivate calls start a task on the node serving
//! the request; each write waits for that task before returning.

use crate::api::nodes::{TaskWaitOptions, TasksApi};
use crate::api::{error::ApiError, Client};
use serde::{Deserialize, Serialize};
use tfplug::Context;

const ACCOUNT_PATH: &str = "/api2/json/cluster/acme/account";

#[derive(Debug, Clone, Deserialize)]
pub struct AcmeAccountListEntry {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcmeAccountDetails {
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcmeAccount {
    #[serde(default)]
    pub account: AcmeAccountDetails,
    pub directory: Option<String>,
    pub location: Option<String>,
    pub tos: Option<String>,
}

impl AcmeAccount {
    /// First contact address without its `mailto:` scheme
    pub fn primary_contact(&self) -> Option<String> {
        self.account
            .contact
            .first()
            .map(|c| c.replacen("mailto:", "", 1))
    }
}

#[derive(Clone, Default, Serialize)]
pub struct AcmeAccountCreate {
    pub name: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(rename = "eab-hmac-key", skip_serializing_if = "Option::is_none")]
    pub eab_hmac_key: Option<String>,
    #[serde(rename = "eab-kid", skip_serializing_if = "Option::is_none")]
    pub eab_kid: Option<String>,
    #[serde(rename = "tos_url", skip_serializing_if = "Option::is_none")]
    pub tos: Option<String>,
}

impl std::fmt::Debug for AcmeAccountCreate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcmeAccountCreate")
            .field("name", &self.name)
            .field("contact", &self.contact)
            .field("directory", &self.directory)
            .field("eab_kid", &self.eab_kid)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AcmeAccountUpdate<'b> {
    contact: &'b str,
}

pub struct AcmeAccountsApi<'a> {
    client: &'a Client,
}

impl<'a> AcmeAccountsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn account_path(name: &str) -> String {
        format!("{}/{}", ACCOUNT_PATH, urlencoding::encode(name))
    }

    async fn wait(&self, ctx: &Context, upid: Option<String>) -> Result<(), ApiError> {
        match upid {
            Some(upid) => {
                TasksApi::new(self.client)
                    .wait_for_task(ctx, &upid, &TaskWaitOptions::default())
                    .await
            }
            None => Ok(()),
        }
    }

    /// GET /api2/json/cluster/acme/account
    pub async fn list(&self) -> Result<Vec<AcmeAccountListEntry>, ApiError> {
        self.client.get(ACCOUNT_PATH).await
    }

    /// GET /api2/json/cluster/acme/account/{name}
    pub async fn get(&self, name: &str) -> Result<AcmeAccount, ApiError> {
        self.client.get(&Self::account_path(name)).await
    }

    /// POST /api2/json/cluster/acme/account
    pub async fn create(&self, ctx: &Context, request: &AcmeAccountCreate) -> Result<(), ApiError> {
        let upid: Option<String> = self.client.post(ACCOUNT_PATH, request).await?;
        self.wait(ctx, upid).await?;
        tracing::info!("Registered ACME account {}", request.name);
        Ok(())
    }

    /// PUT /api2/json/cluster/acme/account/{name}, contact only
    pub async fn update(&self, ctx: &Context, name: &str, contact: &str) -> Result<(), ApiError> {
        let upid: Option<String> = self
            .client
            .put(&Self::account_path(name), &AcmeAccountUpdate { contact })
            .await?;
        self.wait(ctx, upid).await?;
        tracing::info!("Updated ACME account {}", name);
        Ok(())
    }

    /// DELETE /api2/json/cluster/acme/account/{name}
    pub async fn delete(&self, ctx: &Context, name: &str) -> Result<(), ApiError> {
        let upid: Option<String> = self.client.delete(&Self::account_path(name)).await?;
        self.wait(ctx, upid).await?;
        tracing::info!("Deactivated ACME account {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    const UPID: &str = "UPID:pve1:00001234:00005678:6710ABCD:acmeregister:default:root@pam:";

    #[tokio::test]
    async fn create_waits_for_registration_task() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api2/json/cluster/acme/account")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "default".into()),
                Matcher::UrlEncoded("contact".into(), "ops@example.com".into()),
                Matcher::UrlEncoded("eab-kid".into(), "kid-1".into()),
            ]))
            .with_status(200)
            .with_body(format!(r#"{{"data":"{}"}}"#, UPID))
            .create_async()
            .await;
        let status = server
            .mock(
                "GET",
                format!("/api2/json/nodes/pve1/tasks/{}/status", urlencoding::encode(UPID)).as_str(),
            )
            .with_status(200)
            .with_body(r#"{"data":{"status":"stopped","exitstatus":"OK"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let request = AcmeAccountCreate {
            name: "default".to_string(),
            contact: "ops@example.com".to_string(),
            eab_kid: Some("kid-1".to_string()),
            ..Default::default()
        };
        client
            .cluster()
            .acme()
            .accounts()
            .create(&Context::new(), &request)
            .await
            .unwrap();

        create.assert_async().await;
        status.assert_async().await;
    }

    #[tokio::test]
    async fn get_decodes_account() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/cluster/acme/account/default")
            .with_status(200)
            .with_body(
                r#"{"data":{"account":{"contact":["mailto:ops@example.com"],"createdAt":"2025-01-01T00:00:00Z","status":"valid"},
                    "directory":"https://acme-staging-v02.api.letsencrypt.org/directory",
                    "location":"https://acme.example/acct/1","tos":"https://acme.example/tos"}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let account = client.cluster().acme().accounts().get("default").await.unwrap();

        assert_eq!(account.primary_contact().as_deref(), Some("ops@example.com"));
        assert_eq!(account.account.created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn debug_hides_hmac_key() {
        let request = AcmeAccountCreate {
            eab_hmac_key: Some("c2VjcmV0".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", request).contains("c2VjcmV0"));
    }
}
