use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub release: String,
    pub repoid: String,
}

impl super::Client {
    /// GET /api2/json/version
    pub async fn version(&self) -> Result<VersionInfo, super::ApiError> {
        self.get("/api2/json/version").await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;

    #[tokio::test]
    async fn version_decodes_repoid() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/version")
            .with_status(200)
            .with_body(r#"{"data":{"version":"9.0.3","release":"9.0","repoid":"025864202ebb6109"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let version = client.version().await.unwrap();

        assert_eq!(version.version, "9.0.3");
        assert_eq!(version.repoid, "025864202ebb6109");
    }
}
