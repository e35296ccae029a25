#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::common::ApiQueryParams;
    use crate::api::test_helpers::{create_fast_retry_client, create_test_client};
    use mockito::{Matcher, Server};
    use serde::Serialize;

    #[test]
    fn rejects_endpoint_without_http_scheme() {
        let result = Client::new("ftp://pve.example.com", "token", true);
        assert!(matches!(result, Err(ApiError::InvalidEndpoint(_))));

        let result = Client::new("not a url", "token", true);
        assert!(matches!(result, Err(ApiError::InvalidEndpoint(_))));
    }

    #[test]
    fn backoff_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_ms(1), 100);
        assert_eq!(config.backoff_ms(2), 200);
        assert_eq!(config.backoff_ms(20), 10000);
    }

    #[tokio::test]
    async fn get_sends_token_and_unwraps_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api2/json/pools")
            .match_header("authorization", "PVEAPIToken=test@pam!test=secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"poolid":"tank"}]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let pools: Vec<serde_json::Value> = client.get("/api2/json/pools").await.unwrap();

        assert_eq!(pools[0]["poolid"], "tank");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_with_params_appends_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api2/json/cluster/sdn/fabrics/fabric/fab1")
            .match_query(Matcher::UrlEncoded("pending".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"data":{"id":"fab1"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let _: serde_json::Value = client
            .get_with_params(
                "/api2/json/cluster/sdn/fabrics/fabric/fab1",
                &ApiQueryParams::pending(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[derive(Serialize)]
    struct Body {
        poolid: String,
        #[serde(rename = "allow-move")]
        allow_move: bool,
    }

    #[tokio::test]
    async fn post_sends_form_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api2/json/pools")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("poolid".into(), "tank".into()),
                Matcher::UrlEncoded("allow-move".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let body = Body {
            poolid: "tank".to_string(),
            allow_move: true,
        };
        client.post::<(), _>("/api2/json/pools", &body).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_maps_to_resource_does_not_exist() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/pools/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<serde_json::Value>("/api2/json/pools/missing")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn internal_error_mentioning_missing_object_is_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api2/json/cluster/acme/plugins/gone")
            .with_status(500)
            .with_body(r#"{"data":null,"message":"ACME plugin 'gone' does not exist\n"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_fast_retry_client(&server.url());
        let err = client
            .delete::<()>("/api2/json/cluster/acme/plugins/gone")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn internal_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api2/json/pools/tank")
            .with_status(500)
            .with_body(r#"{"data":null,"message":"update pool failed: storage 'x' already exists\n"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_fast_retry_client(&server.url());
        let err = client
            .put::<(), _>("/api2/json/pools/tank", &serde_json::json!({"storage": "x"}))
            .await
            .unwrap_err();

        assert!(err.is_already_exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api2/json/cluster/sdn/fabrics/fabric")
            .with_status(400)
            .with_body(r#"{"data":null,"message":"Parameter verification failed.\n","errors":{"id":"invalid format"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .post::<(), _>(
                "/api2/json/cluster/sdn/fabrics/fabric",
                &serde_json::json!({"id": "1bad"}),
            )
            .await
            .unwrap_err();

        match err {
            ApiError::ApiError {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Parameter verification failed. (id: invalid format)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn service_unavailable_is_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api2/json/version")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = create_fast_retry_client(&server.url());
        let err = client
            .get::<serde_json::Value>("/api2/json/version")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ServiceUnavailable));
        mock.assert_async().await;

        let stats = client.get_connection_stats().await;
        assert_eq!(stats.retried_requests, 3);
    }

    #[tokio::test]
    async fn gateway_timeout_on_post_is_sent_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api2/json/cluster/sdn/fabrics/fabric")
            .with_status(504)
            .expect(1)
            .create_async()
            .await;

        let client = create_fast_retry_client(&server.url());
        let err = client
            .post::<(), _>(
                "/api2/json/cluster/sdn/fabrics/fabric",
                &serde_json::json!({"id": "fab1", "protocol": "openfabric"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ApiError { status: 504, .. }));
        mock.assert_async().await;

        let stats = client.get_connection_stats().await;
        assert_eq!(stats.retried_requests, 0);
    }

    #[tokio::test]
    async fn rate_limited_put_is_not_resent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api2/json/pools/tank")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let client = create_fast_retry_client(&server.url());
        let err = client
            .put::<(), _>("/api2/json/pools/tank", &serde_json::json!({"comment": "x"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ApiError { status: 429, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_fails_immediately() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api2/json/version")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = create_fast_retry_client(&server.url());
        let err = client
            .get::<serde_json::Value>("/api2/json/version")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::AuthError));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_refused_exhausts_retries() {
        let client = create_fast_retry_client("http://127.0.0.1:1");
        let err = client
            .get::<serde_json::Value>("/api2/json/version")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ServiceUnavailable));
    }
}
