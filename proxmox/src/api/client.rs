use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::common::{to_form_pairs, ApiErrorDetails, ApiErrorResponse, ApiQueryParams, ApiResponse};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager, ConnectionStats, RequestOutcome};

/// Proxmox API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
    network_reload_lock: tokio::sync::Mutex<()>,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl RetryConfig {
    fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(
            self.initial_backoff_ms.saturating_mul(factor),
            self.max_backoff_ms,
        )
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, api_token: &str, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(endpoint, api_token, insecure, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        api_token: &str,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidEndpoint(format!(
                "{}: scheme must be http or https",
                endpoint
            )));
        }

        let pool_config = ConnectionPoolConfig {
            request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };

        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client(insecure)?;

        let base_url = endpoint.trim_end_matches('/').to_string();
        let auth_header = format!("PVEAPIToken={}", api_token);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth_header,
                retry_config,
                pool_manager,
                network_reload_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(Method::GET, path, None).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with a form encoded body
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let form = to_form_pairs(body)?;
        self.execute(Method::POST, path, Some(form)).await
    }

    /// Execute a PUT request with a form encoded body
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let form = to_form_pairs(body)?;
        self.execute(Method::PUT, path, Some(form)).await
    }

    /// Execute a DELETE request
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(Method::DELETE, path, None).await
    }

    /// Get connection pool statistics
    pub async fn get_connection_stats(&self) -> ConnectionStats {
        self.inner.pool_manager.get_stats().await
    }

    /// Serializes node network reloads issued through this client
    pub(crate) fn network_reload_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.inner.network_reload_lock
    }

    /// Cluster wide API operations (SDN, ACME)
    pub fn cluster(&self) -> crate::api::cluster::ClusterApi<'_> {
        crate::api::cluster::ClusterApi::new(self)
    }

    /// Resource pool operations
    pub fn pools(&self) -> crate::api::pools::PoolsApi<'_> {
        crate::api::pools::PoolsApi::new(self)
    }

    /// Nodes API operations
    pub fn nodes(&self) -> crate::api::nodes::NodesApi<'_> {
        crate::api::nodes::NodesApi::new(self)
    }

    async fn execute<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        form: Option<Vec<(String, String)>>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        // A write answered by a gateway error or timeout may still have been applied
        let retryable = method == Method::GET;

        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = self.inner.retry_config.backoff_ms(attempt);
                tracing::debug!(
                    "Retrying {} {} after {}ms (attempt {})",
                    method,
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            tracing::debug!("{} request to: {}", method, url);

            let mut request = self
                .inner
                .http_client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, &self.inner.auth_header)
                .header(ACCEPT, "application/json");
            if let Some(form) = &form {
                request = request.form(form);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.pool_manager.record(RequestOutcome::Success).await;
                        return self.parse_success_response(response).await;
                    }

                    match status {
                        StatusCode::UNAUTHORIZED => {
                            self.inner.pool_manager.record(RequestOutcome::Failure).await;
                            return Err(ApiError::AuthError);
                        }
                        StatusCode::TOO_MANY_REQUESTS if retryable => {
                            last_error = Some(ApiError::RateLimited);
                        }
                        StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                        | StatusCode::GATEWAY_TIMEOUT
                            if retryable =>
                        {
                            last_error = Some(ApiError::ServiceUnavailable);
                        }
                        _ => {
                            self.inner.pool_manager.record(RequestOutcome::Failure).await;
                            return self.handle_error_response(path, response).await;
                        }
                    }
                }
                Err(e) if e.is_connect() => {
                    last_error = Some(ApiError::ServiceUnavailable);
                }
                Err(e) if e.is_timeout() && retryable => {
                    last_error = Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                }
                Err(e) => {
                    self.inner.pool_manager.record(RequestOutcome::Failure).await;
                    if e.is_timeout() {
                        return Err(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    }
                    return Err(ApiError::RequestError(e));
                }
            }

            self.inner.pool_manager.record(RequestOutcome::Retry).await;
            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response, unwrapping the data envelope
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(wrapper) => Ok(wrapper.data),
            Err(_) => match serde_json::from_str::<T>(&text) {
                Ok(data) => Ok(data),
                Err(e) => {
                    tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
                    Err(ApiError::ParseError(format!(
                        "Failed to parse response: {}",
                        e
                    )))
                }
            },
        }
    }

    /// Maps an error status to an ApiError, detecting missing resources
    async fn handle_error_response<T>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let details = serde_json::from_str::<ApiErrorResponse>(&text)
            .ok()
            .map(|err_resp| ApiErrorDetails {
                errors: err_resp.errors,
                message: err_resp.message,
            });

        if status == StatusCode::NOT_FOUND
            || (status == StatusCode::INTERNAL_SERVER_ERROR && text.contains("does not exist"))
        {
            tracing::debug!("Resource at {} does not exist", path);
            return Err(ApiError::ResourceDoesNotExist(path.to_string()));
        }

        let message = match &details {
            Some(d) => {
                let base = d
                    .message
                    .as_deref()
                    .map(str::trim_end)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error"))
                    .to_string();
                match d.field_summary() {
                    Some(fields) => format!("{} ({})", base, fields),
                    None => base,
                }
            }
            None => text,
        };

        Err(ApiError::ApiError {
            status: status.as_u16(),
            message,
            details: details.map(Box::new),
        })
    }
}

#[cfg(test)]
#[path = "./client_test.rs"]
mod client_test;
