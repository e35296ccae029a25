//! Test helpers for the Proxmox API

use super::{Client, RetryConfig};

pub fn create_test_client(url: &str) -> Client {
    Client::new(url, "test@pam!test=secret", true).unwrap()
}

/// Client that retries quickly so retry tests stay fast
pub fn create_fast_retry_client(url: &str) -> Client {
    Client::with_config(
        url,
        "test@pam!test=secret",
        true,
        RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
    )
    .unwrap()
}
