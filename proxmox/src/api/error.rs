use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("the requested resource does not exist: {0}")]
    ResourceDoesNotExist(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Failed to encode request: {0}")]
    EncodeError(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("task {upid} failed with exit status: {exit_status}")]
    TaskFailed { upid: String, exit_status: String },

    #[error("timeout while waiting for task {upid} after {seconds} seconds")]
    TaskTimeout { upid: String, seconds: u64 },

    #[error("invalid task UPID: {0}")]
    InvalidUpid(String),

    #[error("operation cancelled while waiting for task {0}")]
    Cancelled(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ResourceDoesNotExist(_))
    }

    pub fn is_already_exists(&self) -> bool {
        match self {
            ApiError::ApiError {
                message, details, ..
            } => {
                message.contains("already exists")
                    || details
                        .as_ref()
                        .is_some_and(|d| d.mentions("already exists"))
            }
            ApiError::TaskFailed { exit_status, .. } => exit_status.contains("already exists"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn already_exists_is_detected_in_field_errors() {
        let err = ApiError::ApiError {
            status: 400,
            message: "Parameter verification failed.".to_string(),
            details: Some(Box::new(ApiErrorDetails {
                errors: Some(HashMap::from([(
                    "name".to_string(),
                    "account 'default' already exists".to_string(),
                )])),
                message: None,
            })),
        };

        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
    }

    #[test]
    fn task_failure_formats_upid() {
        let err = ApiError::TaskFailed {
            upid: "UPID:pve:0001:acmeregister".to_string(),
            exit_status: "command failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "task UPID:pve:0001:acmeregister failed with exit status: command failed"
        );
    }
}
