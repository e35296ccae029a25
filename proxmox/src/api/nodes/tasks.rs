//! Node task status polling

use crate::api::{error::ApiError, Client};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tfplug::Context;

#[derive(Debug, Clone)]
pub struct TaskWaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
    /// Accept `WARNINGS: n` exit statuses as success
    pub ignore_warnings: bool,
}

impl Default for TaskWaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30 * 60),
            ignore_warnings: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: String,
    pub exitstatus: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub node: Option<String>,
}

impl TaskStatus {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Extracts the node name from `UPID:<node>:...`
pub fn parse_upid_node(upid: &str) -> Result<&str, ApiError> {
    let mut fields = upid.split(':');
    match (fields.next(), fields.next(), fields.next()) {
        (Some("UPID"), Some(node), Some(_)) if !node.is_empty() => Ok(node),
        _ => Err(ApiError::InvalidUpid(upid.to_string())),
    }
}

pub struct TasksApi<'a> {
    client: &'a Client,
}

impl<'a> TasksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api2/json/nodes/{node}/tasks/{upid}/status
    pub async fn get_status(&self, upid: &str) -> Result<TaskStatus, ApiError> {
        let node = parse_upid_node(upid)?;
        let path = format!(
            "/api2/json/nodes/{}/tasks/{}/status",
            node,
            urlencoding::encode(upid)
        );
        self.client.get(&path).await
    }

    /// Polls a task until it stops, then checks its exit status
    pub async fn wait_for_task(
        &self,
        ctx: &Context,
        upid: &str,
        options: &TaskWaitOptions,
    ) -> Result<(), ApiError> {
        parse_upid_node(upid)?;
        let started = Instant::now();

        loop {
            match self.get_status(upid).await {
                Ok(status) if !status.is_running() => {
                    return check_exit_status(upid, &status, options.ignore_warnings);
                }
                Ok(_) => {}
                Err(ApiError::ApiError { status: 400, .. }) => {
                    tracing::debug!("Task {} not visible yet, retrying", upid);
                }
                Err(e) => return Err(e),
            }

            if started.elapsed() >= options.timeout {
                return Err(ApiError::TaskTimeout {
                    upid: upid.to_string(),
                    seconds: options.timeout.as_secs(),
                });
            }

            if !ctx.sleep(options.interval).await {
                return Err(ApiError::Cancelled(upid.to_string()));
            }
        }
    }
}

fn check_exit_status(upid: &str, status: &TaskStatus, ignore_warnings: bool) -> Result<(), ApiError> {
    let exit = status.exitstatus.as_deref().unwrap_or("");
    if exit == "OK" {
        return Ok(());
    }
    if ignore_warnings && exit.starts_with("WARNINGS: ") && !exit.contains("ERROR") {
        tracing::warn!("Task {} finished with {}", upid, exit);
        return Ok(());
    }
    Err(ApiError::TaskFailed {
        upid: upid.to_string(),
        exit_status: exit.to_string(),
    })
}
