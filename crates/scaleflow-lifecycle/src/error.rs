//! Lifecycle error types

use scaleflow_cloud::{CloudError, TaskStatus};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A control-plane call failed (submit, fetch, delete)
    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),

    /// The control plane settled the task on a non-success status
    #[error("Task {task_id} for server {server_id} ended with status {status}")]
    TaskFailed {
        task_id: String,
        server_id: String,
        status: TaskStatus,
    },

    /// The task was still pending when the deadline elapsed
    #[error("Timeout after {waited:?} waiting for task {task_id} on server {server_id}")]
    Timeout {
        task_id: String,
        server_id: String,
        waited: Duration,
    },

    /// The server is gone but its root volume could not be removed
    #[error("Server {server_id} deleted but root volume {volume_id} is orphaned: {source}")]
    OrphanedVolume {
        server_id: String,
        volume_id: String,
        #[source]
        source: CloudError,
    },

    /// The caller's operation failed while the server was held stopped
    #[error("Operation on stopped server {server_id} failed: {source}")]
    Operation {
        server_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LifecycleError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::Timeout { .. })
    }

    /// The control plane reported the resource as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, LifecycleError::Cloud(err) if err.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
