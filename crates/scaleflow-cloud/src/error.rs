//! Control-plane error types

use thiserror::Error;

/// Errors reported by a compute control plane
#[derive(Error, Debug)]
pub enum CloudError {
    /// The addressed resource does not exist (HTTP 404 on the wire)
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl CloudError {
    pub fn server_not_found(id: impl Into<String>) -> Self {
        CloudError::NotFound {
            kind: "server",
            id: id.into(),
        }
    }

    pub fn volume_not_found(id: impl Into<String>) -> Self {
        CloudError::NotFound {
            kind: "volume",
            id: id.into(),
        }
    }

    pub fn task_not_found(id: impl Into<String>) -> Self {
        CloudError::NotFound {
            kind: "task",
            id: id.into(),
        }
    }

    /// Whether the control plane reported the resource as absent.
    ///
    /// Clients that only surface raw status codes map to `Api { status: 404 }`,
    /// which is classified the same way.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudError::NotFound { .. } | CloudError::Api { status: 404, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
