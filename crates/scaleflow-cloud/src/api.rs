//! Compute control-plane client trait

use crate::error::Result;
use crate::model::{Server, ServerAction, Task};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for the compute control plane
///
/// The lifecycle layer only needs these five calls. Implementations wrap a
/// concrete SDK; they must report a missing resource as
/// [`CloudError::NotFound`](crate::CloudError::NotFound) (or an `Api` error
/// with status 404) so destructive operations can stay idempotent.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Submit a lifecycle action and return the task tracking it
    async fn submit_action(&self, server_id: &str, action: ServerAction) -> Result<Task>;

    /// Fetch the current state of a task
    async fn get_task(&self, task_id: &str) -> Result<Task>;

    /// Fetch a server snapshot
    async fn get_server(&self, server_id: &str) -> Result<Server>;

    /// Delete a server record. Attached volumes are left in place.
    async fn delete_server(&self, server_id: &str) -> Result<()>;

    async fn delete_volume(&self, volume_id: &str) -> Result<()>;
}

#[async_trait]
impl<T: ComputeApi + ?Sized> ComputeApi for Arc<T> {
    async fn submit_action(&self, server_id: &str, action: ServerAction) -> Result<Task> {
        (**self).submit_action(server_id, action).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        (**self).get_task(task_id).await
    }

    async fn get_server(&self, server_id: &str) -> Result<Server> {
        (**self).get_server(server_id).await
    }

    async fn delete_server(&self, server_id: &str) -> Result<()> {
        (**self).delete_server(server_id).await
    }

    async fn delete_volume(&self, volume_id: &str) -> Result<()> {
        (**self).delete_volume(volume_id).await
    }
}
