//! Server action executor

use crate::coordinator::Lifecycle;
use crate::error::Result;
use scaleflow_cloud::{ComputeApi, ServerAction};
use tracing::{info, warn};

impl<A: ComputeApi> Lifecycle<A> {
    /// Submit `action` for a server and wait until its task completes.
    ///
    /// The server stays in flight from submission until the task settles, so
    /// no other lifecycle operation can interleave. A terminate against a
    /// server the control plane no longer knows succeeds without polling.
    pub async fn execute(&self, server_id: &str, action: ServerAction) -> Result<()> {
        let gate = self.locks.servers().acquire(server_id);
        let guard = gate.enter().await;

        let submitted = {
            let _api = self.locks.api_call(self.config.serialize_api_calls).await;
            self.api.submit_action(server_id, action).await
        };

        let task = match submitted {
            Ok(task) => task,
            Err(err) if action == ServerAction::Terminate && err.is_not_found() => {
                warn!(server_id = %server_id, "Server already gone, nothing to terminate");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            server_id = %server_id,
            task_id = %task.id,
            action = %action,
            "Submitted server action"
        );
        self.poll_until_complete(&task.id, &guard).await
    }

    pub async fn start_server(&self, server_id: &str) -> Result<()> {
        self.execute(server_id, ServerAction::PowerOn).await
    }

    pub async fn stop_server(&self, server_id: &str) -> Result<()> {
        self.execute(server_id, ServerAction::PowerOff).await
    }

    pub async fn terminate_server(&self, server_id: &str) -> Result<()> {
        self.execute(server_id, ServerAction::Terminate).await
    }
}
