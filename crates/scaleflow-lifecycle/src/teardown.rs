//! Server teardown
//!
//! A running server is terminated through the action executor, which removes
//! it together with its volumes. A stopped server is deleted directly, and
//! its root volume has to be removed separately because the control plane
//! leaves it behind.

use crate::coordinator::Lifecycle;
use crate::error::{LifecycleError, Result};
use scaleflow_cloud::{ComputeApi, Server};
use tracing::{info, warn};

impl<A: ComputeApi> Lifecycle<A> {
    /// Terminate a running server and wait until it is removed
    pub async fn delete_running_server(&self, server_id: &str) -> Result<()> {
        self.terminate_server(server_id).await
    }

    /// Delete a stopped server and its root volume.
    ///
    /// Both calls run under the control-plane lock. If the volume deletion
    /// fails after the server is gone the error is returned as
    /// [`LifecycleError::OrphanedVolume`]; the server deletion is not undone.
    pub async fn delete_stopped_server(&self, server: &Server) -> Result<()> {
        let gate = self.locks.servers().acquire(&server.id);
        let _guard = gate.enter().await;
        let _api = self.locks.api_call(self.config.serialize_api_calls).await;

        match self.api.delete_server(&server.id).await {
            Ok(()) => info!(server_id = %server.id, "Deleted server"),
            Err(err) if err.is_not_found() => {
                warn!(server_id = %server.id, "Server already deleted");
            }
            Err(err) => return Err(err.into()),
        }

        let Some(root) = server.root_volume() else {
            return Ok(());
        };

        match self.api.delete_volume(&root.id).await {
            Ok(()) => {
                info!(server_id = %server.id, volume_id = %root.id, "Deleted root volume");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                warn!(volume_id = %root.id, "Root volume already deleted");
                Ok(())
            }
            Err(source) => {
                warn!(
                    server_id = %server.id,
                    volume_id = %root.id,
                    "Root volume left orphaned: {}",
                    source
                );
                Err(LifecycleError::OrphanedVolume {
                    server_id: server.id.clone(),
                    volume_id: root.id.clone(),
                    source,
                })
            }
        }
    }

    /// Remove a server in whatever power state it is in.
    ///
    /// An already absent server counts as removed.
    pub async fn destroy_server(&self, server_id: &str) -> Result<()> {
        let server = match self.fetch_server(server_id).await {
            Ok(server) => server,
            Err(err) if err.is_not_found() => {
                warn!(server_id = %server_id, "Server already gone");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        if server.state.is_stopped() {
            self.delete_stopped_server(&server).await
        } else {
            self.delete_running_server(server_id).await
        }
    }
}
