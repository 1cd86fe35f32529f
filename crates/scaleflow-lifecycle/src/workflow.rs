//! Stopped-server workflow
//!
//! Some server mutations are only accepted by the control plane while the
//! server is powered off. [`Lifecycle::with_stopped_server`] stops the server
//! if needed, runs the mutation and restores the running state afterwards.

use crate::coordinator::Lifecycle;
use crate::error::{LifecycleError, Result};
use scaleflow_cloud::{ComputeApi, Server};
use std::future::Future;
use tracing::{debug, info};

impl<A: ComputeApi> Lifecycle<A> {
    /// Run `operation` while the server is stopped.
    ///
    /// `operation` receives the snapshot taken before any power change. If it
    /// fails the error is returned right away and the server is left stopped;
    /// the restart only happens on success.
    pub async fn with_stopped_server<T, F, Fut>(&self, server_id: &str, operation: F) -> Result<T>
    where
        F: FnOnce(Server) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let server = self.fetch_server(server_id).await?;

        let restart = !server.state.is_stopped();
        if restart {
            info!(server_id = %server_id, state = %server.state, "Stopping server for update");
            self.stop_server(server_id).await?;
        } else {
            debug!(server_id = %server_id, "Server already stopped");
        }

        let output = operation(server)
            .await
            .map_err(|source| LifecycleError::Operation {
                server_id: server_id.to_string(),
                source,
            })?;

        if restart {
            info!(server_id = %server_id, "Restarting server");
            self.start_server(server_id).await?;
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LockSet;
    use scaleflow_cloud::{Call, CloudError, FakeCompute, Op, ServerAction, ServerState};
    use scaleflow_config::LifecycleConfig;
    use std::sync::Arc;

    fn setup(state: ServerState) -> (Arc<FakeCompute>, Lifecycle<Arc<FakeCompute>>) {
        let fake = Arc::new(FakeCompute::new());
        fake.insert_server(Server::new("srv-1", state));
        let lifecycle = Lifecycle::with_locks(
            Arc::clone(&fake),
            LifecycleConfig::default(),
            Arc::new(LockSet::new()),
        );
        (fake, lifecycle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_server_submits_no_actions() {
        let (fake, lifecycle) = setup(ServerState::Stopped);

        let seen = lifecycle
            .with_stopped_server("srv-1", |server| async move { Ok(server.state) })
            .await
            .unwrap();

        assert_eq!(seen, ServerState::Stopped);
        assert!(fake.submitted_actions().is_empty());
        assert_eq!(
            fake.calls(),
            vec![Call::GetServer {
                server_id: "srv-1".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_server_is_stopped_then_restarted() {
        let (fake, lifecycle) = setup(ServerState::Running);
        let observed = Arc::clone(&fake);

        lifecycle
            .with_stopped_server("srv-1", |server| async move {
                // snapshot is taken before the power-off
                assert_eq!(server.state, ServerState::Running);
                assert_eq!(observed.server("srv-1").unwrap().state, ServerState::Stopped);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(
            fake.submitted_actions(),
            vec![
                ("srv-1".to_string(), ServerAction::PowerOff),
                ("srv-1".to_string(), ServerAction::PowerOn),
            ]
        );
        assert_eq!(fake.server("srv-1").unwrap().state, ServerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_operation_leaves_server_stopped() {
        let (fake, lifecycle) = setup(ServerState::Running);

        let err = lifecycle
            .with_stopped_server("srv-1", |_server| async move {
                Err::<(), _>(anyhow::anyhow!("image rejected"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Operation { .. }));
        assert_eq!(
            fake.submitted_actions(),
            vec![("srv-1".to_string(), ServerAction::PowerOff)]
        );
        assert_eq!(fake.server("srv-1").unwrap().state, ServerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_runs_nothing() {
        let (fake, lifecycle) = setup(ServerState::Running);
        fake.fail_next(Op::GetServer, CloudError::Transport("timeout".to_string()));

        let mut ran = false;
        let result = lifecycle
            .with_stopped_server("srv-1", |_server| {
                ran = true;
                async { Ok(()) }
            })
            .await;

        assert!(result.is_err());
        assert!(!ran);
        assert!(fake.submitted_actions().is_empty());
    }
}
