//! Task completion waiter
//!
//! Polls a submitted task until it reaches a terminal status or the deadline
//! elapses. The loop is a small state machine driven by the tokio clock, so
//! tests can pause time and step through it deterministically.

use crate::coordinator::Lifecycle;
use crate::error::{LifecycleError, Result};
use crate::registry::InFlightGuard;
use scaleflow_cloud::ComputeApi;
use std::time::Duration;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, info};

/// Stand-in for waits too long to represent as an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

fn instant_after(base: Instant, wait: Duration) -> Instant {
    base.checked_add(wait)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}

/// Position of the poll loop
#[derive(Debug)]
pub enum PollState {
    /// Sleeping until the next poll is due
    Waiting { until: Instant },
    /// Fetching the task status
    Polling,
    Succeeded,
    Failed(LifecycleError),
}

impl<A: ComputeApi> Lifecycle<A> {
    /// Wait for `task_id` to complete, holding `server_id` in flight meanwhile.
    ///
    /// Blocks first until no other operation is in flight for the server.
    pub async fn await_task(&self, task_id: &str, server_id: &str) -> Result<()> {
        let gate = self.locks.servers().acquire(server_id);
        let guard = gate.enter().await;
        self.poll_until_complete(task_id, &guard).await
    }

    /// Poll loop for a caller that already holds the server's gate
    pub async fn poll_until_complete(&self, task_id: &str, guard: &InFlightGuard) -> Result<()> {
        let server_id = guard.server_id();
        let started = Instant::now();
        let deadline = instant_after(started, self.config.timeout());

        match timeout_at(deadline, self.drive(task_id, server_id, started, deadline)).await {
            Ok(result) => result,
            // deadline hit while a poll was in flight
            Err(_) => Err(self.timeout_error(task_id, server_id)),
        }
    }

    async fn drive(
        &self,
        task_id: &str,
        server_id: &str,
        started: Instant,
        deadline: Instant,
    ) -> Result<()> {
        let mut state = PollState::Waiting {
            until: instant_after(started, self.config.initial_delay()),
        };

        loop {
            state = match state {
                PollState::Waiting { until } if until >= deadline => {
                    sleep_until(deadline).await;
                    PollState::Failed(self.timeout_error(task_id, server_id))
                }
                PollState::Waiting { until } => {
                    sleep_until(until).await;
                    PollState::Polling
                }
                PollState::Polling => self.poll_once(task_id, server_id).await,
                PollState::Succeeded => {
                    info!(
                        task_id = %task_id,
                        server_id = %server_id,
                        elapsed = ?started.elapsed(),
                        "Task completed"
                    );
                    return Ok(());
                }
                PollState::Failed(err) => return Err(err),
            };
        }
    }

    async fn poll_once(&self, task_id: &str, server_id: &str) -> PollState {
        let polled_at = Instant::now();
        let task = {
            let _api = self.locks.api_call(self.config.serialize_api_calls).await;
            self.api.get_task(task_id).await
        };

        match task {
            Ok(task) if task.status.is_success() => PollState::Succeeded,
            Ok(task) if task.status.is_pending() => {
                debug!(task_id = %task_id, status = %task.status, "Task still running");
                PollState::Waiting {
                    until: instant_after(polled_at, self.config.poll_interval()),
                }
            }
            Ok(task) => PollState::Failed(LifecycleError::TaskFailed {
                task_id: task_id.to_string(),
                server_id: server_id.to_string(),
                status: task.status,
            }),
            Err(err) => PollState::Failed(err.into()),
        }
    }

    fn timeout_error(&self, task_id: &str, server_id: &str) -> LifecycleError {
        LifecycleError::Timeout {
            task_id: task_id.to_string(),
            server_id: server_id.to_string(),
            waited: self.config.timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LockSet;
    use scaleflow_cloud::{
        CloudError, FakeCompute, Op, Server, ServerAction, ServerState, TaskStatus,
    };
    use scaleflow_config::LifecycleConfig;
    use std::sync::Arc;

    fn setup(timeout_secs: u64) -> (Arc<FakeCompute>, Lifecycle<Arc<FakeCompute>>) {
        let fake = Arc::new(FakeCompute::new());
        fake.insert_server(Server::new("srv-1", ServerState::Running));
        let config = LifecycleConfig {
            timeout_secs,
            ..Default::default()
        };
        let lifecycle = Lifecycle::with_locks(Arc::clone(&fake), config, Arc::new(LockSet::new()));
        (fake, lifecycle)
    }

    async fn submit(fake: &FakeCompute, statuses: Vec<TaskStatus>) -> String {
        fake.script_next_task(statuses);
        fake.submit_action("srv-1", ServerAction::PowerOff)
            .await
            .unwrap()
            .id
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_follows_schedule() {
        let (fake, lifecycle) = setup(3600);
        let task_id = submit(
            &fake,
            vec![TaskStatus::Pending, TaskStatus::Started, TaskStatus::Success],
        )
        .await;

        let start = Instant::now();
        lifecycle.await_task(&task_id, "srv-1").await.unwrap();

        // 15s initial delay, then polls every 10s
        assert_eq!(start.elapsed(), Duration::from_secs(35));
        assert_eq!(fake.poll_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_server() {
        let (fake, lifecycle) = setup(60);
        let task_id = submit(&fake, vec![TaskStatus::Pending]).await;

        let start = Instant::now();
        let err = lifecycle.await_task(&task_id, "srv-1").await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        // polls at 15, 25, 35, 45, 55
        assert_eq!(fake.poll_count(), 5);
        assert!(lifecycle.locks().servers().acquire("srv-1").is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_at_deadline_is_timeout() {
        let (fake, lifecycle) = setup(35);
        let task_id = submit(
            &fake,
            vec![TaskStatus::Pending, TaskStatus::Started, TaskStatus::Success],
        )
        .await;

        let err = lifecycle.await_task(&task_id, "srv-1").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(fake.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_fails() {
        let (fake, lifecycle) = setup(3600);
        let task_id = submit(&fake, vec![TaskStatus::Started, TaskStatus::Error]).await;

        let err = lifecycle.await_task(&task_id, "srv-1").await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::TaskFailed {
                status: TaskStatus::Error,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_status_fails() {
        let (fake, lifecycle) = setup(3600);
        let task_id = submit(&fake, vec![TaskStatus::Other("cancelled".to_string())]).await;

        let err = lifecycle.await_task(&task_id, "srv-1").await.unwrap_err();
        assert!(matches!(err, LifecycleError::TaskFailed { .. }));
        assert_eq!(fake.poll_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_propagates() {
        let (fake, lifecycle) = setup(3600);
        let task_id = submit(&fake, vec![TaskStatus::Pending]).await;
        fake.fail_next(Op::GetTask, CloudError::Transport("connection reset".to_string()));

        let err = lifecycle.await_task(&task_id, "srv-1").await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Cloud(CloudError::Transport(_))
        ));
        assert!(lifecycle.locks().servers().acquire("srv-1").is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_in_flight_operation() {
        let (fake, lifecycle) = setup(3600);
        let task_id = submit(&fake, vec![TaskStatus::Success]).await;

        let gate = lifecycle.locks().servers().acquire("srv-1");
        let held = gate.enter().await;

        let start = Instant::now();
        let waiting = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.await_task(&task_id, "srv-1").await })
        };

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(fake.poll_count(), 0);
        drop(held);

        waiting.await.unwrap().unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(115));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_does_not_overflow() {
        let (fake, lifecycle) = setup(u64::MAX);
        let task_id = submit(&fake, vec![TaskStatus::Started, TaskStatus::Success]).await;

        let start = Instant::now();
        lifecycle.await_task(&task_id, "srv-1").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_delays_time_out_without_polling() {
        let fake = Arc::new(FakeCompute::new());
        fake.insert_server(Server::new("srv-1", ServerState::Running));
        let config = LifecycleConfig {
            initial_delay_secs: u64::MAX,
            poll_interval_secs: u64::MAX,
            timeout_secs: 60,
            ..Default::default()
        };
        let lifecycle = Lifecycle::with_locks(Arc::clone(&fake), config, Arc::new(LockSet::new()));
        let task_id = submit(&fake, vec![TaskStatus::Success]).await;

        let start = Instant::now();
        let err = lifecycle.await_task(&task_id, "srv-1").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert_eq!(fake.poll_count(), 0);
    }

    #[test]
    fn test_instant_after_saturates() {
        let base = Instant::now();
        assert_eq!(
            instant_after(base, Duration::from_secs(5)),
            base + Duration::from_secs(5)
        );
        assert_eq!(instant_after(base, Duration::MAX), base + FAR_FUTURE);
    }
}
