//! In-memory control plane for tests
//!
//! [`FakeCompute`] keeps servers, volumes and tasks in memory. Every submitted
//! task follows a status script (default `started` then `success`); each
//! `get_task` call advances it by one step and the last status sticks. When a
//! task settles on `success` its action is applied to the server. All calls
//! are recorded in order, failures can be injected per operation, and the fake
//! tracks how many actions overlap on the same server.

use crate::api::ComputeApi;
use crate::error::{CloudError, Result};
use crate::model::{Server, ServerAction, ServerState, Task, TaskStatus};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// A recorded control-plane call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SubmitAction {
        server_id: String,
        action: ServerAction,
    },
    GetTask {
        task_id: String,
    },
    GetServer {
        server_id: String,
    },
    DeleteServer {
        server_id: String,
    },
    DeleteVolume {
        volume_id: String,
    },
}

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    SubmitAction,
    GetTask,
    GetServer,
    DeleteServer,
    DeleteVolume,
}

struct FakeTask {
    task: Task,
    action: ServerAction,
    script: VecDeque<TaskStatus>,
    settled: bool,
}

#[derive(Default)]
struct FakeState {
    servers: HashMap<String, Server>,
    volumes: HashSet<String>,
    tasks: HashMap<String, FakeTask>,
    scripts: VecDeque<Vec<TaskStatus>>,
    failures: HashMap<Op, VecDeque<CloudError>>,
    calls: Vec<Call>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
    next_task: u64,
}

impl FakeState {
    fn take_failure(&mut self, op: Op) -> Option<CloudError> {
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn settle(&mut self, server_id: &str, action: ServerAction, status: &TaskStatus) {
        if let Some(count) = self.in_flight.get_mut(server_id) {
            *count = count.saturating_sub(1);
        }

        if !status.is_success() {
            return;
        }

        match action {
            ServerAction::PowerOn => {
                if let Some(server) = self.servers.get_mut(server_id) {
                    server.state = ServerState::Running;
                }
            }
            ServerAction::PowerOff => {
                if let Some(server) = self.servers.get_mut(server_id) {
                    server.state = ServerState::Stopped;
                }
            }
            ServerAction::Terminate => {
                if let Some(server) = self.servers.remove(server_id) {
                    for volume in server.volumes.values() {
                        self.volumes.remove(&volume.id);
                    }
                }
            }
        }
    }
}

/// Scripted in-memory [`ComputeApi`]
pub struct FakeCompute {
    state: Mutex<FakeState>,
    latency: Duration,
    api_in_flight: AtomicUsize,
    max_api_in_flight: AtomicUsize,
}

impl Default for FakeCompute {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCompute {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            latency: Duration::ZERO,
            api_in_flight: AtomicUsize::new(0),
            max_api_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every call take `latency` (on the tokio clock)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a server and its volumes
    pub fn insert_server(&self, server: Server) {
        let mut state = self.lock();
        for volume in server.volumes.values() {
            state.volumes.insert(volume.id.clone());
        }
        state.servers.insert(server.id.clone(), server);
    }

    /// Status script for the next submitted task
    pub fn script_next_task(&self, statuses: Vec<TaskStatus>) {
        self.lock().scripts.push_back(statuses);
    }

    /// Fail the next call of `op` with `error`
    pub fn fail_next(&self, op: Op, error: CloudError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Submitted actions in order
    pub fn submitted_actions(&self) -> Vec<(String, ServerAction)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::SubmitAction { server_id, action } => Some((server_id.clone(), *action)),
                _ => None,
            })
            .collect()
    }

    pub fn poll_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::GetTask { .. }))
            .count()
    }

    pub fn server(&self, server_id: &str) -> Option<Server> {
        self.lock().servers.get(server_id).cloned()
    }

    pub fn volume_exists(&self, volume_id: &str) -> bool {
        self.lock().volumes.contains(volume_id)
    }

    /// Highest number of unsettled actions ever observed for one server
    pub fn max_concurrent_actions(&self, server_id: &str) -> usize {
        self.lock()
            .max_in_flight
            .get(server_id)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of overlapping API calls ever observed
    pub fn max_concurrent_api_calls(&self) -> usize {
        self.max_api_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let current = self.api_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_api_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.api_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ComputeApi for FakeCompute {
    async fn submit_action(&self, server_id: &str, action: ServerAction) -> Result<Task> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.calls.push(Call::SubmitAction {
            server_id: server_id.to_string(),
            action,
        });
        if let Some(err) = state.take_failure(Op::SubmitAction) {
            return Err(err);
        }
        if !state.servers.contains_key(server_id) {
            return Err(CloudError::server_not_found(server_id));
        }

        state.next_task += 1;
        let task = Task {
            id: format!("task-{}", state.next_task),
            action: action.as_str().to_string(),
            status: TaskStatus::Pending,
            server_id: server_id.to_string(),
        };
        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| vec![TaskStatus::Started, TaskStatus::Success]);

        let count = state.in_flight.entry(server_id.to_string()).or_default();
        *count += 1;
        let current = *count;
        let max = state.max_in_flight.entry(server_id.to_string()).or_default();
        *max = (*max).max(current);

        state.tasks.insert(
            task.id.clone(),
            FakeTask {
                task: task.clone(),
                action,
                script: script.into(),
                settled: false,
            },
        );
        Ok(task)
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.calls.push(Call::GetTask {
            task_id: task_id.to_string(),
        });
        if let Some(err) = state.take_failure(Op::GetTask) {
            return Err(err);
        }

        let fake = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CloudError::task_not_found(task_id))?;

        let mut settled = None;
        if !fake.settled {
            let next = if fake.script.len() > 1 {
                fake.script.pop_front()
            } else {
                fake.script.front().cloned()
            };
            if let Some(status) = next {
                fake.task.status = status;
            }
            if !fake.task.status.is_pending() {
                fake.settled = true;
                settled = Some((
                    fake.task.server_id.clone(),
                    fake.action,
                    fake.task.status.clone(),
                ));
            }
        }
        let task = fake.task.clone();

        if let Some((server_id, action, status)) = settled {
            state.settle(&server_id, action, &status);
        }
        Ok(task)
    }

    async fn get_server(&self, server_id: &str) -> Result<Server> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.calls.push(Call::GetServer {
            server_id: server_id.to_string(),
        });
        if let Some(err) = state.take_failure(Op::GetServer) {
            return Err(err);
        }
        state
            .servers
            .get(server_id)
            .cloned()
            .ok_or_else(|| CloudError::server_not_found(server_id))
    }

    async fn delete_server(&self, server_id: &str) -> Result<()> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.calls.push(Call::DeleteServer {
            server_id: server_id.to_string(),
        });
        if let Some(err) = state.take_failure(Op::DeleteServer) {
            return Err(err);
        }
        state
            .servers
            .remove(server_id)
            .map(|_| ())
            .ok_or_else(|| CloudError::server_not_found(server_id))
    }

    async fn delete_volume(&self, volume_id: &str) -> Result<()> {
        self.simulate_latency().await;

        let mut state = self.lock();
        state.calls.push(Call::DeleteVolume {
            volume_id: volume_id.to_string(),
        });
        if let Some(err) = state.take_failure(Op::DeleteVolume) {
            return Err(err);
        }
        if state.volumes.remove(volume_id) {
            Ok(())
        } else {
            Err(CloudError::volume_not_found(volume_id))
        }
    }
}
