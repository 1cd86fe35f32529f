//! Data model shared with the compute control plane

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Volume slot holding the root volume of a server
pub const ROOT_VOLUME_SLOT: &str = "0";

/// Lifecycle action submitted against a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerAction {
    /// Boot a stopped server
    #[serde(rename = "poweron")]
    PowerOn,
    /// Shut a running server down
    #[serde(rename = "poweroff")]
    PowerOff,
    /// Stop the server and delete it with its volumes
    #[serde(rename = "terminate")]
    Terminate,
}

impl ServerAction {
    /// Action name understood by the control plane
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerAction::PowerOn => "poweron",
            ServerAction::PowerOff => "poweroff",
            ServerAction::Terminate => "terminate",
        }
    }
}

impl std::fmt::Display for ServerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power state of a server as reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Terminating,
    Locked,
    /// Any state the control plane adds later
    Other(String),
}

impl ServerState {
    pub fn as_str(&self) -> &str {
        match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Terminating => "terminating",
            ServerState::Locked => "locked",
            ServerState::Other(s) => s,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ServerState::Stopped)
    }
}

impl From<String> for ServerState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stopped" => ServerState::Stopped,
            "starting" => ServerState::Starting,
            "running" => ServerState::Running,
            "stopping" => ServerState::Stopping,
            "terminating" => ServerState::Terminating,
            "locked" => ServerState::Locked,
            _ => ServerState::Other(value),
        }
    }
}

impl From<ServerState> for String {
    fn from(state: ServerState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an asynchronous control-plane task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Started,
    Success,
    Error,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Started => "started",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
            TaskStatus::Other(s) => s,
        }
    }

    /// The task has not reached a terminal status yet
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Started)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => TaskStatus::Pending,
            "started" => TaskStatus::Started,
            "success" => TaskStatus::Success,
            "error" => TaskStatus::Error,
            _ => TaskStatus::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage volume attached to a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

impl Volume {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }
}

/// Snapshot of a server fetched from the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Control-plane assigned identifier
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub state: ServerState,

    /// Attached volumes keyed by slot index ("0" is the root volume)
    #[serde(default)]
    pub volumes: BTreeMap<String, Volume>,
}

impl Server {
    pub fn new(id: impl Into<String>, state: ServerState) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            state,
            volumes: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_volume(mut self, slot: impl Into<String>, volume: Volume) -> Self {
        self.volumes.insert(slot.into(), volume);
        self
    }

    /// Volume in the root slot, if any
    pub fn root_volume(&self) -> Option<&Volume> {
        self.volumes.get(ROOT_VOLUME_SLOT)
    }
}

/// Asynchronous unit of work created by submitting a [`ServerAction`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    /// Name of the submitted action as reported by the control plane
    pub action: String,

    pub status: TaskStatus,

    /// Server the task operates on
    pub server_id: String,
}
