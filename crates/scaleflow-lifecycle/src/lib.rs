//! scaleflow server lifecycle coordination
//!
//! Gives callers a sequential view of power and teardown operations on
//! servers whose control plane works asynchronously. Each operation submits a
//! task, polls it to a terminal status and only then returns, while a
//! per-server gate keeps concurrent callers from interleaving operations on
//! the same server. Unrelated servers proceed in parallel.
//!
//! # Components
//!
//! - [`registry`]: server lock registry (one gate per server id)
//! - [`waiter`]: task completion waiter
//! - [`executor`]: power-on, power-off and terminate actions
//! - [`workflow`]: run an operation while the server is stopped
//! - [`teardown`]: delete running or stopped servers
//!
//! # Example
//!
//! ```ignore
//! use scaleflow_config::LifecycleConfig;
//! use scaleflow_lifecycle::Lifecycle;
//!
//! let lifecycle = Lifecycle::new(client, LifecycleConfig::load()?);
//!
//! lifecycle
//!     .with_stopped_server("srv-1", |server| async move {
//!         resize_root_volume(&server).await
//!     })
//!     .await?;
//! ```

pub mod coordinator;
pub mod error;
pub mod executor;
pub mod registry;
pub mod teardown;
pub mod waiter;
pub mod workflow;

pub use coordinator::Lifecycle;
pub use error::{LifecycleError, Result};
pub use registry::{InFlightGuard, LockSet, ServerGate, ServerLocks};
pub use waiter::PollState;
