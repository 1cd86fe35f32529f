//! scaleflow Cloud interface
//!
//! This crate describes the compute control plane the lifecycle layer talks
//! to: the server/volume/task data model, the [`ComputeApi`] client trait and
//! the error type every client reports through.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               scaleflow-lifecycle                │
//! │   (lock registry, task waiter, workflows)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │ trait ComputeApi
//! ┌─────────────────▼───────────────────────────────┐
//! │                scaleflow-cloud                   │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │  Data model  │  │  FakeCompute (test-utils) │ │
//! │  └──────────────┘  └──────────────────────────┘ │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!          ┌────────▼────────┐
//!          │   SDK client    │
//!          │ (HTTP, external)│
//!          └─────────────────┘
//! ```

pub mod api;
pub mod error;
#[cfg(feature = "test-utils")]
pub mod fake;
pub mod model;

// Re-exports
pub use api::ComputeApi;
pub use error::{CloudError, Result};
#[cfg(feature = "test-utils")]
pub use fake::{Call, FakeCompute, Op};
pub use model::{ROOT_VOLUME_SLOT, Server, ServerAction, ServerState, Task, TaskStatus, Volume};
