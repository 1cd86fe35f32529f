//! Lifecycle coordinator

use crate::error::Result;
use crate::registry::LockSet;
use scaleflow_cloud::{ComputeApi, Server};
use scaleflow_config::LifecycleConfig;
use std::sync::Arc;

/// Coordinates lifecycle operations against one control plane
///
/// Operations are spread over the component modules: [`crate::executor`]
/// (power on/off, terminate), [`crate::waiter`] (task polling),
/// [`crate::workflow`] (stopped-server workflow) and [`crate::teardown`].
/// A `Lifecycle` built with [`Lifecycle::new`] shares the process-wide
/// [`LockSet`], so separately constructed coordinators still serialize
/// operations on the same server.
#[derive(Debug)]
pub struct Lifecycle<A> {
    pub(crate) api: A,
    pub(crate) config: LifecycleConfig,
    pub(crate) locks: Arc<LockSet>,
}

impl<A: Clone> Clone for Lifecycle<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            config: self.config.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<A: ComputeApi> Lifecycle<A> {
    /// Coordinator using the process-wide lock set
    pub fn new(api: A, config: LifecycleConfig) -> Self {
        Self::with_locks(api, config, LockSet::global())
    }

    /// Coordinator using a caller-provided lock set
    pub fn with_locks(api: A, config: LifecycleConfig, locks: Arc<LockSet>) -> Self {
        Self { api, config, locks }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<LockSet> {
        &self.locks
    }

    /// Fetch a fresh server snapshot under the control-plane lock
    pub async fn fetch_server(&self, server_id: &str) -> Result<Server> {
        let _api = self.locks.api_call(self.config.serialize_api_calls).await;
        Ok(self.api.get_server(server_id).await?)
    }
}
