use scaleflow_cloud::{FakeCompute, Server};
use scaleflow_config::LifecycleConfig;
use scaleflow_lifecycle::{Lifecycle, LockSet};
use std::sync::Arc;
use std::time::Duration;

pub struct TestCloud {
    pub fake: Arc<FakeCompute>,
    pub lifecycle: Lifecycle<Arc<FakeCompute>>,
}

impl TestCloud {
    pub fn new() -> Self {
        Self::with(FakeCompute::new(), LifecycleConfig::default())
    }

    #[allow(dead_code)]
    pub fn with_latency(latency: Duration, config: LifecycleConfig) -> Self {
        Self::with(FakeCompute::new().with_latency(latency), config)
    }

    fn with(fake: FakeCompute, config: LifecycleConfig) -> Self {
        init_tracing();
        let fake = Arc::new(fake);
        let lifecycle = Lifecycle::with_locks(Arc::clone(&fake), config, Arc::new(LockSet::new()));
        Self { fake, lifecycle }
    }

    pub fn add(&self, server: Server) -> &Self {
        self.fake.insert_server(server);
        self
    }
}

/// Route lifecycle logs to the test output (`RUST_LOG=debug cargo test`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
