use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::Handler;
use crate::config::AppConfig;
use crate::probe::prelude::*;
use crate::retry::RetryPolicy;
pub(crate) use crate::telemetry::memory::MemoryStore;

pub const SECRET: &str = "s3cret";
pub const AUTH: &str = "Basic s3cret";

/// Executor that never touches the network. It fails the first
/// `failures` calls with an invocation error, then returns `result`.
pub struct SpyExecutor {
    calls: AtomicU32,
    failures: u32,
    result: ProbeResult,
}

impl SpyExecutor {
    pub fn succeeding() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures,
            result: ProbeResult {
                region: "iad".into(),
                status: 200,
                latency: 35,
                timestamp: 1_700_000_000_000,
                headers: Some([("server".to_string(), "nginx".to_string())].into()),
                body: Some("ok".into()),
                error: String::new(),
                timing: PhaseTimings {
                    connect_start: 1_699_999_999_965,
                    connect_done: 1_699_999_999_975,
                    ..Default::default()
                },
            },
        }
    }

    pub fn always_failing() -> Self {
        Self::failing_first(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeExecutor for SpyExecutor {
    async fn execute(&self, _target: &ProbeTarget) -> Result<ProbeResult, ProbeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(ProbeError::InvalidMethod(format!("call {call}")));
        }
        Ok(self.result.clone())
    }
}

pub fn config(edge_replay: bool) -> AppConfig {
    AppConfig {
        region: "iad".into(),
        secret: SECRET.into(),
        database_url: "postgres://localhost/test".into(),
        cloud_provider: if edge_replay { "fly" } else { "koyeb" }.into(),
        port: 8080,
        log_level: "warn".into(),
        dns_hosts: Vec::new(),
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(2),
        ..Default::default()
    }
}

pub fn handler_with(
    executor: Arc<dyn ProbeExecutor>,
    store: Arc<MemoryStore>,
    edge_replay: bool,
) -> Handler {
    Handler::new(&config(edge_replay), executor, store).with_retry(fast_retry())
}

/// Handler wired to a spy executor and an in-memory store.
pub fn fixture(spy: SpyExecutor, edge_replay: bool) -> (Handler, Arc<SpyExecutor>, Arc<MemoryStore>) {
    let spy = Arc::new(spy);
    let store = Arc::new(MemoryStore::default());
    let handler = handler_with(spy.clone(), store.clone(), edge_replay);
    (handler, spy, store)
}
