use std::time::{Duration, Instant};

use async_trait::async_trait;
use trust_dns_resolver::TokioAsyncResolver;

use super::http::{HttpPlan, probe_http};
use super::prelude::*;
use super::report;
use super::result::TransportError;
use super::tcp::{TcpPlan, probe_tcp};
use super::timer::now_millis;
use crate::config::app_config::ResolverSettings;

/// Upper bound on a whole probe, from first DNS packet to last body byte.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(45);

/// Runs a single probe against a target.
///
/// `Err` is reserved for requests that cannot be attempted. A target that
/// is down, slow or misbehaving produces `Ok` with `error` populated.
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn execute(&self, target: &ProbeTarget) -> Result<ProbeResult, ProbeError>;
}

/// Executor that talks to the network. Every call builds its own resolver
/// and connection, so nothing is pooled between probes and each one pays
/// the full DNS and connect cost it is supposed to measure.
pub struct NetworkExecutor {
    region: String,
    resolver: ResolverSettings,
    timeout: Duration,
}

impl NetworkExecutor {
    pub fn new(region: impl Into<String>, resolver: ResolverSettings) -> Self {
        Self {
            region: region.into(),
            resolver,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn fresh_resolver(&self) -> TokioAsyncResolver {
        TokioAsyncResolver::tokio(self.resolver.config.clone(), self.resolver.opts.clone())
    }
}

#[async_trait]
impl ProbeExecutor for NetworkExecutor {
    async fn execute(&self, target: &ProbeTarget) -> Result<ProbeResult, ProbeError> {
        let timer = PhaseTimer::new();
        let resolver = self.fresh_resolver();
        let start = Instant::now();

        let mut result = ProbeResult {
            region: self.region.clone(),
            ..Default::default()
        };

        match target {
            ProbeTarget::Http(req) => {
                let plan = HttpPlan::build(req)?;
                match bounded(self.timeout, probe_http(&timer, &resolver, plan)).await {
                    Ok(capture) => {
                        result.status = capture.status;
                        result.headers = Some(capture.headers);
                        result.body = Some(capture.body);
                    }
                    Err(err) => result.error = report(&err),
                }
            }
            ProbeTarget::Tcp(req) => {
                let plan = TcpPlan::build(req)?;
                if let Err(err) = bounded(self.timeout, probe_tcp(&timer, &resolver, plan)).await {
                    result.error = report(&err);
                }
            }
        }

        result.latency = start.elapsed().as_millis() as i64;
        result.timestamp = now_millis();
        result.timing = timer.timings();

        if result.is_success() {
            log::info!(
                "[{}] ✅ {}: status {}, {}ms",
                self.region,
                target.address(),
                result.status,
                result.latency
            );
        } else {
            log::warn!(
                "[{}] ❌ {}: {} after {}ms",
                self.region,
                target.address(),
                result.error,
                result.latency
            );
        }

        Ok(result)
    }
}

async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(outcome) => outcome,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}
