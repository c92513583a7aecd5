use std::collections::BTreeMap;

use crate::probe::prelude::*;

use super::Trigger;
use super::value::Attributes;

/// One HTTP probe outcome, as written to `http_responses`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpTelemetryRecord {
    pub timestamp: i64,
    pub monitor_id: String,
    pub workspace_id: String,
    pub region: String,
    pub url: String,
    pub latency: i32,
    pub status_code: Option<i16>,
    pub error: bool,
    pub cron_timestamp: i64,
    pub message: Option<String>,
    pub timing: Option<PhaseTimings>,
    pub headers: Option<BTreeMap<String, String>>,
    pub assertions: Option<Attributes>,
    pub body: Option<String>,
    pub trigger: Option<Trigger>,
}

/// One TCP probe outcome, as written to `tcp_responses`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TcpTelemetryRecord {
    pub timestamp: i64,
    pub monitor_id: String,
    pub workspace_id: String,
    pub region: String,
    pub uri: Option<String>,
    pub latency: i64,
    pub error: bool,
    pub cron_timestamp: i64,
    pub error_message: Option<String>,
    pub trigger: Option<Trigger>,
}

/// An audit trail entry, as written to `audit_logs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLogRecord {
    pub timestamp: i64,
    pub id: String,
    pub action: String,
    pub actor: String,
    pub targets: Option<Attributes>,
    pub metadata: Option<Attributes>,
    pub version: Option<i32>,
}

impl HttpTelemetryRecord {
    pub fn from_probe(check: &CheckRequest<HttpProbeRequest>, result: &ProbeResult) -> Self {
        let error = (!result.is_success()).then(|| result.error.clone());
        Self {
            timestamp: result.timestamp,
            monitor_id: check.request_id.to_string(),
            workspace_id: check.workspace_id.to_string(),
            region: result.region.clone(),
            url: check.target.url.clone(),
            latency: i32::try_from(result.latency).unwrap_or(i32::MAX),
            status_code: (result.status != 0)
                .then(|| i16::try_from(result.status).ok())
                .flatten(),
            error: error.is_some(),
            cron_timestamp: result.timestamp,
            message: error,
            timing: Some(result.timing),
            headers: result.headers.clone(),
            assertions: check.assertions.clone(),
            body: result.body.clone().filter(|b| !b.is_empty()),
            trigger: Some(check.trigger()),
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }
}

impl TcpTelemetryRecord {
    pub fn from_probe(check: &CheckRequest<TcpProbeRequest>, result: &ProbeResult) -> Self {
        let error = (!result.is_success()).then(|| result.error.clone());
        Self {
            timestamp: result.timestamp,
            monitor_id: check.request_id.to_string(),
            workspace_id: check.workspace_id.to_string(),
            region: result.region.clone(),
            uri: Some(check.target.uri.clone()),
            latency: result.latency,
            error: error.is_some(),
            cron_timestamp: result.timestamp,
            error_message: error,
            trigger: Some(check.trigger()),
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }
}
