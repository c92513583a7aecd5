use std::collections::BTreeMap;

use serde::Serialize;

use crate::probe::prelude::*;

fn is_zero(v: &i64) -> bool {
    *v == 0
}

fn is_zero_status(v: &u16) -> bool {
    *v == 0
}

/// Body returned by `/ping/{region}`. HTTP 200 regardless of whether the
/// checked target answered; failures travel in `error`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    pub region: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub request_id: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub workspace_id: i64,
    pub latency: i64,
    pub timestamp: i64,
    pub timing: PhaseTimings,
    #[serde(skip_serializing_if = "is_zero_status")]
    pub status: u16,
}

impl PingResponse {
    pub fn new(check: &CheckRequest<HttpProbeRequest>, result: ProbeResult) -> Self {
        Self {
            headers: result.headers.filter(|h| !h.is_empty()),
            error: result.error,
            body: result.body.unwrap_or_default(),
            region: result.region,
            tags: Vec::new(),
            request_id: check.request_id,
            workspace_id: check.workspace_id,
            latency: result.latency,
            timestamp: result.timestamp,
            timing: result.timing,
            status: result.status,
        }
    }
}

/// Body returned by `/tcp/{region}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpResponse {
    pub region: String,
    pub uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub request_id: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub workspace_id: i64,
    pub latency: i64,
    pub timestamp: i64,
    pub timing: PhaseTimings,
}

impl TcpResponse {
    pub fn new(check: &CheckRequest<TcpProbeRequest>, result: ProbeResult) -> Self {
        Self {
            region: result.region,
            uri: check.target.uri.clone(),
            error: result.error,
            request_id: check.request_id,
            workspace_id: check.workspace_id,
            latency: result.latency,
            timestamp: result.timestamp,
            timing: result.timing,
        }
    }
}
