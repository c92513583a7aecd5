use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::telemetry::{Attributes, Trigger};

fn default_method() -> String {
    "GET".to_string()
}

/// Unknown or non-string trigger values read as absent.
fn lenient_trigger<'de, D>(deserializer: D) -> Result<Option<Trigger>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(Trigger::from_name))
}

/// An HTTP target: method, URL, request headers and an optional body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpProbeRequest {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub body: Option<String>,
}

/// A TCP target in `host:port` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpProbeRequest {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeTarget {
    Http(HttpProbeRequest),
    Tcp(TcpProbeRequest),
}

impl ProbeTarget {
    /// The target as it is recorded in telemetry.
    pub fn address(&self) -> &str {
        match self {
            ProbeTarget::Http(req) => &req.url,
            ProbeTarget::Tcp(req) => &req.uri,
        }
    }
}

/// Inbound check envelope: the target plus the correlation identifiers
/// used when the result is persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest<T> {
    #[serde(flatten)]
    pub target: T,

    #[serde(default)]
    pub request_id: i64,

    #[serde(default)]
    pub workspace_id: i64,

    #[serde(default, deserialize_with = "lenient_trigger")]
    pub trigger: Option<Trigger>,

    /// Assertion outcomes evaluated by the caller, stored with the row.
    #[serde(default)]
    pub assertions: Option<Attributes>,
}

impl<T> CheckRequest<T> {
    /// Telemetry is only written for checks that carry a monitor id.
    pub fn wants_telemetry(&self) -> bool {
        self.request_id != 0
    }

    /// On-demand checks are recorded as `api` unless told otherwise.
    pub fn trigger(&self) -> Trigger {
        self.trigger_or(Trigger::Api)
    }

    pub fn trigger_or(&self, fallback: Trigger) -> Trigger {
        self.trigger.unwrap_or(fallback)
    }
}
