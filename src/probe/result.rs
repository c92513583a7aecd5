use std::collections::BTreeMap;

use thiserror::Error;

use super::timer::PhaseTimings;

/// Outcome of one probe attempt. A target that could not be reached is
/// still a result: `error` carries the reason and `status` stays 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResult {
    pub region: String,
    pub status: u16,
    pub latency: i64,
    pub timestamp: i64,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<String>,
    pub error: String,
    pub timing: PhaseTimings,
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// The probe could not be attempted at all because its input is malformed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid url {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("url {0:?} has no host")]
    MissingHost(String),

    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    #[error("invalid tcp address {0:?}, expected host:port")]
    InvalidAddress(String),

    #[error("failed to build request")]
    Request(#[from] hyper::http::Error),
}

/// Failure while talking to the target. These end up as the `error`
/// string of a [`ProbeResult`], never as a pipeline error.
#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error("dns lookup for {host} failed")]
    Dns {
        host: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },

    #[error("dns lookup for {0} returned no addresses")]
    NoAddress(String),

    #[error("dial tcp {addr} failed")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tls handshake with {host} failed")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },

    #[error("http exchange failed")]
    Http(#[from] hyper::Error),

    #[error("Timeout: probe exceeded {0:?}")]
    Timeout(std::time::Duration),
}
