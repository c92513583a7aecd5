pub mod executor;
mod http;
pub mod request;
pub mod result;
mod tcp;
pub mod timer;

pub mod prelude {
    pub use super::executor::{NetworkExecutor, PROBE_TIMEOUT, ProbeExecutor};
    pub use super::request::{CheckRequest, HttpProbeRequest, ProbeTarget, TcpProbeRequest};
    pub use super::result::{ProbeError, ProbeResult};
    pub use super::timer::{Phase, PhaseTimer, PhaseTimings};
}

use std::fmt::Write;

/// Flattens an error and its source chain into one line, the form stored
/// in a result's `error` field. A source that repeats its parent's text
/// is skipped.
pub(crate) fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    let mut previous = s.clone();
    while let Some(src) = err.source() {
        let text = src.to_string();
        if text != previous {
            let _ = write!(s, ": {}", text);
        }
        previous = text;
        err = src;
    }
    s
}
