use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A named sub-interval of a probe's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Dns,
    Connect,
    TlsHandshake,
    FirstByte,
    Transfer,
}

impl Phase {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            Phase::Dns => 0,
            Phase::Connect => 1,
            Phase::TlsHandshake => 2,
            Phase::FirstByte => 3,
            Phase::Transfer => 4,
        }
    }
}

/// Start and done timestamps for every phase, in milliseconds since the epoch.
/// Phases that never ran are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimings {
    pub dns_start: i64,
    pub dns_done: i64,
    pub connect_start: i64,
    pub connect_done: i64,
    pub tls_handshake_start: i64,
    pub tls_handshake_done: i64,
    pub first_byte_start: i64,
    pub first_byte_done: i64,
    pub transfer_start: i64,
    pub transfer_done: i64,
}

/// Per-phase durations in milliseconds, derived from [`PhaseTimings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseDurations {
    pub dns: i64,
    pub connect: i64,
    pub tls: i64,
    pub ttfb: i64,
    pub transfer: i64,
}

impl PhaseTimings {
    pub fn pairs(&self) -> [(i64, i64); Phase::COUNT] {
        [
            (self.dns_start, self.dns_done),
            (self.connect_start, self.connect_done),
            (self.tls_handshake_start, self.tls_handshake_done),
            (self.first_byte_start, self.first_byte_done),
            (self.transfer_start, self.transfer_done),
        ]
    }

    pub fn phases(&self) -> PhaseDurations {
        let span = |(start, done): (i64, i64)| {
            if start == 0 || done == 0 { 0 } else { done - start }
        };
        let [dns, connect, tls, ttfb, transfer] = self.pairs().map(span);
        PhaseDurations {
            dns,
            connect,
            tls,
            ttfb,
            transfer,
        }
    }
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Captures phase timestamps for a single network operation.
///
/// Hooks are fired by the transport as each phase begins and ends. When a
/// phase fires more than once (a resolver retry, a second connect attempt)
/// the first start and the last done are kept.
pub struct PhaseTimer {
    clock: Clock,
    starts: [AtomicI64; Phase::COUNT],
    dones: [AtomicI64; Phase::COUNT],
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTimer {
    /// Timer anchored at the current wall clock and advanced by a monotonic
    /// clock, so later hooks never read earlier than former ones.
    pub fn new() -> Self {
        let origin = Instant::now();
        let origin_ms = now_millis();
        Self::with_clock(move || origin_ms + origin.elapsed().as_millis() as i64)
    }

    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            starts: std::array::from_fn(|_| AtomicI64::new(0)),
            dones: std::array::from_fn(|_| AtomicI64::new(0)),
        }
    }

    pub fn start(&self, phase: Phase) {
        let now = (self.clock)();
        let _ = self.starts[phase.index()].compare_exchange(
            0,
            now,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    pub fn done(&self, phase: Phase) {
        let now = (self.clock)();
        self.dones[phase.index()].store(now, Ordering::Relaxed);
    }

    pub fn timings(&self) -> PhaseTimings {
        let start = |phase: Phase| self.starts[phase.index()].load(Ordering::Relaxed);
        let done = |phase: Phase| self.dones[phase.index()].load(Ordering::Relaxed);
        PhaseTimings {
            dns_start: start(Phase::Dns),
            dns_done: done(Phase::Dns),
            connect_start: start(Phase::Connect),
            connect_done: done(Phase::Connect),
            tls_handshake_start: start(Phase::TlsHandshake),
            tls_handshake_done: done(Phase::TlsHandshake),
            first_byte_start: start(Phase::FirstByte),
            first_byte_done: done(Phase::FirstByte),
            transfer_start: start(Phase::Transfer),
            transfer_done: done(Phase::Transfer),
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
