//! Region placement: decide whether a check runs on this node or gets
//! replayed by the edge in the region the caller asked for.

use crate::config::AppConfig;

/// Response header read by the Fly.io proxy to replay a request elsewhere.
pub const REPLAY_HEADER: &str = "fly-replay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Local,
    /// Hand the request back to the edge to replay in this region.
    Remote(String),
}

#[derive(Debug, Clone)]
pub struct RegionDispatcher {
    local_region: String,
    edge_replay: bool,
}

impl RegionDispatcher {
    pub fn new(local_region: impl Into<String>, edge_replay: bool) -> Self {
        Self {
            local_region: local_region.into(),
            edge_replay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.region.clone(), config.edge_replay_supported())
    }

    pub fn local_region(&self) -> &str {
        &self.local_region
    }

    /// Without edge replay every request runs where it landed.
    pub fn place(&self, requested: &str) -> Placement {
        if self.edge_replay && requested != self.local_region {
            Placement::Remote(requested.to_string())
        } else {
            Placement::Local
        }
    }
}

pub fn replay_directive(region: &str) -> String {
    format!("region={region}")
}
