//! Write-only persistence of probe outcomes and audit entries into the
//! TimescaleDB hypertables.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod client;
pub mod record;
pub mod value;

pub use client::TimescaleClient;
pub use record::{AuditLogRecord, HttpTelemetryRecord, TcpTelemetryRecord};
pub use value::{AttributeValue, Attributes};

/// Why a probe ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Cron,
    Api,
}

impl Trigger {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cron" => Some(Trigger::Cron),
            "api" => Some(Trigger::Api),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Cron => "cron",
            Trigger::Api => "api",
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode {field}")]
    Encode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("timestamp {0} ms is out of range")]
    Timestamp(i64),

    #[error("failed to connect to TimescaleDB")]
    Connect(#[source] sqlx::Error),

    #[error("insert into {table} failed")]
    Insert {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Single-row, append-only inserts. A failed insert is reported to the
/// caller and never retried here.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn insert_http_response(&self, record: HttpTelemetryRecord) -> Result<(), PersistError>;

    async fn insert_tcp_response(&self, record: TcpTelemetryRecord) -> Result<(), PersistError>;

    async fn insert_audit_log(&self, record: AuditLogRecord) -> Result<(), PersistError>;

    async fn close(&self);
}
