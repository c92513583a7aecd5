use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::value::encode_json;
use super::*;

const MAX_CONNECTIONS: u32 = 20;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_AUDIT_VERSION: i32 = 1;

// JSON parameters are cast to jsonb so the statements work whether the
// columns are jsonb or text.
const INSERT_HTTP_RESPONSE: &str = r#"
    INSERT INTO http_responses (
        time, monitor_id, workspace_id, region, url, latency,
        status_code, error, cron_timestamp, message, timing,
        headers, assertions, body, trigger
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::jsonb, $12::jsonb, $13::jsonb, $14, $15)"#;

const INSERT_TCP_RESPONSE: &str = r#"
    INSERT INTO tcp_responses (
        time, monitor_id, workspace_id, region, uri, latency,
        error, cron_timestamp, error_message, trigger
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#;

const INSERT_AUDIT_LOG: &str = r#"
    INSERT INTO audit_logs (
        time, id, action, actor, targets, metadata, version
    ) VALUES ($1, $2, $3, $4, $5::jsonb, $6::jsonb, $7)"#;

/// Column values for one `http_responses` row.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponseRow {
    pub time: DateTime<Utc>,
    pub monitor_id: String,
    pub workspace_id: String,
    pub region: String,
    pub url: String,
    pub latency: i32,
    pub status_code: Option<i16>,
    pub error: bool,
    pub cron_timestamp: i64,
    pub message: Option<String>,
    pub timing: Option<String>,
    pub headers: Option<String>,
    pub assertions: Option<String>,
    pub body: Option<String>,
    pub trigger: &'static str,
}

/// Column values for one `tcp_responses` row.
#[derive(Debug, Clone, PartialEq)]
pub struct TcpResponseRow {
    pub time: DateTime<Utc>,
    pub monitor_id: String,
    pub workspace_id: String,
    pub region: String,
    pub uri: Option<String>,
    pub latency: i64,
    pub error: bool,
    pub cron_timestamp: i64,
    pub error_message: Option<String>,
    pub trigger: &'static str,
}

/// Column values for one `audit_logs` row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogRow {
    pub time: DateTime<Utc>,
    pub id: String,
    pub action: String,
    pub actor: String,
    pub targets: Option<String>,
    pub metadata: Option<String>,
    pub version: i32,
}

fn to_time(timestamp_ms: i64) -> Result<DateTime<Utc>, PersistError> {
    DateTime::from_timestamp_millis(timestamp_ms).ok_or(PersistError::Timestamp(timestamp_ms))
}

impl TryFrom<HttpTelemetryRecord> for HttpResponseRow {
    type Error = PersistError;

    fn try_from(record: HttpTelemetryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            time: to_time(record.timestamp)?,
            timing: encode_json("timing", record.timing.as_ref())?,
            headers: encode_json("headers", record.headers.as_ref())?,
            assertions: encode_json("assertions", record.assertions.as_ref())?,
            monitor_id: record.monitor_id,
            workspace_id: record.workspace_id,
            region: record.region,
            url: record.url,
            latency: record.latency,
            status_code: record.status_code,
            error: record.error,
            cron_timestamp: record.cron_timestamp,
            message: record.message,
            body: record.body,
            trigger: record.trigger.unwrap_or_default().as_str(),
        })
    }
}

impl TryFrom<TcpTelemetryRecord> for TcpResponseRow {
    type Error = PersistError;

    fn try_from(record: TcpTelemetryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            time: to_time(record.timestamp)?,
            monitor_id: record.monitor_id,
            workspace_id: record.workspace_id,
            region: record.region,
            uri: record.uri,
            latency: record.latency,
            error: record.error,
            cron_timestamp: record.cron_timestamp,
            error_message: record.error_message,
            trigger: record.trigger.unwrap_or_default().as_str(),
        })
    }
}

impl TryFrom<AuditLogRecord> for AuditLogRow {
    type Error = PersistError;

    fn try_from(record: AuditLogRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            time: to_time(record.timestamp)?,
            targets: encode_json("targets", record.targets.as_ref())?,
            metadata: encode_json("metadata", record.metadata.as_ref())?,
            id: record.id,
            action: record.action,
            actor: record.actor,
            version: record
                .version
                .filter(|v| *v != 0)
                .unwrap_or(DEFAULT_AUDIT_VERSION),
        })
    }
}

/// TimescaleDB writer over a shared PostgreSQL pool.
#[derive(Clone)]
pub struct TimescaleClient {
    pool: PgPool,
}

impl TimescaleClient {
    /// Opens the pool and checks the database answers before returning.
    pub async fn connect(connection_string: &str) -> Result<Self, PersistError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect(connection_string)
            .await
            .map_err(PersistError::Connect)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(PersistError::Connect)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl TelemetryStore for TimescaleClient {
    async fn insert_http_response(&self, record: HttpTelemetryRecord) -> Result<(), PersistError> {
        let row = HttpResponseRow::try_from(record)?;
        sqlx::query(INSERT_HTTP_RESPONSE)
            .bind(row.time)
            .bind(row.monitor_id)
            .bind(row.workspace_id)
            .bind(row.region)
            .bind(row.url)
            .bind(row.latency)
            .bind(row.status_code)
            .bind(row.error)
            .bind(row.cron_timestamp)
            .bind(row.message)
            .bind(row.timing)
            .bind(row.headers)
            .bind(row.assertions)
            .bind(row.body)
            .bind(row.trigger)
            .execute(&self.pool)
            .await
            .map_err(|source| PersistError::Insert {
                table: "http_responses",
                source,
            })?;
        Ok(())
    }

    async fn insert_tcp_response(&self, record: TcpTelemetryRecord) -> Result<(), PersistError> {
        let row = TcpResponseRow::try_from(record)?;
        sqlx::query(INSERT_TCP_RESPONSE)
            .bind(row.time)
            .bind(row.monitor_id)
            .bind(row.workspace_id)
            .bind(row.region)
            .bind(row.uri)
            .bind(row.latency)
            .bind(row.error)
            .bind(row.cron_timestamp)
            .bind(row.error_message)
            .bind(row.trigger)
            .execute(&self.pool)
            .await
            .map_err(|source| PersistError::Insert {
                table: "tcp_responses",
                source,
            })?;
        Ok(())
    }

    async fn insert_audit_log(&self, record: AuditLogRecord) -> Result<(), PersistError> {
        let row = AuditLogRow::try_from(record)?;
        sqlx::query(INSERT_AUDIT_LOG)
            .bind(row.time)
            .bind(row.id)
            .bind(row.action)
            .bind(row.actor)
            .bind(row.targets)
            .bind(row.metadata)
            .bind(row.version)
            .execute(&self.pool)
            .await
            .map_err(|source| PersistError::Insert {
                table: "audit_logs",
                source,
            })?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
