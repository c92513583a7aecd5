use serde::Deserialize;

/// Optional YAML configuration file. Every key can also be supplied via the
/// environment, which wins when both are set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// The region this node executes probes in, e.g. `iad`.
    pub region: Option<String>,

    /// Shared secret expected in the `Authorization: Basic <secret>` header.
    pub secret: Option<String>,

    /// PostgreSQL connection string of the TimescaleDB instance.
    pub database_url: Option<String>,

    /// Hosting provider. Only `fly` supports replaying a request in another region.
    pub cloud_provider: Option<String>,

    /// Port the HTTP front end listens on.
    pub port: Option<u16>,

    /// env_logger filter, e.g. `info` or `edgeprobe=debug`.
    pub log_level: Option<String>,

    /// Nameserver IPs used for probe DNS lookups.
    /// Defaults to the system resolver configuration.
    #[serde(default)]
    pub dns_hosts: Vec<String>,
}
