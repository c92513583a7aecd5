use std::env;
use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;
use trust_dns_resolver::config::{
    NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts,
};
use trust_dns_resolver::system_conf::read_system_conf;

use super::model::FileConfig;

const DEFAULT_REGION: &str = "local";
const DEFAULT_CLOUD_PROVIDER: &str = "fly";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "warn";

/// The only provider whose edge can replay a request in another region.
const EDGE_REPLAY_PROVIDER: &str = "fly";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid PORT {0:?}")]
    Port(String),

    #[error("invalid DNS host {0:?}")]
    DnsHost(String),

    #[error("TIMESCALE_URL or DATABASE_URL must be set")]
    MissingDatabaseUrl,
}

/// Process configuration, read once at startup and handed to the
/// components that need it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub region: String,
    pub secret: String,
    pub database_url: String,
    pub cloud_provider: String,
    pub port: u16,
    pub log_level: String,
    pub dns_hosts: Vec<String>,
}

impl AppConfig {
    /// Merges the file configuration with environment lookups. Environment
    /// values take precedence; defaults fill whatever is left.
    pub fn resolve(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let first = |keys: &[&str]| keys.iter().find_map(|&key| lookup(key));

        let region = first(&["FLY_REGION", "REGION"])
            .or(file.region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let secret = first(&["CRON_SECRET"]).or(file.secret).unwrap_or_default();
        let database_url = first(&["TIMESCALE_URL", "DATABASE_URL"])
            .or(file.database_url)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;
        let cloud_provider = first(&["CLOUD_PROVIDER"])
            .or(file.cloud_provider)
            .unwrap_or_else(|| DEFAULT_CLOUD_PROVIDER.to_string());
        let port = match first(&["PORT"]) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Port(raw))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };
        let log_level = first(&["RUST_LOG", "LOG_LEVEL"])
            .or(file.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let dns_hosts = match first(&["DNS_HOSTS"]) {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => file.dns_hosts,
        };

        Ok(Self {
            region,
            secret,
            database_url,
            cloud_provider,
            port,
            log_level,
            dns_hosts,
        })
    }

    pub fn edge_replay_supported(&self) -> bool {
        self.cloud_provider == EDGE_REPLAY_PROVIDER
    }
}

/// Load the application configuration from an optional YAML file and the environment.
/// The file is read from `CONFIG_FILE` when that variable is set; a `.env` file in the
/// working directory is honoured as well.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let _ = dotenvy::dotenv();

    let file = match env::var("CONFIG_FILE") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml { path, source })?
        }
        Err(_) => FileConfig::default(),
    };

    AppConfig::resolve(file, |key| env::var(key).ok())
}

/// Resolver configuration shared by all probes. Each probe builds its own
/// resolver from it, so no lookup is ever answered from another probe's cache.
#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    pub config: ResolverConfig,
    pub opts: ResolverOpts,
}

/// Setup the probe resolver settings.
/// With explicit DNS hosts, queries go to those nameservers over TCP. Without, the
/// system configuration (`/etc/resolv.conf`) is used.
/// The cache is disabled so every probe measures a real lookup.
pub fn setup_resolver(dns_hosts: &[String]) -> Result<ResolverSettings, ConfigError> {
    let (config, mut opts) = if dns_hosts.is_empty() {
        read_system_conf().unwrap_or_else(|err| {
            log::warn!("Failed to read system resolver config, using defaults: {err}");
            (ResolverConfig::default(), ResolverOpts::default())
        })
    } else {
        let mut name_servers = NameServerConfigGroup::new();
        for host in dns_hosts {
            let ip: IpAddr = host
                .parse()
                .map_err(|_| ConfigError::DnsHost(host.clone()))?;
            name_servers.push(NameServerConfig {
                socket_addr: (ip, 53).into(),
                protocol: Protocol::Tcp,
                tls_dns_name: None,
                trust_negative_responses: false,
                bind_addr: None,
            });
        }
        (
            ResolverConfig::from_parts(None, vec![], name_servers),
            ResolverOpts::default(),
        )
    };

    opts.attempts = 2;
    opts.timeout = Duration::from_secs(5);
    opts.cache_size = 0;

    Ok(ResolverSettings { config, opts })
}
