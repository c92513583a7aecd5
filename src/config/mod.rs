pub mod app_config;
pub mod model;

pub use app_config::{AppConfig, ConfigError, ResolverSettings, load_config, setup_resolver};
