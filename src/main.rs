use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};

use edgeprobe::config::{load_config, setup_resolver};
use edgeprobe::handlers::{self, Handler};
use edgeprobe::probe::prelude::NetworkExecutor;
use edgeprobe::telemetry::{TelemetryStore, TimescaleClient};

/// In-flight checks get this long to finish once a shutdown signal arrives.
const SHUTDOWN_GRACE_SECONDS: u64 = 10;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .init();

    log::info!("Using DNS hosts: {:?}", config.dns_hosts);
    let resolver = setup_resolver(&config.dns_hosts)?;

    let store = Arc::new(TimescaleClient::connect(&config.database_url).await?);
    let executor = Arc::new(NetworkExecutor::new(config.region.clone(), resolver));
    let handler = web::Data::new(Handler::new(&config, executor, store.clone()));

    log::info!(
        "Starting checker in region {} on port {} (edge replay: {})",
        config.region,
        config.port,
        config.edge_replay_supported()
    );

    // actix-web stops on SIGINT/SIGTERM and waits up to the grace period
    // for running handlers before dropping them.
    let served = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(handler.clone())
            .configure(handlers::configure)
    })
    .shutdown_timeout(SHUTDOWN_GRACE_SECONDS)
    .bind(("0.0.0.0", config.port))?
    .run()
    .await;

    store.close().await;
    log::info!("TimescaleDB pool closed");

    served?;
    Ok(())
}
