//! HTTP front end: `/checker/*`, `/ping/{region}`, `/tcp/{region}` and `/health`.

use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;

use crate::config::AppConfig;
use crate::dispatch::{Placement, REPLAY_HEADER, RegionDispatcher, replay_directive};
use crate::probe::prelude::*;
use crate::probe::report;
use crate::retry::RetryPolicy;
use crate::telemetry::{HttpTelemetryRecord, TcpTelemetryRecord, TelemetryStore};

pub mod checker;
pub mod ping;
pub mod response;
pub mod tcp;

#[cfg(test)]
mod testing;

/// Shared, read-only state for every request.
pub struct Handler {
    secret: String,
    dispatcher: RegionDispatcher,
    executor: Arc<dyn ProbeExecutor>,
    store: Arc<dyn TelemetryStore>,
    retry: RetryPolicy,
}

impl Handler {
    pub fn new(
        config: &AppConfig,
        executor: Arc<dyn ProbeExecutor>,
        store: Arc<dyn TelemetryStore>,
    ) -> Self {
        Self {
            secret: config.secret.clone(),
            dispatcher: RegionDispatcher::from_config(config),
            executor,
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn authorized(&self, req: &HttpRequest) -> bool {
        let expected = format!("Basic {}", self.secret);
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == expected)
    }

    fn authenticate(&self, req: &HttpRequest) -> Result<(), HttpResponse> {
        if self.authorized(req) {
            Ok(())
        } else {
            Err(HttpResponse::Unauthorized().json(json!({"error": "unauthorized"})))
        }
    }

    /// Everything that has to pass before the body is even looked at:
    /// a region, a valid secret, and this node being the right place.
    fn admit(&self, req: &HttpRequest, region: &str) -> Result<(), HttpResponse> {
        if region.is_empty() {
            return Err(HttpResponse::BadRequest().body("region is required"));
        }

        self.authenticate(req)?;

        match self.dispatcher.place(region) {
            Placement::Local => Ok(()),
            Placement::Remote(region) => {
                log::info!(
                    "[{}] replaying request in {region}",
                    self.dispatcher.local_region()
                );
                Err(HttpResponse::Accepted()
                    .insert_header((REPLAY_HEADER, replay_directive(&region)))
                    .body(format!("Forwarding request to {region}")))
            }
        }
    }

    /// Runs the probe under the retry policy. `None` means every attempt
    /// failed before the target was even tried.
    async fn probe(&self, target: &ProbeTarget) -> Option<ProbeResult> {
        match self.retry.retry(|_| self.executor.execute(target)).await {
            Ok(result) => Some(result),
            Err(exhausted) => {
                log::error!("{} not reachable: {}", target.address(), report(&exhausted));
                None
            }
        }
    }

    // Persistence is best effort: failures are logged, never returned.

    async fn persist_http(&self, record: HttpTelemetryRecord) {
        if let Err(err) = self.store.insert_http_response(record).await {
            log::error!("failed to send event to TimescaleDB: {}", report(&err));
        }
    }

    async fn persist_tcp(&self, record: TcpTelemetryRecord) {
        if let Err(err) = self.store.insert_tcp_response(record).await {
            log::error!("failed to send event to TimescaleDB: {}", report(&err));
        }
    }
}

fn invalid_request(err: serde_json::Error) -> HttpResponse {
    log::error!("failed to decode checker request: {err}");
    HttpResponse::BadRequest().json(json!({"error": "invalid request"}))
}

fn not_reachable() -> HttpResponse {
    HttpResponse::Ok().json(json!({"message": "url not reachable"}))
}

pub async fn health(handler: web::Data<Handler>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "pong",
        "fly_region": handler.dispatcher.local_region(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/checker", web::post().to(checker::http_checker))
        .route("/checker/http", web::post().to(checker::http_checker))
        .route("/checker/tcp", web::post().to(checker::tcp_checker))
        .route("/ping/{region:[^/]*}", web::post().to(ping::ping_region))
        .route("/tcp/{region:[^/]*}", web::post().to(tcp::tcp_region))
        .route("/health", web::get().to(health));
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};

    use super::testing::*;
    use super::*;

    #[actix_web::test]
    async fn test_health_needs_no_authorization() {
        let (handler, _, _) = fixture(SpyExecutor::succeeding(), true);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(handler))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({"message": "pong", "fly_region": "iad"}));
    }
}
