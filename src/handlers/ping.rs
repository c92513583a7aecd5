use actix_web::{HttpRequest, HttpResponse, web};

use super::response::PingResponse;
use super::{Handler, invalid_request, not_reachable};
use crate::probe::prelude::*;
use crate::telemetry::HttpTelemetryRecord;

/// `POST /ping/{region}`: run an HTTP check from `region`.
pub async fn ping_region(
    handler: web::Data<Handler>,
    region: web::Path<String>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let region = region.into_inner();
    log::debug!("Start of /ping/{region}");

    if let Err(rejection) = handler.admit(&req, &region) {
        return rejection;
    }

    let check: CheckRequest<HttpProbeRequest> = match serde_json::from_slice(&body) {
        Ok(check) => check,
        Err(err) => return invalid_request(err),
    };

    let target = ProbeTarget::Http(check.target.clone());
    let Some(result) = handler.probe(&target).await else {
        return not_reachable();
    };

    if check.wants_telemetry() {
        handler
            .persist_http(HttpTelemetryRecord::from_probe(&check, &result))
            .await;
    }

    HttpResponse::Ok().json(PingResponse::new(&check, result))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::header, test};
    use serde_json::{Value, json};

    use super::super::testing::*;
    use super::super::configure;
    use super::*;
    use crate::config::ResolverSettings;
    use crate::telemetry::Trigger;

    macro_rules! app {
        ($handler:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($handler))
                    .configure(configure),
            )
            .await
        };
    }

    fn ping(region: &str, payload: Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri(&format!("/ping/{region}"))
            .insert_header((header::AUTHORIZATION, AUTH))
            .set_json(payload)
    }

    fn check_body() -> Value {
        json!({
            "url": "http://example.test",
            "method": "GET",
            "requestId": 42,
            "workspaceId": 7
        })
    }

    #[actix_web::test]
    async fn test_other_region_is_replayed_without_probing() {
        let (handler, spy, store) = fixture(SpyExecutor::succeeding(), true);
        let app = app!(handler);

        let resp = test::call_service(&app, ping("fra", check_body()).to_request()).await;

        assert_eq!(resp.status(), 202);
        assert_eq!(
            resp.headers().get("fly-replay").and_then(|v| v.to_str().ok()),
            Some("region=fra")
        );
        let body = test::read_body(resp).await;
        assert_eq!(body, "Forwarding request to fra");
        assert_eq!(spy.calls(), 0);
        assert!(store.http_rows().is_empty());
    }

    #[actix_web::test]
    async fn test_other_region_runs_locally_without_edge_replay() {
        let (handler, spy, store) = fixture(SpyExecutor::succeeding(), false);
        let app = app!(handler);

        let resp = test::call_service(&app, ping("fra", check_body()).to_request()).await;

        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get("fly-replay").is_none());
        assert_eq!(spy.calls(), 1);
        assert_eq!(store.http_rows().len(), 1);
    }

    #[actix_web::test]
    async fn test_bad_or_missing_secret_is_rejected() {
        let (handler, spy, store) = fixture(SpyExecutor::succeeding(), true);
        let app = app!(handler);

        let missing = test::TestRequest::post()
            .uri("/ping/iad")
            .set_json(check_body())
            .to_request();
        let resp = test::call_service(&app, missing).await;
        assert_eq!(resp.status(), 401);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "unauthorized"}));

        let wrong = test::TestRequest::post()
            .uri("/ping/iad")
            .insert_header((header::AUTHORIZATION, "Basic nope"))
            .set_json(check_body())
            .to_request();
        let resp = test::call_service(&app, wrong).await;
        assert_eq!(resp.status(), 401);

        assert_eq!(spy.calls(), 0);
        assert!(store.http_rows().is_empty());
    }

    #[actix_web::test]
    async fn test_region_and_body_are_validated() {
        let (handler, spy, _) = fixture(SpyExecutor::succeeding(), true);
        let app = app!(handler);

        let resp = test::call_service(&app, ping("", check_body()).to_request()).await;
        assert_eq!(resp.status(), 400);
        assert_eq!(test::read_body(resp).await, "region is required");

        let malformed = test::TestRequest::post()
            .uri("/ping/iad")
            .insert_header((header::AUTHORIZATION, AUTH))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, malformed).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid request");

        assert_eq!(spy.calls(), 0);
    }

    #[actix_web::test]
    async fn test_local_check_returns_result_and_records_it() {
        let (handler, spy, store) = fixture(SpyExecutor::succeeding(), true);
        let app = app!(handler);

        let resp = test::call_service(&app, ping("iad", check_body()).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["region"], "iad");
        assert_eq!(body["status"], 200);
        assert_eq!(body["body"], "ok");
        assert_eq!(body["requestId"], 42);
        assert_eq!(body["workspaceId"], 7);
        assert_eq!(body["headers"]["server"], "nginx");
        assert_eq!(body["timing"]["connectDone"], 1_699_999_999_975i64);
        assert!(body.get("error").is_none());

        assert_eq!(spy.calls(), 1);
        let rows = store.http_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].monitor_id, "42");
        assert_eq!(rows[0].url, "http://example.test");
        assert_eq!(rows[0].status_code, Some(200));
        assert_eq!(rows[0].trigger, Some(Trigger::Api));
    }

    #[actix_web::test]
    async fn test_unknown_trigger_is_recorded_as_api() {
        let (handler, spy, store) = fixture(SpyExecutor::succeeding(), true);
        let app = app!(handler);

        let mut payload = check_body();
        payload["trigger"] = json!("manual");
        let resp = test::call_service(&app, ping("iad", payload).to_request()).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(spy.calls(), 1);
        let rows = store.http_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trigger, Some(Trigger::Api));
    }

    #[actix_web::test]
    async fn test_zero_request_id_is_not_recorded() {
        let (handler, spy, store) = fixture(SpyExecutor::succeeding(), true);
        let app = app!(handler);

        let payload = json!({"url": "http://example.test", "method": "GET"});
        let resp = test::call_service(&app, ping("iad", payload).to_request()).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(spy.calls(), 1);
        assert!(store.http_rows().is_empty());
    }

    #[actix_web::test]
    async fn test_transient_invocation_failures_are_retried() {
        let (handler, spy, store) = fixture(SpyExecutor::failing_first(2), true);
        let app = app!(handler);

        let resp = test::call_service(&app, ping("iad", check_body()).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 200);

        assert_eq!(spy.calls(), 3);
        assert_eq!(store.http_rows().len(), 1, "one row per check, not per attempt");
    }

    #[actix_web::test]
    async fn test_exhausted_retries_report_generic_message() {
        let (handler, spy, store) = fixture(SpyExecutor::always_failing(), true);
        let app = app!(handler);

        let resp = test::call_service(&app, ping("iad", check_body()).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"message": "url not reachable"}));

        assert_eq!(spy.calls(), 3);
        assert!(store.http_rows().is_empty());
    }

    #[actix_web::test]
    async fn test_store_failure_does_not_affect_response() {
        let spy = Arc::new(SpyExecutor::succeeding());
        let store = Arc::new(MemoryStore::failing());
        let app = app!(handler_with(spy.clone(), store.clone(), true));

        let resp = test::call_service(&app, ping("iad", check_body()).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 200);
        assert_eq!(spy.calls(), 1, "persistence failures are not retried");
    }

    #[actix_web::test]
    async fn test_refused_target_is_reported_and_recorded() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let executor = Arc::new(NetworkExecutor::new("iad", ResolverSettings::default()));
        let store = Arc::new(MemoryStore::default());
        let app = app!(handler_with(executor, store.clone(), true));

        let payload = json!({
            "url": format!("http://{addr}"),
            "method": "GET",
            "requestId": 42,
            "workspaceId": 7
        });
        let resp = test::call_service(&app, ping("iad", payload).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert!(
            body["error"].as_str().is_some_and(|e| e.starts_with("dial tcp")),
            "error: {}",
            body["error"]
        );
        assert!(body.get("status").is_none());
        assert_eq!(body["region"], "iad");
        assert!(body["latency"].as_i64().is_some_and(|l| l >= 0));
        assert_eq!(body["timing"]["tlsHandshakeStart"], 0);

        let rows = store.http_rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].error);
        assert_eq!(rows[0].status_code, None);
    }

    #[actix_web::test]
    async fn test_repeated_checks_are_recorded_independently() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let executor = Arc::new(NetworkExecutor::new("iad", ResolverSettings::default()));
        let store = Arc::new(MemoryStore::default());
        let app = app!(handler_with(executor, store.clone(), true));

        let payload = json!({"url": format!("http://{addr}"), "requestId": 42});
        for _ in 0..2 {
            let resp = test::call_service(&app, ping("iad", payload.clone()).to_request()).await;
            assert_eq!(resp.status(), 200);
        }

        let rows = store.http_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.error));
        assert!(rows[1].timestamp >= rows[0].timestamp);
    }
}
