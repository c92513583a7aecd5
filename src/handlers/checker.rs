//! Scheduled checks. The scheduler has already picked this node, so there
//! is no region to place and nothing is replayed.

use actix_web::{HttpRequest, HttpResponse, web};

use super::response::{PingResponse, TcpResponse};
use super::{Handler, invalid_request, not_reachable};
use crate::probe::prelude::*;
use crate::telemetry::{HttpTelemetryRecord, TcpTelemetryRecord, Trigger};

/// `POST /checker` and `POST /checker/http`.
pub async fn http_checker(
    handler: web::Data<Handler>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    if let Err(rejection) = handler.authenticate(&req) {
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
        let record = HttpTelemetryRecord::from_probe(&check, &result)
            .with_trigger(check.trigger_or(Trigger::Cron));
        handler.persist_http(record).await;
    }

    HttpResponse::Ok().json(PingResponse::new(&check, result))
}

/// `POST /checker/tcp`.
pub async fn tcp_checker(
    handler: web::Data<Handler>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    if let Err(rejection) = handler.authenticate(&req) {
        return rejection;
    }

    let check: CheckRequest<TcpProbeRequest> = match serde_json::from_slice(&body) {
        Ok(check) => check,
        Err(err) => return invalid_request(err),
    };

    let target = ProbeTarget::Tcp(check.target.clone());
    let Some(result) = handler.probe(&target).await else {
        return not_reachable();
    };

    if check.wants_telemetry() {
        let record = TcpTelemetryRecord::from_probe(&check, &result)
            .with_trigger(check.trigger_or(Trigger::Cron));
        handler.persist_tcp(record).await;
    }

    HttpResponse::Ok().json(TcpResponse::new(&check, result))
}
