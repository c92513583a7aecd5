use actix_web::{HttpRequest, HttpResponse, web};

use super::response::TcpResponse;
use super::{Handler, invalid_request, not_reachable};
use crate::probe::prelude::*;
use crate::telemetry::TcpTelemetryRecord;

/// `POST /tcp/{region}`: run a TCP connect check from `region`.
pub async fn tcp_region(
    handler: web::Data<Handler>,
    region: web::Path<String>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let region = region.into_inner();
    log::debug!("Start of /tcp/{region}");

    if let Err(rejection) = handler.admit(&req, &region) {
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
        handler
            .persist_tcp(TcpTelemetryRecord::from_probe(&check, &result))
            .await;
    }

    HttpResponse::Ok().json(TcpResponse::new(&check, result))
}
