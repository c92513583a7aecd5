use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HOST, HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use trust_dns_resolver::TokioAsyncResolver;
use url::{Host, Position, Url};

use super::prelude::*;
use super::result::TransportError;

/// A validated HTTP probe, ready to be sent over a fresh connection.
pub(crate) struct HttpPlan {
    host: Host<String>,
    port: u16,
    tls: bool,
    request: Request<Full<Bytes>>,
}

/// What came back from the target.
pub(crate) struct HttpCapture {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpPlan {
    /// Validates the request without touching the network. Anything that
    /// fails here is an invocation error rather than a probe failure.
    pub fn build(req: &HttpProbeRequest) -> Result<Self, ProbeError> {
        let url = Url::parse(&req.url).map_err(|source| ProbeError::InvalidUrl {
            url: req.url.clone(),
            source,
        })?;

        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(ProbeError::UnsupportedScheme(other.to_string())),
        };

        let host = url
            .host()
            .map(|h| h.to_owned())
            .ok_or_else(|| ProbeError::MissingHost(req.url.clone()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProbeError::MissingHost(req.url.clone()))?;

        let method = if req.method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(req.method.to_uppercase().as_bytes())
                .map_err(|_| ProbeError::InvalidMethod(req.method.clone()))?
        };

        let mut headers = HeaderMap::new();
        for (key, value) in &req.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ProbeError::InvalidHeader(key.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| ProbeError::InvalidHeader(key.clone()))?;
            headers.append(name, value);
        }
        if !headers.contains_key(HOST) {
            let authority = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let value =
                HeaderValue::from_str(&authority).map_err(|_| ProbeError::InvalidHeader("host".into()))?;
            headers.insert(HOST, value);
        }

        let body = req.body.clone().unwrap_or_default();
        let mut request = Request::builder()
            .method(method)
            .uri(&url[Position::BeforePath..])
            .body(Full::new(Bytes::from(body)))?;
        *request.headers_mut() = headers;

        Ok(Self {
            host,
            port,
            tls,
            request,
        })
    }
}

/// Aborts the connection driver when the probe finishes or is dropped
/// mid-flight, so no socket outlives its probe.
struct ConnectionGuard(JoinHandle<()>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub(crate) async fn resolve(
    timer: &PhaseTimer,
    resolver: &TokioAsyncResolver,
    host: &Host<String>,
) -> Result<Vec<IpAddr>, TransportError> {
    match host {
        Host::Ipv4(ip) => Ok(vec![IpAddr::V4(*ip)]),
        Host::Ipv6(ip) => Ok(vec![IpAddr::V6(*ip)]),
        Host::Domain(domain) => {
            timer.start(Phase::Dns);
            let lookup = resolver.lookup_ip(domain.as_str()).await;
            timer.done(Phase::Dns);
            let ips: Vec<IpAddr> = lookup
                .map_err(|source| TransportError::Dns {
                    host: domain.clone(),
                    source,
                })?
                .iter()
                .collect();
            if ips.is_empty() {
                return Err(TransportError::NoAddress(domain.clone()));
            }
            Ok(ips)
        }
    }
}

/// Dials each address in turn until one accepts.
pub(crate) async fn connect(
    timer: &PhaseTimer,
    ips: &[IpAddr],
    port: u16,
) -> Result<TcpStream, TransportError> {
    let mut last_err = None;
    for ip in ips {
        let addr = SocketAddr::new(*ip, port);
        timer.start(Phase::Connect);
        let attempt = TcpStream::connect(addr).await;
        timer.done(Phase::Connect);
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(source) => {
                last_err = Some(TransportError::Connect {
                    addr: addr.to_string(),
                    source,
                })
            }
        }
    }
    Err(last_err.unwrap_or_else(|| TransportError::NoAddress(format!("port {port}"))))
}

pub(crate) async fn probe_http(
    timer: &PhaseTimer,
    resolver: &TokioAsyncResolver,
    plan: HttpPlan,
) -> Result<HttpCapture, TransportError> {
    let ips = resolve(timer, resolver, &plan.host).await?;
    let stream = connect(timer, &ips, plan.port).await?;

    if !plan.tls {
        return exchange(timer, stream, plan.request).await;
    }

    let domain = plan.host.to_string();
    timer.start(Phase::TlsHandshake);
    let tls = async {
        let connector = native_tls::TlsConnector::new()?;
        TokioTlsConnector::from(connector).connect(&domain, stream).await
    }
    .await;
    timer.done(Phase::TlsHandshake);
    let stream = tls.map_err(|source| TransportError::Tls {
        host: domain.clone(),
        source,
    })?;

    exchange(timer, stream, plan.request).await
}

async fn exchange<S>(
    timer: &PhaseTimer,
    stream: S,
    request: Request<Full<Bytes>>,
) -> Result<HttpCapture, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    let _guard = ConnectionGuard(tokio::spawn(async move {
        if let Err(err) = conn.await {
            log::debug!("probe connection closed with error: {err}");
        }
    }));

    timer.start(Phase::FirstByte);
    let response = sender.send_request(request).await;
    timer.done(Phase::FirstByte);
    let response = response?;

    let status = response.status().as_u16();
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in response.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    timer.start(Phase::Transfer);
    let body = response.into_body().collect().await;
    timer.done(Phase::Transfer);
    let body = body?.to_bytes();

    Ok(HttpCapture {
        status,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
