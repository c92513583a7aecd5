use trust_dns_resolver::TokioAsyncResolver;
use url::Host;

use super::http::{connect, resolve};
use super::prelude::*;
use super::result::TransportError;

/// A validated `host:port` pair.
pub(crate) struct TcpPlan {
    host: Host<String>,
    port: u16,
}

impl TcpPlan {
    pub fn build(req: &TcpProbeRequest) -> Result<Self, ProbeError> {
        let invalid = || ProbeError::InvalidAddress(req.uri.clone());

        let (host, port) = req.uri.trim().rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if host.is_empty() {
            return Err(invalid());
        }
        // Host::parse understands bracketed IPv6 literals and plain names.
        let host = Host::parse(host).map_err(|_| invalid())?;

        Ok(Self { host, port })
    }
}

/// Success is an established connection; it is closed straight away.
pub(crate) async fn probe_tcp(
    timer: &PhaseTimer,
    resolver: &TokioAsyncResolver,
    plan: TcpPlan,
) -> Result<(), TransportError> {
    let ips = resolve(timer, resolver, &plan.host).await?;
    let stream = connect(timer, &ips, plan.port).await?;
    drop(stream);
    Ok(())
}
