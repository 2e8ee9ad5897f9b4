use mdns_sd::{HostnameResolutionEvent, IfKind, Receiver, ScopedIp, ServiceDaemon};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use super::Discovery;
use crate::error::ProxyError;

/// Resolves a `.local` host name through the mdns-sd daemon.
pub struct MdnsDiscovery {
    daemon: Arc<ServiceDaemon>,
    hostname: String,
    deadline: Duration,
}

impl MdnsDiscovery {
    /// Create a discovery source with its own mDNS daemon
    pub fn new(hostname: &str, deadline: Duration) -> Result<Self, ProxyError> {
        let daemon = ServiceDaemon::new().map_err(|e| {
            ProxyError::discovery(hostname, format!("cannot start mDNS daemon: {}", e))
        })?;
        Self::with_daemon(Arc::new(daemon), hostname, deadline)
    }

    /// Create a discovery source on an existing daemon.
    /// Tests use this to share one daemon between advertiser and resolver.
    pub fn with_daemon(
        daemon: Arc<ServiceDaemon>,
        hostname: &str,
        deadline: Duration,
    ) -> Result<Self, ProxyError> {
        daemon.enable_interface(IfKind::All).map_err(|e| {
            ProxyError::discovery(hostname, format!("cannot enable interfaces: {}", e))
        })?;

        Ok(Self {
            daemon,
            hostname: mdns_hostname(hostname),
            deadline,
        })
    }
}

#[async_trait::async_trait]
impl Discovery for MdnsDiscovery {
    fn name(&self) -> &str {
        &self.hostname
    }

    async fn discover(&self) -> Result<Ipv4Addr, ProxyError> {
        let search = ActiveSearch::start(&self.daemon, &self.hostname, self.deadline)?;

        let hostname = self.hostname.as_str();
        let outcome: Result<Result<Ipv4Addr, String>, _> = timeout(self.deadline, async {
            loop {
                match search.events.recv_async().await {
                    Ok(HostnameResolutionEvent::SearchStarted(_)) => {
                        debug!("Hostname resolution started for {}", hostname);
                    }
                    Ok(HostnameResolutionEvent::AddressesFound(_, addresses)) => {
                        if let Some(addr) = first_ipv4(&addresses) {
                            return Ok(addr);
                        }
                        debug!("Only non-IPv4 addresses found for {}", hostname);
                    }
                    Ok(HostnameResolutionEvent::SearchTimeout(_)) => {
                        return Err("no answer before the search timed out".to_string());
                    }
                    Ok(HostnameResolutionEvent::SearchStopped(_)) => {
                        return Err("search stopped".to_string());
                    }
                    Ok(_) => {}
                    Err(e) => return Err(format!("mDNS event channel closed: {}", e)),
                }
            }
        })
        .await;
        drop(search);

        match outcome {
            Ok(Ok(addr)) => Ok(addr),
            Ok(Err(reason)) => Err(ProxyError::discovery(&self.hostname, reason)),
            Err(_) => Err(ProxyError::discovery(
                &self.hostname,
                format!("no answer within {:?}", self.deadline),
            )),
        }
    }
}

/// A running hostname search. Dropping it stops the search, including when
/// the lookup future is cancelled mid-flight.
struct ActiveSearch<'a> {
    daemon: &'a ServiceDaemon,
    hostname: &'a str,
    events: Receiver<HostnameResolutionEvent>,
}

impl<'a> ActiveSearch<'a> {
    fn start(
        daemon: &'a ServiceDaemon,
        hostname: &'a str,
        deadline: Duration,
    ) -> Result<Self, ProxyError> {
        let events = daemon
            .resolve_hostname(hostname, Some(deadline.as_millis() as u64))
            .map_err(|e| ProxyError::discovery(hostname, e.to_string()))?;

        Ok(Self {
            daemon,
            hostname,
            events,
        })
    }
}

impl Drop for ActiveSearch<'_> {
    fn drop(&mut self) {
        // Harmless when the daemon already ended the search on its own.
        if let Err(e) = self.daemon.stop_resolve_hostname(self.hostname) {
            debug!("Failed to stop hostname resolution for {}: {}", self.hostname, e);
        }
    }
}

/// Lowest IPv4 address of a responder, so repeated answers with the same
/// address set publish the same value.
fn first_ipv4<'a>(addresses: impl IntoIterator<Item = &'a ScopedIp>) -> Option<Ipv4Addr> {
    addresses
        .into_iter()
        .filter_map(|addr| match addr {
            ScopedIp::V4(ipv4) => Some(*ipv4.addr()),
            _ => None,
        })
        .min()
}

/// mdns-sd only resolves fully-qualified names under `local.`
fn mdns_hostname(name: &str) -> String {
    let trimmed = name.trim_end_matches('.').to_lowercase();
    if trimmed.ends_with(".local") {
        format!("{}.", trimmed)
    } else {
        format!("{}.local.", trimmed)
    }
}
