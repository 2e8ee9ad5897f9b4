use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised by the proxy.
///
/// Only `ListenerBind` and `Config` are fatal; the other kinds are logged and
/// absorbed by the request path or the discovery loop.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("upstream resolver {server} unavailable: {reason}")]
    UpstreamUnavailable { server: SocketAddr, reason: String },

    #[error("mDNS discovery of {hostname} failed: {reason}")]
    DiscoveryFailed { hostname: String, reason: String },

    #[error("failed to bind DNS listener on {addr}: {source}")]
    ListenerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    pub(crate) fn upstream(server: SocketAddr, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            server,
            reason: reason.into(),
        }
    }

    pub(crate) fn discovery(hostname: &str, reason: impl Into<String>) -> Self {
        Self::DiscoveryFailed {
            hostname: hostname.to_string(),
            reason: reason.into(),
        }
    }
}
