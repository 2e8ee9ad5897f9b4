mod mdns;
mod poller;
pub mod state;

pub use mdns::MdnsDiscovery;
pub use poller::{Poller, PollerHandle};
pub use state::{Address, AddressSnapshot, AddressState};

use crate::error::ProxyError;
use std::net::Ipv4Addr;

/// A source that can locate the local server once.
#[async_trait::async_trait]
pub trait Discovery: Send + Sync {
    /// Name being looked up, for logging.
    fn name(&self) -> &str;

    /// Run a single bounded lookup.
    async fn discover(&self) -> Result<Ipv4Addr, ProxyError>;
}
