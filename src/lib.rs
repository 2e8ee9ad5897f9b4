pub mod config;
pub mod discovery;
pub mod dns_handler;
pub mod error;
pub mod forwarder;

// Re-export commonly used types
pub use config::{AaaaPolicy, Args, Config};
pub use discovery::{Address, AddressState, MdnsDiscovery, Poller};
pub use dns_handler::{TargetDomains, ZwiftDnsHandler};
pub use error::ProxyError;
pub use forwarder::{Forwarder, UdpUpstream};
