use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Arc, PoisonError, RwLock};

/// Last address learned from mDNS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Address {
    /// Nothing has been discovered since startup.
    #[default]
    Unknown,
    Resolved(Ipv4Addr),
}

impl Address {
    pub fn resolved(&self) -> Option<Ipv4Addr> {
        match self {
            Address::Unknown => None,
            Address::Resolved(addr) => Some(*addr),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Address::Unknown)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Unknown => f.write_str("unknown"),
            Address::Resolved(addr) => write!(f, "{}", addr),
        }
    }
}

/// Consistent view of the address state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressSnapshot {
    pub address: Address,
    /// Number of successful publishes so far; zero while still unknown.
    pub version: u64,
}

/// Shared holder of the discovered address.
///
/// Cloning is cheap and every clone observes the same value. The poller is
/// the only writer; request handlers take a snapshot once per request.
#[derive(Debug, Clone, Default)]
pub struct AddressState {
    inner: Arc<RwLock<AddressSnapshot>>,
}

impl AddressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AddressSnapshot {
        // A writer cannot panic halfway through a Copy assignment, so a
        // poisoned lock still holds a whole value.
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Address {
        self.snapshot().address
    }

    /// Atomically replace the address and bump the version.
    /// Returns the address that was stored before.
    pub fn publish(&self, addr: Ipv4Addr) -> Address {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let previous = guard.address;
        *guard = AddressSnapshot {
            address: Address::Resolved(addr),
            version: guard.version + 1,
        };
        previous
    }
}
