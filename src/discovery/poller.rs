use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{Address, AddressState, Discovery};
use crate::error::ProxyError;

/// Periodically re-discovers the local server and publishes its address.
///
/// A failed lookup never clears a previously discovered address: a stale
/// address is more useful to clients than falling back to upstream answers.
pub struct Poller {
    discovery: Arc<dyn Discovery>,
    state: AddressState,
    interval: Duration,
}

impl Poller {
    pub fn new(discovery: Arc<dyn Discovery>, state: AddressState, interval: Duration) -> Self {
        Self {
            discovery,
            state,
            interval,
        }
    }

    /// Run one discovery cycle and apply its outcome to the address state.
    /// The error is returned for inspection only; it has already been logged.
    pub async fn poll_once(&self) -> Result<Ipv4Addr, ProxyError> {
        match self.discovery.discover().await {
            Ok(addr) => {
                match self.state.publish(addr) {
                    Address::Unknown => {
                        info!("Discovered {} at {}", self.discovery.name(), addr);
                    }
                    Address::Resolved(previous) if previous == addr => {
                        debug!("{} still at {}", self.discovery.name(), addr);
                    }
                    Address::Resolved(previous) => {
                        info!("{} moved from {} to {}", self.discovery.name(), previous, addr);
                    }
                }
                Ok(addr)
            }
            Err(e) => {
                warn!("{}; keeping address {}", e, self.state.current());
                Err(e)
            }
        }
    }

    /// Start polling on the tokio runtime until the returned handle is shut down.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        PollerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Polling mDNS for {} every {:?}",
            self.discovery.name(),
            self.interval
        );

        // `changed()` also resolves when the handle is dropped.
        loop {
            tokio::select! {
                _ = self.poll_once() => {}
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Stopped polling mDNS for {}", self.discovery.name());
    }
}

/// Handle to a running poller. Dropping it stops the poller as well.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("mDNS poller task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
