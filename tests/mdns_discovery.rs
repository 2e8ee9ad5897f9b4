use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mdns_sd::{ServiceDaemon, ServiceInfo};
use serial_test::serial;
use tokio::time::sleep;
use zwift_dns_proxy::discovery::Discovery;
use zwift_dns_proxy::{Address, AddressState, MdnsDiscovery, Poller};

const SERVICE_TYPE: &str = "_http._tcp.local.";

/// Advertise a uniquely named host so parallel runs do not see each other.
fn advertise_host(daemon: &ServiceDaemon, ip: &str) -> String {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_micros();
    let instance_name = format!("zwift-proxy-test-{suffix}");
    let host_name = format!("zwift-proxy-test-{suffix}.local.");

    let ip_addrs: &[&str] = &[ip];
    let mut service_info = ServiceInfo::new(
        SERVICE_TYPE,
        &instance_name,
        &host_name,
        ip_addrs,
        21587,
        HashMap::<String, String>::new(),
    )
    .expect("failed to create service info");
    service_info.set_requires_probe(false);

    daemon
        .register(service_info)
        .expect("failed to register test service");

    host_name
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
#[ignore = "requires multicast networking"]
async fn discovers_advertised_host() {
    let daemon = Arc::new(ServiceDaemon::new().expect("failed to create daemon"));
    let host_name = advertise_host(&daemon, "127.0.0.1");
    sleep(Duration::from_secs(1)).await;

    let discovery = MdnsDiscovery::with_daemon(daemon, &host_name, Duration::from_secs(2))
        .expect("failed to create discovery");

    let mut found = None;
    for _attempt in 0..5 {
        if let Ok(addr) = discovery.discover().await {
            found = Some(addr);
            break;
        }
        sleep(Duration::from_millis(250)).await;
    }

    assert_eq!(found, Some(Ipv4Addr::LOCALHOST));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
#[ignore = "requires multicast networking"]
async fn poller_publishes_advertised_host() {
    let daemon = Arc::new(ServiceDaemon::new().expect("failed to create daemon"));
    let host_name = advertise_host(&daemon, "127.0.0.1");
    sleep(Duration::from_secs(1)).await;

    let discovery = MdnsDiscovery::with_daemon(daemon, &host_name, Duration::from_secs(2))
        .expect("failed to create discovery");
    let state = AddressState::new();
    let handle =
        Poller::new(Arc::new(discovery), state.clone(), Duration::from_millis(250)).spawn();

    for _ in 0..40 {
        if !state.current().is_unknown() {
            break;
        }
        sleep(Duration::from_millis(250)).await;
    }
    handle.shutdown().await;

    assert_eq!(state.current(), Address::Resolved(Ipv4Addr::LOCALHOST));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
#[ignore = "requires multicast networking"]
async fn missing_host_fails_within_deadline() {
    let discovery = MdnsDiscovery::new("no-such-zwift-host.local.", Duration::from_millis(500))
        .expect("failed to create discovery");

    let started = std::time::Instant::now();
    let result = discovery.discover().await;

    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(3));
}
