use clap::Parser;
use hickory_server::ServerFuture;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{error, info};
use zwift_dns_proxy::{
    AddressState, Args, Config, MdnsDiscovery, Poller, ProxyError, ZwiftDnsHandler,
};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    if args.print_example_config {
        Config::print_example_config();
        return;
    }

    let config = match Config::load(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.parse_log_level())
        .init();

    info!("Starting Zwift DNS proxy");
    info!(
        "Configuration: listen={}, upstream={}, mdns={}, redirected={}, aaaa_policy={:?}",
        config.listen_addr(),
        config.upstream.address,
        config.mdns.hostname,
        config.redirect.domains.join(","),
        config.redirect.aaaa_policy
    );

    // Without the listener there is nothing to do
    let listen_addr = config.listen_addr();
    let udp_socket = match UdpSocket::bind(listen_addr).await {
        Ok(s) => s,
        Err(source) => {
            error!("{}", ProxyError::ListenerBind { addr: listen_addr, source });
            std::process::exit(1);
        }
    };
    info!("UDP socket bound to {}", listen_addr);

    let state = AddressState::new();

    let poller = match MdnsDiscovery::new(&config.mdns.hostname, config.mdns_query_timeout()) {
        Ok(discovery) => {
            Some(Poller::new(Arc::new(discovery), state.clone(), config.poll_interval()).spawn())
        }
        Err(e) => {
            error!("{}; redirected names will be forwarded upstream", e);
            None
        }
    };

    let handler = ZwiftDnsHandler::from_config(&config, state);
    let mut server = ServerFuture::new(handler);
    server.register_socket(udp_socket);

    info!("Zwift DNS proxy is running on {}", listen_addr);

    tokio::select! {
        result = server.block_until_done() => match result {
            Ok(_) => info!("DNS server shutdown gracefully"),
            Err(e) => error!("DNS server error: {}", e),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    if let Some(poller) = poller {
        poller.shutdown().await;
    }
}
