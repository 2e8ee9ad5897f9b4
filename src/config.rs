use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use crate::error::ProxyError;

/// Zwift DNS proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream resolver configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Which names get redirected to the discovered address
    #[serde(default)]
    pub redirect: RedirectConfig,

    /// mDNS discovery configuration
    #[serde(default)]
    pub mdns: MdnsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// UDP port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Resolver that receives every question not answered locally
    #[serde(default = "default_upstream_address")]
    pub address: SocketAddr,

    /// How long to wait for the upstream reply, in milliseconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_ms: u64,
}

/// What to do with AAAA questions for a redirected name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AaaaPolicy {
    /// Neither answer nor forward, so clients fall back to the synthesized A record.
    #[default]
    Drop,
    /// Relay to the upstream resolver like any other question.
    Forward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Fully-qualified names answered with the discovered address
    #[serde(default = "default_redirect_domains")]
    pub domains: Vec<String>,

    #[serde(default)]
    pub aaaa_policy: AaaaPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdnsConfig {
    /// Host name resolved over mDNS to find the local server
    #[serde(default = "default_mdns_hostname")]
    pub hostname: String,

    /// Delay between discovery attempts in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Deadline for a single discovery attempt in milliseconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    53
}

fn default_upstream_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 10, 10, 1)), 53)
}

fn default_upstream_timeout() -> u64 {
    2000
}

fn default_redirect_domains() -> Vec<String> {
    vec![
        "us-or-rly101.zwift.com.".to_string(),
        "secure.zwift.com.".to_string(),
        "cdn.zwift.com.".to_string(),
        "launcher.zwift.com.".to_string(),
    ]
}

fn default_mdns_hostname() -> String {
    "zwift.local.".to_string()
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_query_timeout() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: default_upstream_address(),
            timeout_ms: default_upstream_timeout(),
        }
    }
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            domains: default_redirect_domains(),
            aaaa_policy: AaaaPolicy::default(),
        }
    }
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            hostname: default_mdns_hostname(),
            poll_interval_ms: default_poll_interval(),
            query_timeout_ms: default_query_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, env = "ZWIFT_DNS_PROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// IP address to bind to
    #[arg(short, long, env = "ZWIFT_DNS_PROXY_BIND_ADDRESS")]
    pub bind_address: Option<IpAddr>,

    /// UDP port to bind to
    #[arg(short, long, env = "ZWIFT_DNS_PROXY_PORT")]
    pub port: Option<u16>,

    /// Upstream resolver address (ip:port)
    #[arg(short, long, env = "ZWIFT_DNS_PROXY_UPSTREAM")]
    pub upstream: Option<SocketAddr>,

    /// mDNS host name of the local server
    #[arg(long, env = "ZWIFT_DNS_PROXY_MDNS_HOSTNAME")]
    pub mdns_hostname: Option<String>,

    /// Forward AAAA questions for redirected names instead of dropping them
    #[arg(long, env = "ZWIFT_DNS_PROXY_FORWARD_AAAA")]
    pub forward_aaaa: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "ZWIFT_DNS_PROXY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Print an example configuration file with defaults and exit
    #[arg(long)]
    pub print_example_config: bool,
}

impl Config {
    /// Print an example configuration file with all defaults and comments
    pub fn print_example_config() {
        println!(
            r#"# Zwift DNS proxy configuration
#
# Every setting is optional. The defaults below are what the proxy uses
# when started without a configuration file.

[server]
# Address and UDP port the DNS listener binds to
bind_address = "0.0.0.0"
port = 53

[upstream]
# Resolver that answers everything that is not redirected
address = "10.10.10.1:53"
# Single attempt, no retry
timeout_ms = 2000

[redirect]
# Names answered with the address discovered over mDNS
domains = [
    "us-or-rly101.zwift.com.",
    "secure.zwift.com.",
    "cdn.zwift.com.",
    "launcher.zwift.com.",
]
# AAAA questions for the names above: "drop" or "forward"
aaaa_policy = "drop"

[mdns]
# Host name advertised by the local server
hostname = "zwift.local."
poll_interval_ms = 5000
query_timeout_ms = 2000

[logging]
# Options: trace, debug, info, warn, error
level = "info"
"#
        );
    }

    /// Load configuration from file, environment variables, and CLI arguments
    pub fn load(args: Args) -> Result<Self, ProxyError> {
        let mut config = if let Some(config_path) = &args.config {
            let contents = std::fs::read_to_string(config_path).map_err(|e| {
                ProxyError::Config(format!("cannot read {}: {}", config_path.display(), e))
            })?;
            toml::from_str(&contents).map_err(|e| {
                ProxyError::Config(format!("cannot parse {}: {}", config_path.display(), e))
            })?
        } else {
            Config::default()
        };

        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }

        if let Some(port) = args.port {
            config.server.port = port;
        }

        if let Some(upstream) = args.upstream {
            config.upstream.address = upstream;
        }

        if let Some(hostname) = args.mdns_hostname {
            config.mdns.hostname = hostname;
        }

        if args.forward_aaaa {
            config.redirect.aaaa_policy = AaaaPolicy::Forward;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        Ok(config)
    }

    /// Parse log level string to tracing::Level
    pub fn parse_log_level(&self) -> Level {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => {
                eprintln!("Invalid log level '{}', defaulting to INFO", self.logging.level);
                Level::INFO
            }
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_address, self.server.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.mdns.poll_interval_ms)
    }

    pub fn mdns_query_timeout(&self) -> Duration {
        Duration::from_millis(self.mdns.query_timeout_ms)
    }
}
