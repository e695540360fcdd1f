//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;

use unit_stream_relay::config::{RelayConfig, UnitConfig};
use unit_stream_relay::http::{AppState, HttpServer};
use unit_stream_relay::lifecycle::Shutdown;
use unit_stream_relay::security::{AddressValidator, Resolve};
use unit_stream_relay::units::{DirectoryError, StaticUnitDirectory, Unit, UnitDirectory, UnitStatus};

/// A public documentation address (TEST-NET-3). Passes validation, never answers.
pub const PUBLIC_UNIT_IP: &str = "203.0.113.50";

pub fn unit(id: &str, ip: Option<&str>, status: UnitStatus) -> UnitConfig {
    UnitConfig {
        id: id.to_string(),
        serial: format!("SERIAL-{id}"),
        ip_address: ip.map(String::from),
        status,
    }
}

/// Config with the standard test fleet:
/// - `online-public`: online, public IP
/// - `offline`: offline
/// - `no-address`: online, no IP
/// - `private`: online, RFC 1918 IP
/// - `hostname`: online, hostname resolved by [`FixedResolver`]
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.stream.connect_timeout_secs = 1;
    config.units = vec![
        unit("online-public", Some(PUBLIC_UNIT_IP), UnitStatus::Online),
        unit("offline", Some(PUBLIC_UNIT_IP), UnitStatus::Offline),
        unit("no-address", None, UnitStatus::Online),
        unit("private", Some("192.168.1.20"), UnitStatus::Online),
        unit("hostname", Some("cam.internal.example"), UnitStatus::Online),
    ];
    config
}

/// Resolver answering from a fixed table; unknown names fail.
#[derive(Default)]
pub struct FixedResolver {
    answers: HashMap<String, Vec<IpAddr>>,
}

impl FixedResolver {
    pub fn with(mut self, host: &str, ips: &[&str]) -> Self {
        let ips: Vec<IpAddr> = ips.iter().map(|ip| ip.parse().unwrap()).collect();
        self.answers.insert(host.to_string(), ips);
        self
    }
}

#[async_trait]
impl Resolve for FixedResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        self.answers
            .get(host)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such host"))
    }
}

/// Directory whose backing store is always down.
pub struct FailingDirectory;

#[async_trait]
impl UnitDirectory for FailingDirectory {
    async fn find_unit(&self, _unit_id: &str) -> Result<Option<Unit>, DirectoryError> {
        Err(DirectoryError("connection refused".into()))
    }
}

/// State over `config.units`, resolving hostnames through `resolver`.
pub fn test_state(config: &RelayConfig, resolver: FixedResolver) -> AppState {
    let units = Arc::new(StaticUnitDirectory::from_config(&config.units));
    AppState::new(config, units, Shutdown::new())
        .with_validator(AddressValidator::new(Arc::new(resolver)))
}

/// Serve `state` on an ephemeral loopback port.
pub async fn spawn_relay(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = HttpServer::new(state).run(listener).await;
    });
    addr
}
