#![allow(dead_code)]

use ftp_core::{FtpServer, PortRange, ServerConfig, ServerEvent};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const ACCOUNTS: &str = "bob hunter2\nalice wonder\n";

pub struct TestServer {
    pub addr: SocketAddr,
    pub root: PathBuf,
    pub data_ports: PortRange,
    pub events: mpsc::Receiver<ServerEvent>,
    pub shutdown: CancellationToken,
    pub task: JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    /// Start a server on an ephemeral control port. Each test passes its
    /// own data port floor so parallel tests never share data ports.
    pub async fn start(port_floor: u16) -> Self {
        Self::start_with(port_floor, |_| {}).await
    }

    pub async fn start_with(port_floor: u16, tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let accounts = dir.path().join(".accounts");
        std::fs::write(&accounts, ACCOUNTS).unwrap();

        let data_ports = PortRange::new(port_floor, port_floor + 20).unwrap();
        let mut config = ServerConfig {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            control_port: 0,
            data_ports,
            root_dir: root.clone(),
            accounts_file: accounts,
            ..ServerConfig::default()
        };
        tweak(&mut config);
        let data_ports = config.data_ports;

        let (event_tx, events) = mpsc::channel(256);
        let server = FtpServer::bind(config, event_tx).await.unwrap();
        let addr = server.local_addr().unwrap();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(server.run(shutdown.clone()));

        Self {
            addr,
            root: root.canonicalize().unwrap(),
            data_ports,
            events,
            shutdown,
            task,
            _dir: dir,
        }
    }

    /// Wait for the next event matching `pred`
    pub async fn wait_for<F>(&mut self, mut pred: F) -> ServerEvent
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("Timeout waiting for server event")
                .expect("Event channel closed");
            if pred(&event) {
                return event;
            }
        }
    }
}
