//! Bridge startup: config, MIDI output, listening address, OSC server

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use rosc::OscMessage;
use tracing::{debug, info};

use crate::config::Config;
use crate::device;
use crate::dispatch::DispatchTable;
use crate::error::Result;
use crate::net;
use crate::osc::{BoundServer, OscServer};
use crate::sink::SharedSink;

/// Default UDP port to listen on for OSC messages
pub const DEFAULT_OSC_PORT: u16 = 8000;

/// Arguments for [`start`]
#[derive(Debug, Clone)]
pub struct Arguments {
    pub config_path: PathBuf,
    pub port: u16,
    pub debug: bool,
    /// Case-insensitive substring of the MIDI output name
    pub midi_device: Option<String>,
    /// Network interface whose IPv4 address is used for listening
    pub interface: String,
    /// Listen on this address instead of resolving the interface
    pub bind: Option<IpAddr>,
    /// Reject duplicate addresses and out-of-range targets
    pub strict: bool,
}

impl Arguments {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            port: DEFAULT_OSC_PORT,
            debug: false,
            midi_device: None,
            interface: net::DEFAULT_INTERFACE.to_string(),
            bind: None,
            strict: false,
        }
    }
}

/// Run the bridge until `shutdown` resolves.
///
/// Resources are acquired in order and any failure returns before the next
/// one is touched. The MIDI output is closed when this returns.
pub async fn start(args: Arguments, shutdown: impl Future<Output = ()>) -> Result<()> {
    let config = Config::load(&args.config_path).await?;
    if args.strict {
        config.validate()?;
    }
    info!("Loaded {} endpoint(s) from {}", config.endpoints.len(), args.config_path.display());

    let port = device::open_output(args.midi_device.as_deref(), args.debug)?;
    let sink = SharedSink::new(port);
    info!("Sending MIDI CC to {}", sink.name());

    let ip = match args.bind {
        Some(ip) => ip,
        None => IpAddr::V4(net::resolve_interface_ipv4(&args.interface)?),
    };
    let addr = SocketAddr::new(ip, args.port);

    let server = listen(&config, sink, addr, args.debug).await?;
    server.serve(shutdown).await
}

/// Build the dispatch table, register it and bind the OSC socket
pub async fn listen(
    config: &Config,
    sink: SharedSink,
    addr: SocketAddr,
    debug: bool,
) -> Result<BoundServer> {
    let table = DispatchTable::build(config, sink);
    let mut server = OscServer::new();
    table.register(&mut server);

    if debug {
        server.handle_all(Arc::new(|msg: &OscMessage| {
            debug!("Received at {} arguments {:?}", msg.addr, msg.args);
        }));
    }

    server.bind(addr).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoint, MidiCc, TargetSpec};
    use crate::error::Error;
    use crate::midi::ShortMessage;
    use crate::sink::testing::MemoryPort;
    use rosc::{OscPacket, OscType};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    fn send(target: SocketAddr, addr: &str, args: Vec<OscType>) {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let bytes = rosc::encoder::encode(&packet).unwrap();
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(&bytes, target).unwrap();
    }

    async fn wait_for(port: &MemoryPort, count: usize) -> Vec<ShortMessage> {
        for _ in 0..200 {
            let messages = port.messages();
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        port.messages()
    }

    #[tokio::test]
    async fn test_malformed_config_fails_before_opening_anything() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        std::fs::write(&path, "endpoints: [ {address: ").unwrap();

        let err = start(Arguments::new(&path), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[tokio::test]
    async fn test_strict_rejects_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dup.yaml");
        std::fs::write(
            &path,
            "endpoints:\n  - address: /a\n    cc: {channel: 1, number: 1}\n  - address: /a\n    cc: {channel: 1, number: 2}\n",
        )
        .unwrap();

        let mut args = Arguments::new(&path);
        args.strict = true;
        let err = start(args, std::future::pending()).await.unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[tokio::test]
    async fn test_udp_messages_become_midi_events() {
        let port = MemoryPort::new();
        let config = Config {
            endpoints: vec![
                Endpoint {
                    address: "/fader1".into(),
                    cc: TargetSpec::Shared(MidiCc::new(1, 20)),
                },
                Endpoint {
                    address: "/pad".into(),
                    cc: TargetSpec::PerArgument(vec![MidiCc::new(1, 10), MidiCc::new(1, 11)]),
                },
            ],
        };

        let server = listen(
            &config,
            SharedSink::new(port.clone()),
            "127.0.0.1:0".parse().unwrap(),
            true,
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.serve(async {
            let _ = stop_rx.await;
        }));

        send(addr, "/fader1", vec![OscType::Float(0.5)]);
        assert_eq!(wait_for(&port, 1).await, vec![ShortMessage::new(0xB0, 20, 64)]);

        // Unknown addresses and undecodable datagrams leave the server running
        send(addr, "/unknown", vec![OscType::Float(1.0)]);
        std::net::UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .send_to(b"garbage", addr)
            .unwrap();

        send(
            addr,
            "/pad",
            vec![OscType::Float(1.0), OscType::Float(0.0), OscType::Float(0.25)],
        );
        assert_eq!(
            wait_for(&port, 3).await,
            vec![
                ShortMessage::new(0xB0, 20, 64),
                ShortMessage::new(0xB0, 10, 127),
                ShortMessage::new(0xB0, 11, 0),
            ]
        );

        stop_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }
}
