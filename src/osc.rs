//! OSC over UDP server
//!
//! Receives datagrams, decodes them with `rosc` and routes each message to the
//! handlers registered for its address. Every datagram is handled on its own
//! task, so handlers must be safe to run concurrently.

use rosc::address::{Matcher, OscAddress};
use rosc::{OscMessage, OscPacket};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Callback invoked for every message routed to an address
pub type MessageHandler = Arc<dyn Fn(&OscMessage) + Send + Sync>;

struct Route {
    address: String,
    /// `None` when the registered address is not a valid OSC address
    parsed: Option<OscAddress>,
    handler: MessageHandler,
}

/// Routing table of an OSC server, filled before serving starts
#[derive(Default)]
pub struct OscServer {
    routes: Vec<Route>,
    catch_all: Vec<MessageHandler>,
}

impl OscServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route messages for `address` to `handler`.
    ///
    /// Registering the same address again replaces the previous handler.
    pub fn handle(&mut self, address: impl Into<String>, handler: MessageHandler) {
        let address = address.into();
        let parsed = OscAddress::new(address.clone()).ok();
        if parsed.is_none() {
            debug!("'{}' is not a valid OSC address, matching it literally", address);
        }

        let route = Route {
            address,
            parsed,
            handler,
        };
        match self.routes.iter_mut().find(|r| r.address == route.address) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    /// Route every message to `handler`, in addition to address routes
    pub fn handle_all(&mut self, handler: MessageHandler) {
        self.catch_all.push(handler);
    }

    /// Registered addresses, in registration order
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.address.as_str())
    }

    /// Invoke every handler matching the message address.
    ///
    /// The inbound address may be an OSC pattern (`/fader*`, `/pad/{1,2}`).
    /// Returns the number of address routes that matched.
    pub fn dispatch(&self, msg: &OscMessage) -> usize {
        for handler in &self.catch_all {
            handler(msg);
        }

        let matcher = Matcher::new(&msg.addr).ok();
        let mut matched = 0;
        for route in &self.routes {
            let is_match = route.address == msg.addr
                || match (&matcher, &route.parsed) {
                    (Some(matcher), Some(address)) => matcher.match_address(address),
                    _ => false,
                };
            if is_match {
                (route.handler)(msg);
                matched += 1;
            }
        }

        if matched == 0 {
            debug!("No endpoint for OSC address {}", msg.addr);
        }
        matched
    }

    /// Bind the listening socket
    pub async fn bind(self, addr: SocketAddr) -> Result<BoundServer> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::ListenBind { addr, source })?;
        Ok(BoundServer {
            socket,
            server: Arc::new(self),
        })
    }
}

/// Server with a bound socket, ready to serve
pub struct BoundServer {
    socket: UdpSocket,
    server: Arc<OscServer>,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive and dispatch datagrams until `shutdown` resolves
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        if let Ok(addr) = self.local_addr() {
            info!("Listening for OSC on UDP {}", addr);
        }

        let mut buf = [0u8; rosc::decoder::MTU];
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    let (size, peer) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("OSC receive error: {}", e);
                            continue;
                        }
                    };

                    let packet = match rosc::decoder::decode_udp(&buf[..size]) {
                        Ok((_, packet)) => packet,
                        Err(e) => {
                            debug!("Dropping undecodable OSC datagram from {}: {}", peer, e);
                            continue;
                        }
                    };

                    let server = Arc::clone(&self.server);
                    tokio::spawn(async move {
                        for msg in flatten(packet) {
                            server.dispatch(&msg);
                        }
                    });
                }

                _ = &mut shutdown => {
                    info!("OSC server stopping");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Messages of a packet in bundle order
fn flatten(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(msg) => vec![msg],
        OscPacket::Bundle(bundle) => bundle.content.into_iter().flat_map(flatten).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rosc::{OscBundle, OscTime, OscType};

    fn message(addr: &str) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args: vec![OscType::Float(1.0)],
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> MessageHandler {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |msg: &OscMessage| log.lock().push(format!("{}:{}", tag, msg.addr)))
    }

    #[test]
    fn test_dispatch_exact_address() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut server = OscServer::new();
        server.handle("/fader1", recorder(&log, "f1"));
        server.handle("/fader2", recorder(&log, "f2"));

        assert_eq!(server.dispatch(&message("/fader2")), 1);
        assert_eq!(*log.lock(), vec!["f2:/fader2"]);
    }

    #[test]
    fn test_dispatch_unknown_address() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut server = OscServer::new();
        server.handle("/fader1", recorder(&log, "f1"));

        assert_eq!(server.dispatch(&message("/nothing")), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_dispatch_pattern_address() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut server = OscServer::new();
        server.handle("/fader1", recorder(&log, "f1"));
        server.handle("/fader2", recorder(&log, "f2"));
        server.handle("/pad", recorder(&log, "pad"));

        assert_eq!(server.dispatch(&message("/fader*")), 2);
        assert_eq!(*log.lock(), vec!["f1:/fader*", "f2:/fader*"]);
    }

    #[test]
    fn test_same_address_last_registration_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut server = OscServer::new();
        server.handle("/a", recorder(&log, "first"));
        server.handle("/b", recorder(&log, "b"));
        server.handle("/a", recorder(&log, "second"));

        assert_eq!(server.addresses().collect::<Vec<_>>(), vec!["/a", "/b"]);
        server.dispatch(&message("/a"));
        assert_eq!(*log.lock(), vec!["second:/a"]);
    }

    #[test]
    fn test_catch_all_sees_every_message() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut server = OscServer::new();
        server.handle_all(recorder(&log, "all"));
        server.handle("/a", recorder(&log, "a"));

        server.dispatch(&message("/a"));
        server.dispatch(&message("/z"));
        assert_eq!(*log.lock(), vec!["all:/a", "a:/a", "all:/z"]);
    }

    #[test]
    fn test_flatten_nested_bundles() {
        let packet = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![
                OscPacket::Message(message("/a")),
                OscPacket::Bundle(OscBundle {
                    timetag: OscTime::from((0, 1)),
                    content: vec![OscPacket::Message(message("/b"))],
                }),
            ],
        });

        let addrs: Vec<String> = flatten(packet).into_iter().map(|m| m.addr).collect();
        assert_eq!(addrs, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_listen_error() {
        let first = OscServer::new()
            .bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        let err = OscServer::new().bind(addr).await.err().unwrap();
        assert!(matches!(err, Error::ListenBind { .. }));
    }
}
