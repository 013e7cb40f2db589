//! Referee multicast listener
//!
//! Binds a UDP socket, joins the configured multicast group, and pushes
//! decoded referee snapshots onto a bounded channel. No logic beyond framing
//! and error-tolerant reception lives here: malformed datagrams are dropped
//! with a log line, and socket errors trigger a rebind on a fixed backoff.

use std::net::Ipv4Addr;
use std::time::Duration;

use prost::Message;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use sslcast_common::config::MulticastConfig;

use crate::error::{Error, Result};
use crate::proto::Referee;

/// Maximum referee datagram size
const RECV_BUFFER_SIZE: usize = 65535;
/// Delay between rebind attempts after a socket error
const REBIND_DELAY: Duration = Duration::from_secs(2);

/// Run the listener until shutdown, feeding snapshots to `tx`
pub async fn run(
    config: MulticastConfig,
    tx: mpsc::Sender<Referee>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        match bind_multicast(&config).await {
            Ok(socket) => {
                info!(
                    "Listening for referee packets on {}:{}",
                    config.group, config.port
                );
                if receive_loop(&socket, &tx, &mut shutdown).await {
                    return;
                }
            }
            Err(e) => {
                warn!("Multicast socket setup failed: {}", e);
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(REBIND_DELAY) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

async fn bind_multicast(config: &MulticastConfig) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(("0.0.0.0", config.port)).await?;
    let group: Ipv4Addr = config
        .group
        .parse()
        .map_err(|e| Error::Config(format!("invalid multicast group {}: {e}", config.group)))?;
    let interface: Ipv4Addr = match &config.interface {
        Some(addr) => addr
            .parse()
            .map_err(|e| Error::Config(format!("invalid interface {addr}: {e}")))?,
        None => Ipv4Addr::UNSPECIFIED,
    };
    socket.join_multicast_v4(group, interface)?;
    Ok(socket)
}

/// Returns true on shutdown, false on socket error (caller rebinds)
async fn receive_loop(
    socket: &UdpSocket,
    tx: &mpsc::Sender<Referee>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, _peer)) => {
                        match Referee::decode(&buf[..len]) {
                            Ok(snapshot) => {
                                if tx.send(snapshot).await.is_err() {
                                    // Tracker gone; nothing left to do
                                    return true;
                                }
                            }
                            Err(e) => {
                                debug!("Dropping malformed referee datagram ({len} bytes): {e}");
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Receive error, rebinding socket: {}", e);
                        return false;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Listener shutting down");
                    return true;
                }
            }
        }
    }
}
