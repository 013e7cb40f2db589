//! Event bus: topic-framed publish/subscribe over TCP
//!
//! One logical publisher per process, any number of subscribers. Each bus
//! message is a two-part frame: an ASCII topic label and a UTF-8 JSON
//! payload. Delivery is fire-and-forget: a slow or absent subscriber never
//! blocks the publisher, and messages in flight during a connection drop are
//! lost, not redelivered.

use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Topic carrying serialized `GameEvent` records
pub const TOPIC_EVENT: &str = "event";
/// Topic carrying serialized `GameStateUpdate` records
pub const TOPIC_STATE: &str = "state";

/// Frames a lagged subscriber can fall behind before dropping
const BROADCAST_CAPACITY: usize = 256;
/// Fixed delay between subscriber reconnect attempts
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on topic label length; anything larger is a framing error
const MAX_TOPIC_LEN: usize = 64;
/// Upper bound on payload length; anything larger is a framing error
const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// A single bus message: topic label plus JSON payload bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Payload as UTF-8, for JSON decoding
    pub fn payload_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| Error::Bus(format!("non-UTF-8 payload: {e}")))
    }
}

/// Write one frame: `[u16 BE topic len][topic][u32 BE payload len][payload]`
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<()> {
    let topic = frame.topic.as_bytes();
    if topic.len() > MAX_TOPIC_LEN {
        return Err(Error::Bus(format!("topic too long: {}", topic.len())));
    }
    if frame.payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::Bus(format!(
            "payload too long: {}",
            frame.payload.len()
        )));
    }
    writer.write_u16(topic.len() as u16).await?;
    writer.write_all(topic).await?;
    writer.write_u32(frame.payload.len() as u32).await?;
    writer.write_all(&frame.payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame; errors on EOF, oversized fields, or a non-ASCII topic
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame> {
    let topic_len = reader.read_u16().await? as usize;
    if topic_len > MAX_TOPIC_LEN {
        return Err(Error::Bus(format!("topic too long: {topic_len}")));
    }
    let mut topic_buf = vec![0u8; topic_len];
    reader.read_exact(&mut topic_buf).await?;
    let topic = String::from_utf8(topic_buf)
        .map_err(|e| Error::Bus(format!("non-UTF-8 topic: {e}")))?;
    if !topic.is_ascii() {
        return Err(Error::Bus(format!("non-ASCII topic: {topic}")));
    }

    let payload_len = reader.read_u32().await? as usize;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(Error::Bus(format!("payload too long: {payload_len}")));
    }
    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload).await?;

    Ok(Frame { topic, payload })
}

/// Bus publisher: accepts subscriber connections and fans frames out to them.
///
/// Internally a lossy broadcast channel feeds one writer task per connected
/// subscriber. Send errors (no subscribers) are ignored; a subscriber that
/// lags behind the channel capacity silently misses frames.
#[derive(Clone)]
pub struct BusPublisher {
    tx: broadcast::Sender<Frame>,
    local_addr: std::net::SocketAddr,
}

impl BusPublisher {
    /// Bind the publisher socket and start the accept loop
    pub async fn bind(addr: &str, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        info!("Bus publisher listening on {}", local_addr);

        let accept_tx = tx.clone();
        tokio::spawn(accept_loop(listener, accept_tx, shutdown));

        Ok(Self { tx, local_addr })
    }

    /// Address the publisher is bound to (useful with port 0)
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Serialize `payload` as JSON and broadcast it on `topic`.
    ///
    /// Fire-and-forget: having zero subscribers is not an error.
    pub fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> Result<()> {
        let bytes = serde_json::to_vec(payload)?;
        let _ = self.tx.send(Frame::new(topic, bytes));
        Ok(())
    }

    /// Number of currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: broadcast::Sender<Frame>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!("Bus subscriber connected from {}", peer);
                        let rx = tx.subscribe();
                        tokio::spawn(writer_task(stream, rx, shutdown.clone()));
                    }
                    Err(e) => {
                        warn!("Bus accept error: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Bus publisher shutting down");
                    return;
                }
            }
        }
    }
}

async fn writer_task(
    mut stream: TcpStream,
    mut rx: broadcast::Receiver<Frame>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            received = rx.recv() => {
                match received {
                    Ok(frame) => {
                        if let Err(e) = write_frame(&mut stream, &frame).await {
                            debug!("Bus subscriber write failed, dropping connection: {}", e);
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Bus subscriber lagged, {} frames dropped", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// Bus subscriber: connects to a publisher, filters by topic, and yields
/// frames. Reconnects on a fixed backoff after any connection loss.
pub struct BusSubscriber {
    rx: mpsc::Receiver<Frame>,
}

impl BusSubscriber {
    /// Spawn the connect/read loop subscribing to the given topics
    pub fn connect(addr: String, topics: Vec<String>, shutdown: watch::Receiver<bool>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(subscriber_loop(addr, topics, tx, shutdown));
        Self { rx }
    }

    /// Receive the next frame; `None` after shutdown
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

async fn subscriber_loop(
    addr: String,
    topics: Vec<String>,
    tx: mpsc::Sender<Frame>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        match TcpStream::connect(&addr).await {
            Ok(mut stream) => {
                info!("Bus subscriber connected to {}", addr);
                loop {
                    tokio::select! {
                        frame = read_frame(&mut stream) => {
                            match frame {
                                Ok(frame) => {
                                    if !topics.iter().any(|t| t == &frame.topic) {
                                        continue;
                                    }
                                    if tx.send(frame).await.is_err() {
                                        return;
                                    }
                                }
                                Err(e) => {
                                    warn!("Bus connection to {} lost: {}", addr, e);
                                    break;
                                }
                            }
                        }
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                return;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                debug!("Bus connect to {} failed: {}", addr, e);
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GameEvent;
    use serde_json::Map;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let frame = Frame::new("event", br#"{"k":1}"#.to_vec());
        write_frame(&mut client, &frame).await.unwrap();
        let decoded = read_frame(&mut server).await.unwrap();
        assert_eq!(decoded, frame);
    }

    #[tokio::test]
    async fn test_frame_rejects_oversized_topic() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        // Hand-craft a frame header claiming a huge topic
        client.write_u16(999).await.unwrap();
        client.write_all(&[0u8; 64]).await.unwrap();
        drop(client);
        assert!(read_frame(&mut server).await.is_err());
    }

    async fn wait_for_subscribers(publisher: &BusPublisher, n: usize) {
        for _ in 0..200 {
            if publisher.subscriber_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("subscriber never connected");
    }

    #[tokio::test]
    async fn test_publish_subscribe_end_to_end() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let publisher = BusPublisher::bind("127.0.0.1:0", shutdown_rx.clone())
            .await
            .unwrap();
        let addr = publisher.local_addr().to_string();

        let mut subscriber =
            BusSubscriber::connect(addr, vec![TOPIC_EVENT.to_string()], shutdown_rx);
        wait_for_subscribers(&publisher, 1).await;

        let event = GameEvent::with_timestamp(1.0, "COMMAND_STOP", 5, Map::new());
        // A frame on an unsubscribed topic must be filtered out
        publisher.publish(TOPIC_STATE, &"ignored").unwrap();
        publisher.publish(TOPIC_EVENT, &event).unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), subscriber.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("subscriber closed");
        assert_eq!(frame.topic, TOPIC_EVENT);
        let decoded = GameEvent::from_json(frame.payload_str().unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let publisher = BusPublisher::bind("127.0.0.1:0", shutdown_rx).await.unwrap();
        publisher.publish(TOPIC_EVENT, &"nobody listening").unwrap();
    }
}
