//! Publish/subscribe half of the command channel: the actuator publishes a
//! liveness ping on a fixed period, and the aggregator subscribes to track
//! how stale the last one was (`spec.md` §4.2, §6).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::errors::TransportError;
use crate::sync_util::lock_or_recover;
use crate::wire::HeartbeatEnvelope;

/// Fans a stream of heartbeat envelopes out to every connected subscriber.
/// Subscribers that connect after a tick simply miss it — heartbeats are a
/// liveness signal, not a log; the next tick arrives within `period`.
pub struct Publisher {
    tx: broadcast::Sender<String>,
}

impl Publisher {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Publisher { tx }
    }

    pub async fn serve(&self, addr: &str) -> Result<(), TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        tracing::info!(addr, "heartbeat channel listening");
        self.serve_on(listener).await
    }

    /// Same as [`Publisher::serve`], but on an already-bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), TransportError> {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "heartbeat channel accept failed");
                    continue;
                }
            };
            let mut rx = self.tx.subscribe();
            tokio::spawn(async move {
                let (_read_half, mut writer) = stream.into_split();
                while let Ok(line) = rx.recv().await {
                    if writer.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                }
                tracing::debug!(%peer, "heartbeat subscriber disconnected");
            });
        }
    }

    fn publish(&self, envelope: &HeartbeatEnvelope) {
        let Ok(mut line) = serde_json::to_string(envelope) else {
            return;
        };
        line.push('\n');
        // No subscribers is not an error; the send simply has no receivers.
        let _ = self.tx.send(line);
    }

    /// Ticks at `period`, publishing one heartbeat per tick, forever.
    pub async fn run_periodic(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.publish(&HeartbeatEnvelope::now_ok());
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Publisher::new()
    }
}

/// Tracks the age of the last heartbeat observed from a publisher,
/// reconnecting on any drop. Mirrors the aggregator-side watchdog loop in
/// `command_aggregator.py`, which tolerates transient reconnects rather
/// than treating one dropped connection as a fatal stop condition.
pub struct Subscriber {
    last_heartbeat: std::sync::Mutex<Option<Instant>>,
}

impl Subscriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Subscriber {
            last_heartbeat: std::sync::Mutex::new(None),
        })
    }

    /// How long ago the last heartbeat arrived. `Duration::MAX` before the
    /// first one is ever seen.
    pub fn age(&self) -> Duration {
        match *lock_or_recover(&self.last_heartbeat) {
            Some(instant) => instant.elapsed(),
            None => Duration::MAX,
        }
    }

    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.age() > threshold
    }

    /// Connects to `addr` and reads heartbeats forever, reconnecting with a
    /// fixed backoff on any read failure or disconnect. Never returns.
    pub async fn run(self: Arc<Self>, addr: String) {
        loop {
            match TcpStream::connect(&addr).await {
                Ok(stream) => self.drain(stream).await,
                Err(e) => tracing::debug!(addr, error = %e, "heartbeat connect failed"),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn drain(&self, stream: TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => return,
                Ok(_) => {
                    if let Ok(envelope) = serde_json::from_str::<HeartbeatEnvelope>(line.trim_end())
                    {
                        if envelope.kind == "heartbeat" {
                            *lock_or_recover(&self.last_heartbeat) = Some(Instant::now());
                        }
                    }
                }
                Err(_) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_is_max_before_any_heartbeat_seen() {
        let sub = Subscriber::new();
        assert_eq!(sub.age(), Duration::MAX);
        assert!(sub.is_stale(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn subscriber_observes_a_published_heartbeat() {
        let publisher = Arc::new(Publisher::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let serve_publisher = Arc::clone(&publisher);
        tokio::spawn(async move {
            let _ = serve_publisher.serve_on(listener).await;
        });

        let subscriber = Subscriber::new();
        let sub_task = Arc::clone(&subscriber);
        tokio::spawn(sub_task.run(addr.to_string()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        publisher.publish(&HeartbeatEnvelope::now_ok());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!subscriber.is_stale(Duration::from_secs(5)));
    }
}
