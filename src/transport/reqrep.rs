//! Request/reply half of the command channel: a connection-accepting
//! `Server` on the actuator side, and a reconnecting `Client` for callers
//! that issue requests (the aggregator's forwarder, the `send` CLI).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use super::{read_frame, write_frame};
use crate::errors::TransportError;
use crate::wire::{CommandReply, CommandRequest};

/// Accepts command connections and answers each request in strict lockstep
/// per connection. Concurrent producers get concurrent connections; a single
/// connection never has two requests in flight at once.
pub struct Server;

impl Server {
    pub async fn serve<H, Fut>(addr: &str, handler: H) -> Result<(), TransportError>
    where
        H: Fn(CommandRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandReply> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        tracing::info!(addr, "command channel listening");
        Self::serve_on(listener, handler).await
    }

    /// Same as [`Server::serve`], but on an already-bound listener. Lets
    /// callers (and tests) bind an ephemeral port, read back its real
    /// address, and hand the listener off without a bind/drop/rebind race.
    pub async fn serve_on<H, Fut>(listener: TcpListener, handler: H) -> Result<(), TransportError>
    where
        H: Fn(CommandRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandReply> + Send + 'static,
    {
        let handler = Arc::new(handler);
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "command channel accept failed");
                    continue;
                }
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Err(e) = Self::serve_connection(stream, handler).await {
                    tracing::debug!(%peer, error = %e, "command connection closed");
                }
            });
        }
    }

    async fn serve_connection<H, Fut>(
        stream: TcpStream,
        handler: Arc<H>,
    ) -> Result<(), TransportError>
    where
        H: Fn(CommandRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandReply> + Send + 'static,
    {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        loop {
            let request: CommandRequest = match read_frame(&mut reader).await? {
                Some(req) => req,
                None => return Ok(()),
            };
            let reply = handler(request).await;
            write_frame(&mut write_half, &reply).await?;
        }
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// A request/reply client with lazy reconnect. One TCP connection is held
/// open and reused across calls; callers are serialized behind an internal
/// mutex so the lockstep contract the `Server` assumes always holds, even
/// when the aggregator's forwarder and the `send` CLI share a client.
pub struct Client {
    addr: String,
    timeout: Duration,
    retries: u32,
    conn: Mutex<Option<Connection>>,
}

impl Client {
    pub fn new(addr: impl Into<String>, timeout: Duration, retries: u32) -> Self {
        Client {
            addr: addr.into(),
            timeout,
            retries,
            conn: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Connection, TransportError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Send one request, reconnecting lazily if the held connection is
    /// stale or absent. Retries up to `retries` additional times beyond the
    /// first attempt before surfacing the last error, each bounded by
    /// `timeout`.
    pub async fn request(&self, req: &CommandRequest) -> Result<CommandReply, TransportError> {
        let mut guard = self.conn.lock().await;
        let mut last_err = TransportError::Unreachable(self.addr.clone());

        for _ in 0..=self.retries {
            if guard.is_none() {
                match self.connect().await {
                    Ok(conn) => *guard = Some(conn),
                    Err(e) => {
                        last_err = e;
                        continue;
                    }
                }
            }

            let conn = guard.as_mut().expect("just populated above");
            let attempt = tokio::time::timeout(self.timeout, async {
                write_frame(&mut conn.writer, req).await?;
                read_frame::<CommandReply>(&mut conn.reader).await
            })
            .await;

            match attempt {
                Ok(Ok(Some(reply))) => return Ok(reply),
                Ok(Ok(None)) => {
                    *guard = None;
                    last_err = TransportError::ConnectionReset;
                }
                Ok(Err(e)) => {
                    *guard = None;
                    last_err = e;
                }
                Err(_) => {
                    *guard = None;
                    last_err = TransportError::Timeout;
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Status;

    #[tokio::test]
    async fn client_round_trips_a_request_through_a_real_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let _ = Server::serve_on(listener, |req| async move {
                CommandReply::ok(req.cmd().to_string())
            })
            .await;
        });

        let client = Client::new(addr.to_string(), Duration::from_secs(1), 2);
        let reply = client
            .request(&CommandRequest::text("forward 1"))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.cmd.as_deref(), Some("forward 1"));
    }

    #[tokio::test]
    async fn client_surfaces_unreachable_after_exhausting_retries() {
        let client = Client::new("127.0.0.1:1", Duration::from_millis(100), 1);
        let result = client.request(&CommandRequest::text("stop")).await;
        assert!(result.is_err());
    }
}
