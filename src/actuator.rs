//! # Actuator
//!
//! Wires the command-channel server, the motion executor, and the
//! heartbeat publisher together. Every accepted request replies `ok`
//! immediately — motion runs in the background (`spec.md` §4.3 acceptance
//! protocol, step 3).

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::errors::TransportError;
use crate::executor::MotionExecutor;
use crate::transport::heartbeat::Publisher;
use crate::transport::reqrep::Server;
use crate::wire::CommandReply;

pub struct Actuator {
    executor: MotionExecutor,
    heartbeat: Arc<Publisher>,
}

impl Actuator {
    pub fn new(executor: MotionExecutor, heartbeat: Arc<Publisher>) -> Self {
        Actuator { executor, heartbeat }
    }

    /// Serves the command channel forever. Every request — `stop` or
    /// otherwise — preempts whatever is running and replies `ok` without
    /// waiting for motion to finish.
    pub async fn serve_commands(self: Arc<Self>, addr: &str) -> Result<(), TransportError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        self.serve_commands_on(listener).await
    }

    /// Same as [`Actuator::serve_commands`], but on an already-bound
    /// listener — lets tests grab an ephemeral port's real address before
    /// handing the listener off.
    pub async fn serve_commands_on(self: Arc<Self>, listener: TcpListener) -> Result<(), TransportError> {
        let actuator = self;
        Server::serve_on(listener, move |request| {
            let actuator = Arc::clone(&actuator);
            async move {
                let normalized = request.cmd().trim().to_string();
                if normalized.is_empty() {
                    return CommandReply::error("Invalid command");
                }
                actuator
                    .executor
                    .accept(&normalized, request.resolved_mode())
                    .await;
                CommandReply::ok(normalized)
            }
        })
        .await
    }

    /// Ticks the heartbeat publisher and serves its subscriber endpoint
    /// forever. Both halves run until the process exits.
    pub async fn serve_heartbeat(&self, addr: &str, period: Duration) -> Result<(), TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        self.serve_heartbeat_on(listener, period).await
    }

    /// Same as [`Actuator::serve_heartbeat`], but on an already-bound
    /// listener.
    pub async fn serve_heartbeat_on(
        &self,
        listener: TcpListener,
        period: Duration,
    ) -> Result<(), TransportError> {
        let ticker = Arc::clone(&self.heartbeat);
        tokio::spawn(async move {
            ticker.run_periodic(period).await;
        });
        self.heartbeat.serve_on(listener).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorConfig;
    use crate::pins::test_support::RecordingPinSink;
    use crate::transport::reqrep::Client;
    use crate::wire::{CommandRequest, Status};
    use tokio::net::TcpListener;

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            dur_forward: Duration::from_millis(30),
            dur_backward: Duration::from_millis(30),
            dur_turn: Duration::from_millis(20),
            post_sequence_hold: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn command_channel_replies_ok_without_waiting_for_motion() {
        let pins = Arc::new(RecordingPinSink::default());
        let executor = MotionExecutor::new(pins, config());
        let actuator = Arc::new(Actuator::new(executor, Arc::new(Publisher::new())));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let addr_str = addr.to_string();
        tokio::spawn(async move {
            let _ = actuator.serve_commands(&addr_str).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = Client::new(addr.to_string(), Duration::from_secs(1), 2);
        let reply = client
            .request(&CommandRequest::text("forward 10"))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Ok);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let pins = Arc::new(RecordingPinSink::default());
        let executor = MotionExecutor::new(pins, config());
        let actuator = Arc::new(Actuator::new(executor, Arc::new(Publisher::new())));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let addr_str = addr.to_string();
        tokio::spawn(async move {
            let _ = actuator.serve_commands(&addr_str).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = Client::new(addr.to_string(), Duration::from_secs(1), 2);
        let reply = client.request(&CommandRequest::text("  ")).await.unwrap();
        assert_eq!(reply.status, Status::Error);
    }
}
