//! # Aggregator
//!
//! Single entry point for all producers: validates, normalizes, stamps, and
//! forwards accepted intents to the actuator, while keeping running
//! statistics and a bounded history. Grounded on `command_aggregator.py`'s
//! `CommandAggregator.process_command`, minus its module-level singleton
//! (see Design Notes in `SPEC_FULL.md` — constructed once in `main.rs` and
//! shared as `Arc<Aggregator>` instead).

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use crate::model::{HistoryEntry, History, Priority, Source, Stats};
use crate::sync_util::lock_or_recover;
use crate::transport::heartbeat::Subscriber;
use crate::transport::reqrep::{Client, Server};
use crate::validate;
use crate::wire::{CommandReply, CommandRequest, Mode};

struct State {
    stats: Stats,
    history: History,
}

/// The outcome of one `submit` call, independent of the wire encoding a
/// caller might translate it into.
pub struct SubmitOutcome {
    pub accepted: bool,
    pub normalized: Option<String>,
    pub message: Option<String>,
    pub forwarded: Option<bool>,
}

impl SubmitOutcome {
    /// Render as the reply a producer sees over the command channel.
    pub fn into_reply(self) -> CommandReply {
        if !self.accepted {
            return CommandReply::error(self.message.unwrap_or_else(|| "Invalid command".to_string()));
        }
        let mut reply = CommandReply::ok(self.normalized.unwrap_or_default());
        reply.forwarded = self.forwarded;
        reply.message = self.message;
        reply
    }
}

pub struct Aggregator {
    state: Mutex<State>,
    forwarder: Client,
    heartbeat: Arc<Subscriber>,
}

impl Aggregator {
    pub fn new(forwarder: Client, heartbeat: Arc<Subscriber>, history_capacity: usize) -> Self {
        Aggregator {
            state: Mutex::new(State {
                stats: Stats::default(),
                history: History::new(history_capacity),
            }),
            forwarder,
            heartbeat,
        }
    }

    /// Validate, stamp, record, and forward one producer intent. `mode` is
    /// the producer's requested sequence-vs-single interpretation (`spec.md`
    /// §6); it rides along to the actuator unchanged so a `mode: "seq"`
    /// request is honored there even when the normalized text carries no
    /// literal `seq ` prefix for the actuator to sniff.
    pub async fn submit(
        &self,
        raw: &str,
        source: Source,
        priority: Priority,
        mode: Mode,
    ) -> SubmitOutcome {
        let normalized = match validate::validate(raw) {
            Ok(normalized) => normalized,
            Err(err) => {
                lock_or_recover(&self.state).stats.errors += 1;
                tracing::warn!(raw, error = %err, "command rejected");
                return SubmitOutcome {
                    accepted: false,
                    normalized: None,
                    message: Some(err.to_string()),
                    forwarded: None,
                };
            }
        };

        let forward_result = self
            .forwarder
            .request(&CommandRequest::structured(
                normalized.clone(),
                mode,
                source,
                priority,
            ))
            .await;
        let forward_error = forward_result.as_ref().err().map(|e| e.to_string());
        let forwarded = forward_result.is_ok();
        let ts = Utc::now();

        {
            let mut guard = lock_or_recover(&self.state);
            guard.stats.total += 1;
            *guard
                .stats
                .by_source
                .entry(source.to_string())
                .or_insert(0) += 1;
            guard.stats.last_normalized = Some(normalized.clone());
            guard.stats.last_ts = Some(ts);
            guard.history.push(HistoryEntry {
                ts,
                raw: raw.to_string(),
                normalized: normalized.clone(),
                source,
                priority,
                forward_error: forward_error.clone(),
            });
        }

        tracing::info!(
            source = %source,
            priority = %priority,
            normalized = %normalized,
            forwarded,
            "command accepted"
        );

        SubmitOutcome {
            accepted: true,
            normalized: Some(normalized),
            message: forward_error,
            forwarded: Some(forwarded),
        }
    }

    pub fn stats(&self) -> Stats {
        lock_or_recover(&self.state).stats.clone()
    }

    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        lock_or_recover(&self.state).history.recent(n)
    }

    /// Seconds since the last heartbeat, or `Duration::MAX` if none yet.
    /// Consumers may render this for health but must never use it to gate
    /// command acceptance (`spec.md` §4.5).
    pub fn heartbeat_age(&self) -> Duration {
        self.heartbeat.age()
    }

    pub fn heartbeat_is_stale(&self, threshold: Duration) -> bool {
        self.heartbeat.is_stale(threshold)
    }

    /// Run the producer-facing request/reply endpoint forever.
    pub async fn serve(self: Arc<Self>, addr: &str) -> Result<(), crate::errors::TransportError> {
        let aggregator = self;
        Server::serve(addr, move |request| {
            let aggregator = Arc::clone(&aggregator);
            async move {
                let mode = request.resolved_mode();
                let outcome = aggregator
                    .submit(request.cmd(), request.source(), request.priority(), mode)
                    .await;
                outcome.into_reply()
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat() -> Arc<Subscriber> {
        Subscriber::new()
    }

    #[tokio::test]
    async fn invalid_command_is_rejected_without_forwarding() {
        let forwarder = Client::new("127.0.0.1:1", Duration::from_millis(50), 0);
        let aggregator = Aggregator::new(forwarder, heartbeat(), 10);

        let outcome = aggregator
            .submit("teleport 3", Source::Manual, Priority::Normal, Mode::Auto)
            .await;

        assert!(!outcome.accepted);
        assert_eq!(outcome.message.as_deref(), Some("Invalid command"));
        assert_eq!(aggregator.stats().errors, 1);
        assert_eq!(aggregator.recent(10).len(), 0);
    }

    #[tokio::test]
    async fn accepted_command_is_recorded_even_when_forwarding_fails() {
        let forwarder = Client::new("127.0.0.1:1", Duration::from_millis(50), 0);
        let aggregator = Aggregator::new(forwarder, heartbeat(), 10);

        let outcome = aggregator
            .submit("forward 2", Source::Manual, Priority::High, Mode::Auto)
            .await;

        assert!(outcome.accepted);
        assert_eq!(outcome.forwarded, Some(false));
        let history = aggregator.recent(10);
        assert_eq!(history.len(), 1);
        assert!(history[0].forward_error.is_some());
        assert_eq!(aggregator.stats().total, 1);
    }

    #[tokio::test]
    async fn history_records_the_caller_supplied_source_verbatim() {
        let forwarder = Client::new("127.0.0.1:1", Duration::from_millis(50), 0);
        let aggregator = Aggregator::new(forwarder, heartbeat(), 10);

        aggregator
            .submit("seq forward 1; stop", Source::Vision, Priority::Normal, Mode::Auto)
            .await;

        let history = aggregator.recent(1);
        assert_eq!(history[0].source, Source::Vision);
    }

    #[tokio::test]
    async fn stale_heartbeat_does_not_block_submission() {
        let forwarder = Client::new("127.0.0.1:1", Duration::from_millis(50), 0);
        let aggregator = Aggregator::new(forwarder, heartbeat(), 10);
        assert!(aggregator.heartbeat_is_stale(Duration::from_secs(1)));

        let outcome = aggregator
            .submit("stop", Source::Manual, Priority::Normal, Mode::Auto)
            .await;
        assert!(outcome.accepted);
    }
}
