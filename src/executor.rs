//! # Motion Executor
//!
//! Single-active-worker scheduler: at most one `MotionJob` runs at a time,
//! newly accepted intents preempt whatever is running, and every sleep
//! inside a worker is interruptible within a bounded step. Cancellation
//! uses a generation counter plus an `Arc<Notify>` rather than a bare
//! `AtomicBool` flag, so a sleeping worker wakes as soon as it is
//! preempted instead of waiting out its current poll step.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::parser::{self, Kind, Token};
use crate::pins::{PinSink, PinState};
use crate::wire::Mode;

/// Per-token-kind default durations, plus the idle pause held after a
/// sequence finishes uninterrupted. `lock`/`unlock` default to zero unless a
/// duration is supplied explicitly (see Design Notes: the source's handling
/// of these two was inconsistent; this crate picks the stricter default).
#[derive(Clone, Copy, Debug)]
pub struct ExecutorConfig {
    pub dur_forward: Duration,
    pub dur_backward: Duration,
    pub dur_turn: Duration,
    pub post_sequence_hold: Duration,
}

impl ExecutorConfig {
    fn default_for(&self, kind: Kind) -> Duration {
        match kind {
            Kind::Forward => self.dur_forward,
            Kind::Backward => self.dur_backward,
            Kind::Left | Kind::Right => self.dur_turn,
            Kind::Lock | Kind::Unlock => Duration::ZERO,
            Kind::Stop | Kind::Sleep => Duration::ZERO,
        }
    }
}

/// Upper bound on one interruptible-sleep poll step. A missing `sleep`
/// duration also defaults to this constant.
const SLEEP_STEP: Duration = Duration::from_millis(50);

struct Inner {
    pins: Arc<dyn PinSink>,
    config: ExecutorConfig,
    generation: AtomicU64,
    notify: Notify,
}

/// Drives at most one motion job at a time. `accept` cancels whatever is
/// running, waits for it to actually assert the stop pattern, then either
/// handles a direct `stop` inline or spawns a fresh worker and returns —
/// it never blocks on the new job's motion.
pub struct MotionExecutor {
    inner: Arc<Inner>,
    job: Mutex<Option<JoinHandle<()>>>,
}

impl MotionExecutor {
    pub fn new(pins: Arc<dyn PinSink>, config: ExecutorConfig) -> Self {
        MotionExecutor {
            inner: Arc::new(Inner {
                pins,
                config,
                generation: AtomicU64::new(0),
                notify: Notify::new(),
            }),
            job: Mutex::new(None),
        }
    }

    /// Accept one normalized intent under an explicit `mode` (already
    /// validated — this does the splitting/parsing itself). `mode` decides
    /// whether the text is split on `;` as a sequence or parsed as a single
    /// token, independent of whether it happens to carry a literal `seq `
    /// prefix — `Mode::Auto` is the only case that sniffs the prefix.
    pub async fn accept(&self, normalized: &str, mode: Mode) {
        let trimmed = normalized.trim();
        let (is_sequence, body) = resolve_body(trimmed, mode);
        let is_direct_stop = if is_sequence {
            body.is_empty()
        } else {
            body == "stop"
        };

        self.preempt().await;

        if is_direct_stop {
            self.inner.pins.assert(PinState::STOP);
            return;
        }

        let tokens = resolve_tokens(is_sequence, body);
        if tokens.is_empty() {
            self.inner.pins.assert(PinState::STOP);
            return;
        }

        let generation = self.inner.generation.load(Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            run_worker(inner, generation, tokens).await;
        });
        *self.job.lock().await = Some(handle);
    }

    /// Bump the generation, wake any sleeping worker, and wait for the
    /// previous job's task to finish. Enforces that a new job never begins
    /// before the old one has asserted the stop pattern.
    async fn preempt(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        let previous = self.job.lock().await.take();
        if let Some(handle) = previous {
            let _ = handle.await;
        }
    }
}

/// Resolve whether `trimmed` should be treated as a sequence (split on `;`)
/// or as a single token, and the body to hand to the parser either way.
/// `Mode::Auto` sniffs the literal `seq ` prefix; `Mode::Seq`/`Mode::Single`
/// are explicit and override whatever the text looks like.
fn resolve_body(trimmed: &str, mode: Mode) -> (bool, &str) {
    match mode {
        Mode::Seq => (true, trimmed.strip_prefix("seq ").map(str::trim).unwrap_or(trimmed)),
        Mode::Single => (false, trimmed),
        Mode::Auto => match trimmed.strip_prefix("seq ") {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        },
    }
}

fn resolve_tokens(is_sequence: bool, body: &str) -> Vec<Token> {
    if is_sequence {
        parser::split_sequence(body)
            .into_iter()
            .filter_map(|part| match parser::parse_command(&part) {
                Some(token) => Some(token),
                None => {
                    tracing::warn!(token = %part, "unknown or malformed token skipped");
                    None
                }
            })
            .collect()
    } else {
        match parser::parse_command(body) {
            Some(token) => vec![token],
            None => {
                tracing::warn!(token = %body, "unknown or malformed token skipped");
                Vec::new()
            }
        }
    }
}

async fn run_worker(inner: Arc<Inner>, generation: u64, tokens: Vec<Token>) {
    for token in tokens {
        if inner.generation.load(Ordering::SeqCst) != generation {
            inner.pins.assert(PinState::STOP);
            return;
        }

        match token.kind {
            Kind::Stop => {
                inner.pins.assert(PinState::STOP);
                return;
            }
            Kind::Sleep => {
                let duration = token.duration.unwrap_or(SLEEP_STEP);
                if !interruptible_sleep(&inner, generation, duration).await {
                    inner.pins.assert(PinState::STOP);
                    return;
                }
            }
            motor_kind => {
                let duration = token.duration.unwrap_or(inner.config.default_for(motor_kind));
                inner.pins.assert(PinState::for_kind(motor_kind));
                let completed = interruptible_sleep(&inner, generation, duration).await;
                inner.pins.assert(PinState::STOP);
                if !completed {
                    return;
                }
            }
        }
    }

    inner.pins.assert(PinState::STOP);
    interruptible_sleep(&inner, generation, inner.config.post_sequence_hold).await;
}

/// Sleeps up to `total`, in steps of at most `SLEEP_STEP`, checking the
/// generation between steps. Returns `false` if preempted mid-sleep.
async fn interruptible_sleep(inner: &Inner, generation: u64, total: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + total;
    loop {
        if inner.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return true;
        }
        let step = (deadline - now).min(SLEEP_STEP);
        tokio::select! {
            _ = tokio::time::sleep(step) => {}
            _ = inner.notify.notified() => {}
        }
    }
}
