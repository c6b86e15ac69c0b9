//! # Model — Intents, History, Stats
//!
//! The data types that flow through the command plane: a validated `Intent`
//! from a producer, the bounded `History` ring the aggregator keeps for
//! observability, and the running `Stats` counters.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an intent originated. `Sequence` tags intents whose normalized form
/// begins with `seq `; `Unknown` is the default for callers that don't
/// specify a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Vision,
    Controller,
    Manual,
    Sequence,
    Unknown,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::Vision => "vision",
            Source::Controller => "controller",
            Source::Manual => "manual",
            Source::Sequence => "sequence",
            Source::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl Default for Source {
    fn default() -> Self {
        Source::Unknown
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vision" => Ok(Source::Vision),
            "controller" => Ok(Source::Controller),
            "manual" => Ok(Source::Manual),
            "sequence" => Ok(Source::Sequence),
            "unknown" => Ok(Source::Unknown),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// Advisory priority. Recorded in history and the bus envelope but never
/// gates acceptance or ordering — see Design Notes in `SPEC_FULL.md`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A validated, normalized textual motion request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intent {
    pub raw: String,
    pub normalized: String,
    pub source: Source,
    pub priority: Priority,
    pub ts: DateTime<Utc>,
}

/// Observability record appended to the aggregator's history on acceptance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: DateTime<Utc>,
    pub raw: String,
    pub normalized: String,
    pub source: Source,
    pub priority: Priority,
    /// Set when forwarding to the actuator failed; the intent is still
    /// recorded as accepted but the transport error is attached.
    pub forward_error: Option<String>,
}

/// Running counters. `total == by_source-sum + errors` is not an invariant:
/// exactly one of `by_source` or `errors` increments per `process_command`
/// call (spec.md §3 invariant 5).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    pub by_source: HashMap<String, u64>,
    pub errors: u64,
    pub last_normalized: Option<String>,
    pub last_ts: Option<DateTime<Utc>>,
}

/// Bounded FIFO history. Oldest entries are evicted first once `capacity` is
/// reached (spec.md §3 invariant 4).
pub struct History {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        History {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        let len = self.entries.len();
        let skip = len.saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}
