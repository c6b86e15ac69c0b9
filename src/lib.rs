//! # tricore
//!
//! A three-tier remote-control command plane for a mobile robot: producers
//! submit textual motion intents to an [`aggregator`], which validates and
//! forwards them over the [`transport`] command bus to an [`actuator`],
//! which parses them ([`parser`]) and drives hardware pins ([`pins`])
//! through a single-active-worker [`executor`].
//!
//! ## Modules
//!
//! - [`model`] — intents, history, running statistics.
//! - [`parser`] — splits and parses the textual command grammar.
//! - [`validate`] — aggregator-side admission rules.
//! - [`pins`] — the pin-state table and the hardware output boundary.
//! - [`wire`] — JSON shapes exchanged over the command bus.
//! - [`transport`] — newline-delimited JSON over TCP, request/reply and
//!   heartbeat pub/sub.
//! - [`executor`] — the motion worker state machine.
//! - [`aggregator`] — central validation, arbitration, history/statistics.
//! - [`actuator`] — wires the command channel, executor, and heartbeat
//!   publisher together.
//! - [`errors`] — the error taxonomy.

pub mod actuator;
pub mod aggregator;
pub mod errors;
pub mod executor;
pub mod model;
pub mod parser;
pub mod pins;
pub mod sync_util;
pub mod transport;
pub mod validate;
pub mod wire;
