//! # Pins — Hardware Output Contract
//!
//! The 3-bit pattern table from `spec.md` §6 and the `PinSink` trait the
//! motion executor drives it through. Real GPIO drivers are host-specific
//! and explicitly out of scope (`spec.md` §1); `LoggingPinSink` is the only
//! implementation this crate provides, standing in for whatever hardware
//! backend a deployment plugs in — the same role `rpi_server.py`'s
//! `handle_command` print-only mock plays in the original source.

use crate::parser::Kind;

/// The 3-bit output asserted on actuator outputs for one token kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinState(pub bool, pub bool, pub bool);

impl PinState {
    pub const STOP: PinState = PinState(false, false, false);

    /// Look up the static pin pattern for a motor-relevant kind. `Sleep` has
    /// no pin pattern of its own — the executor never calls this for it.
    pub fn for_kind(kind: Kind) -> PinState {
        match kind {
            Kind::Forward => PinState(false, false, true),
            Kind::Backward => PinState(false, true, false),
            Kind::Left => PinState(false, true, true),
            Kind::Right => PinState(true, false, false),
            Kind::Lock => PinState(true, false, true),
            Kind::Unlock => PinState(true, true, false),
            Kind::Stop => PinState::STOP,
            Kind::Sleep => PinState::STOP,
        }
    }
}

impl std::fmt::Display for PinState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.0 as u8, self.1 as u8, self.2 as u8)
    }
}

/// The hardware boundary the motion worker writes through. A single writer
/// (the active worker or the stop path) calls this at any moment — see
/// `spec.md` §5.
pub trait PinSink: Send + Sync {
    fn assert(&self, state: PinState);
}

/// Default sink: logs every pin assertion via `tracing`. Stands in for a
/// real GPIO driver.
#[derive(Default)]
pub struct LoggingPinSink;

impl PinSink for LoggingPinSink {
    fn assert(&self, state: PinState) {
        tracing::info!(pins = %state, "pin state asserted");
    }
}

/// Test-only support types, left ungated (rather than behind `#[cfg(test)]`)
/// so integration tests under `tests/` — which link the crate without the
/// unit-test cfg — can use them too.
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records every assertion in order, for tests that need to observe the
    /// exact pin sequence a worker produced.
    #[derive(Default)]
    pub struct RecordingPinSink {
        pub history: Mutex<Vec<PinState>>,
    }

    impl PinSink for RecordingPinSink {
        fn assert(&self, state: PinState) {
            self.history.lock().unwrap().push(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_table_matches_spec() {
        assert_eq!(PinState::for_kind(Kind::Forward), PinState(false, false, true));
        assert_eq!(PinState::for_kind(Kind::Backward), PinState(false, true, false));
        assert_eq!(PinState::for_kind(Kind::Left), PinState(false, true, true));
        assert_eq!(PinState::for_kind(Kind::Right), PinState(true, false, false));
        assert_eq!(PinState::for_kind(Kind::Lock), PinState(true, false, true));
        assert_eq!(PinState::for_kind(Kind::Unlock), PinState(true, true, false));
        assert_eq!(PinState::for_kind(Kind::Stop), PinState(false, false, false));
    }

    #[test]
    fn display_renders_bits() {
        assert_eq!(PinState(true, false, true).to_string(), "101");
    }
}
