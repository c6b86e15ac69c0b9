//! # Command Parser
//!
//! Splits a normalized intent into a `;`-delimited sequence of tokens and
//! parses each token into a `(kind, duration)` pair. Mirrors the grammar in
//! `spec.md` §6 and the original `seq_mode.py`/`command_aggregator.py`
//! splitting logic, but with no hardware knowledge — a `Token` is opaque to
//! everything except `executor` and `pins`.

use std::time::Duration;

/// One atomic motor action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Forward,
    Backward,
    Left,
    Right,
    Lock,
    Unlock,
    Stop,
    Sleep,
}

impl Kind {
    fn from_str(s: &str) -> Option<Kind> {
        match s {
            "forward" => Some(Kind::Forward),
            "backward" => Some(Kind::Backward),
            "left" => Some(Kind::Left),
            "right" => Some(Kind::Right),
            "lock" => Some(Kind::Lock),
            "unlock" => Some(Kind::Unlock),
            "stop" => Some(Kind::Stop),
            "sleep" => Some(Kind::Sleep),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Forward => "forward",
            Kind::Backward => "backward",
            Kind::Left => "left",
            Kind::Right => "right",
            Kind::Lock => "lock",
            Kind::Unlock => "unlock",
            Kind::Stop => "stop",
            Kind::Sleep => "sleep",
        }
    }
}

/// One parsed command: a kind plus an optional explicit duration in seconds.
/// `duration` is `None` when the token carried no number — the caller (the
/// executor) substitutes its configured default.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Token {
    pub kind: Kind,
    pub duration: Option<Duration>,
}

/// Split `seq forward 2; right 1; stop` style text on `;`, trimming each
/// piece and dropping empty ones.
pub fn split_sequence(text: &str) -> Vec<String> {
    text.split(';')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

/// Parse one token: `kind`, `kind value`, or `kind:value`. Returns `None` on
/// any malformed input (unknown kind, non-numeric or negative/non-finite
/// duration) — the caller logs and skips.
pub fn parse_command(token: &str) -> Option<Token> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let (head, rest) = if let Some((h, v)) = token.split_once(':') {
        (h, Some(v))
    } else if let Some((h, v)) = token.split_once(char::is_whitespace) {
        (h, Some(v.trim()))
    } else {
        (token, None)
    };

    let kind = Kind::from_str(&head.to_ascii_lowercase())?;

    let duration = match rest {
        None => None,
        Some(v) if v.is_empty() => None,
        Some(v) => {
            let seconds: f64 = v.parse().ok()?;
            if !seconds.is_finite() || seconds < 0.0 {
                return None;
            }
            Some(Duration::from_secs_f64(seconds))
        }
    };

    Some(Token { kind, duration })
}

/// Render a `Token` back to its canonical textual form. Used by the
/// round-trip property test; not otherwise called in production code.
pub fn format_token(kind: Kind, duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{} {}", kind.as_str(), d.as_secs_f64()),
        None => kind.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sequence_trims_and_drops_empties() {
        let parts = split_sequence(" forward 2 ; ; right 1;stop ");
        assert_eq!(parts, vec!["forward 2", "right 1", "stop"]);
    }

    #[test]
    fn split_sequence_single_token_has_no_semicolon() {
        assert_eq!(split_sequence("stop"), vec!["stop"]);
    }

    #[test]
    fn parse_plain_kind_has_no_duration() {
        let t = parse_command("stop").unwrap();
        assert_eq!(t.kind, Kind::Stop);
        assert_eq!(t.duration, None);
    }

    #[test]
    fn parse_kind_with_space_duration() {
        let t = parse_command("forward 2").unwrap();
        assert_eq!(t.kind, Kind::Forward);
        assert_eq!(t.duration, Some(Duration::from_secs_f64(2.0)));
    }

    #[test]
    fn parse_colon_form_is_equivalent_to_space_form() {
        let colon = parse_command("left:1.5").unwrap();
        let space = parse_command("left 1.5").unwrap();
        assert_eq!(colon, space);
    }

    #[test]
    fn sleep_with_no_duration_is_none() {
        let t = parse_command("sleep").unwrap();
        assert_eq!(t.kind, Kind::Sleep);
        assert_eq!(t.duration, None);
    }

    #[test]
    fn unknown_kind_returns_none() {
        assert!(parse_command("dance 2").is_none());
    }

    #[test]
    fn negative_duration_returns_none() {
        assert!(parse_command("forward -1").is_none());
    }

    #[test]
    fn non_numeric_duration_returns_none() {
        assert!(parse_command("forward soon").is_none());
    }

    #[test]
    fn nan_duration_returns_none() {
        assert!(parse_command("forward nan").is_none());
    }

    #[test]
    fn empty_token_returns_none() {
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn kind_is_case_insensitive() {
        let t = parse_command("FORWARD 1").unwrap();
        assert_eq!(t.kind, Kind::Forward);
    }
}
