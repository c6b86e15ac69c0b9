//! # Validation
//!
//! Normalizes and validates raw producer text per `spec.md` §4.1. Grounded on
//! `command_aggregator.py`'s `_validate_command`: strip whitespace, lowercase
//! only the first token, then special-case a `seq ` lead on the now-lowercased
//! text, otherwise require the first whitespace-separated field (or the part
//! before `:`) to be a known command head.

use crate::errors::ValidationError;

const ALLOWED_HEADS: &[&str] = &[
    "forward", "backward", "left", "right", "stop", "lock", "unlock", "sleep",
];

const SEQ_PREFIX: &str = "seq ";

/// Normalize and validate raw text. Returns the normalized command on
/// success, or a `ValidationError` carrying the rejection message.
pub fn validate(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty());
    }

    let normalized = lowercase_first_token(trimmed);

    if normalized.starts_with(SEQ_PREFIX) {
        return Ok(normalized);
    }

    let head = normalized.split_whitespace().next().unwrap_or("");
    let head_name = head.split(':').next().unwrap_or(head);

    if ALLOWED_HEADS.contains(&head_name) {
        Ok(normalized)
    } else {
        Err(ValidationError::invalid_command())
    }
}

/// Lowercase only the first whitespace-separated token, preserving the rest
/// of the string verbatim (durations, `seq` payloads, etc.).
fn lowercase_first_token(s: &str) -> String {
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => format!("{} {}", head.to_ascii_lowercase(), rest.trim_start()),
        None => s.to_ascii_lowercase(),
    }
}
