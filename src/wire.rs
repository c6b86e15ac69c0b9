//! # Wire Envelopes
//!
//! The JSON shapes that cross the command channel and the heartbeat channel,
//! per `spec.md` §6. Frames are newline-delimited JSON over TCP (see
//! `transport`); these types are what gets encoded/decoded on each line.

use serde::{Deserialize, Serialize};

use crate::model::{Priority, Source};

/// How the actuator should interpret a command request's text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Seq,
    Single,
    Auto,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Auto
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Seq => "seq",
            Mode::Single => "single",
            Mode::Auto => "auto",
        };
        f.write_str(s)
    }
}

/// A command request. Accepts either a bare text frame or a structured
/// object carrying an explicit `mode` — matching the two shapes `spec.md`
/// §6 allows ("a UTF-8 text payload, *or* a JSON object"). `source` and
/// `priority` are optional extensions of the structured shape, carried by
/// producers (the `tricore send` CLI) that know who they are; the actuator
/// never looks at them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandRequest {
    Structured {
        cmd: String,
        #[serde(default)]
        mode: Mode,
        #[serde(default)]
        source: Source,
        #[serde(default)]
        priority: Priority,
    },
    Text(String),
}

impl CommandRequest {
    pub fn text(cmd: impl Into<String>) -> Self {
        CommandRequest::Text(cmd.into())
    }

    pub fn structured(cmd: impl Into<String>, mode: Mode, source: Source, priority: Priority) -> Self {
        CommandRequest::Structured {
            cmd: cmd.into(),
            mode,
            source,
            priority,
        }
    }

    /// The raw command text, independent of which shape was used.
    pub fn cmd(&self) -> &str {
        match self {
            CommandRequest::Structured { cmd, .. } => cmd,
            CommandRequest::Text(cmd) => cmd,
        }
    }

    /// The effective mode: explicit if structured, otherwise inferred from a
    /// leading `seq ` token (spec.md §6: "When absent, mode is auto: a
    /// leading `seq ` token means sequence, else single").
    pub fn mode(&self) -> Mode {
        match self {
            CommandRequest::Structured { mode, .. } => *mode,
            CommandRequest::Text(_) => Mode::Auto,
        }
    }

    pub fn resolved_mode(&self) -> Mode {
        match self.mode() {
            Mode::Auto if self.cmd().starts_with("seq ") => Mode::Seq,
            Mode::Auto => Mode::Single,
            explicit => explicit,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            CommandRequest::Structured { source, .. } => *source,
            CommandRequest::Text(_) => Source::Unknown,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            CommandRequest::Structured { priority, .. } => *priority,
            CommandRequest::Text(_) => Priority::Normal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// The structured reply to a command request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandReply {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandReply {
    pub fn ok(cmd: impl Into<String>) -> Self {
        CommandReply {
            status: Status::Ok,
            cmd: Some(cmd.into()),
            original: None,
            forwarded: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        CommandReply {
            status: Status::Error,
            cmd: None,
            original: None,
            forwarded: None,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }
}

/// A periodic liveness ping published by the actuator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeartbeatEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub ts: f64,
    pub status: String,
}

impl HeartbeatEnvelope {
    pub fn now_ok() -> Self {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        HeartbeatEnvelope {
            kind: "heartbeat".to_string(),
            ts,
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_deserializes_from_bare_json_string() {
        let req: CommandRequest = serde_json::from_str("\"forward 2\"").unwrap();
        assert_eq!(req.cmd(), "forward 2");
        assert_eq!(req.resolved_mode(), Mode::Single);
    }

    #[test]
    fn structured_request_defaults_mode_to_auto_then_resolves() {
        let req: CommandRequest =
            serde_json::from_str(r#"{"cmd":"seq forward 1; stop"}"#).unwrap();
        assert_eq!(req.resolved_mode(), Mode::Seq);
    }

    #[test]
    fn structured_request_honors_explicit_mode() {
        let req: CommandRequest =
            serde_json::from_str(r#"{"cmd":"forward 1","mode":"seq"}"#).unwrap();
        assert_eq!(req.resolved_mode(), Mode::Seq);
    }

    #[test]
    fn reply_error_has_nonempty_message() {
        let reply = CommandReply::error("Invalid command");
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(json.contains("Invalid command"));
    }

    #[test]
    fn reply_ok_serializes_without_message_field() {
        let reply = CommandReply::ok("stop");
        let json = serde_json::to_string(&reply).unwrap();
        assert!(!json.contains("message"));
    }

    #[test]
    fn heartbeat_envelope_roundtrips() {
        let hb = HeartbeatEnvelope::now_ok();
        let json = serde_json::to_string(&hb).unwrap();
        let back: HeartbeatEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, "heartbeat");
        assert_eq!(back.status, "ok");
    }
}
