//! # Command Bus Transport
//!
//! Newline-delimited JSON over TCP, implementing the request/reply and
//! publish/subscribe contracts from `spec.md` §4.2. Any transport meeting
//! that contract is acceptable; this is the concrete choice for this crate —
//! no message-queue dependency is pulled in, since nothing else here needs
//! one.

pub mod heartbeat;
pub mod reqrep;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::errors::TransportError;

/// Write one JSON value terminated by `\n`.
pub(crate) async fn write_frame<T: Serialize>(
    writer: &mut OwnedWriteHalf,
    value: &T,
) -> Result<(), TransportError> {
    let mut line =
        serde_json::to_string(value).map_err(|e| TransportError::Unreachable(e.to_string()))?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|_| TransportError::ConnectionReset)?;
    writer
        .flush()
        .await
        .map_err(|_| TransportError::ConnectionReset)
}

/// Read one `\n`-terminated JSON value. Returns `Ok(None)` on clean EOF.
pub(crate) async fn read_frame<T: DeserializeOwned>(
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<Option<T>, TransportError> {
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .await
        .map_err(|_| TransportError::ConnectionReset)?;
    if n == 0 {
        return Ok(None);
    }
    let value = serde_json::from_str(line.trim_end())
        .map_err(|e| TransportError::Unreachable(format!("malformed frame: {e}")))?;
    Ok(Some(value))
}
