//! IPC Transport (spec §4.A): the only component that touches the
//! compositor's Unix sockets directly.

pub mod paths;

use crate::error::{ControllerError, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::mpsc;

/// A single `TYPE>>DATA` frame off the event socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub event_type: String,
    pub data: String,
}

pub struct Transport {
    command_socket: std::path::PathBuf,
    event_socket: std::path::PathBuf,
}

impl Transport {
    pub fn new(short_path_prefix: &str) -> std::io::Result<Self> {
        Ok(Self {
            command_socket: paths::command_socket_path(short_path_prefix)?,
            event_socket: paths::event_socket_path(short_path_prefix)?,
        })
    }

    #[cfg(test)]
    pub fn with_paths(command_socket: std::path::PathBuf, event_socket: std::path::PathBuf) -> Self {
        Self {
            command_socket,
            event_socket,
        }
    }

    /// Send a single command and read the response to EOF. Returns `None`
    /// for the literal `ok` response or an empty body (spec §4.A).
    pub async fn command(&self, text: &str) -> Result<Option<Vec<u8>>> {
        let mut stream = UnixStream::connect(&self.command_socket)
            .await
            .map_err(|e| ControllerError::TransportUnavailable(e.to_string()))?;

        let request = format!("-j/{}", text);
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| ControllerError::TransportUnavailable(e.to_string()))?;
        // Hyprland replies once the writer side is done; shutdown the write
        // half so it sees EOF on its own read.
        let _ = stream.shutdown().await;

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| ControllerError::TransportUnavailable(e.to_string()))?;

        if buf.is_empty() || buf == b"ok" {
            return Ok(None);
        }
        Ok(Some(buf))
    }

    /// Connect to the event socket and stream newline-delimited frames into
    /// `tx`. Reconnects on disconnect or connect failure with a fixed 5s
    /// backoff (original: `asyncio.sleep(5)` in `connect_to_socket`);
    /// retried indefinitely until the receiver is dropped.
    pub async fn event_stream(&self, tx: mpsc::UnboundedSender<RawFrame>) {
        loop {
            let stream = match UnixStream::connect(&self.event_socket).await {
                Ok(s) => s,
                Err(e) => {
                    log::warn!(
                        "event socket {} unavailable ({}), retrying in 5s",
                        self.event_socket.display(),
                        e
                    );
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            if !Self::pump_lines(stream, &tx).await {
                return; // receiver dropped, stop retrying
            }
            log::warn!("event socket connection closed, reconnecting in 5s");
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    /// Reads lines from `stream`, parsing and forwarding each as a
    /// `RawFrame`. Returns `false` once the channel receiver has gone away
    /// (caller should stop retrying), `true` on any other disconnect.
    async fn pump_lines(mut stream: UnixStream, tx: &mpsc::UnboundedSender<RawFrame>) -> bool {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match stream.read(&mut chunk).await {
                Ok(0) => return true, // EOF, reconnect
                Ok(n) => n,
                Err(e) => {
                    log::warn!("error reading event socket: {}", e);
                    return true;
                }
            };
            buf.extend_from_slice(&chunk[..n]);

            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(frame) = parse_frame(line) {
                    if tx.send(frame).is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

fn parse_frame(line: &str) -> Option<RawFrame> {
    let (event_type, data) = line.split_once(">>")?;
    Some(RawFrame {
        event_type: event_type.trim().to_string(),
        data: data.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_frame() {
        let frame = parse_frame("openwindow>>addr,1,class,title").unwrap();
        assert_eq!(frame.event_type, "openwindow");
        assert_eq!(frame.data, "addr,1,class,title");
    }

    #[test]
    fn rejects_frame_without_separator() {
        assert!(parse_frame("not-a-frame").is_none());
    }

    #[test]
    fn data_may_itself_contain_arrows() {
        // The `>>` split is on the first occurrence only.
        let frame = parse_frame("submap>>reset>>again").unwrap();
        assert_eq!(frame.event_type, "submap");
        assert_eq!(frame.data, "reset>>again");
    }
}
