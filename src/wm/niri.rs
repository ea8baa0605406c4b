//! Niri backend using newline-terminated JSON over `$NIRI_SOCKET`.
//!
//! Replies are wrapped as `{"Ok": ...}` or `{"Err": "..."}`. Niri
//! lays windows out in scrolling columns, so horizontal moves target
//! the next column and vertical moves the next window in the column.

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::{socket_timeout, WindowManager};
use crate::direction::Direction;
use crate::error::WmError;
use crate::process::Pid;

/// Reply lines we care about are small; longer ones fail the parse
/// instead of growing the buffer.
const REPLY_MAX: u64 = 8192;

pub struct NiriWm {
    socket_path: PathBuf,
    timeout_ms: u64,
}

impl NiriWm {
    pub fn new(timeout_ms: u64) -> Result<Self, WmError> {
        let socket_path = std::env::var_os("NIRI_SOCKET")
            .map(PathBuf::from)
            .ok_or(WmError::NoSocketPath("niri"))?;
        Ok(Self {
            socket_path,
            timeout_ms,
        })
    }

    fn request(&self, body: &str) -> Result<String, WmError> {
        let mut stream =
            UnixStream::connect(&self.socket_path).map_err(|source| WmError::ConnectFailed {
                path: self.socket_path.clone(),
                source,
            })?;
        let timeout = socket_timeout(self.timeout_ms);
        let _ = stream.set_read_timeout(timeout);
        let _ = stream.set_write_timeout(timeout);

        stream
            .write_all(body.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .map_err(WmError::WriteFailed)?;

        let mut line = String::new();
        BufReader::new(stream.take(REPLY_MAX))
            .read_line(&mut line)
            .map_err(WmError::ReadFailed)?;
        if line.is_empty() {
            return Err(WmError::ProtocolError("empty niri reply".into()));
        }
        Ok(line)
    }

    fn action_body(dir: Direction) -> &'static str {
        match dir {
            Direction::Left => r#"{"Action":{"FocusColumnOrMonitorLeft":{}}}"#,
            Direction::Right => r#"{"Action":{"FocusColumnOrMonitorRight":{}}}"#,
            Direction::Up => r#"{"Action":{"FocusWindowOrMonitorUp":{}}}"#,
            Direction::Down => r#"{"Action":{"FocusWindowOrMonitorDown":{}}}"#,
        }
    }
}

impl WindowManager for NiriWm {
    fn focused_pid(&mut self) -> Option<Pid> {
        let line = match self.request("\"FocusedWindow\"") {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "niri FocusedWindow failed");
                return None;
            }
        };
        let reply: FocusedWindowReply = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "niri reply parse failed");
                return None;
            }
        };
        // The window itself and its pid are both nullable.
        let pid = reply.ok?.focused_window?.pid?;
        (pid > 0).then_some(pid)
    }

    fn move_focus(&mut self, dir: Direction) -> Result<(), WmError> {
        let line = self.request(Self::action_body(dir))?;
        let reply: ActionReply =
            serde_json::from_str(&line).map_err(|e| WmError::ParseFailed(e.to_string()))?;
        if let Some(message) = reply.err {
            return Err(WmError::ProtocolError(message));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "niri"
    }
}

#[derive(Debug, Deserialize)]
struct FocusedWindowReply {
    #[serde(rename = "Ok")]
    ok: Option<FocusedWindowOk>,
}

#[derive(Debug, Deserialize)]
struct FocusedWindowOk {
    #[serde(rename = "FocusedWindow")]
    focused_window: Option<NiriWindow>,
}

#[derive(Debug, Deserialize)]
struct NiriWindow {
    pid: Option<Pid>,
}

#[derive(Debug, Deserialize)]
struct ActionReply {
    #[serde(rename = "Err")]
    err: Option<String>,
}
