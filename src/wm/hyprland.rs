//! Hyprland backend using the request socket.
//!
//! Each request is one plain-text line on a fresh connection to
//! `.socket.sock`; shutting down the write half marks end-of-request,
//! then the reply is read to EOF.

use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::{socket_timeout, WindowManager};
use crate::direction::Direction;
use crate::error::WmError;
use crate::process::Pid;

/// Hyprland replies fit comfortably here; `j/activewindow` is a few
/// hundred bytes.
const REPLY_MAX: usize = 8192;

pub struct HyprlandWm {
    socket_path: PathBuf,
    timeout_ms: u64,
}

impl HyprlandWm {
    pub fn new(timeout_ms: u64) -> Result<Self, WmError> {
        let signature = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
            .map_err(|_| WmError::NoSocketPath("hyprland"))?;
        let runtime_dir =
            std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
        let socket_path =
            PathBuf::from(format!("{runtime_dir}/hypr/{signature}/.socket.sock"));
        Ok(Self {
            socket_path,
            timeout_ms,
        })
    }

    /// Send one command and read the reply to EOF.
    fn send_command(&self, cmd: &str) -> Result<String, WmError> {
        let mut stream =
            UnixStream::connect(&self.socket_path).map_err(|source| WmError::ConnectFailed {
                path: self.socket_path.clone(),
                source,
            })?;
        let timeout = socket_timeout(self.timeout_ms);
        let _ = stream.set_read_timeout(timeout);
        let _ = stream.set_write_timeout(timeout);

        stream
            .write_all(cmd.as_bytes())
            .map_err(WmError::WriteFailed)?;
        // Hyprland treats the closed write half as end-of-request.
        stream
            .shutdown(Shutdown::Write)
            .map_err(WmError::WriteFailed)?;

        let mut response = String::new();
        stream
            .take(REPLY_MAX as u64)
            .read_to_string(&mut response)
            .map_err(WmError::ReadFailed)?;
        Ok(response)
    }
}

impl WindowManager for HyprlandWm {
    fn focused_pid(&mut self) -> Option<Pid> {
        let json = match self.send_command("j/activewindow") {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "hyprland activewindow failed");
                return None;
            }
        };
        let window: ActiveWindow = match serde_json::from_str(&json) {
            Ok(w) => w,
            Err(e) => {
                // An empty object comes back when nothing is focused.
                debug!(error = %e, "hyprland activewindow parse failed");
                return None;
            }
        };
        (window.pid > 0).then_some(window.pid)
    }

    fn move_focus(&mut self, dir: Direction) -> Result<(), WmError> {
        self.send_command(&format!("dispatch movefocus {}", dir.hyprland_arg()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "hyprland"
    }
}

#[derive(Debug, Deserialize)]
struct ActiveWindow {
    #[serde(default)]
    pid: Pid,
}
