//! dwm backend: dwmfifo for commands, raw X11 for queries.
//!
//! The dwmfifo patch reads newline-terminated command words from a
//! fifo. `focusstack` only cycles the stack, so Left/Up map to `-`
//! and Right/Down to `+` — the patch has no spatial vocabulary.

use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use tracing::debug;

use super::x11::X11Conn;
use super::WindowManager;
use crate::direction::Direction;
use crate::error::WmError;
use crate::process::Pid;

const DEFAULT_FIFO: &str = "/tmp/dwm.fifo";

pub struct DwmWm {
    fifo_path: PathBuf,
    timeout_ms: u64,
}

impl DwmWm {
    pub fn new(timeout_ms: u64) -> Self {
        let fifo_path = std::env::var_os("DWM_FIFO")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FIFO));
        Self {
            fifo_path,
            timeout_ms,
        }
    }

    fn command(dir: Direction) -> &'static str {
        match dir {
            Direction::Left | Direction::Up => "focusstack-\n",
            Direction::Right | Direction::Down => "focusstack+\n",
        }
    }
}

impl WindowManager for DwmWm {
    fn focused_pid(&mut self) -> Option<Pid> {
        let mut conn = X11Conn::connect(self.timeout_ms)?;
        let pid = conn.active_window_pid();
        if pid.is_none() {
            debug!("no _NET_ACTIVE_WINDOW/_NET_WM_PID answer from X");
        }
        pid
    }

    fn move_focus(&mut self, dir: Direction) -> Result<(), WmError> {
        // Non-blocking so a fifo with no reader fails fast instead of
        // hanging the invocation.
        let mut fifo = std::fs::OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.fifo_path)
            .map_err(|source| WmError::ConnectFailed {
                path: self.fifo_path.clone(),
                source,
            })?;
        fifo.write_all(Self::command(dir).as_bytes())
            .map_err(WmError::WriteFailed)
    }

    fn name(&self) -> &'static str {
        "dwm"
    }
}
