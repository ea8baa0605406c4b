//! Tmux hook driven through the tmux CLI.
//!
//! The server's socket path is the first comma-separated field of the
//! `TMUX` variable in the server process's environ. Edge probes use
//! `display-message -p` with the `pane_at_*` format variables, which
//! evaluate against the currently active pane; movement uses
//! `select-pane`.

use std::process::Command;

use tracing::debug;

use super::{CanMove, Hook, EDGE_LOOP_MAX};
use crate::direction::Direction;
use crate::error::HookError;
use crate::process::{environ_var_of, Pid};

pub struct TmuxHook;

impl TmuxHook {
    /// Socket path from the server's `TMUX` entry
    /// (`<socket>,<server-pid>,<session>`), falling back to our own
    /// `TMUX` and finally the default server socket location.
    fn socket_path(pid: Pid) -> Result<String, HookError> {
        let tmux_var = environ_var_of(pid, "TMUX").or_else(|| std::env::var("TMUX").ok());
        if let Some(tmux_var) = tmux_var {
            let socket = tmux_var.split(',').next().unwrap_or_default();
            if !socket.is_empty() {
                return Ok(socket.to_string());
            }
        }
        let tmpdir = std::env::var("TMUX_TMPDIR").unwrap_or_else(|_| "/tmp".to_string());
        let uid = unsafe { libc::getuid() };
        Ok(format!("{tmpdir}/tmux-{uid}/default"))
    }

    fn run(socket: &str, args: &[&str]) -> Result<String, HookError> {
        let output = Command::new("tmux")
            .arg("-S")
            .arg(socket)
            .args(args)
            .output()
            .map_err(|e| HookError::Helper(format!("tmux spawn failed: {e}")))?;
        if !output.status.success() {
            return Err(HookError::Helper(format!(
                "tmux exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn at_edge(socket: &str, dir: Direction) -> Result<bool, HookError> {
        let out = Self::run(socket, &["display-message", "-p", dir.tmux_edge_var()])?;
        match out.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(HookError::ParseFailed(format!(
                "unexpected pane_at answer '{other}'"
            ))),
        }
    }

    fn select_pane(socket: &str, dir: Direction) -> Result<(), HookError> {
        Self::run(socket, &["select-pane", dir.tmux_flag()]).map(|_| ())
    }
}

impl Hook for TmuxHook {
    fn name(&self) -> &'static str {
        "tmux"
    }

    /// Any process name containing `tmux` (client or server).
    fn detect(&self, pid: Pid, comm: &str, exe_basename: &str, argv0: &str) -> Option<Pid> {
        (comm.contains("tmux") || exe_basename.contains("tmux") || argv0.contains("tmux"))
            .then_some(pid)
    }

    fn can_move(&self, pid: Pid, dir: Direction, _timeout_ms: u64) -> CanMove {
        let answer = Self::socket_path(pid).and_then(|socket| Self::at_edge(&socket, dir));
        match answer {
            Ok(true) => CanMove::No,
            Ok(false) => CanMove::Yes,
            Err(e) => {
                debug!(error = %e, "tmux edge probe failed");
                CanMove::Unknown
            }
        }
    }

    fn move_focus(&self, pid: Pid, dir: Direction, _timeout_ms: u64) {
        let result = Self::socket_path(pid).and_then(|socket| Self::select_pane(&socket, dir));
        if let Err(e) = result {
            debug!(error = %e, "tmux select-pane failed");
        }
    }

    fn move_to_edge(&self, pid: Pid, dir: Direction, _timeout_ms: u64) {
        let Ok(socket) = Self::socket_path(pid) else {
            return;
        };
        for _ in 0..EDGE_LOOP_MAX {
            match Self::at_edge(&socket, dir) {
                Ok(false) => {
                    if Self::select_pane(&socket, dir).is_err() {
                        return;
                    }
                }
                _ => return,
            }
        }
    }
}
