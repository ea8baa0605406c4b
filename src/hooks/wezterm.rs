//! WezTerm hook via `wezterm cli`.
//!
//! `get-pane-direction` prints the neighbour's pane id, or nothing
//! when the pane is at the edge; that distinction carries the whole
//! tri-state. `activate-pane-direction` moves.

use std::process::Command;

use tracing::debug;

use super::{CanMove, Hook, EDGE_LOOP_MAX};
use crate::direction::Direction;
use crate::error::HookError;
use crate::process::{environ_var_of, Pid};

pub struct WeztermHook;

struct WeztermEnv {
    pane_id: u64,
    /// Absent when wezterm runs its default socket; the CLI finds it.
    socket: Option<String>,
}

impl WeztermHook {
    fn env_for(pid: Pid) -> Result<WeztermEnv, HookError> {
        let pane_id = environ_var_of(pid, "WEZTERM_PANE")
            .or_else(|| std::env::var("WEZTERM_PANE").ok())
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| HookError::ParseFailed("WEZTERM_PANE".into()))?;
        let socket = environ_var_of(pid, "WEZTERM_UNIX_SOCKET")
            .or_else(|| std::env::var("WEZTERM_UNIX_SOCKET").ok());
        Ok(WeztermEnv { pane_id, socket })
    }

    fn run(env: &WeztermEnv, args: &[&str]) -> Result<std::process::Output, HookError> {
        let mut command = Command::new("wezterm");
        if let Some(socket) = &env.socket {
            command.arg("--unix-socket").arg(socket);
        }
        command
            .arg("cli")
            .args(args)
            .output()
            .map_err(|e| HookError::Helper(format!("wezterm spawn failed: {e}")))
    }

    /// Neighbour pane id in `dir`, `Ok(None)` when at the edge.
    fn pane_in_direction(
        env: &WeztermEnv,
        pane_id: u64,
        dir: Direction,
    ) -> Result<Option<u64>, HookError> {
        let pane = pane_id.to_string();
        let output = Self::run(
            env,
            &[
                "get-pane-direction",
                "--pane-id",
                &pane,
                dir.wezterm_arg(),
            ],
        )?;
        if !output.status.success() {
            return Err(HookError::Helper(format!(
                "wezterm exited with {}",
                output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse()
            .map(Some)
            .map_err(|_| HookError::ParseFailed(format!("pane id '{trimmed}'")))
    }

    fn activate(env: &WeztermEnv, pane_id: u64, dir: Direction) -> Result<(), HookError> {
        let pane = pane_id.to_string();
        let output = Self::run(
            env,
            &[
                "activate-pane-direction",
                "--pane-id",
                &pane,
                dir.wezterm_arg(),
            ],
        )?;
        if !output.status.success() {
            return Err(HookError::Helper(format!(
                "wezterm exited with {}",
                output.status
            )));
        }
        Ok(())
    }
}

impl Hook for WeztermHook {
    fn name(&self) -> &'static str {
        "wezterm"
    }

    fn detect(&self, pid: Pid, comm: &str, exe_basename: &str, argv0: &str) -> Option<Pid> {
        (comm.contains("wezterm") || exe_basename.contains("wezterm") || argv0.contains("wezterm"))
            .then_some(pid)
    }

    fn can_move(&self, pid: Pid, dir: Direction, _timeout_ms: u64) -> CanMove {
        let answer = Self::env_for(pid)
            .and_then(|env| Self::pane_in_direction(&env, env.pane_id, dir));
        match answer {
            Ok(Some(_)) => CanMove::Yes,
            Ok(None) => CanMove::No,
            Err(e) => {
                debug!(error = %e, "wezterm direction probe failed");
                CanMove::Unknown
            }
        }
    }

    fn move_focus(&self, pid: Pid, dir: Direction, _timeout_ms: u64) {
        let result = Self::env_for(pid).and_then(|env| Self::activate(&env, env.pane_id, dir));
        if let Err(e) = result {
            debug!(error = %e, "wezterm activate-pane failed");
        }
    }

    /// Follow neighbour ids outward, re-anchoring on each step so the
    /// loop tracks the pane it just moved to.
    fn move_to_edge(&self, pid: Pid, dir: Direction, _timeout_ms: u64) {
        let Ok(env) = Self::env_for(pid) else {
            return;
        };
        let mut current = env.pane_id;
        for _ in 0..EDGE_LOOP_MAX {
            match Self::pane_in_direction(&env, current, dir) {
                Ok(Some(neighbour)) => {
                    if Self::activate(&env, current, dir).is_err() {
                        return;
                    }
                    current = neighbour;
                }
                _ => return,
            }
        }
    }
}
