//! Ghostty stub: detection only, same posture as the VS Code hook.

use super::{CanMove, Hook};
use crate::direction::Direction;
use crate::process::Pid;

pub struct GhosttyHook;

impl Hook for GhosttyHook {
    fn name(&self) -> &'static str {
        "ghostty"
    }

    fn detect(&self, pid: Pid, comm: &str, exe_basename: &str, argv0: &str) -> Option<Pid> {
        let argv0_base = argv0.rsplit('/').next().unwrap_or(argv0);
        let matches = |name: &str| name == "ghostty";
        (matches(comm) || matches(exe_basename) || matches(argv0_base)).then_some(pid)
    }

    fn can_move(&self, _pid: Pid, _dir: Direction, _timeout_ms: u64) -> CanMove {
        CanMove::Unknown
    }

    fn move_focus(&self, _pid: Pid, _dir: Direction, _timeout_ms: u64) {}

    fn move_to_edge(&self, _pid: Pid, _dir: Direction, _timeout_ms: u64) {}
}
