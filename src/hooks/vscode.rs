//! VS Code stub: detection only.
//!
//! Code has no external IPC for editor-group navigation, so this hook
//! answers `Unknown` and lets the keystroke bubble to the window
//! manager. Keeping the detection means a future implementation slots
//! in without touching the resolver.

use super::{CanMove, Hook};
use crate::direction::Direction;
use crate::process::Pid;

pub struct VscodeHook;

impl Hook for VscodeHook {
    fn name(&self) -> &'static str {
        "vscode"
    }

    /// Exact basename match only; `code` is a substring trap
    /// (barcode, encode, unicode...).
    fn detect(&self, pid: Pid, comm: &str, exe_basename: &str, argv0: &str) -> Option<Pid> {
        let argv0_base = argv0.rsplit('/').next().unwrap_or(argv0);
        let matches = |name: &str| name == "code" || name == "code-oss";
        (matches(comm) || matches(exe_basename) || matches(argv0_base)).then_some(pid)
    }

    fn can_move(&self, _pid: Pid, _dir: Direction, _timeout_ms: u64) -> CanMove {
        CanMove::Unknown
    }

    fn move_focus(&self, _pid: Pid, _dir: Direction, _timeout_ms: u64) {}

    fn move_to_edge(&self, _pid: Pid, _dir: Direction, _timeout_ms: u64) {}
}
