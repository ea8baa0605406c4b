//! Process-tree hook detection.
//!
//! Walks the descendants of the WM-focused process breadth-first and
//! applies every enabled hook's probe to each one. Breadth-first
//! keeps the emitted list shallowest-first with non-decreasing
//! depths, which is what the resolver's reverse iteration relies on.

use std::path::Path;

use tracing::debug;

use super::{Detected, DetectedList, Hook};
use crate::process::{
    argv0_in, children_in, comm_in, exe_basename_in, Pid, WALK_MAX_DEPTH, WALK_MAX_VISITED,
};

/// Detect enabled hooks under `root_pid` in the real `/proc`.
///
/// The root itself is not probed; hooks match descendants only (the
/// WM-focused process is the terminal or editor's own window process,
/// and a hook matching it would shadow everything inside).
pub fn detect_hooks<'a>(root_pid: Pid, hooks: &[&'a dyn Hook]) -> DetectedList<'a> {
    detect_hooks_in(Path::new("/proc"), root_pid, hooks)
}

pub fn detect_hooks_in<'a>(
    proc_root: &Path,
    root_pid: Pid,
    hooks: &[&'a dyn Hook],
) -> DetectedList<'a> {
    let mut detected = DetectedList::new();
    let mut frontier = vec![root_pid];
    let mut visited = 0usize;

    for depth in 1..=WALK_MAX_DEPTH {
        let mut next = Vec::new();
        for &parent in &frontier {
            for child in children_in(proc_root, parent) {
                visited += 1;
                if visited > WALK_MAX_VISITED {
                    return detected;
                }
                probe(proc_root, child, depth, hooks, &mut detected);
                next.push(child);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    detected
}

fn probe<'a>(
    proc_root: &Path,
    pid: Pid,
    depth: u32,
    hooks: &[&'a dyn Hook],
    detected: &mut DetectedList<'a>,
) {
    let comm = comm_in(proc_root, pid).unwrap_or_default();
    let exe = exe_basename_in(proc_root, pid).unwrap_or_default();
    let argv0 = argv0_in(proc_root, pid).unwrap_or_default();
    for hook in hooks {
        if let Some(match_pid) = hook.detect(pid, &comm, &exe, &argv0) {
            debug!(hook = hook.name(), pid = match_pid, depth, "hook detected");
            detected.push(Detected {
                hook: *hook,
                pid: match_pid,
                depth,
            });
        }
    }
}
