//! Hook abstraction for focus-aware applications.
//!
//! A hook adapts one application (editor, multiplexer, terminal with
//! splits) so the resolver can probe and drive focus inside it. Hooks
//! are stateless singletons; any auxiliary IPC is opened afresh per
//! call and every failure collapses to `Unknown` so the keystroke
//! bubbles to the next layer instead of vanishing.

pub mod detect;
pub mod ghostty;
pub mod kitty;
pub mod nvim;
pub mod tmux;
pub mod vscode;
pub mod wezterm;

use crate::direction::Direction;
use crate::process::Pid;

/// Three-valued edge probe answer.
///
/// `No` and `Unknown` both bubble up, but they are distinct answers:
/// one is a confident "at edge", the other is a failure or timeout,
/// and debug traces tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanMove {
    Yes,
    No,
    Unknown,
}

/// Adapter for one focus-aware application.
pub trait Hook: Sync {
    /// Registry name, as accepted by `--hooks`.
    fn name(&self) -> &'static str;

    /// Probe one process of the focused window's tree. `comm`, `exe`
    /// and `argv0` may be empty when unreadable. Returns the pid the
    /// remaining operations should target (normally `pid` itself).
    fn detect(&self, pid: Pid, comm: &str, exe_basename: &str, argv0: &str) -> Option<Pid>;

    /// Is there a neighbour in `dir` inside the application?
    fn can_move(&self, pid: Pid, dir: Direction, timeout_ms: u64) -> CanMove;

    /// Move one step inside the application. Best-effort.
    fn move_focus(&self, pid: Pid, dir: Direction, timeout_ms: u64);

    /// Walk to the outermost split in `dir`. Used after a WM move to
    /// land at the entry edge of the new window. Best-effort.
    fn move_to_edge(&self, pid: Pid, dir: Direction, timeout_ms: u64);
}

/// Shared cap for move-to-edge loops.
pub(crate) const EDGE_LOOP_MAX: usize = 50;

/// All hooks in registration order. Detection applies them in this
/// order per process, so earlier entries win on a tie.
pub fn registry() -> &'static [&'static dyn Hook] {
    static REGISTRY: [&'static dyn Hook; 6] = [
        &nvim::NvimHook,
        &tmux::TmuxHook,
        &vscode::VscodeHook,
        &kitty::KittyHook,
        &wezterm::WeztermHook,
        &ghostty::GhosttyHook,
    ];
    &REGISTRY
}

/// Resolve `--hooks` names against the registry, preserving registry
/// order regardless of the order given.
pub fn hooks_by_names(names: &[String]) -> Result<Vec<&'static dyn Hook>, String> {
    if names.is_empty() {
        return Err("empty hook list".to_string());
    }
    for name in names {
        if !registry().iter().any(|h| h.name() == name) {
            return Err(format!("unknown hook '{name}'"));
        }
    }
    Ok(registry()
        .iter()
        .copied()
        .filter(|h| names.iter().any(|n| n == h.name()))
        .collect())
}

/// One positive detection: which hook matched, where, and how deep
/// under the WM-focused process.
#[derive(Clone, Copy)]
pub struct Detected<'a> {
    pub hook: &'a dyn Hook,
    pub pid: Pid,
    pub depth: u32,
}

/// Capacity of a detection list. Deeper stacks are pathological and
/// silently truncated.
pub const MAX_DETECTED: usize = 8;

/// Fixed-capacity list of detections, shallowest first. Iterate in
/// reverse for innermost-first.
pub struct DetectedList<'a> {
    slots: [Option<Detected<'a>>; MAX_DETECTED],
    len: usize,
}

impl<'a> DetectedList<'a> {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_DETECTED],
            len: 0,
        }
    }

    /// Append, dropping the entry once the list is full.
    pub fn push(&mut self, entry: Detected<'a>) {
        if self.len < MAX_DETECTED {
            self.slots[self.len] = Some(entry);
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shallowest-first iteration.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Detected<'a>> {
        self.slots[..self.len].iter().flatten()
    }

    /// The deepest entry, i.e. the innermost layer.
    pub fn innermost(&self) -> Option<&Detected<'a>> {
        self.iter().next_back()
    }
}

impl<'a> Default for DetectedList<'a> {
    fn default() -> Self {
        Self::new()
    }
}
