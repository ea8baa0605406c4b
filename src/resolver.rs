//! The focus resolver: decides which layer consumes the keystroke.
//!
//! One invocation performs exactly one focus action. The detected
//! hook stack is tried innermost-first; a confident `Yes` consumes
//! the keystroke, while `No` and `Unknown` both bubble outward until
//! the window manager itself moves. After a WM move the destination
//! is re-detected and its innermost layer is steered to the entry
//! edge, so moving right lands on the leftmost split of the new
//! window.
//!
//! Detection is injected as a function so the state machine is fully
//! coverable with recording mocks.

use tracing::debug;

use crate::direction::Direction;
use crate::hooks::{CanMove, DetectedList, Hook};
use crate::process::Pid;
use crate::wm::WindowManager;

/// Navigate one step in `dir`, bubbling through the hook stack and
/// falling back to the window manager. Never fails: every error has
/// already collapsed to `Unknown` or "absent" by the time it gets
/// here.
pub fn navigate<'h, F>(
    wm: &mut dyn WindowManager,
    dir: Direction,
    timeout_ms: u64,
    hooks: &[&'h dyn Hook],
    detect: F,
) where
    F: Fn(Pid, &[&'h dyn Hook]) -> DetectedList<'h>,
{
    if let Some(pid) = wm.focused_pid() {
        debug!(pid, "focused window process");
        let detected = detect(pid, hooks);
        for entry in detected.iter().rev() {
            match entry.hook.can_move(entry.pid, dir, timeout_ms) {
                CanMove::Yes => {
                    debug!(hook = entry.hook.name(), pid = entry.pid, "moving inside hook");
                    entry.hook.move_focus(entry.pid, dir, timeout_ms);
                    return;
                }
                CanMove::No => {
                    debug!(hook = entry.hook.name(), pid = entry.pid, "at edge, bubbling");
                }
                CanMove::Unknown => {
                    debug!(hook = entry.hook.name(), pid = entry.pid, "no answer, bubbling");
                }
            }
        }
    } else {
        debug!("no focused window reported");
    }

    // Every layer bubbled: move at the window-manager level, then
    // land at the entry edge of wherever focus arrived.
    if let Err(e) = wm.move_focus(dir) {
        debug!(error = %e, "wm move failed");
        return;
    }
    debug!(%dir, "wm moved focus");

    let Some(landed) = wm.focused_pid() else {
        return;
    };
    let detected = detect(landed, hooks);
    let Some(inner) = detected.innermost() else {
        return;
    };
    debug!(
        hook = inner.hook.name(),
        pid = inner.pid,
        "steering to entry edge"
    );
    inner.hook.move_to_edge(inner.pid, dir.opposite(), timeout_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WmError;
    use crate::hooks::Detected;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockWm {
        /// Answers for successive focused_pid calls.
        focused: Vec<Option<Pid>>,
        queries: usize,
        moves: Vec<Direction>,
        fail_move: bool,
    }

    impl MockWm {
        fn focused(answers: &[Option<Pid>]) -> Self {
            Self {
                focused: answers.to_vec(),
                ..Self::default()
            }
        }
    }

    impl WindowManager for MockWm {
        fn focused_pid(&mut self) -> Option<Pid> {
            let answer = self.focused.get(self.queries).copied().flatten();
            self.queries += 1;
            answer
        }

        fn move_focus(&mut self, dir: Direction) -> Result<(), WmError> {
            self.moves.push(dir);
            if self.fail_move {
                Err(WmError::WriteFailed(std::io::Error::other("mock")))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    #[derive(Default)]
    struct MockHook {
        answer: Option<CanMove>,
        can_move_calls: Mutex<Vec<(Pid, Direction)>>,
        move_calls: Mutex<Vec<(Pid, Direction)>>,
        edge_calls: Mutex<Vec<(Pid, Direction, u64)>>,
    }

    impl MockHook {
        fn answering(answer: CanMove) -> Self {
            Self {
                answer: Some(answer),
                ..Self::default()
            }
        }

        fn can_move_count(&self) -> usize {
            self.can_move_calls.lock().unwrap().len()
        }
    }

    impl Hook for MockHook {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn detect(&self, _pid: Pid, _comm: &str, _exe: &str, _argv0: &str) -> Option<Pid> {
            None
        }

        fn can_move(&self, pid: Pid, dir: Direction, _timeout_ms: u64) -> CanMove {
            self.can_move_calls.lock().unwrap().push((pid, dir));
            self.answer.expect("can_move on a hook without an answer")
        }

        fn move_focus(&self, pid: Pid, dir: Direction, _timeout_ms: u64) {
            self.move_calls.lock().unwrap().push((pid, dir));
        }

        fn move_to_edge(&self, pid: Pid, dir: Direction, timeout_ms: u64) {
            self.edge_calls.lock().unwrap().push((pid, dir, timeout_ms));
        }
    }

    /// Detection list with the given hooks at pids 100, 101, ...
    /// and depths 1, 2, ...
    fn stack<'h>(hooks: &[&'h dyn Hook]) -> DetectedList<'h> {
        let mut list = DetectedList::new();
        for (index, hook) in hooks.iter().enumerate() {
            list.push(Detected {
                hook: *hook,
                pid: 100 + index as Pid,
                depth: 1 + index as u32,
            });
        }
        list
    }

    #[test]
    fn test_no_focused_pid_moves_wm_once() {
        let mut wm = MockWm::focused(&[None, None]);
        let hook = MockHook::answering(CanMove::Yes);
        let hooks: Vec<&dyn Hook> = vec![&hook];
        navigate(&mut wm, Direction::Right, 100, &hooks, |_, h| stack(h));
        assert_eq!(wm.moves, vec![Direction::Right]);
        assert_eq!(hook.can_move_count(), 0);
    }

    #[test]
    fn test_empty_detection_moves_wm_once() {
        let mut wm = MockWm::focused(&[Some(7), None]);
        navigate(&mut wm, Direction::Left, 100, &[], |_, _| {
            DetectedList::new()
        });
        assert_eq!(wm.moves, vec![Direction::Left]);
    }

    #[test]
    fn test_innermost_yes_consumes_keystroke() {
        let outer = MockHook::answering(CanMove::Yes);
        let inner = MockHook::answering(CanMove::Yes);
        let mut wm = MockWm::focused(&[Some(7)]);
        let hooks: Vec<&dyn Hook> = vec![&outer, &inner];
        navigate(&mut wm, Direction::Down, 100, &hooks, |_, h| stack(h));

        // inner is the deepest entry (pid 101) and consumes the move
        assert_eq!(*inner.move_calls.lock().unwrap(), vec![(101, Direction::Down)]);
        assert_eq!(outer.can_move_count(), 0, "outer hook must not be consulted");
        assert!(wm.moves.is_empty());
    }

    #[test]
    fn test_edge_answer_bubbles_to_outer_hook() {
        let outer = MockHook::answering(CanMove::Yes);
        let inner = MockHook::answering(CanMove::No);
        let mut wm = MockWm::focused(&[Some(7)]);
        let hooks: Vec<&dyn Hook> = vec![&outer, &inner];
        navigate(&mut wm, Direction::Right, 100, &hooks, |_, h| stack(h));

        assert_eq!(inner.can_move_count(), 1);
        assert_eq!(*outer.move_calls.lock().unwrap(), vec![(100, Direction::Right)]);
        assert!(wm.moves.is_empty());
    }

    #[test]
    fn test_unknown_bubbles_like_edge() {
        let outer = MockHook::answering(CanMove::Unknown);
        let inner = MockHook::answering(CanMove::Unknown);
        let mut wm = MockWm::focused(&[Some(7), None]);
        let hooks: Vec<&dyn Hook> = vec![&outer, &inner];
        navigate(&mut wm, Direction::Up, 100, &hooks, |_, h| stack(h));

        assert_eq!(inner.can_move_count(), 1);
        assert_eq!(outer.can_move_count(), 1);
        assert_eq!(wm.moves, vec![Direction::Up]);
        assert!(inner.move_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_landing_steers_innermost_to_opposite_edge() {
        // Before the move nothing is detected; after it, a two-hook
        // stack appears in the destination window.
        let landing_outer = MockHook::answering(CanMove::No);
        let landing_inner = MockHook::answering(CanMove::No);
        let mut wm = MockWm::focused(&[Some(7), Some(8)]);
        let hooks: Vec<&dyn Hook> = vec![&landing_outer, &landing_inner];
        navigate(&mut wm, Direction::Right, 250, &hooks, |pid, h| {
            if pid == 8 {
                stack(h)
            } else {
                DetectedList::new()
            }
        });

        assert_eq!(wm.moves, vec![Direction::Right]);
        // deepest entry of the re-detection, opposite direction
        assert_eq!(
            *landing_inner.edge_calls.lock().unwrap(),
            vec![(101, Direction::Left, 250)]
        );
        assert!(landing_outer.edge_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_wm_move_skips_landing() {
        let mut wm = MockWm {
            focused: vec![None, Some(8)],
            fail_move: true,
            ..MockWm::default()
        };
        let hook = MockHook::answering(CanMove::No);
        let hooks: Vec<&dyn Hook> = vec![&hook];
        navigate(&mut wm, Direction::Left, 100, &hooks, |_, h| stack(h));
        assert_eq!(wm.moves.len(), 1);
        assert!(hook.edge_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_landing_pid_ends_quietly() {
        let mut wm = MockWm::focused(&[None, None]);
        navigate(&mut wm, Direction::Down, 100, &[], |_, _| {
            DetectedList::new()
        });
        assert_eq!(wm.moves, vec![Direction::Down]);
        assert_eq!(wm.queries, 2);
    }
}
