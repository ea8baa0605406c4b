//! Kitty hook via the `kitten @` remote-control CLI.
//!
//! `kitten @ ls` reports, per window, whether it sits at each screen
//! edge of its layout; `at_<edge> == true` means there is no
//! neighbour on that side. Movement goes through the
//! `neighboring_window` action.

use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use super::{CanMove, Hook, EDGE_LOOP_MAX};
use crate::direction::Direction;
use crate::error::HookError;
use crate::process::{environ_var_of, Pid};

pub struct KittyHook;

struct KittyEnv {
    listen_on: String,
    window_id: u64,
}

impl KittyHook {
    /// Socket and window id from the target's environ, falling back
    /// to our own environment (useful when nvg runs inside kitty).
    fn env_for(pid: Pid) -> Result<KittyEnv, HookError> {
        let listen_on = environ_var_of(pid, "KITTY_LISTEN_ON")
            .or_else(|| std::env::var("KITTY_LISTEN_ON").ok())
            .ok_or(HookError::NoSocket("kitty"))?;
        let window_id = environ_var_of(pid, "KITTY_WINDOW_ID")
            .or_else(|| std::env::var("KITTY_WINDOW_ID").ok())
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| HookError::ParseFailed("KITTY_WINDOW_ID".into()))?;
        Ok(KittyEnv {
            listen_on,
            window_id,
        })
    }

    fn run(socket: &str, args: &[&str]) -> Result<Vec<u8>, HookError> {
        let output = Command::new("kitten")
            .args(["@", "--to", socket])
            .args(args)
            .output()
            .map_err(|e| HookError::Helper(format!("kitten spawn failed: {e}")))?;
        if !output.status.success() {
            return Err(HookError::Helper(format!(
                "kitten exited with {}",
                output.status
            )));
        }
        Ok(output.stdout)
    }

    fn at_edge(env: &KittyEnv, dir: Direction) -> Result<bool, HookError> {
        let stdout = Self::run(&env.listen_on, &["ls"])?;
        let os_windows: Vec<OsWindow> = serde_json::from_slice(&stdout)
            .map_err(|e| HookError::ParseFailed(e.to_string()))?;
        window_at_edge(&os_windows, env.window_id, dir)
            .ok_or_else(|| HookError::ParseFailed("window not in kitten @ ls output".into()))
    }

    fn neighboring_window(env: &KittyEnv, dir: Direction) -> Result<(), HookError> {
        Self::run(
            &env.listen_on,
            &["action", "neighboring_window", dir.kitty_arg()],
        )
        .map(|_| ())
    }
}

/// Focused OS window, then focused tab, then window by id.
fn window_at_edge(os_windows: &[OsWindow], window_id: u64, dir: Direction) -> Option<bool> {
    let os_window = os_windows.iter().find(|w| w.is_focused)?;
    let tab = os_window.tabs.iter().find(|t| t.is_focused)?;
    let window = tab.windows.iter().find(|w| w.id == window_id)?;
    Some(match dir {
        Direction::Left => window.at_left,
        Direction::Right => window.at_right,
        Direction::Up => window.at_top,
        Direction::Down => window.at_bottom,
    })
}

impl Hook for KittyHook {
    fn name(&self) -> &'static str {
        "kitty"
    }

    /// `kitty` but not `kitten` (kittens are short-lived helpers).
    fn detect(&self, pid: Pid, comm: &str, exe_basename: &str, argv0: &str) -> Option<Pid> {
        let matches = |name: &str| name.contains("kitty") && !name.contains("kitten");
        (matches(comm) || matches(exe_basename) || matches(argv0)).then_some(pid)
    }

    fn can_move(&self, pid: Pid, dir: Direction, _timeout_ms: u64) -> CanMove {
        let answer = Self::env_for(pid).and_then(|env| Self::at_edge(&env, dir));
        match answer {
            Ok(true) => CanMove::No,
            Ok(false) => CanMove::Yes,
            Err(e) => {
                debug!(error = %e, "kitty edge probe failed");
                CanMove::Unknown
            }
        }
    }

    fn move_focus(&self, pid: Pid, dir: Direction, _timeout_ms: u64) {
        let result = Self::env_for(pid).and_then(|env| Self::neighboring_window(&env, dir));
        if let Err(e) = result {
            debug!(error = %e, "kitty neighboring_window failed");
        }
    }

    fn move_to_edge(&self, pid: Pid, dir: Direction, timeout_ms: u64) {
        for _ in 0..EDGE_LOOP_MAX {
            if self.can_move(pid, dir, timeout_ms) != CanMove::Yes {
                return;
            }
            self.move_focus(pid, dir, timeout_ms);
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsWindow {
    #[serde(default)]
    is_focused: bool,
    #[serde(default)]
    tabs: Vec<Tab>,
}

#[derive(Debug, Deserialize)]
struct Tab {
    #[serde(default)]
    is_focused: bool,
    #[serde(default)]
    windows: Vec<Window>,
}

#[derive(Debug, Deserialize)]
struct Window {
    id: u64,
    #[serde(default)]
    at_left: bool,
    #[serde(default)]
    at_right: bool,
    #[serde(default)]
    at_top: bool,
    #[serde(default)]
    at_bottom: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<OsWindow> {
        let json = r#"[
            {"is_focused": false, "tabs": []},
            {"is_focused": true, "tabs": [
                {"is_focused": false, "windows": [{"id": 1}]},
                {"is_focused": true, "windows": [
                    {"id": 2, "at_left": true, "at_right": false,
                     "at_top": true, "at_bottom": true},
                    {"id": 3, "at_left": false, "at_right": true,
                     "at_top": true, "at_bottom": true}
                ]}
            ]}
        ]"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_detect_kitty_not_kitten() {
        assert_eq!(KittyHook.detect(8, "kitty", "", ""), Some(8));
        assert_eq!(KittyHook.detect(8, "", "", "/usr/bin/kitty"), Some(8));
        assert_eq!(KittyHook.detect(8, "kitten", "kitten", "kitten"), None);
    }

    #[test]
    fn test_edge_flags_follow_focused_tab_and_id() {
        let windows = sample();
        // window 2 is leftmost: at the left edge, not the right
        assert_eq!(window_at_edge(&windows, 2, Direction::Left), Some(true));
        assert_eq!(window_at_edge(&windows, 2, Direction::Right), Some(false));
        assert_eq!(window_at_edge(&windows, 3, Direction::Right), Some(true));
    }

    #[test]
    fn test_unknown_window_id_is_absent() {
        assert_eq!(window_at_edge(&sample(), 99, Direction::Left), None);
    }

    #[test]
    fn test_vertical_uses_top_bottom_spelling() {
        assert_eq!(Direction::Up.kitty_arg(), "top");
        assert_eq!(Direction::Down.kitty_arg(), "bottom");
    }
}
