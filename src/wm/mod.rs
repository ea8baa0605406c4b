//! Window-manager abstraction.
//!
//! This module provides a trait-based abstraction over the host
//! compositor or X manager: query the focused window's process and
//! move focus one step. Implementations exist for i3/sway (shared
//! protocol), Hyprland, Niri, River, and dwm.

pub mod detect;
pub mod dwm;
pub mod hyprland;
pub mod niri;
pub mod river;
pub mod sway;
pub mod wayland;
pub mod x11;

use std::fmt;
use std::time::Duration;

pub use detect::{connect_backend, detect_backend, Backend};

use crate::direction::Direction;
use crate::error::WmError;
use crate::process::Pid;

/// Trait for window-manager focus operations.
///
/// Exactly one concrete backend exists per invocation; it is driven
/// through one or two IPC round-trips and then dropped.
pub trait WindowManager {
    /// Pid of the currently focused window's client.
    ///
    /// Transport and parse failures collapse to `None` ("no focused
    /// window"); the resolver then falls through to a plain WM move.
    fn focused_pid(&mut self) -> Option<Pid>;

    /// Move focus one step. Best-effort; an error here ends the
    /// invocation as a no-op.
    fn move_focus(&mut self, dir: Direction) -> Result<(), WmError>;

    /// Release the connection early. Dropping the backend does the
    /// same; this exists for backends that want an orderly shutdown.
    fn disconnect(&mut self) {}

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

impl fmt::Debug for dyn WindowManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowManager({})", self.name())
    }
}

/// Socket timeout from user milliseconds; 0 disables the timeout,
/// which for the std socket API means `None`.
pub(crate) fn socket_timeout(timeout_ms: u64) -> Option<Duration> {
    (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_timeout_zero_disables() {
        assert_eq!(socket_timeout(0), None);
        assert_eq!(socket_timeout(100), Some(Duration::from_millis(100)));
    }
}
