//! Window-manager detection logic.

use std::str::FromStr;

use tracing::{debug, info};

use super::dwm::DwmWm;
use super::hyprland::HyprlandWm;
use super::niri::NiriWm;
use super::river::RiverWm;
use super::sway::SwayWm;
use super::WindowManager;
use crate::error::WmError;

/// Supported window-manager families. Sway and i3 share a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sway,
    Hyprland,
    Niri,
    River,
    Dwm,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Sway => "sway",
            Backend::Hyprland => "hyprland",
            Backend::Niri => "niri",
            Backend::River => "river",
            Backend::Dwm => "dwm",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sway" | "i3" => Ok(Backend::Sway),
            "hyprland" => Ok(Backend::Hyprland),
            "niri" => Ok(Backend::Niri),
            "river" => Ok(Backend::River),
            "dwm" => Ok(Backend::Dwm),
            other => Err(format!(
                "unknown window manager '{other}', expected sway|i3|hyprland|niri|river|dwm"
            )),
        }
    }
}

/// Probe the environment for a running window manager.
///
/// Probe order: `SWAYSOCK`, `I3SOCK` (same protocol),
/// `HYPRLAND_INSTANCE_SIGNATURE`, `NIRI_SOCKET`, then River via
/// `XDG_CURRENT_DESKTOP=river` with a Wayland display. dwm exposes no
/// environment marker of its own beyond `DWM_FIFO`, so it is probed
/// last and otherwise reached with an explicit `--wm dwm`.
pub fn detect_backend() -> Option<Backend> {
    if std::env::var_os("SWAYSOCK").is_some() || std::env::var_os("I3SOCK").is_some() {
        return Some(Backend::Sway);
    }
    if std::env::var_os("HYPRLAND_INSTANCE_SIGNATURE").is_some() {
        return Some(Backend::Hyprland);
    }
    if std::env::var_os("NIRI_SOCKET").is_some() {
        return Some(Backend::Niri);
    }
    if std::env::var("XDG_CURRENT_DESKTOP").as_deref() == Ok("river")
        && std::env::var_os("WAYLAND_DISPLAY").is_some()
    {
        return Some(Backend::River);
    }
    if std::env::var_os("DWM_FIFO").is_some() {
        return Some(Backend::Dwm);
    }
    None
}

/// Create the backend for `choice`, or auto-detect when `None`.
pub fn connect_backend(
    choice: Option<Backend>,
    timeout_ms: u64,
) -> Result<Box<dyn WindowManager>, WmError> {
    let backend = match choice {
        Some(b) => {
            debug!(wm = b.name(), "window manager forced by flag");
            b
        }
        None => detect_backend().ok_or(WmError::NoWmDetected)?,
    };
    info!(wm = backend.name(), "using window manager backend");
    match backend {
        Backend::Sway => Ok(Box::new(SwayWm::connect(timeout_ms)?)),
        Backend::Hyprland => Ok(Box::new(HyprlandWm::new(timeout_ms)?)),
        Backend::Niri => Ok(Box::new(NiriWm::new(timeout_ms)?)),
        Backend::River => Ok(Box::new(RiverWm::new(timeout_ms)?)),
        Backend::Dwm => Ok(Box::new(DwmWm::new(timeout_ms))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names_parse() {
        assert_eq!("sway".parse::<Backend>().unwrap(), Backend::Sway);
        assert_eq!("i3".parse::<Backend>().unwrap(), Backend::Sway);
        assert_eq!("hyprland".parse::<Backend>().unwrap(), Backend::Hyprland);
        assert_eq!("niri".parse::<Backend>().unwrap(), Backend::Niri);
        assert_eq!("river".parse::<Backend>().unwrap(), Backend::River);
        assert_eq!("dwm".parse::<Backend>().unwrap(), Backend::Dwm);
        assert!("kwin".parse::<Backend>().is_err());
    }
}
