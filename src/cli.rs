//! Command-line surface and per-invocation glue.

use anyhow::{Context, Result};
use clap::Parser;

use crate::direction::Direction;
use crate::hooks::detect::detect_hooks;
use crate::hooks::{hooks_by_names, registry, Hook};
use crate::resolver::navigate;
use crate::wm::{connect_backend, Backend};

#[derive(Parser, Debug)]
#[command(name = "nvg")]
#[command(version, disable_version_flag = true)]
#[command(about = "Directional focus navigation across WM windows, panes and splits")]
pub struct Cli {
    /// Direction to navigate: left|right|up|down (or h|l|k|j)
    pub direction: Direction,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// IPC timeout in milliseconds; 0 disables timeouts
    #[arg(short = 't', long, default_value_t = 100, value_name = "MS")]
    pub timeout: u64,

    /// Comma-separated hook subset (nvim,tmux,vscode,kitty,wezterm,ghostty)
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub hooks: Option<Vec<String>>,

    /// Skip detection and use this window manager
    #[arg(long, value_name = "NAME")]
    pub wm: Option<Backend>,
}

/// Perform the single focus action this invocation is for.
pub fn run(cli: Cli) -> Result<()> {
    let hooks: Vec<&'static dyn Hook> = match &cli.hooks {
        Some(names) => hooks_by_names(names).map_err(|e| anyhow::anyhow!(e))?,
        None => registry().to_vec(),
    };

    let mut wm = connect_backend(cli.wm, cli.timeout)
        .context("cannot reach a window manager")?;
    navigate(
        wm.as_mut(),
        cli.direction,
        cli.timeout,
        &hooks,
        |pid, enabled| detect_hooks(pid, enabled),
    );
    wm.disconnect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_direction_and_defaults() {
        let cli = Cli::try_parse_from(["nvg", "left"]).unwrap();
        assert_eq!(cli.direction, Direction::Left);
        assert_eq!(cli.timeout, 100);
        assert!(cli.hooks.is_none());
        assert!(cli.wm.is_none());
    }

    #[test]
    fn test_parses_vim_letter_alias() {
        let cli = Cli::try_parse_from(["nvg", "l"]).unwrap();
        assert_eq!(cli.direction, Direction::Right);
    }

    #[test]
    fn test_parses_hook_list_and_wm() {
        let cli =
            Cli::try_parse_from(["nvg", "down", "--hooks", "nvim,tmux", "--wm", "i3"]).unwrap();
        assert_eq!(
            cli.hooks.as_deref(),
            Some(&["nvim".to_string(), "tmux".to_string()][..])
        );
        assert_eq!(cli.wm, Some(Backend::Sway));
    }

    #[test]
    fn test_timeout_flag() {
        let cli = Cli::try_parse_from(["nvg", "up", "-t", "250"]).unwrap();
        assert_eq!(cli.timeout, 250);
    }

    #[test]
    fn test_rejects_missing_or_bad_direction() {
        assert!(Cli::try_parse_from(["nvg"]).is_err());
        assert!(Cli::try_parse_from(["nvg", "north"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_wm() {
        assert!(Cli::try_parse_from(["nvg", "up", "--wm", "kwin"]).is_err());
    }

    #[test]
    fn test_short_version_flag() {
        let err = Cli::try_parse_from(["nvg", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
