//! Navigation directions and their per-protocol spellings.
//!
//! Every backend and hook speaks its own dialect for the same four
//! directions; the conversions live here so the call sites stay flat.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Error for an unrecognized direction word.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown direction '{0}', expected left|right|up|down")]
pub struct ParseDirectionError(pub String);

impl Direction {
    /// The reverse direction. Moving right and landing means entering
    /// from the left edge, so arrival steering uses the opposite.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Canonical lowercase name, as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Vim motion letter (`wincmd h/l/k/j`, `winnr('h')`).
    pub fn vim_key(self) -> char {
        match self {
            Direction::Left => 'h',
            Direction::Right => 'l',
            Direction::Up => 'k',
            Direction::Down => 'j',
        }
    }

    /// Hyprland `dispatch movefocus` letter.
    pub fn hyprland_arg(self) -> &'static str {
        match self {
            Direction::Left => "l",
            Direction::Right => "r",
            Direction::Up => "u",
            Direction::Down => "d",
        }
    }

    /// kitty names vertical neighbours top/bottom rather than up/down.
    pub fn kitty_arg(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "top",
            Direction::Down => "bottom",
        }
    }

    /// wezterm CLI direction argument.
    pub fn wezterm_arg(self) -> &'static str {
        match self {
            Direction::Left => "Left",
            Direction::Right => "Right",
            Direction::Up => "Up",
            Direction::Down => "Down",
        }
    }

    /// tmux `select-pane` flag.
    pub fn tmux_flag(self) -> &'static str {
        match self {
            Direction::Left => "-L",
            Direction::Right => "-R",
            Direction::Up => "-U",
            Direction::Down => "-D",
        }
    }

    /// tmux pane edge format variable for this direction.
    pub fn tmux_edge_var(self) -> &'static str {
        match self {
            Direction::Left => "#{pane_at_left}",
            Direction::Right => "#{pane_at_right}",
            Direction::Up => "#{pane_at_top}",
            Direction::Down => "#{pane_at_bottom}",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Exact lowercase match on the long names, plus the vim letters
    /// as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" | "h" => Ok(Direction::Left),
            "right" | "l" => Ok(Direction::Right),
            "up" | "k" => Ok(Direction::Up),
            "down" | "j" => Ok(Direction::Down),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    #[test]
    fn test_opposite_is_involution() {
        for d in ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn test_opposite_pairs() {
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        assert_eq!(Direction::Up.opposite(), Direction::Down);
    }

    #[test]
    fn test_vim_keys_are_distinct() {
        let mut keys: Vec<char> = ALL.iter().map(|d| d.vim_key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_from_str_round_trips_names() {
        for d in ALL {
            assert_eq!(d.name().parse::<Direction>().unwrap(), d);
        }
    }

    #[test]
    fn test_from_str_accepts_vim_letters() {
        for d in ALL {
            let alias = d.vim_key().to_string();
            assert_eq!(alias.parse::<Direction>().unwrap(), d);
        }
    }

    #[test]
    fn test_from_str_rejects_mixed_case_and_junk() {
        assert!("Left".parse::<Direction>().is_err());
        assert!("LEFT".parse::<Direction>().is_err());
        assert!("north".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }
}
