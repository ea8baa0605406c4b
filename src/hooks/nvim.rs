//! Neovim hook over msgpack-RPC.
//!
//! The socket path comes from the target process's own environment
//! (`NVIM=`), which neovim sets in every child and also in its own
//! environ. The edge probe compares `winnr()` with `winnr('<motion>')`:
//! equal numbers mean vim would not move, i.e. the window is at the
//! edge in that direction.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use tracing::debug;

use super::{CanMove, Hook, EDGE_LOOP_MAX};
use crate::direction::Direction;
use crate::error::{HookError, MsgpackError};
use crate::msgpack::{decode_response, encode_request};
use crate::process::{environ_var_of, Pid};
use crate::wm::socket_timeout;

/// Reply frames from nvim for a single uint result are tiny.
const REPLY_MAX: usize = 1024;

pub struct NvimHook;

impl NvimHook {
    fn connect(pid: Pid, timeout_ms: u64) -> Result<UnixStream, HookError> {
        let socket = environ_var_of(pid, "NVIM").ok_or(HookError::NoSocket("nvim"))?;
        let path = PathBuf::from(socket);
        let stream = UnixStream::connect(&path)
            .map_err(|source| HookError::ConnectFailed { path, source })?;
        let timeout = socket_timeout(timeout_ms);
        let _ = stream.set_read_timeout(timeout);
        let _ = stream.set_write_timeout(timeout);
        Ok(stream)
    }

    /// One request/response exchange returning the uint result.
    fn call(
        stream: &mut UnixStream,
        msgid: u32,
        method: &str,
        arg: &str,
    ) -> Result<u64, HookError> {
        let mut request = Vec::new();
        encode_request(&mut request, msgid, method, arg);
        stream.write_all(&request).map_err(HookError::Transport)?;

        let mut reply = [0u8; REPLY_MAX];
        let mut filled = 0;
        loop {
            let n = stream
                .read(&mut reply[filled..])
                .map_err(HookError::Transport)?;
            if n == 0 {
                return Err(HookError::Nvim(MsgpackError::Truncated));
            }
            filled += n;
            match decode_response(&reply[..filled], msgid) {
                Err(MsgpackError::Truncated) if filled < REPLY_MAX => continue,
                other => return other.map_err(HookError::Nvim),
            }
        }
    }

    fn winnr(stream: &mut UnixStream, msgid: u32, motion: Option<char>) -> Result<u64, HookError> {
        let expr = match motion {
            Some(m) => format!("winnr('{m}')"),
            None => "winnr()".to_string(),
        };
        Self::call(stream, msgid, "nvim_eval", &expr)
    }

    fn wincmd(stream: &mut UnixStream, msgid: u32, motion: char) -> Result<u64, HookError> {
        Self::call(stream, msgid, "nvim_command", &format!("wincmd {motion}"))
    }

    fn probe(pid: Pid, dir: Direction, timeout_ms: u64) -> Result<bool, HookError> {
        let mut stream = Self::connect(pid, timeout_ms)?;
        let current = Self::winnr(&mut stream, 1, None)?;
        let target = Self::winnr(&mut stream, 2, Some(dir.vim_key()))?;
        Ok(current != target)
    }
}

impl Hook for NvimHook {
    fn name(&self) -> &'static str {
        "nvim"
    }

    /// Name contains `nvim`; wrapper helpers like nvim-qt spawn the
    /// real nvim underneath and are rejected by their dashed names.
    fn detect(&self, pid: Pid, comm: &str, exe_basename: &str, argv0: &str) -> Option<Pid> {
        let argv0_base = argv0.rsplit('/').next().unwrap_or(argv0);
        let matches = |name: &str| name.contains("nvim") && !name.contains("nvim-");
        (matches(comm) || matches(exe_basename) || matches(argv0_base)).then_some(pid)
    }

    fn can_move(&self, pid: Pid, dir: Direction, timeout_ms: u64) -> CanMove {
        match Self::probe(pid, dir, timeout_ms) {
            Ok(true) => CanMove::Yes,
            Ok(false) => CanMove::No,
            Err(e) => {
                debug!(error = %e, "nvim probe failed");
                CanMove::Unknown
            }
        }
    }

    fn move_focus(&self, pid: Pid, dir: Direction, timeout_ms: u64) {
        let result = Self::connect(pid, timeout_ms)
            .and_then(|mut stream| Self::wincmd(&mut stream, 1, dir.vim_key()));
        if let Err(e) = result {
            debug!(error = %e, "nvim wincmd failed");
        }
    }

    /// Repeat the motion until vim stops moving, with a safety cap.
    fn move_to_edge(&self, pid: Pid, dir: Direction, timeout_ms: u64) {
        let Ok(mut stream) = Self::connect(pid, timeout_ms) else {
            return;
        };
        let motion = dir.vim_key();
        let mut msgid = 1u32;
        for _ in 0..EDGE_LOOP_MAX {
            let Ok(before) = Self::winnr(&mut stream, msgid, None) else {
                return;
            };
            if Self::wincmd(&mut stream, msgid + 1, motion).is_err() {
                return;
            }
            let Ok(after) = Self::winnr(&mut stream, msgid + 2, None) else {
                return;
            };
            if before == after {
                return;
            }
            msgid += 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(comm: &str, exe: &str, argv0: &str) -> Option<Pid> {
        NvimHook.detect(77, comm, exe, argv0)
    }

    #[test]
    fn test_detect_plain_nvim() {
        assert_eq!(detect("nvim", "nvim", "/usr/bin/nvim"), Some(77));
        assert_eq!(detect("nvim", "", ""), Some(77));
    }

    #[test]
    fn test_detect_uses_argv0_basename() {
        assert_eq!(detect("", "", "/opt/neovim/bin/nvim"), Some(77));
    }

    #[test]
    fn test_detect_rejects_helper_variants() {
        assert_eq!(detect("nvim-qt", "nvim-qt", "nvim-qt"), None);
        assert_eq!(detect("vim", "vim", "/usr/bin/vim"), None);
        assert_eq!(detect("", "", ""), None);
    }

    #[test]
    fn test_probe_edge_semantics() {
        // winnr('l') == winnr() means there is no window to the right.
        assert_eq!(Direction::Right.vim_key(), 'l');
        assert_eq!(Direction::Up.vim_key(), 'k');
    }
}
