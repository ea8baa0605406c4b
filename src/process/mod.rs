//! Bounded readers for `/proc` and process-tree discovery.
//!
//! Everything here reads small pseudo-files into capped buffers. A
//! file that is missing, unreadable, or larger than the cap yields
//! `None`; callers treat that as "process gone" and move on. The proc
//! root is a parameter so tests can point at a temp directory; the
//! `*_of` wrappers default to `/proc`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::trace;

/// A kernel process id. Zero and negatives are sentinel "absent".
pub type Pid = i32;

/// Cap for any single `/proc` pseudo-file read.
pub const PROC_READ_MAX: usize = 8192;

/// Ceiling on processes visited by one tree walk.
pub const WALK_MAX_VISITED: usize = 256;

/// Ceiling on parent-hops followed by one tree walk.
pub const WALK_MAX_DEPTH: u32 = 16;

/// Read a `/proc` pseudo-file into `buf`, returning the filled slice.
///
/// `/proc` files report size 0, so this loops `read` until EOF or the
/// buffer is full. A full buffer means the file exceeded the cap and
/// the read is rejected rather than grown.
fn read_capped<'a>(path: &Path, buf: &'a mut [u8]) -> Option<&'a [u8]> {
    let mut file = File::open(path).ok()?;
    let mut filled = 0;
    loop {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if filled == buf.len() {
                    trace!(?path, "proc file exceeds read cap, skipping");
                    return None;
                }
            }
            Err(e) => {
                trace!(?path, error = %e, "proc read failed");
                return None;
            }
        }
    }
    Some(&buf[..filled])
}

/// The process name from `comm`, without the trailing newline.
pub fn comm_in(proc_root: &Path, pid: Pid) -> Option<String> {
    let mut buf = [0u8; 64];
    let data = read_capped(&proc_root.join(pid.to_string()).join("comm"), &mut buf)?;
    let data = data.strip_suffix(b"\n").unwrap_or(data);
    Some(String::from_utf8_lossy(data).into_owned())
}

/// argv[0]: the first NUL-terminated slice of `cmdline`.
pub fn argv0_in(proc_root: &Path, pid: Pid) -> Option<String> {
    let mut buf = [0u8; PROC_READ_MAX];
    let data = read_capped(&proc_root.join(pid.to_string()).join("cmdline"), &mut buf)?;
    let first = data.split(|&b| b == 0).next().filter(|s| !s.is_empty())?;
    Some(String::from_utf8_lossy(first).into_owned())
}

/// Basename of the `exe` symlink target. Unreadable links (typically
/// permissions on processes of another user) yield `None`.
pub fn exe_basename_in(proc_root: &Path, pid: Pid) -> Option<String> {
    let target = std::fs::read_link(proc_root.join(pid.to_string()).join("exe")).ok()?;
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Look up one variable in the process's `environ` block.
pub fn environ_var_in(proc_root: &Path, pid: Pid, key: &str) -> Option<String> {
    let mut buf = [0u8; PROC_READ_MAX];
    let data = read_capped(&proc_root.join(pid.to_string()).join("environ"), &mut buf)?;
    for entry in data.split(|&b| b == 0) {
        let Some(eq) = entry.iter().position(|&b| b == b'=') else {
            continue;
        };
        if &entry[..eq] == key.as_bytes() {
            return Some(String::from_utf8_lossy(&entry[eq + 1..]).into_owned());
        }
    }
    None
}

/// Parent pid from the `PPid:` line of `status`.
pub fn ppid_in(proc_root: &Path, pid: Pid) -> Option<Pid> {
    let mut buf = [0u8; PROC_READ_MAX];
    let data = read_capped(&proc_root.join(pid.to_string()).join("status"), &mut buf)?;
    parse_ppid(data)
}

/// Extract the `PPid:` field from a `status` buffer.
pub fn parse_ppid(status: &[u8]) -> Option<Pid> {
    let text = std::str::from_utf8(status).ok()?;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("PPid:") {
            return rest.trim().parse().ok();
        }
    }
    None
}

/// Direct children of `pid`, discovered by scanning `/proc` for
/// entries whose `PPid:` matches. A dead pid simply has no children.
pub fn children_in(proc_root: &Path, pid: Pid) -> Vec<Pid> {
    let mut children = Vec::new();
    let Ok(entries) = std::fs::read_dir(proc_root) else {
        return children;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(candidate) = name.to_str().and_then(|s| s.parse::<Pid>().ok()) else {
            continue;
        };
        if candidate <= 0 || candidate == pid {
            continue;
        }
        if ppid_in(proc_root, candidate) == Some(pid) {
            children.push(candidate);
            if children.len() >= WALK_MAX_VISITED {
                break;
            }
        }
    }
    children
}

fn proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

/// `comm` of `pid` under the real `/proc`.
pub fn comm_of(pid: Pid) -> Option<String> {
    comm_in(&proc_root(), pid)
}

/// argv[0] of `pid` under the real `/proc`.
pub fn argv0_of(pid: Pid) -> Option<String> {
    argv0_in(&proc_root(), pid)
}

/// `exe` basename of `pid` under the real `/proc`.
pub fn exe_basename_of(pid: Pid) -> Option<String> {
    exe_basename_in(&proc_root(), pid)
}

/// One environment variable of `pid` under the real `/proc`.
pub fn environ_var_of(pid: Pid, key: &str) -> Option<String> {
    environ_var_in(&proc_root(), pid, key)
}

/// Direct children of `pid` under the real `/proc`.
pub fn children_of(pid: Pid) -> Vec<Pid> {
    children_in(&proc_root(), pid)
}

/// Scan all of `/proc` for the first process whose `comm` or argv[0]
/// basename case-insensitively equals `app_id`.
///
/// Approximate by nature: several processes can share a name and the
/// first match wins. Used by the River backend, which only learns an
/// app id from the compositor.
pub fn pid_by_name(app_id: &str) -> Option<Pid> {
    pid_by_name_in(&proc_root(), app_id)
}

pub fn pid_by_name_in(proc_root: &Path, app_id: &str) -> Option<Pid> {
    let entries = std::fs::read_dir(proc_root).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<Pid>().ok()) else {
            continue;
        };
        if pid <= 0 {
            continue;
        }
        if let Some(comm) = comm_in(proc_root, pid) {
            if comm.eq_ignore_ascii_case(app_id) {
                return Some(pid);
            }
        }
        if let Some(argv0) = argv0_in(proc_root, pid) {
            let base = argv0.rsplit('/').next().unwrap_or(&argv0);
            if base.eq_ignore_ascii_case(app_id) {
                return Some(pid);
            }
        }
    }
    None
}
