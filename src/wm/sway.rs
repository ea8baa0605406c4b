//! i3/sway backend using the i3 IPC socket protocol.
//!
//! Both compositors speak the same length-prefixed binary protocol:
//! a 14-byte header of `"i3-ipc"` magic, a native-endian u32 payload
//! length and a u32 message type, then the JSON payload. Replies use
//! the same framing; event frames set the high type bit and are
//! skipped here since nothing subscribes.

use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::{socket_timeout, WindowManager};
use crate::direction::Direction;
use crate::error::WmError;
use crate::process::Pid;

const IPC_MAGIC: &[u8; 6] = b"i3-ipc";
const RUN_COMMAND: u32 = 0;
const GET_TREE: u32 = 4;
const EVENT_BIT: u32 = 1 << 31;

/// Replies larger than this are rejected rather than buffered.
const REPLY_MAX: usize = 4 * 1024 * 1024;

pub struct SwayWm {
    stream: UnixStream,
}

impl SwayWm {
    /// Connect to `$SWAYSOCK` (or `$I3SOCK`). One connection serves
    /// the whole invocation.
    pub fn connect(timeout_ms: u64) -> Result<Self, WmError> {
        let path = std::env::var_os("SWAYSOCK")
            .or_else(|| std::env::var_os("I3SOCK"))
            .map(PathBuf::from)
            .ok_or(WmError::NoSocketPath("sway"))?;

        let stream = UnixStream::connect(&path)
            .map_err(|source| WmError::ConnectFailed { path, source })?;
        let timeout = socket_timeout(timeout_ms);
        let _ = stream.set_read_timeout(timeout);
        let _ = stream.set_write_timeout(timeout);
        Ok(Self { stream })
    }

    fn send(&mut self, message_type: u32, payload: &str) -> Result<(), WmError> {
        let payload = payload.as_bytes();
        let mut frame = Vec::with_capacity(14 + payload.len());
        frame.extend_from_slice(IPC_MAGIC);
        frame.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
        frame.extend_from_slice(&message_type.to_ne_bytes());
        frame.extend_from_slice(payload);
        self.stream.write_all(&frame).map_err(WmError::WriteFailed)
    }

    /// Read one reply frame of the requested type, skipping any event
    /// frames that might precede it.
    fn read_reply(&mut self, expected_type: u32) -> Result<Vec<u8>, WmError> {
        loop {
            let mut header = [0u8; 14];
            self.stream
                .read_exact(&mut header)
                .map_err(WmError::ReadFailed)?;
            if &header[..6] != IPC_MAGIC {
                return Err(WmError::ProtocolError("bad i3-ipc magic".into()));
            }
            let length = u32::from_ne_bytes(header[6..10].try_into().unwrap()) as usize;
            let msg_type = u32::from_ne_bytes(header[10..14].try_into().unwrap());
            if length > REPLY_MAX {
                return Err(WmError::ProtocolError(format!(
                    "oversize i3-ipc reply of {length} bytes"
                )));
            }
            let mut payload = vec![0u8; length];
            self.stream
                .read_exact(&mut payload)
                .map_err(WmError::ReadFailed)?;
            if msg_type & EVENT_BIT != 0 {
                debug!(event = msg_type & !EVENT_BIT, "skipping i3 event frame");
                continue;
            }
            if msg_type != expected_type {
                return Err(WmError::ProtocolError(format!(
                    "reply type {msg_type}, expected {expected_type}"
                )));
            }
            return Ok(payload);
        }
    }

    fn get_tree(&mut self) -> Result<TreeNode, WmError> {
        self.send(GET_TREE, "")?;
        let payload = self.read_reply(GET_TREE)?;
        serde_json::from_slice(&payload).map_err(|e| WmError::ParseFailed(e.to_string()))
    }
}

impl WindowManager for SwayWm {
    fn focused_pid(&mut self) -> Option<Pid> {
        let tree = match self.get_tree() {
            Ok(tree) => tree,
            Err(e) => {
                debug!(error = %e, "sway GET_TREE failed");
                return None;
            }
        };
        tree.find_focused_pid()
    }

    fn move_focus(&mut self, dir: Direction) -> Result<(), WmError> {
        self.send(RUN_COMMAND, &format!("focus {}", dir.name()))?;
        // Drain the command reply so the next request starts clean.
        let _ = self.read_reply(RUN_COMMAND)?;
        Ok(())
    }

    fn disconnect(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn name(&self) -> &'static str {
        "sway"
    }
}

/// The slice of the layout tree this backend cares about.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TreeNode {
    #[serde(default)]
    focused: bool,
    #[serde(default)]
    pid: Option<Pid>,
    #[serde(default)]
    nodes: Vec<TreeNode>,
    #[serde(default)]
    floating_nodes: Vec<TreeNode>,
}

impl TreeNode {
    /// Depth-first search for the node with `focused == true` and a
    /// positive pid.
    pub(crate) fn find_focused_pid(&self) -> Option<Pid> {
        if self.focused {
            if let Some(pid) = self.pid.filter(|&p| p > 0) {
                return Some(pid);
            }
        }
        self.nodes
            .iter()
            .chain(self.floating_nodes.iter())
            .find_map(TreeNode::find_focused_pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let payload = "focus left";
        let mut frame = Vec::new();
        frame.extend_from_slice(IPC_MAGIC);
        frame.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
        frame.extend_from_slice(&RUN_COMMAND.to_ne_bytes());
        frame.extend_from_slice(payload.as_bytes());

        assert_eq!(&frame[..6], b"i3-ipc");
        assert_eq!(
            u32::from_ne_bytes(frame[6..10].try_into().unwrap()),
            payload.len() as u32
        );
        assert_eq!(u32::from_ne_bytes(frame[10..14].try_into().unwrap()), 0);
    }

    #[test]
    fn test_focused_pid_in_nested_tree() {
        let json = r#"{
            "focused": false,
            "nodes": [
                {"focused": false, "pid": 11, "nodes": []},
                {"focused": false, "nodes": [
                    {"focused": true, "pid": 42, "nodes": []}
                ]}
            ]
        }"#;
        let tree: TreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(tree.find_focused_pid(), Some(42));
    }

    #[test]
    fn test_focused_pid_in_floating_nodes() {
        let json = r#"{
            "focused": false,
            "nodes": [{"focused": false, "pid": 11}],
            "floating_nodes": [{"focused": true, "pid": 7}]
        }"#;
        let tree: TreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(tree.find_focused_pid(), Some(7));
    }

    #[test]
    fn test_focused_node_without_pid_is_absent() {
        let json = r#"{"focused": true, "pid": 0}"#;
        let tree: TreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(tree.find_focused_pid(), None);
    }

    #[test]
    fn test_no_focused_node() {
        let json = r#"{"nodes": [{"pid": 3}, {"pid": 4}]}"#;
        let tree: TreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(tree.find_focused_pid(), None);
    }
}
