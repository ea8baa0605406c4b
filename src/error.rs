//! Domain-specific error types for nvg.
//!
//! Only two failures are fatal for an invocation: no window manager
//! detected, and failing to connect to the chosen one. Everything
//! deeper degrades — hooks answer `Unknown`, backends report "no
//! focused window" — so a keystroke always ends in a move or a no-op.

use std::path::PathBuf;

use thiserror::Error;

/// Window-manager backend errors.
#[derive(Error, Debug)]
pub enum WmError {
    /// No environment hint matched any supported window manager.
    #[error("no supported window manager detected")]
    NoWmDetected,

    /// The backend's socket environment variable is missing.
    #[error("no socket path for {0}")]
    NoSocketPath(&'static str),

    /// Failed to connect to the backend's socket.
    #[error("failed to connect to {path:?}")]
    ConnectFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport error while writing a request.
    #[error("failed to write request")]
    WriteFailed(#[source] std::io::Error),

    /// Transport error while reading a reply.
    #[error("failed to read reply")]
    ReadFailed(#[source] std::io::Error),

    /// A reply arrived but did not parse.
    #[error("failed to parse reply: {0}")]
    ParseFailed(String),

    /// The peer violated its protocol (bad magic, error frame, short
    /// header).
    #[error("protocol error: {0}")]
    ProtocolError(String),
}

/// Hook-side errors. These never escape the resolver; `can_move`
/// collapses them to `Unknown` and movement operations to a no-op.
#[derive(Error, Debug)]
pub enum HookError {
    /// The hook's auxiliary socket could not be discovered.
    #[error("no socket for {0}")]
    NoSocket(&'static str),

    /// Failed to connect to the hook's auxiliary socket.
    #[error("failed to connect to {path:?}")]
    ConnectFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport error on the hook's socket.
    #[error("hook transport error")]
    Transport(#[source] std::io::Error),

    /// A helper CLI (kitten, wezterm, tmux) failed to spawn or exited
    /// non-zero.
    #[error("helper command failed: {0}")]
    Helper(String),

    /// Helper output or RPC reply did not parse.
    #[error("failed to parse hook reply: {0}")]
    ParseFailed(String),

    /// neovim RPC failure.
    #[error("nvim rpc error")]
    Nvim(#[from] MsgpackError),
}

/// msgpack-RPC codec errors for the neovim subset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MsgpackError {
    /// The reply buffer ended before the value did.
    #[error("truncated msgpack message")]
    Truncated,

    /// A marker outside the supported subset, or a malformed frame.
    #[error("invalid msgpack format at byte {0}")]
    InvalidFormat(usize),

    /// The response msgid does not match the request that was sent.
    #[error("unexpected msgid {got}, expected {expected}")]
    UnexpectedMsgId { expected: u64, got: u64 },

    /// The response error field was non-nil.
    #[error("rpc error response")]
    Rpc,
}
