//! River backend over the Wayland socket.
//!
//! River has no focused-window query of its own, so the backend leans
//! on two protocol extensions: `zwlr_foreign_toplevel_manager_v1` to
//! find the activated toplevel's app id, and `zriver_control_v1` to
//! run `focus-view <dir>`. The connection lives only for the call.

use tracing::debug;

use super::wayland::{
    arg_array, arg_string, arg_u32, Message, WaylandConn, WL_CALLBACK_EVT_DONE, WL_DISPLAY,
    WL_DISPLAY_EVT_ERROR, WL_DISPLAY_GET_REGISTRY, WL_REGISTRY_BIND, WL_REGISTRY_EVT_GLOBAL,
};
use super::WindowManager;
use crate::direction::Direction;
use crate::error::WmError;
use crate::process::{pid_by_name, Pid};

const TOPLEVEL_MANAGER: &str = "zwlr_foreign_toplevel_manager_v1";
const TOPLEVEL_MANAGER_VERSION: u32 = 3;
const SEAT: &str = "wl_seat";
const RIVER_CONTROL: &str = "zriver_control_v1";

const MGR_EVT_TOPLEVEL: u16 = 0;
const HANDLE_EVT_APP_ID: u16 = 1;
const HANDLE_EVT_STATE: u16 = 4;
const HANDLE_EVT_CLOSED: u16 = 6;
const CONTROL_ADD_ARGUMENT: u16 = 1;
const CONTROL_RUN_COMMAND: u16 = 2;

/// `zwlr_foreign_toplevel_handle_v1.state` entry for "activated".
const STATE_ACTIVATED: u32 = 2;

const APP_ID_MAX: usize = 128;
const MAX_TOPLEVELS: usize = 32;

pub struct RiverWm {
    timeout_ms: u64,
}

impl RiverWm {
    /// Validate that the Wayland socket is reachable; every operation
    /// opens its own short-lived connection afterwards.
    pub fn new(timeout_ms: u64) -> Result<Self, WmError> {
        WaylandConn::connect(timeout_ms)?;
        Ok(Self { timeout_ms })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Global {
    name: u32,
    version: u32,
}

#[derive(Debug, Default)]
struct Globals {
    registry: u32,
    seat: Option<Global>,
    toplevel_manager: Option<Global>,
    river_control: Option<Global>,
}

/// Announce the registry and collect the globals we care about, using
/// a sync roundtrip as the end marker.
fn discover_globals(conn: &mut WaylandConn) -> Result<Globals, WmError> {
    let registry = conn.allocate_id();
    conn.send(&Message::new(WL_DISPLAY, WL_DISPLAY_GET_REGISTRY).uint(registry))?;
    let done = conn.sync()?;

    let mut globals = Globals {
        registry,
        ..Globals::default()
    };
    loop {
        let (header, payload) = conn.read_event()?;
        if header.object_id == WL_DISPLAY && header.opcode == WL_DISPLAY_EVT_ERROR {
            return Err(WmError::ProtocolError("wl_display error".into()));
        }
        if header.object_id == done && header.opcode == WL_CALLBACK_EVT_DONE {
            return Ok(globals);
        }
        if header.object_id == registry && header.opcode == WL_REGISTRY_EVT_GLOBAL {
            let Some(name) = arg_u32(payload, 0) else {
                continue;
            };
            let Some((interface, next)) = arg_string(payload, 4) else {
                continue;
            };
            let Some(version) = arg_u32(payload, next) else {
                continue;
            };
            let global = Global { name, version };
            match interface {
                b if b == SEAT.as_bytes() && globals.seat.is_none() => {
                    globals.seat = Some(global);
                }
                b if b == TOPLEVEL_MANAGER.as_bytes() => {
                    globals.toplevel_manager = Some(global);
                }
                b if b == RIVER_CONTROL.as_bytes() => {
                    globals.river_control = Some(global);
                }
                _ => {}
            }
        }
        // Unknown objects and other registry traffic are ignored.
    }
}

fn bind(
    conn: &mut WaylandConn,
    registry: u32,
    global: Global,
    interface: &str,
    version: u32,
) -> Result<u32, WmError> {
    let id = conn.allocate_id();
    conn.send(
        &Message::new(registry, WL_REGISTRY_BIND)
            .uint(global.name)
            .string(interface)
            .uint(version.min(global.version))
            .uint(id),
    )?;
    Ok(id)
}

/// Per-toplevel state gathered from the manager's initial burst.
#[derive(Clone, Copy)]
struct Toplevel {
    object_id: u32,
    app_id: [u8; APP_ID_MAX],
    app_id_len: usize,
    activated: bool,
    closed: bool,
}

impl Toplevel {
    fn new(object_id: u32) -> Self {
        Self {
            object_id,
            app_id: [0; APP_ID_MAX],
            app_id_len: 0,
            activated: false,
            closed: false,
        }
    }

    fn app_id(&self) -> &[u8] {
        &self.app_id[..self.app_id_len]
    }
}

/// A `state` array contains the activated sentinel.
fn state_is_activated(bytes: &[u8]) -> bool {
    bytes
        .chunks_exact(4)
        .any(|c| u32::from_le_bytes(c.try_into().unwrap()) == STATE_ACTIVATED)
}

/// Fixed-capacity toplevel table; overflow drops the newcomer.
struct Toplevels {
    slots: [Option<Toplevel>; MAX_TOPLEVELS],
    len: usize,
}

impl Toplevels {
    fn new() -> Self {
        Self {
            slots: [None; MAX_TOPLEVELS],
            len: 0,
        }
    }

    fn add(&mut self, object_id: u32) {
        if self.len < MAX_TOPLEVELS {
            self.slots[self.len] = Some(Toplevel::new(object_id));
            self.len += 1;
        }
    }

    fn get_mut(&mut self, object_id: u32) -> Option<&mut Toplevel> {
        self.slots[..self.len]
            .iter_mut()
            .flatten()
            .find(|t| t.object_id == object_id)
    }

    /// The activated, still-open toplevel, if any.
    fn activated(&self) -> Option<&Toplevel> {
        self.slots[..self.len]
            .iter()
            .flatten()
            .find(|t| t.activated && !t.closed && t.app_id_len > 0)
    }
}

fn collect_toplevels(conn: &mut WaylandConn, manager: u32) -> Result<Toplevels, WmError> {
    let done = conn.sync()?;
    let mut toplevels = Toplevels::new();
    loop {
        let (header, payload) = conn.read_event()?;
        if header.object_id == WL_DISPLAY && header.opcode == WL_DISPLAY_EVT_ERROR {
            return Err(WmError::ProtocolError("wl_display error".into()));
        }
        if header.object_id == done && header.opcode == WL_CALLBACK_EVT_DONE {
            return Ok(toplevels);
        }
        if header.object_id == manager && header.opcode == MGR_EVT_TOPLEVEL {
            if let Some(id) = arg_u32(payload, 0) {
                toplevels.add(id);
            }
            continue;
        }
        // Copy out what we need before touching the table; the
        // payload aliases the connection buffer.
        let opcode = header.opcode;
        let object_id = header.object_id;
        let mut app_id_buf = [0u8; APP_ID_MAX];
        let mut app_id_len = 0usize;
        let mut activated = None;
        match opcode {
            HANDLE_EVT_APP_ID => {
                if let Some((s, _)) = arg_string(payload, 0) {
                    // Oversize app ids are pathological; skip them.
                    if s.len() <= APP_ID_MAX {
                        app_id_buf[..s.len()].copy_from_slice(s);
                        app_id_len = s.len();
                    }
                }
            }
            HANDLE_EVT_STATE => {
                if let Some((bytes, _)) = arg_array(payload, 0) {
                    activated = Some(state_is_activated(bytes));
                }
            }
            _ => {}
        }
        if let Some(toplevel) = toplevels.get_mut(object_id) {
            match opcode {
                HANDLE_EVT_APP_ID if app_id_len > 0 => {
                    toplevel.app_id = app_id_buf;
                    toplevel.app_id_len = app_id_len;
                }
                HANDLE_EVT_STATE => {
                    if let Some(a) = activated {
                        toplevel.activated = a;
                    }
                }
                HANDLE_EVT_CLOSED => toplevel.closed = true,
                _ => {}
            }
        }
    }
}

impl WindowManager for RiverWm {
    fn focused_pid(&mut self) -> Option<Pid> {
        let mut conn = match WaylandConn::connect(self.timeout_ms) {
            Ok(conn) => conn,
            Err(e) => {
                debug!(error = %e, "wayland connect failed");
                return None;
            }
        };
        let result = (|| -> Result<Option<Pid>, WmError> {
            let globals = discover_globals(&mut conn)?;
            let Some(manager_global) = globals.toplevel_manager else {
                debug!("compositor does not expose {TOPLEVEL_MANAGER}");
                return Ok(None);
            };
            let manager = bind(
                &mut conn,
                globals.registry,
                manager_global,
                TOPLEVEL_MANAGER,
                TOPLEVEL_MANAGER_VERSION,
            )?;
            let toplevels = collect_toplevels(&mut conn, manager)?;
            let Some(active) = toplevels.activated() else {
                return Ok(None);
            };
            let app_id = String::from_utf8_lossy(active.app_id()).into_owned();
            debug!(%app_id, "activated toplevel");
            // Approximate: several processes can share the name and
            // the first match wins.
            Ok(pid_by_name(&app_id))
        })();
        match result {
            Ok(pid) => pid,
            Err(e) => {
                debug!(error = %e, "river focused-pid lookup failed");
                None
            }
        }
    }

    fn move_focus(&mut self, dir: Direction) -> Result<(), WmError> {
        let mut conn = WaylandConn::connect(self.timeout_ms)?;
        let globals = discover_globals(&mut conn)?;
        let seat_global = globals
            .seat
            .ok_or_else(|| WmError::ProtocolError("no wl_seat advertised".into()))?;
        let control_global = globals
            .river_control
            .ok_or_else(|| WmError::ProtocolError(format!("no {RIVER_CONTROL} advertised")))?;

        let seat = bind(&mut conn, globals.registry, seat_global, SEAT, 1)?;
        let control = bind(
            &mut conn,
            globals.registry,
            control_global,
            RIVER_CONTROL,
            1,
        )?;

        conn.send(&Message::new(control, CONTROL_ADD_ARGUMENT).string("focus-view"))?;
        conn.send(&Message::new(control, CONTROL_ADD_ARGUMENT).string(dir.name()))?;
        let callback = conn.allocate_id();
        conn.send(
            &Message::new(control, CONTROL_RUN_COMMAND)
                .uint(seat)
                .uint(callback),
        )?;

        // Roundtrip so the command is delivered before disconnect.
        let done = conn.sync()?;
        loop {
            let (header, _payload) = conn.read_event()?;
            if header.object_id == WL_DISPLAY && header.opcode == WL_DISPLAY_EVT_ERROR {
                return Err(WmError::ProtocolError("wl_display error".into()));
            }
            if header.object_id == done && header.opcode == WL_CALLBACK_EVT_DONE {
                return Ok(());
            }
            if header.object_id == callback {
                // success/failure from the command callback; either
                // way the command reached the server.
                return Ok(());
            }
        }
    }

    fn name(&self) -> &'static str {
        "river"
    }
}
