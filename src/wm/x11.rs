//! Raw X11 protocol client, just large enough for dwm.
//!
//! dwm exposes no IPC for queries, so the focused pid comes straight
//! from the X server: `_NET_ACTIVE_WINDOW` on the root window, then
//! `_NET_WM_PID` on the active window. Two atoms and two properties —
//! the connection setup is the bulk of the work. All request framing
//! is little-endian as declared in the handshake; replies that do not
//! parse collapse to absent.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use tracing::debug;

use super::socket_timeout;
use super::wayland::pad4;
use crate::process::Pid;

const FAMILY_WILD: u16 = 0;
const FAMILY_LOCAL: u16 = 256;

const OP_INTERN_ATOM: u8 = 16;
const OP_GET_PROPERTY: u8 = 20;

/// Cap on the setup reply's variable-length trailer.
const SETUP_MAX: usize = 64 * 1024;
/// Cap on a GetProperty value.
const PROPERTY_MAX: usize = 8 * 1024;

/// Display number and screen from `$DISPLAY` (`[host]:display[.screen]`).
pub(crate) fn parse_display(display: &str) -> Option<(u16, u16)> {
    let colon = display.rfind(':')?;
    let rest = &display[colon + 1..];
    let (num, screen) = match rest.split_once('.') {
        Some((num, screen)) => (num, screen.parse().ok()?),
        None => (rest, 0),
    };
    Some((num.parse().ok()?, screen))
}

/// One parsed Xauthority record, borrowed from the file buffer.
struct XauthRecord<'a> {
    family: u16,
    address: &'a [u8],
    number: &'a [u8],
    name: &'a [u8],
    data: &'a [u8],
}

fn xauth_field<'a>(buf: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let len_bytes = buf.get(*pos..*pos + 2)?;
    let len = u16::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
    let field = buf.get(*pos + 2..*pos + 2 + len)?;
    *pos += 2 + len;
    Some(field)
}

fn xauth_record<'a>(buf: &'a [u8], pos: &mut usize) -> Option<XauthRecord<'a>> {
    let family_bytes = buf.get(*pos..*pos + 2)?;
    let family = u16::from_be_bytes(family_bytes.try_into().unwrap());
    *pos += 2;
    Some(XauthRecord {
        family,
        address: xauth_field(buf, pos)?,
        number: xauth_field(buf, pos)?,
        name: xauth_field(buf, pos)?,
        data: xauth_field(buf, pos)?,
    })
}

/// Scan an Xauthority buffer for the cookie covering `display`.
///
/// The first record wins whose family is the wildcard, or FamilyLocal
/// with an address equal to this machine's hostname — and whose
/// display number matches in either case.
pub(crate) fn find_xauth_cookie(
    buf: &[u8],
    hostname: &[u8],
    display: u16,
) -> Option<(Vec<u8>, Vec<u8>)> {
    let display_decimal = display.to_string();
    let mut pos = 0;
    while pos < buf.len() {
        let record = xauth_record(buf, &mut pos)?;
        let family_ok = record.family == FAMILY_WILD
            || (record.family == FAMILY_LOCAL && record.address == hostname);
        if family_ok && record.number == display_decimal.as_bytes() {
            return Some((record.name.to_vec(), record.data.to_vec()));
        }
    }
    None
}

fn hostname() -> Option<Vec<u8>> {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return None;
    }
    Some(
        uts.nodename
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect(),
    )
}

fn xauth_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("XAUTHORITY") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".Xauthority"))
}

/// Root window id of screen `screen` from the setup reply body.
pub(crate) fn root_of_screen(body: &[u8], screen: u16) -> Option<u32> {
    let vendor_len = u16::from_le_bytes(body.get(16..18)?.try_into().unwrap()) as usize;
    let num_screens = *body.get(20)? as usize;
    let num_formats = *body.get(21)? as usize;
    if screen as usize >= num_screens {
        return None;
    }
    // Fixed 32-byte head, padded vendor string, 8 bytes per format.
    let mut pos = 32 + pad4(vendor_len) + num_formats * 8;
    for index in 0..num_screens {
        let root = u32::from_le_bytes(body.get(pos..pos + 4)?.try_into().unwrap());
        if index == screen as usize {
            return Some(root);
        }
        let num_depths = *body.get(pos + 39)? as usize;
        pos += 40;
        for _ in 0..num_depths {
            let num_visuals =
                u16::from_le_bytes(body.get(pos + 2..pos + 4)?.try_into().unwrap()) as usize;
            pos += 8 + num_visuals * 24;
        }
    }
    None
}

pub(crate) struct X11Conn {
    stream: UnixStream,
    root: u32,
}

impl X11Conn {
    /// Parse `$DISPLAY`, find the auth cookie, connect and shake hands.
    pub(crate) fn connect(timeout_ms: u64) -> Option<Self> {
        let display_var = std::env::var("DISPLAY").ok()?;
        let (display, screen) = parse_display(&display_var)?;

        let (auth_name, auth_data) = xauth_path()
            .and_then(|path| std::fs::read(path).ok())
            .and_then(|buf| find_xauth_cookie(&buf, &hostname()?, display))
            .unwrap_or_default();

        let path = PathBuf::from(format!("/tmp/.X11-unix/X{display}"));
        let stream = match UnixStream::connect(&path) {
            Ok(s) => s,
            Err(e) => {
                debug!(?path, error = %e, "X11 connect failed");
                return None;
            }
        };
        let timeout = socket_timeout(timeout_ms);
        let _ = stream.set_read_timeout(timeout);
        let _ = stream.set_write_timeout(timeout);

        let mut conn = Self { stream, root: 0 };
        conn.root = conn.setup(&auth_name, &auth_data, screen)?;
        Some(conn)
    }

    fn setup(&mut self, auth_name: &[u8], auth_data: &[u8], screen: u16) -> Option<u32> {
        let mut request = Vec::with_capacity(12 + pad4(auth_name.len()) + pad4(auth_data.len()));
        request.push(b'l'); // little-endian
        request.push(0);
        request.extend_from_slice(&11u16.to_le_bytes()); // protocol major
        request.extend_from_slice(&0u16.to_le_bytes()); // protocol minor
        request.extend_from_slice(&(auth_name.len() as u16).to_le_bytes());
        request.extend_from_slice(&(auth_data.len() as u16).to_le_bytes());
        request.extend_from_slice(&[0, 0]);
        request.extend_from_slice(auth_name);
        request.resize(12 + pad4(auth_name.len()), 0);
        request.extend_from_slice(auth_data);
        request.resize(12 + pad4(auth_name.len()) + pad4(auth_data.len()), 0);
        self.stream.write_all(&request).ok()?;

        let mut header = [0u8; 8];
        self.stream.read_exact(&mut header).ok()?;
        if header[0] != 1 {
            debug!(status = header[0], "X11 setup refused");
            return None;
        }
        let additional = u16::from_le_bytes(header[6..8].try_into().unwrap()) as usize * 4;
        if additional > SETUP_MAX {
            return None;
        }
        let mut body = vec![0u8; additional];
        self.stream.read_exact(&mut body).ok()?;
        root_of_screen(&body, screen)
    }

    fn intern_atom(&mut self, name: &str) -> Option<u32> {
        let padded = pad4(name.len());
        let mut request = Vec::with_capacity(8 + padded);
        request.push(OP_INTERN_ATOM);
        request.push(0); // only-if-exists: false
        request.extend_from_slice(&((2 + padded / 4) as u16).to_le_bytes());
        request.extend_from_slice(&(name.len() as u16).to_le_bytes());
        request.extend_from_slice(&[0, 0]);
        request.extend_from_slice(name.as_bytes());
        request.resize(8 + padded, 0);
        self.stream.write_all(&request).ok()?;

        let reply = self.read_reply()?;
        Some(u32::from_le_bytes(reply.0[8..12].try_into().unwrap()))
    }

    /// First u32 of a 32-format property, if present.
    fn property_u32(&mut self, window: u32, property: u32) -> Option<u32> {
        let mut request = Vec::with_capacity(24);
        request.push(OP_GET_PROPERTY);
        request.push(0); // delete: false
        request.extend_from_slice(&6u16.to_le_bytes());
        request.extend_from_slice(&window.to_le_bytes());
        request.extend_from_slice(&property.to_le_bytes());
        request.extend_from_slice(&0u32.to_le_bytes()); // AnyPropertyType
        request.extend_from_slice(&0u32.to_le_bytes()); // long-offset
        request.extend_from_slice(&1u32.to_le_bytes()); // long-length
        self.stream.write_all(&request).ok()?;

        let (reply, value) = self.read_reply()?;
        let format = reply[1];
        let value_len = u32::from_le_bytes(reply[16..20].try_into().unwrap());
        if format != 32 || value_len < 1 || value.len() < 4 {
            return None;
        }
        Some(u32::from_le_bytes(value[..4].try_into().unwrap()))
    }

    /// Read one 32-byte reply plus its trailer. An error frame (first
    /// byte 0) aborts to absent.
    fn read_reply(&mut self) -> Option<([u8; 32], Vec<u8>)> {
        let mut reply = [0u8; 32];
        self.stream.read_exact(&mut reply).ok()?;
        if reply[0] != 1 {
            debug!(code = reply[1], "X11 error reply");
            return None;
        }
        let trailer = u32::from_le_bytes(reply[4..8].try_into().unwrap()) as usize * 4;
        if trailer > PROPERTY_MAX {
            return None;
        }
        let mut value = vec![0u8; trailer];
        self.stream.read_exact(&mut value).ok()?;
        Some((reply, value))
    }

    /// `_NET_ACTIVE_WINDOW` on the root, then `_NET_WM_PID` on it.
    pub(crate) fn active_window_pid(&mut self) -> Option<Pid> {
        let net_active_window = self.intern_atom("_NET_ACTIVE_WINDOW")?;
        let net_wm_pid = self.intern_atom("_NET_WM_PID")?;
        let window = self.property_u32(self.root, net_active_window)?;
        if window == 0 {
            return None;
        }
        let pid = self.property_u32(window, net_wm_pid)?;
        (pid > 0 && pid <= i32::MAX as u32).then_some(pid as Pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad4_matches_mask_form() {
        for n in [0usize, 1, 2, 3, 4, 5, 31, 32, 1000, 1 << 29] {
            assert_eq!(pad4(n), (n + 3) & !3);
        }
    }

    #[test]
    fn test_parse_display() {
        assert_eq!(parse_display(":0"), Some((0, 0)));
        assert_eq!(parse_display(":1.2"), Some((1, 2)));
        assert_eq!(parse_display("localhost:10.0"), Some((10, 0)));
        assert_eq!(parse_display("nonsense"), None);
        assert_eq!(parse_display(":"), None);
    }

    fn xauth_entry(family: u16, addr: &[u8], number: &[u8], name: &[u8], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&family.to_be_bytes());
        for field in [addr, number, name, data] {
            out.extend_from_slice(&(field.len() as u16).to_be_bytes());
            out.extend_from_slice(field);
        }
        out
    }

    #[test]
    fn test_xauth_local_family_matches_hostname() {
        let mut buf = xauth_entry(FAMILY_LOCAL, b"otherhost", b"0", b"MIT-MAGIC-COOKIE-1", b"aa");
        buf.extend(xauth_entry(
            FAMILY_LOCAL,
            b"thishost",
            b"0",
            b"MIT-MAGIC-COOKIE-1",
            b"bb",
        ));
        let (name, data) = find_xauth_cookie(&buf, b"thishost", 0).unwrap();
        assert_eq!(name, b"MIT-MAGIC-COOKIE-1");
        assert_eq!(data, b"bb");
    }

    #[test]
    fn test_xauth_wildcard_family_ignores_address() {
        let buf = xauth_entry(FAMILY_WILD, b"whatever", b"3", b"MIT-MAGIC-COOKIE-1", b"cc");
        let (_, data) = find_xauth_cookie(&buf, b"thishost", 3).unwrap();
        assert_eq!(data, b"cc");
    }

    #[test]
    fn test_xauth_display_number_must_match() {
        let buf = xauth_entry(
            FAMILY_LOCAL,
            b"thishost",
            b"1",
            b"MIT-MAGIC-COOKIE-1",
            b"dd",
        );
        assert!(find_xauth_cookie(&buf, b"thishost", 0).is_none());
    }

    #[test]
    fn test_xauth_first_match_wins() {
        let mut buf = xauth_entry(FAMILY_WILD, b"", b"0", b"first", b"11");
        buf.extend(xauth_entry(FAMILY_LOCAL, b"thishost", b"0", b"second", b"22"));
        let (name, _) = find_xauth_cookie(&buf, b"thishost", 0).unwrap();
        assert_eq!(name, b"first");
    }

    #[test]
    fn test_xauth_truncated_record_is_absent() {
        let mut buf = xauth_entry(FAMILY_LOCAL, b"host", b"0", b"name", b"data");
        buf.truncate(buf.len() - 2);
        assert!(find_xauth_cookie(&buf, b"host", 0).is_none());
    }

    fn synthetic_setup_body(screens: &[(u32, &[(u16, usize)])]) -> Vec<u8> {
        let vendor = b"test";
        let mut body = vec![0u8; 16];
        body.extend_from_slice(&(vendor.len() as u16).to_le_bytes()); // vendor len
        body.extend_from_slice(&0u16.to_le_bytes()); // max request len
        body.push(screens.len() as u8);
        body.push(0); // no pixmap formats
        body.extend_from_slice(&[0; 6]); // byte orders, keycodes
        body.extend_from_slice(&[0; 4]); // pad
        body.extend_from_slice(vendor);
        body.resize(32 + pad4(vendor.len()), 0);
        for &(root, depths) in screens {
            let start = body.len();
            body.extend_from_slice(&root.to_le_bytes());
            body.resize(start + 39, 0);
            body.push(depths.len() as u8);
            for &(num_visuals, _) in depths {
                body.push(24); // depth value
                body.push(0);
                body.extend_from_slice(&num_visuals.to_le_bytes());
                body.extend_from_slice(&[0; 4]);
                body.resize(body.len() + num_visuals as usize * 24, 0);
            }
        }
        body
    }

    #[test]
    fn test_root_of_screen_walks_depths_and_visuals() {
        let body = synthetic_setup_body(&[
            (0xdead_0001, &[(2, 0), (1, 0)]),
            (0xdead_0002, &[(3, 0)]),
        ]);
        assert_eq!(root_of_screen(&body, 0), Some(0xdead_0001));
        assert_eq!(root_of_screen(&body, 1), Some(0xdead_0002));
        assert_eq!(root_of_screen(&body, 2), None);
    }

    #[test]
    fn test_root_of_screen_truncated_body() {
        let mut body = synthetic_setup_body(&[(7, &[])]);
        body.truncate(30);
        assert_eq!(root_of_screen(&body, 0), None);
    }
}
