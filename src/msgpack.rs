//! msgpack-RPC codec, restricted to the subset neovim's API needs.
//!
//! A request is the four-element array `[0, msgid, method, [arg]]`;
//! a response is `[1, msgid, error, result]` where the result is an
//! unsigned integer (`winnr()` output). Anything outside that shape
//! is a format error.

use crate::error::MsgpackError;

const FIXARRAY_4: u8 = 0x94;
const FIXARRAY_1: u8 = 0x91;
const NIL: u8 = 0xc0;
const UINT8: u8 = 0xcc;
const UINT16: u8 = 0xcd;
const UINT32: u8 = 0xce;
const UINT64: u8 = 0xcf;
const STR8: u8 = 0xd9;
const FIXSTR_BASE: u8 = 0xa0;
const FIXSTR_MAX: usize = 31;

/// Encode `[0, msgid, method, [arg]]` into `out`.
pub fn encode_request(out: &mut Vec<u8>, msgid: u32, method: &str, arg: &str) {
    out.push(FIXARRAY_4);
    out.push(0); // request type
    encode_uint(out, u64::from(msgid));
    encode_str(out, method);
    out.push(FIXARRAY_1);
    encode_str(out, arg);
}

fn encode_uint(out: &mut Vec<u8>, value: u64) {
    if value <= 0x7f {
        out.push(value as u8);
    } else if value <= u64::from(u8::MAX) {
        out.push(UINT8);
        out.push(value as u8);
    } else if value <= u64::from(u16::MAX) {
        out.push(UINT16);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u64::from(u32::MAX) {
        out.push(UINT32);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(UINT64);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn encode_str(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    if bytes.len() <= FIXSTR_MAX {
        out.push(FIXSTR_BASE | bytes.len() as u8);
    } else {
        // Methods and expressions stay well under 256 bytes.
        out.push(STR8);
        out.push(bytes.len() as u8);
    }
    out.extend_from_slice(bytes);
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, MsgpackError> {
        let b = *self.buf.get(self.pos).ok_or(MsgpackError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MsgpackError> {
        let end = self.pos.checked_add(n).ok_or(MsgpackError::Truncated)?;
        if end > self.buf.len() {
            return Err(MsgpackError::Truncated);
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Positive fixint or one of the 0xcc–0xcf markers, big-endian.
    fn uint(&mut self) -> Result<u64, MsgpackError> {
        let at = self.pos;
        let marker = self.byte()?;
        match marker {
            0x00..=0x7f => Ok(u64::from(marker)),
            UINT8 => Ok(u64::from(self.byte()?)),
            UINT16 => {
                let b = self.take(2)?;
                Ok(u64::from(u16::from_be_bytes([b[0], b[1]])))
            }
            UINT32 => {
                let b = self.take(4)?;
                Ok(u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            UINT64 => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                Ok(u64::from_be_bytes(raw))
            }
            _ => Err(MsgpackError::InvalidFormat(at)),
        }
    }
}

/// Decode `[1, msgid, error, result]`, checking the msgid against the
/// request and returning the unsigned result. A nil result (the
/// `nvim_command` case) decodes as 0.
///
/// A non-nil error field short-circuits to `Rpc` without looking at
/// the result. A wrong msgid is `UnexpectedMsgId`, never a silent
/// cross-match.
pub fn decode_response(buf: &[u8], expected_msgid: u32) -> Result<u64, MsgpackError> {
    let mut r = Reader { buf, pos: 0 };
    if r.byte()? != FIXARRAY_4 {
        return Err(MsgpackError::InvalidFormat(0));
    }
    let type_at = r.pos;
    if r.uint()? != 1 {
        return Err(MsgpackError::InvalidFormat(type_at));
    }
    let msgid = r.uint()?;
    if msgid != u64::from(expected_msgid) {
        return Err(MsgpackError::UnexpectedMsgId {
            expected: u64::from(expected_msgid),
            got: msgid,
        });
    }
    if r.byte()? != NIL {
        return Err(MsgpackError::Rpc);
    }
    if r.buf.get(r.pos) == Some(&NIL) {
        return Ok(0);
    }
    r.uint()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(msgid: u8, result: &[u8]) -> Vec<u8> {
        let mut buf = vec![FIXARRAY_4, 0x01, msgid, NIL];
        buf.extend_from_slice(result);
        buf
    }

    #[test]
    fn test_request_layout() {
        let mut buf = Vec::new();
        encode_request(&mut buf, 7, "nvim_eval", "winnr()");
        let mut expected = vec![0x94, 0x00, 0x07, 0xa9];
        expected.extend_from_slice(b"nvim_eval");
        expected.push(0x91);
        expected.push(0xa7);
        expected.extend_from_slice(b"winnr()");
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_fixstr_str8_boundary() {
        let at_31 = "x".repeat(31);
        let at_32 = "x".repeat(32);
        let mut buf = Vec::new();
        encode_str(&mut buf, &at_31);
        assert_eq!(buf[0], 0xbf); // fixstr of length 31
        buf.clear();
        encode_str(&mut buf, &at_32);
        assert_eq!(&buf[..2], &[STR8, 32]);
    }

    #[test]
    fn test_uint_marker_selection() {
        let cases: [(u64, &[u8]); 5] = [
            (0x7f, &[0x7f]),
            (0x80, &[0xcc, 0x80]),
            (0x1234, &[0xcd, 0x12, 0x34]),
            (0x0001_0000, &[0xce, 0x00, 0x01, 0x00, 0x00]),
            (
                0x1_0000_0000,
                &[0xcf, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
            ),
        ];
        for (value, wire) in cases {
            let mut buf = Vec::new();
            encode_uint(&mut buf, value);
            assert_eq!(buf, wire, "encoding of {value:#x}");
        }
    }

    #[test]
    fn test_decode_fixint_result() {
        assert_eq!(decode_response(&response(3, &[0x02]), 3), Ok(2));
    }

    #[test]
    fn test_decode_wide_uints_big_endian() {
        assert_eq!(
            decode_response(&response(1, &[0xcc, 0xff]), 1),
            Ok(255)
        );
        assert_eq!(
            decode_response(&response(1, &[0xcd, 0x01, 0x00]), 1),
            Ok(256)
        );
        assert_eq!(
            decode_response(&response(1, &[0xce, 0x00, 0x01, 0x00, 0x00]), 1),
            Ok(65536)
        );
    }

    #[test]
    fn test_msgid_mismatch_is_flagged_not_matched() {
        let err = decode_response(&response(9, &[0x02]), 3).unwrap_err();
        assert_eq!(
            err,
            MsgpackError::UnexpectedMsgId {
                expected: 3,
                got: 9
            }
        );
    }

    #[test]
    fn test_nil_result_decodes_as_zero() {
        // nvim_command replies carry a nil result
        assert_eq!(decode_response(&response(4, &[NIL]), 4), Ok(0));
    }

    #[test]
    fn test_non_nil_error_field() {
        // error field holds an array instead of nil
        let buf = [FIXARRAY_4, 0x01, 0x03, 0x92, 0x01, 0xa0, 0x02];
        assert_eq!(decode_response(&buf, 3), Err(MsgpackError::Rpc));
    }

    #[test]
    fn test_truncated_and_malformed() {
        assert_eq!(
            decode_response(&[FIXARRAY_4, 0x01], 0),
            Err(MsgpackError::Truncated)
        );
        // not an array at all
        assert!(matches!(
            decode_response(&[0x90], 0),
            Err(MsgpackError::InvalidFormat(0))
        ));
        // response type 2 is not a response
        assert!(matches!(
            decode_response(&[FIXARRAY_4, 0x02, 0x03, NIL, 0x01], 3),
            Err(MsgpackError::InvalidFormat(1))
        ));
    }
}
