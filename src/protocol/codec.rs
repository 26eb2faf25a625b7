//! Low-level binary serialization primitives.
//!
//! Wire protocol uses big-endian (network byte order) for the frame length
//! prefix, and little-endian for fields inside payloads.

use crate::common::error::CodecError;
use bytes::{BufMut, BytesMut};

/// Read a u32 in little-endian format.
pub fn get_u32(src: &mut &[u8]) -> Result<u32, CodecError> {
    if src.len() < 4 {
        return Err(CodecError::Short);
    }

    let v = u32::from_le_bytes(src[0..4].try_into().unwrap());

    *src = &src[4..];

    Ok(v)
}

/// Write a length-prefixed string (4-byte LE length + bytes).
pub fn put_str(dst: &mut BytesMut, s: &str) {
    dst.put_u32_le(s.len() as u32);
    dst.extend_from_slice(s.as_bytes());
}

/// Read a length-prefixed string.
pub fn get_str(src: &mut &[u8]) -> Result<String, CodecError> {
    let len = get_u32(src)? as usize;

    if src.len() < len {
        return Err(CodecError::Short);
    }

    let s = std::str::from_utf8(&src[..len]).map_err(|_| CodecError::Malformed("utf8"))?;

    *src = &src[len..];

    Ok(s.to_string())
}

/// Read a length-prefixed string with maximum length enforcement.
pub fn get_str_max(src: &mut &[u8], max_len: usize) -> Result<String, CodecError> {
    if src.len() < 4 {
        return Err(CodecError::Short);
    }

    let len = u32::from_le_bytes(src[0..4].try_into().unwrap()) as usize;

    if len > max_len {
        return Err(CodecError::Malformed("string too large"));
    }

    get_str(src)
}

/// Create a wire-format frame with message tag and payload.
pub fn frame(msg_type: u8, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4 + 1 + payload.len());

    // Wire protocol uses big-endian (network byte order) for length prefix
    buf.put_u32((1 + payload.len()) as u32);
    buf.put_u8(msg_type);
    buf.extend_from_slice(payload);

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_roundtrip() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "héllo");
        let mut src: &[u8] = &buf;
        assert_eq!(get_str(&mut src).unwrap(), "héllo");
        assert!(src.is_empty());
    }

    #[test]
    fn test_get_str_short_input() {
        let mut src: &[u8] = &[5, 0, 0, 0, b'a', b'b'];
        assert!(matches!(get_str(&mut src), Err(CodecError::Short)));
    }

    #[test]
    fn test_get_str_max_enforced() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "abcdef");
        let mut src: &[u8] = &buf;
        assert!(matches!(
            get_str_max(&mut src, 3),
            Err(CodecError::Malformed("string too large"))
        ));
    }

    #[test]
    fn test_get_str_rejects_bad_utf8() {
        let mut src: &[u8] = &[2, 0, 0, 0, 0xff, 0xfe];
        assert!(matches!(
            get_str(&mut src),
            Err(CodecError::Malformed("utf8"))
        ));
    }

    #[test]
    fn test_frame_layout() {
        let f = frame(0x42, b"xyz");
        // BE length covers tag + payload
        assert_eq!(&f[..4], &4u32.to_be_bytes());
        assert_eq!(f[4], 0x42);
        assert_eq!(&f[5..], b"xyz");
    }
}
