//! Message framing over a byte stream.
//!
//! Each frame is a 4-byte big-endian length field followed by that many
//! bytes: one tag byte plus the payload. Partial reads and writes are
//! reassembled here so callers always see whole messages.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read exactly one frame, returning the tag byte and payload together.
///
/// A zero length field, a length above `max_frame_bytes`, or a close in the
/// middle of a frame is an error; the caller must tear the connection down.
/// A clean close before any byte surfaces as `UnexpectedEof` from the first
/// `read_exact`.
pub async fn read_frame<R: AsyncRead + Unpin>(
    r: &mut R,
    max_frame_bytes: usize,
) -> io::Result<Vec<u8>> {
    let mut head = [0u8; 4];
    r.read_exact(&mut head).await?;
    let len_field = u32::from_be_bytes(head) as usize;

    if len_field == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid length"));
    }
    if len_field > max_frame_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame too large",
        ));
    }

    let mut data = vec![0u8; len_field];
    r.read_exact(&mut data).await?;

    Ok(data)
}

/// Write one already-encoded frame and flush.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, buf: &[u8]) -> io::Result<()> {
    w.write_all(buf).await?;
    w.flush().await
}
