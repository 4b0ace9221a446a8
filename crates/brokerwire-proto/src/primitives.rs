//! Primitive codec.
//!
//! Readers are pure functions over `(buffer, offset)` that return the decoded
//! value and the offset just past it. They never mutate the buffer, so the same
//! bytes can be decoded any number of times with identical results.
//!
//! Writers append to a [`BytesMut`]. Integers are written with the [`BufMut`]
//! methods directly; the helpers here cover the length-prefixed types.
//!
//! | Type     | Prefix  | Null          |
//! |----------|---------|---------------|
//! | string   | `int16` | negative      |
//! | bytes    | `int32` | negative      |
//! | array    | `int32` | negative      |

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{ProtocolError, Result};

/// Borrow `len` bytes at `offset`, failing with `TruncatedBuffer` if the
/// buffer is too short.
pub fn take(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let available = buf.len().saturating_sub(offset);
    if available < len {
        return Err(ProtocolError::TruncatedBuffer { offset, needed: len, available });
    }
    Ok(&buf[offset..offset + len])
}

fn take_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(buf, offset, N)?);
    Ok(out)
}

/// Read an `int8`.
pub fn read_i8(buf: &[u8], offset: usize) -> Result<(i8, usize)> {
    Ok((i8::from_be_bytes(take_array(buf, offset)?), offset + 1))
}

/// Read a big-endian `int16`.
pub fn read_i16(buf: &[u8], offset: usize) -> Result<(i16, usize)> {
    Ok((i16::from_be_bytes(take_array(buf, offset)?), offset + 2))
}

/// Read a big-endian `int32`.
pub fn read_i32(buf: &[u8], offset: usize) -> Result<(i32, usize)> {
    Ok((i32::from_be_bytes(take_array(buf, offset)?), offset + 4))
}

/// Read a big-endian `uint32`.
pub fn read_u32(buf: &[u8], offset: usize) -> Result<(u32, usize)> {
    Ok((u32::from_be_bytes(take_array(buf, offset)?), offset + 4))
}

/// Read a big-endian `int64`.
pub fn read_i64(buf: &[u8], offset: usize) -> Result<(i64, usize)> {
    Ok((i64::from_be_bytes(take_array(buf, offset)?), offset + 8))
}

/// Read an `int16`-prefixed UTF-8 string. A negative length is null.
pub fn read_string(buf: &[u8], offset: usize) -> Result<(Option<String>, usize)> {
    let (len, start) = read_i16(buf, offset)?;
    let Ok(len) = usize::try_from(len) else {
        return Ok((None, start));
    };
    let raw = take(buf, start, len)?;
    let s = std::str::from_utf8(raw)
        .map_err(|_| ProtocolError::InvalidString { offset: start })?
        .to_owned();
    Ok((Some(s), start + len))
}

/// Read an `int32`-prefixed byte array as a zero-copy slice of `buf`. A
/// negative length is null.
pub fn read_bytes(buf: &Bytes, offset: usize) -> Result<(Option<Bytes>, usize)> {
    let (len, start) = read_i32(buf, offset)?;
    let Ok(len) = usize::try_from(len) else {
        return Ok((None, start));
    };
    let (region, next) = read_region(buf, start, len)?;
    Ok((Some(region), next))
}

/// Slice exactly `len` bytes at `offset` without copying.
pub fn read_region(buf: &Bytes, offset: usize, len: usize) -> Result<(Bytes, usize)> {
    take(buf, offset, len)?;
    Ok((buf.slice(offset..offset + len), offset + len))
}

/// Read an `int32` array length. A negative length is an absent array and
/// reads as zero elements.
pub fn read_array_len(buf: &[u8], offset: usize) -> Result<(usize, usize)> {
    let (len, next) = read_i32(buf, offset)?;
    Ok((usize::try_from(len).unwrap_or(0), next))
}

/// Read an `int32`-prefixed array, decoding each element with `element`.
pub fn read_array<T, F>(buf: &Bytes, offset: usize, mut element: F) -> Result<(Vec<T>, usize)>
where
    F: FnMut(&Bytes, usize) -> Result<(T, usize)>,
{
    let (count, mut offset) = read_array_len(buf, offset)?;
    let mut items = Vec::with_capacity(preallocation(count, buf.len().saturating_sub(offset)));
    for _ in 0..count {
        let (item, next) = element(buf, offset)?;
        items.push(item);
        offset = next;
    }
    Ok((items, offset))
}

/// Most elements reserved up front for an array read off the wire.
pub const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Capacity to reserve for an array of `count` elements with `remaining`
/// bytes left to read. Every element occupies at least one byte; beyond that
/// the vector grows as elements actually decode.
fn preallocation(count: usize, remaining: usize) -> usize {
    count.min(remaining).min(MAX_PREALLOCATED_ELEMENTS)
}

/// Write an `int16`-prefixed string.
pub fn put_string(buf: &mut BytesMut, s: &str) -> Result<()> {
    let len = i16::try_from(s.len()).map_err(|_| ProtocolError::ValueTooLarge {
        field: "string",
        len: s.len(),
        max: i16::MAX as usize,
    })?;
    buf.put_i16(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}

/// Write an `int32`-prefixed byte array, `-1` for `None`.
pub fn put_bytes(buf: &mut BytesMut, bytes: Option<&[u8]>) -> Result<()> {
    let Some(bytes) = bytes else {
        buf.put_i32(-1);
        return Ok(());
    };
    buf.put_i32(checked_i32_len("bytes", bytes.len())?);
    buf.put_slice(bytes);
    Ok(())
}

/// Write an `int32`-prefixed array, encoding each element with `element`.
pub fn put_array<T, F>(buf: &mut BytesMut, items: &[T], mut element: F) -> Result<()>
where
    F: FnMut(&mut BytesMut, &T) -> Result<()>,
{
    buf.put_i32(checked_i32_len("array", items.len())?);
    for item in items {
        element(buf, item)?;
    }
    Ok(())
}

/// Convert a length to an `int32` prefix.
pub fn checked_i32_len(field: &'static str, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| ProtocolError::ValueTooLarge {
        field,
        len,
        max: i32::MAX as usize,
    })
}
