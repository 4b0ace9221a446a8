//! Response frame envelope.
//!
//! ```text
//! ┌──────────────┬────────────────────┬──────────────────────────┐
//! │ length (4B)  │ correlation id (4B)│ body (length - 4 bytes)  │
//! └──────────────┴────────────────────┴──────────────────────────┘
//! ```
//!
//! `length` counts everything after itself.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    primitives::{checked_i32_len, read_i32},
};

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the correlation id that opens every frame payload.
pub const CORRELATION_ID_SIZE: usize = 4;

/// Default upper bound on a frame's declared length (100 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// One complete response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Correlation id echoed from the request.
    pub correlation_id: i32,
    /// Response body, exactly `length - 4` bytes.
    pub body: Bytes,
}

impl Frame {
    /// Create a frame.
    pub fn new(correlation_id: i32, body: impl Into<Bytes>) -> Self {
        Self { correlation_id, body: body.into() }
    }

    /// Split the correlation id off a length-stripped frame payload.
    pub fn from_payload(payload: Bytes) -> Result<Self> {
        let (correlation_id, offset) = read_i32(&payload, 0)?;
        Ok(Self { correlation_id, body: payload.slice(offset..) })
    }

    /// Check a declared frame length and return the payload size in bytes.
    pub fn validate_length(length: i32, max: usize) -> Result<usize> {
        match usize::try_from(length) {
            Ok(len) if len >= CORRELATION_ID_SIZE && len <= max => Ok(len),
            _ => Err(ProtocolError::InvalidFrameLength { length, max }),
        }
    }

    /// Value of the length prefix for this frame.
    pub fn declared_length(&self) -> usize {
        CORRELATION_ID_SIZE + self.body.len()
    }

    /// Append the full envelope (length prefix included) to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        let length = checked_i32_len("frame", self.declared_length())?;
        buf.reserve(LENGTH_PREFIX_SIZE + self.declared_length());
        buf.put_i32(length);
        buf.put_i32(self.correlation_id);
        buf.put_slice(&self.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prefixes_length_without_itself() {
        let frame = Frame::new(3, vec![0x00, 0x00, 0x00, 0x00]);
        let mut buf = BytesMut::new();
        frame.encode(&mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn from_payload_splits_correlation_id() {
        let payload = Bytes::from_static(&[0x00, 0x00, 0x00, 0x07, 0xAB]);
        let frame = Frame::from_payload(payload).unwrap();
        assert_eq!(frame.correlation_id, 7);
        assert_eq!(frame.body.as_ref(), &[0xAB]);
    }

    #[test]
    fn validate_length_bounds() {
        assert_eq!(Frame::validate_length(4, 16), Ok(4));
        assert_eq!(Frame::validate_length(16, 16), Ok(16));
        for length in [i32::MIN, -1, 0, 1, 3, 17] {
            assert_eq!(
                Frame::validate_length(length, 16),
                Err(ProtocolError::InvalidFrameLength { length, max: 16 })
            );
        }
    }
}
