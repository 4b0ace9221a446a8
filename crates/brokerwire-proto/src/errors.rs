//! Protocol errors.
//!
//! Errors are plain data (`Clone + Eq`) so they can be stored next to the
//! messages they belong to and carried inside connection actions.

use thiserror::Error;

/// Result alias for wire format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A fixed field extends past the end of the buffer.
    #[error("truncated buffer: need {needed} bytes at offset {offset}, {available} available")]
    TruncatedBuffer {
        /// Offset the read started at.
        offset: usize,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the buffer from `offset`.
        available: usize,
    },

    /// Declared frame length is non-positive, too small to hold a correlation
    /// id, or above the configured maximum.
    #[error("invalid frame length {length} (max {max})")]
    InvalidFrameLength {
        /// Length as read from the wire.
        length: i32,
        /// Configured maximum frame size.
        max: usize,
    },

    /// Attribute bits select a codec this decoder does not implement.
    #[error("unsupported compression codec {codec}")]
    UnsupportedCompression {
        /// Codec value taken from attribute bits 0-2.
        codec: u8,
    },

    /// Stored checksum does not match the message contents.
    #[error("crc mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch {
        /// Checksum carried by the message.
        expected: u32,
        /// Checksum computed over the message bytes.
        actual: u32,
    },

    /// A mandatory size field is negative.
    #[error("invalid length {length} for {field}")]
    InvalidLength {
        /// Name of the field.
        field: &'static str,
        /// Length as read from the wire.
        length: i32,
    },

    /// String bytes are not valid UTF-8.
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidString {
        /// Offset of the string contents.
        offset: usize,
    },

    /// Value does not fit its length prefix.
    #[error("{field} is {len} bytes, limit is {max}")]
    ValueTooLarge {
        /// Name of the field.
        field: &'static str,
        /// Actual size.
        len: usize,
        /// Largest size the prefix can express.
        max: usize,
    },

    /// Compressed payload could not be decompressed.
    #[error("{codec} decompression failed: {message}")]
    Decompression {
        /// Codec name.
        codec: &'static str,
        /// Underlying codec error.
        message: String,
    },

    /// Decompressed output would exceed the configured limit.
    #[error("{codec} output exceeds {limit} bytes")]
    DecompressedTooLarge {
        /// Codec name.
        codec: &'static str,
        /// Bytes that were still allowed.
        limit: usize,
    },

    /// Message format version is not understood.
    #[error("unsupported message magic {magic}")]
    UnsupportedMagic {
        /// Magic byte as read from the wire.
        magic: i8,
    },

    /// Compressed messages nest deeper than allowed.
    #[error("compressed message nesting exceeds depth {max}")]
    NestingTooDeep {
        /// Configured maximum depth.
        max: usize,
    },

    /// No response decoder is registered for this api key and version.
    #[error("unsupported api {api_key} v{api_version}")]
    UnsupportedApi {
        /// Raw api key.
        api_key: i16,
        /// Api version.
        api_version: i16,
    },
}
