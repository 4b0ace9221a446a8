//! Compression codecs for wrapped message sets.
//!
//! A compressed message's value is an entire message set run through the codec
//! named by the wrapper's attribute bits.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::{read::GzDecoder, write::GzEncoder};

use crate::{
    errors::{ProtocolError, Result},
    flags::Attributes,
    primitives::{read_i32, take},
};

/// Xerial snappy stream magic (`0x82 "SNAPPY" 0x00`).
const XERIAL_MAGIC: &[u8; 8] = b"\x82SNAPPY\x00";

/// Xerial header: magic plus two `int32` version fields.
const XERIAL_HEADER_SIZE: usize = 16;

/// Compression codec selected by attribute bits 0-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Plain message.
    #[default]
    None,
    /// Gzip stream.
    Gzip,
    /// Snappy, raw or xerial-framed.
    Snappy,
}

impl Compression {
    /// Codec named by `attributes`.
    pub const fn from_attributes(attributes: Attributes) -> Result<Self> {
        match attributes.codec() {
            0 => Ok(Self::None),
            1 => Ok(Self::Gzip),
            2 => Ok(Self::Snappy),
            codec => Err(ProtocolError::UnsupportedCompression { codec }),
        }
    }

    /// Attribute bits for this codec.
    pub const fn attributes(self) -> Attributes {
        match self {
            Self::None => Attributes::empty(),
            Self::Gzip => Attributes::GZIP,
            Self::Snappy => Attributes::SNAPPY,
        }
    }

    /// Codec name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Snappy => "snappy",
        }
    }

    /// Decompress `data`, producing at most `limit` bytes.
    ///
    /// Output that would grow past `limit` fails with `DecompressedTooLarge`
    /// before it is materialised.
    pub fn decompress(self, data: &[u8], limit: usize) -> Result<Bytes> {
        match self {
            Self::None if data.len() > limit => Err(self.too_large(limit)),
            Self::None => Ok(Bytes::copy_from_slice(data)),
            Self::Gzip => {
                let mut out = Vec::new();
                GzDecoder::new(data)
                    .take(u64::try_from(limit).map_or(u64::MAX, |l| l.saturating_add(1)))
                    .read_to_end(&mut out)
                    .map_err(|e| self.failed(e))?;
                if out.len() > limit {
                    return Err(self.too_large(limit));
                }
                Ok(out.into())
            },
            Self::Snappy if data.starts_with(XERIAL_MAGIC) => self.decompress_xerial(data, limit),
            Self::Snappy => {
                let mut out = Vec::new();
                self.decompress_block(data, limit, &mut out)?;
                Ok(out.into())
            },
        }
    }

    /// Compress `data`. Snappy output is a raw block.
    pub fn compress(self, data: &[u8]) -> Result<Bytes> {
        match self {
            Self::None => Ok(Bytes::copy_from_slice(data)),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data).map_err(|e| self.failed(e))?;
                encoder.finish().map(Bytes::from).map_err(|e| self.failed(e))
            },
            Self::Snappy => snap::raw::Encoder::new()
                .compress_vec(data)
                .map(Bytes::from)
                .map_err(|e| self.failed(e)),
        }
    }

    fn decompress_xerial(self, data: &[u8], limit: usize) -> Result<Bytes> {
        let mut out = Vec::new();
        let mut offset = XERIAL_HEADER_SIZE;
        while offset < data.len() {
            let (len, start) = read_i32(data, offset)?;
            let len = usize::try_from(len)
                .map_err(|_| ProtocolError::InvalidLength { field: "xerial block", length: len })?;
            let block = take(data, start, len)?;
            self.decompress_block(block, limit, &mut out)?;
            offset = start + len;
        }
        Ok(out.into())
    }

    /// Append one raw snappy block to `out`, keeping `out` within `limit`.
    fn decompress_block(self, block: &[u8], limit: usize, out: &mut Vec<u8>) -> Result<()> {
        let len = snap::raw::decompress_len(block).map_err(|e| self.failed(e))?;
        if len > limit.saturating_sub(out.len()) {
            return Err(self.too_large(limit));
        }
        let start = out.len();
        out.resize(start + len, 0);
        let written = snap::raw::Decoder::new()
            .decompress(block, &mut out[start..])
            .map_err(|e| self.failed(e))?;
        out.truncate(start + written);
        Ok(())
    }

    fn too_large(self, limit: usize) -> ProtocolError {
        ProtocolError::DecompressedTooLarge { codec: self.name(), limit }
    }

    fn failed(self, err: impl std::fmt::Display) -> ProtocolError {
        ProtocolError::Decompression { codec: self.name(), message: err.to_string() }
    }
}
