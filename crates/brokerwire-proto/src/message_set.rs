//! Message sets.
//!
//! A message set is a byte region holding back-to-back entries:
//!
//! ```text
//! offset:int64 | messageSize:int32 | crc:uint32 | magic:int8 | attributes:int8
//!              |                   | [timestamp:int64, magic 1 only]
//!              |                   | key:bytes | value:bytes
//! ```
//!
//! Brokers fill fetch responses up to the requested byte budget, so the last
//! entry of a region is often cut short. A record whose fixed header or
//! declared size does not fit in what is left ends the set; the leftover bytes
//! are reported in [`MessageSet::discarded`] and are not an error.
//!
//! A message whose attributes name a codec wraps a whole compressed message
//! set in its value. Those inner messages replace the wrapper in the output,
//! in order. Failures of individual records (bad checksum, unknown codec,
//! corrupt payload) are collected in [`MessageSet::failures`] and decoding
//! moves on to the next record.

use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::big_endian::{I32, I64, U32},
};

use crate::{
    compression::Compression,
    errors::{ProtocolError, Result},
    flags::Attributes,
    frame::DEFAULT_MAX_FRAME_SIZE,
    primitives::{checked_i32_len, put_bytes, read_bytes, read_i64},
};

/// `offset` and `messageSize` preceding every message.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct EntryHeader {
    offset: I64,
    message_size: I32,
}

/// Fixed fields at the start of a message body.
#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct MessageHeader {
    crc: U32,
    magic: i8,
    attributes: u8,
}

/// Size of the per-entry header.
pub const ENTRY_HEADER_SIZE: usize = size_of::<EntryHeader>();

/// Size of the fixed message fields covered by `messageSize`.
pub const MESSAGE_HEADER_SIZE: usize = size_of::<MessageHeader>();

/// Bytes of the message body not covered by its checksum.
const CRC_SIZE: usize = 4;

/// Knobs for message set decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Recompute and compare each message's checksum.
    pub verify_crc: bool,
    /// How many levels of compressed wrappers may be unpacked.
    pub max_nesting_depth: usize,
    /// Total bytes decompression may produce for one message set region,
    /// nested wrappers included.
    pub max_decompressed_size: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_crc: false,
            max_nesting_depth: 2,
            max_decompressed_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// A single decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Log offset.
    pub offset: i64,
    /// Checksum stored with the message.
    pub crc: u32,
    /// Format version.
    pub magic: i8,
    /// Attribute flags.
    pub attributes: Attributes,
    /// Create or append time in milliseconds; magic 1 only.
    pub timestamp: Option<i64>,
    /// Message key, `None` when null.
    pub key: Option<Bytes>,
    /// Message value, `None` when null.
    pub value: Option<Bytes>,
}

/// A record that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFailure {
    /// Offset of the failed record.
    pub offset: i64,
    /// Why it failed.
    pub error: ProtocolError,
}

/// Decoded contents of a message set region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageSet {
    /// Declared size of the region in bytes.
    pub size: i32,
    /// Decoded messages in log order, compressed wrappers expanded.
    pub messages: Vec<Message>,
    /// Records that were skipped, in the order they were encountered.
    pub failures: Vec<MessageFailure>,
    /// Trailing bytes of a partial record that were dropped.
    pub discarded: usize,
}

impl MessageSet {
    /// Whether no messages were decoded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Decode every complete record in `region`.
///
/// Never reads past `region` and never fails as a whole: problems with a
/// single record land in [`MessageSet::failures`].
pub fn decode_message_set(region: &Bytes, options: &DecodeOptions) -> MessageSet {
    let mut set = MessageSet {
        size: i32::try_from(region.len()).unwrap_or(i32::MAX),
        ..MessageSet::default()
    };
    let mut cursor = Cursor {
        options,
        budget: options.max_decompressed_size,
        messages: &mut set.messages,
        failures: &mut set.failures,
    };
    let consumed = cursor.decode_entries(region, 0);
    set.discarded = region.len() - consumed;
    set
}

/// Output and decompression budget shared by every nesting level of one
/// region.
struct Cursor<'a> {
    options: &'a DecodeOptions,
    /// Bytes decompression may still produce
    budget: usize,
    messages: &'a mut Vec<Message>,
    failures: &'a mut Vec<MessageFailure>,
}

impl Cursor<'_> {
    /// Decode entries from the start of `region`, returning the bytes consumed.
    fn decode_entries(&mut self, region: &Bytes, depth: usize) -> usize {
        let mut pos = 0;
        while let Ok((header, _)) = EntryHeader::read_from_prefix(&region[pos..]) {
            let offset = header.offset.get();
            let declared = header.message_size.get();
            let Ok(size) = usize::try_from(declared) else {
                self.fail(offset, ProtocolError::InvalidLength {
                    field: "message size",
                    length: declared,
                });
                break;
            };

            let start = pos + ENTRY_HEADER_SIZE;
            if region.len() - start < size {
                break;
            }
            let body = region.slice(start..start + size);
            pos = start + size;

            let decoded = decode_message(offset, &body, self.options).and_then(|message| {
                Compression::from_attributes(message.attributes).map(|codec| (message, codec))
            });
            match decoded {
                Ok((message, Compression::None)) => self.messages.push(message),
                Ok((wrapper, codec)) => self.expand(wrapper, codec, depth),
                Err(error) => self.fail(offset, error),
            }
        }
        pos
    }

    /// Replace a compressed wrapper with the messages it carries.
    fn expand(&mut self, wrapper: Message, codec: Compression, depth: usize) {
        if depth >= self.options.max_nesting_depth {
            let max = self.options.max_nesting_depth;
            return self.fail(wrapper.offset, ProtocolError::NestingTooDeep { max });
        }
        let Some(value) = wrapper.value else {
            return self.fail(wrapper.offset, ProtocolError::InvalidLength {
                field: "compressed value",
                length: -1,
            });
        };
        let inner = match codec.decompress(&value, self.budget) {
            Ok(inner) => inner,
            Err(error) => return self.fail(wrapper.offset, error),
        };
        self.budget -= inner.len();

        let first_message = self.messages.len();
        let first_failure = self.failures.len();
        self.decode_entries(&inner, depth + 1);

        // Magic 1 wrappers carry relative inner offsets; the last inner message
        // sits at the wrapper's offset.
        if wrapper.magic == 1
            && let Some(last) = self.messages[first_message..].last().map(|m| m.offset)
        {
            let base = wrapper.offset.wrapping_sub(last);
            for message in &mut self.messages[first_message..] {
                message.offset = message.offset.wrapping_add(base);
            }
            for failure in &mut self.failures[first_failure..] {
                failure.offset = failure.offset.wrapping_add(base);
            }
        }
    }

    fn fail(&mut self, offset: i64, error: ProtocolError) {
        self.failures.push(MessageFailure { offset, error });
    }
}

/// Decode one message body (the `messageSize` bytes after the entry header).
fn decode_message(offset: i64, body: &Bytes, options: &DecodeOptions) -> Result<Message> {
    let Ok((header, _)) = MessageHeader::read_from_prefix(body) else {
        return Err(ProtocolError::TruncatedBuffer {
            offset: 0,
            needed: MESSAGE_HEADER_SIZE,
            available: body.len(),
        });
    };

    let crc = header.crc.get();
    if options.verify_crc {
        let actual = crc32fast::hash(&body[CRC_SIZE..]);
        if actual != crc {
            return Err(ProtocolError::CrcMismatch { expected: crc, actual });
        }
    }

    let (timestamp, pos) = match header.magic {
        0 => (None, MESSAGE_HEADER_SIZE),
        1 => {
            let (ts, next) = read_i64(body, MESSAGE_HEADER_SIZE)?;
            (Some(ts), next)
        },
        magic => return Err(ProtocolError::UnsupportedMagic { magic }),
    };
    let (key, pos) = read_bytes(body, pos)?;
    let (value, _) = read_bytes(body, pos)?;

    Ok(Message {
        offset,
        crc,
        magic: header.magic,
        attributes: Attributes::from_bits_retain(header.attributes),
        timestamp,
        key,
        value,
    })
}

/// Key and value of a message to encode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// Message key.
    pub key: Option<Bytes>,
    /// Message value.
    pub value: Option<Bytes>,
}

impl Record {
    /// Record with a value and no key.
    pub fn value(value: impl Into<Bytes>) -> Self {
        Self { key: None, value: Some(value.into()) }
    }

    /// Record with both key and value.
    pub fn keyed(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self { key: Some(key.into()), value: Some(value.into()) }
    }
}

/// Builds magic 0 message sets, optionally compressed.
///
/// Records get sequential offsets starting at the base offset. With a codec
/// set, the plain set is compressed into the value of a single wrapper message
/// whose offset is that of the last record.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageSetEncoder {
    compression: Compression,
    base_offset: i64,
}

impl MessageSetEncoder {
    /// Encoder using `compression`.
    pub fn new(compression: Compression) -> Self {
        Self { compression, base_offset: 0 }
    }

    /// Offset assigned to the first record.
    #[must_use]
    pub fn with_base_offset(mut self, base_offset: i64) -> Self {
        self.base_offset = base_offset;
        self
    }

    /// Encode `records` into a message set region.
    pub fn encode(&self, records: &[Record]) -> Result<Bytes> {
        let mut plain = BytesMut::new();
        let mut offset = self.base_offset;
        for record in records {
            put_message(
                &mut plain,
                offset,
                Attributes::empty(),
                record.key.as_deref(),
                record.value.as_deref(),
            )?;
            offset = offset.wrapping_add(1);
        }
        if self.compression == Compression::None || records.is_empty() {
            return Ok(plain.freeze());
        }

        let packed = self.compression.compress(&plain)?;
        let mut wrapped = BytesMut::new();
        put_message(
            &mut wrapped,
            offset.wrapping_sub(1),
            self.compression.attributes(),
            None,
            Some(packed.as_ref()),
        )?;
        Ok(wrapped.freeze())
    }
}

fn put_message(
    buf: &mut BytesMut,
    offset: i64,
    attributes: Attributes,
    key: Option<&[u8]>,
    value: Option<&[u8]>,
) -> Result<()> {
    let mut body = BytesMut::new();
    body.put_i8(0);
    body.put_u8(attributes.bits());
    put_bytes(&mut body, key)?;
    put_bytes(&mut body, value)?;

    let header = EntryHeader {
        offset: I64::new(offset),
        message_size: I32::new(checked_i32_len("message", CRC_SIZE + body.len())?),
    };
    buf.put_slice(header.as_bytes());
    buf.put_u32(crc32fast::hash(&body));
    buf.put_slice(&body);
    Ok(())
}
