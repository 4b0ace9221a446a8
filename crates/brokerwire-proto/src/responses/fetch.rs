//! Fetch response (api key 1, v0).
//!
//! ```text
//! [topic:string | [partition:int32 | errorCode:int16 | highwaterMarkOffset:int64
//!                  | messageSetSize:int32 | messageSet]]
//! ```

use bytes::Bytes;

use super::DecodeBody;
use crate::{
    errors::{ProtocolError, Result},
    message_set::{DecodeOptions, MessageSet, decode_message_set},
    primitives::{read_array, read_i16, read_i32, read_i64, read_region, read_string},
};

/// Message sets returned for each requested partition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse {
    /// Topics in response order.
    pub topics: Vec<TopicEntry>,
}

/// Partitions of one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    /// Topic name; empty if the broker sent a null string.
    pub name: String,
    /// Partitions in response order.
    pub partitions: Vec<PartitionResponse>,
}

/// Fetch result for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionResponse {
    /// Partition id.
    pub id: i32,
    /// Error code, 0 on success.
    pub error_code: i16,
    /// Offset of the last fully replicated message plus one.
    pub high_watermark_offset: i64,
    /// Messages read from the partition.
    pub message_set: MessageSet,
}

impl DecodeBody for FetchResponse {
    fn decode_body(body: &Bytes, offset: usize, options: &DecodeOptions) -> Result<(Self, usize)> {
        let (topics, offset) =
            read_array(body, offset, |buf, offset| decode_topic(buf, offset, options))?;
        Ok((Self { topics }, offset))
    }
}

fn decode_topic(buf: &Bytes, offset: usize, options: &DecodeOptions) -> Result<(TopicEntry, usize)> {
    let (name, offset) = read_string(buf, offset)?;
    let (partitions, offset) =
        read_array(buf, offset, |buf, offset| decode_partition(buf, offset, options))?;
    Ok((TopicEntry { name: name.unwrap_or_default(), partitions }, offset))
}

fn decode_partition(
    buf: &Bytes,
    offset: usize,
    options: &DecodeOptions,
) -> Result<(PartitionResponse, usize)> {
    let (id, offset) = read_i32(buf, offset)?;
    let (error_code, offset) = read_i16(buf, offset)?;
    let (high_watermark_offset, offset) = read_i64(buf, offset)?;
    let (size, offset) = read_i32(buf, offset)?;
    let len = usize::try_from(size)
        .map_err(|_| ProtocolError::InvalidLength { field: "message set size", length: size })?;

    // The message set decoder only ever sees its own region; whatever it
    // leaves unread is skipped along with the region.
    let (region, offset) = read_region(buf, offset, len)?;
    let message_set = decode_message_set(&region, options);

    Ok((PartitionResponse { id, error_code, high_watermark_offset, message_set }, offset))
}
