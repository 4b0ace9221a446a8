//! Produce response (api key 0, v0).

use bytes::Bytes;

use super::DecodeBody;
use crate::{
    errors::Result,
    message_set::DecodeOptions,
    primitives::{read_array, read_i16, read_i32, read_i64, read_string},
};

/// Acknowledgements for a produce request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceResponse {
    /// Topics in response order.
    pub topics: Vec<ProduceTopicResponse>,
}

/// Acknowledgements for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceTopicResponse {
    /// Topic name.
    pub name: String,
    /// Per-partition results.
    pub partitions: Vec<ProducePartitionResponse>,
}

/// Result of appending to one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducePartitionResponse {
    /// Partition id.
    pub id: i32,
    /// Error code, 0 on success.
    pub error_code: i16,
    /// Offset assigned to the first appended message.
    pub base_offset: i64,
}

impl DecodeBody for ProduceResponse {
    fn decode_body(body: &Bytes, offset: usize, _: &DecodeOptions) -> Result<(Self, usize)> {
        let (topics, offset) = read_array(body, offset, |buf, offset| {
            let (name, offset) = read_string(buf, offset)?;
            let (partitions, offset) = read_array(buf, offset, |buf, offset| {
                let (id, offset) = read_i32(buf, offset)?;
                let (error_code, offset) = read_i16(buf, offset)?;
                let (base_offset, offset) = read_i64(buf, offset)?;
                Ok((ProducePartitionResponse { id, error_code, base_offset }, offset))
            })?;
            Ok((ProduceTopicResponse { name: name.unwrap_or_default(), partitions }, offset))
        })?;
        Ok((Self { topics }, offset))
    }
}
