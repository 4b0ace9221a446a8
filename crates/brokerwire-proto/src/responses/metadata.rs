//! Metadata response (api key 3, v0).
//!
//! ```text
//! [nodeId:int32 | host:string | port:int32]
//! [errorCode:int16 | topic:string
//!   | [errorCode:int16 | partition:int32 | leader:int32 | [replica:int32] | [isr:int32]]]
//! ```

use bytes::Bytes;

use super::DecodeBody;
use crate::{
    errors::Result,
    message_set::DecodeOptions,
    primitives::{read_array, read_i16, read_i32, read_string},
};

/// Brokers and topic layout of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataResponse {
    /// Live brokers.
    pub brokers: Vec<BrokerMetadata>,
    /// Requested topics (or all topics).
    pub topics: Vec<TopicMetadata>,
}

/// Address of one broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMetadata {
    /// Broker id.
    pub node_id: i32,
    /// Host name.
    pub host: String,
    /// Port.
    pub port: i32,
}

/// Partition layout of one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    /// Topic-level error code, 0 on success.
    pub error_code: i16,
    /// Topic name.
    pub name: String,
    /// Partitions of the topic.
    pub partitions: Vec<PartitionMetadata>,
}

/// Leadership and replicas of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    /// Partition-level error code, 0 on success.
    pub error_code: i16,
    /// Partition id.
    pub id: i32,
    /// Leader broker id, -1 during leader election.
    pub leader: i32,
    /// All replica broker ids.
    pub replicas: Vec<i32>,
    /// In-sync replica broker ids.
    pub isr: Vec<i32>,
}

impl DecodeBody for MetadataResponse {
    fn decode_body(body: &Bytes, offset: usize, _: &DecodeOptions) -> Result<(Self, usize)> {
        let (brokers, offset) = read_array(body, offset, decode_broker)?;
        let (topics, offset) = read_array(body, offset, decode_topic)?;
        Ok((Self { brokers, topics }, offset))
    }
}

fn decode_broker(buf: &Bytes, offset: usize) -> Result<(BrokerMetadata, usize)> {
    let (node_id, offset) = read_i32(buf, offset)?;
    let (host, offset) = read_string(buf, offset)?;
    let (port, offset) = read_i32(buf, offset)?;
    Ok((BrokerMetadata { node_id, host: host.unwrap_or_default(), port }, offset))
}

fn decode_topic(buf: &Bytes, offset: usize) -> Result<(TopicMetadata, usize)> {
    let (error_code, offset) = read_i16(buf, offset)?;
    let (name, offset) = read_string(buf, offset)?;
    let (partitions, offset) = read_array(buf, offset, decode_partition)?;
    Ok((TopicMetadata { error_code, name: name.unwrap_or_default(), partitions }, offset))
}

fn decode_partition(buf: &Bytes, offset: usize) -> Result<(PartitionMetadata, usize)> {
    let (error_code, offset) = read_i16(buf, offset)?;
    let (id, offset) = read_i32(buf, offset)?;
    let (leader, offset) = read_i32(buf, offset)?;
    let (replicas, offset) = read_array(buf, offset, |buf, offset| read_i32(buf, offset))?;
    let (isr, offset) = read_array(buf, offset, |buf, offset| read_i32(buf, offset))?;
    Ok((PartitionMetadata { error_code, id, leader, replicas, isr }, offset))
}
