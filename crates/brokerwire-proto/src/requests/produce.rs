//! Produce request (api key 0, v0).

use bytes::{BufMut, Bytes, BytesMut};

use super::ApiRequest;
use crate::{
    api_key::ApiKey,
    errors::Result,
    primitives::{put_array, put_bytes, put_string},
};

/// Append pre-encoded message sets to partitions.
///
/// Message sets are built with [`crate::MessageSetEncoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceRequest {
    /// Acknowledgements required: 0 none, 1 leader, -1 all in-sync replicas.
    pub acks: i16,
    /// How long the broker may wait for the acknowledgements.
    pub timeout_ms: i32,
    /// Message sets, grouped by topic.
    pub topics: Vec<ProduceTopic>,
}

/// Message sets for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceTopic {
    /// Topic name.
    pub name: String,
    /// Per-partition message sets.
    pub partitions: Vec<ProducePartition>,
}

/// Message set destined for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducePartition {
    /// Partition id.
    pub partition: i32,
    /// Encoded message set.
    pub message_set: Bytes,
}

impl ProduceRequest {
    /// Empty request with the given acknowledgement mode.
    pub fn new(acks: i16, timeout_ms: i32) -> Self {
        Self { acks, timeout_ms, topics: Vec::new() }
    }

    /// Add a message set for a partition, grouping it under its topic.
    #[must_use]
    pub fn message_set(mut self, topic: &str, partition: i32, message_set: Bytes) -> Self {
        let entry = ProducePartition { partition, message_set };
        match self.topics.iter_mut().find(|t| t.name == topic) {
            Some(t) => t.partitions.push(entry),
            None => self.topics.push(ProduceTopic { name: topic.to_owned(), partitions: vec![entry] }),
        }
        self
    }
}

impl ApiRequest for ProduceRequest {
    const API_KEY: ApiKey = ApiKey::Produce;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_i16(self.acks);
        buf.put_i32(self.timeout_ms);
        put_array(buf, &self.topics, |buf, topic| {
            put_string(buf, &topic.name)?;
            put_array(buf, &topic.partitions, |buf, p| {
                buf.put_i32(p.partition);
                put_bytes(buf, Some(p.message_set.as_ref()))
            })
        })
    }

    /// With `acks = 0` the broker sends nothing back.
    fn expects_response(&self) -> bool {
        self.acks != 0
    }
}
