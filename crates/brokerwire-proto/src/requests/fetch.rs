//! Fetch request (api key 1, v0).

use bytes::{BufMut, BytesMut};

use super::ApiRequest;
use crate::{
    api_key::ApiKey,
    errors::Result,
    primitives::{put_array, put_string},
};

/// Replica id used by ordinary consumers.
pub const CONSUMER_REPLICA_ID: i32 = -1;

/// Read message sets from a list of partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Requesting replica, [`CONSUMER_REPLICA_ID`] for clients.
    pub replica_id: i32,
    /// Longest the broker may block waiting for `min_bytes`.
    pub max_wait_ms: i32,
    /// Smallest response the broker should return.
    pub min_bytes: i32,
    /// Partitions to read, grouped by topic.
    pub topics: Vec<FetchTopic>,
}

/// Partitions of one topic in a fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTopic {
    /// Topic name.
    pub name: String,
    /// Partitions to read.
    pub partitions: Vec<FetchPartition>,
}

/// Read position within one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPartition {
    /// Partition id.
    pub partition: i32,
    /// First offset to return.
    pub fetch_offset: i64,
    /// Byte budget for this partition's message set.
    pub max_bytes: i32,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self { replica_id: CONSUMER_REPLICA_ID, max_wait_ms: 100, min_bytes: 1, topics: Vec::new() }
    }
}

impl FetchRequest {
    /// Add a partition to read, grouping it under its topic.
    #[must_use]
    pub fn partition(mut self, topic: &str, partition: FetchPartition) -> Self {
        match self.topics.iter_mut().find(|t| t.name == topic) {
            Some(entry) => entry.partitions.push(partition),
            None => self
                .topics
                .push(FetchTopic { name: topic.to_owned(), partitions: vec![partition] }),
        }
        self
    }
}

impl ApiRequest for FetchRequest {
    const API_KEY: ApiKey = ApiKey::Fetch;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_i32(self.replica_id);
        buf.put_i32(self.max_wait_ms);
        buf.put_i32(self.min_bytes);
        put_array(buf, &self.topics, |buf, topic| {
            put_string(buf, &topic.name)?;
            put_array(buf, &topic.partitions, |buf, p| {
                buf.put_i32(p.partition);
                buf.put_i64(p.fetch_offset);
                buf.put_i32(p.max_bytes);
                Ok(())
            })
        })
    }
}
