//! Metadata request (api key 3, v0).

use bytes::BytesMut;

use super::ApiRequest;
use crate::{
    api_key::ApiKey,
    errors::Result,
    primitives::{put_array, put_string},
};

/// Ask for brokers and partition leadership of `topics`.
///
/// An empty topic list asks for every topic in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRequest {
    /// Topic names.
    pub topics: Vec<String>,
}

impl MetadataRequest {
    /// Request metadata for `topics`.
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { topics: topics.into_iter().map(Into::into).collect() }
    }
}

impl ApiRequest for MetadataRequest {
    const API_KEY: ApiKey = ApiKey::Metadata;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        put_array(buf, &self.topics, |buf, topic| put_string(buf, topic))
    }
}
