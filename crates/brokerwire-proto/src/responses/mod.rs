//! Response decoding.
//!
//! A response body carries no type information of its own; its shape follows
//! from the api key and version of the request it answers. [`ResponseKind`]
//! resolves that pair through a fixed table and decodes the body into the
//! matching [`Response`] variant.

mod fetch;
mod metadata;
mod produce;

use bytes::Bytes;
pub use fetch::{FetchResponse, PartitionResponse, TopicEntry};
pub use metadata::{BrokerMetadata, MetadataResponse, PartitionMetadata, TopicMetadata};
pub use produce::{ProducePartitionResponse, ProduceResponse, ProduceTopicResponse};

use crate::{
    api_key::ApiKey,
    errors::{ProtocolError, Result},
    message_set::DecodeOptions,
};

/// A response type that can be decoded from body bytes.
pub trait DecodeBody: Sized {
    /// Decode starting at `offset`, returning the value and the offset after it.
    fn decode_body(body: &Bytes, offset: usize, options: &DecodeOptions) -> Result<(Self, usize)>;
}

/// Shape of the response expected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// [`ProduceResponse`]
    Produce,
    /// [`FetchResponse`]
    Fetch,
    /// [`MetadataResponse`]
    Metadata,
}

/// Request `(api key, api version)` pairs with a known response shape.
const RESPONSE_TABLE: &[(ApiKey, i16, ResponseKind)] = &[
    (ApiKey::Produce, 0, ResponseKind::Produce),
    (ApiKey::Fetch, 0, ResponseKind::Fetch),
    (ApiKey::Metadata, 0, ResponseKind::Metadata),
];

impl ResponseKind {
    /// Response shape for a request type.
    pub fn lookup(api_key: ApiKey, api_version: i16) -> Result<Self> {
        RESPONSE_TABLE
            .iter()
            .find(|(key, version, _)| *key == api_key && *version == api_version)
            .map(|(_, _, kind)| *kind)
            .ok_or(ProtocolError::UnsupportedApi { api_key: api_key.to_i16(), api_version })
    }

    /// Response shape for a raw api key off the wire.
    pub fn lookup_raw(api_key: i16, api_version: i16) -> Result<Self> {
        ApiKey::from_i16(api_key)
            .ok_or(ProtocolError::UnsupportedApi { api_key, api_version })
            .and_then(|key| Self::lookup(key, api_version))
    }

    /// Decode a frame body of this shape.
    pub fn decode(self, body: &Bytes, options: &DecodeOptions) -> Result<Response> {
        match self {
            Self::Produce => decode_whole(body, options).map(Response::Produce),
            Self::Fetch => decode_whole(body, options).map(Response::Fetch),
            Self::Metadata => decode_whole(body, options).map(Response::Metadata),
        }
    }
}

fn decode_whole<T: DecodeBody>(body: &Bytes, options: &DecodeOptions) -> Result<T> {
    T::decode_body(body, 0, options).map(|(value, _)| value)
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Produce acknowledgements.
    Produce(ProduceResponse),
    /// Fetched message sets.
    Fetch(FetchResponse),
    /// Cluster metadata.
    Metadata(MetadataResponse),
}

impl Response {
    /// Shape of this response.
    pub const fn kind(&self) -> ResponseKind {
        match self {
            Self::Produce(_) => ResponseKind::Produce,
            Self::Fetch(_) => ResponseKind::Fetch,
            Self::Metadata(_) => ResponseKind::Metadata,
        }
    }

    /// The fetch response, if this is one.
    pub fn into_fetch(self) -> Option<FetchResponse> {
        match self {
            Self::Fetch(response) => Some(response),
            _ => None,
        }
    }

    /// The metadata response, if this is one.
    pub fn into_metadata(self) -> Option<MetadataResponse> {
        match self {
            Self::Metadata(response) => Some(response),
            _ => None,
        }
    }

    /// The produce response, if this is one.
    pub fn into_produce(self) -> Option<ProduceResponse> {
        match self {
            Self::Produce(response) => Some(response),
            _ => None,
        }
    }
}
