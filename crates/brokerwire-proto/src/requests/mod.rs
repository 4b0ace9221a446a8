//! Request encoding.
//!
//! ```text
//! length:int32 | apiKey:int16 | apiVersion:int16 | correlationId:int32
//!              | clientId:string | body
//! ```
//!
//! The length slot is reserved first and patched once the body is written, so
//! bodies can be streamed straight into the output buffer.

mod fetch;
mod metadata;
mod produce;

use bytes::{BufMut, Bytes, BytesMut};
pub use fetch::{FetchPartition, FetchRequest, FetchTopic};
pub use metadata::MetadataRequest;
pub use produce::{ProducePartition, ProduceRequest, ProduceTopic};

use crate::{
    api_key::ApiKey,
    errors::Result,
    frame::LENGTH_PREFIX_SIZE,
    primitives::{checked_i32_len, put_string},
};

/// A request body of a specific api key and version.
pub trait ApiRequest {
    /// Api key written into the header.
    const API_KEY: ApiKey;

    /// Api version written into the header.
    const API_VERSION: i16 = 0;

    /// Append the body fields to `buf`.
    fn encode_body(&self, buf: &mut BytesMut) -> Result<()>;

    /// Whether the broker answers this request.
    fn expects_response(&self) -> bool {
        true
    }
}

/// Header fields common to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    /// Request type.
    pub api_key: ApiKey,
    /// Request version.
    pub api_version: i16,
    /// Caller-assigned id echoed in the response.
    pub correlation_id: i32,
    /// Client identifier for broker logs and quotas.
    pub client_id: String,
}

impl RequestHeader {
    /// Header for request type `R`.
    pub fn for_request<R: ApiRequest>(correlation_id: i32, client_id: impl Into<String>) -> Self {
        Self {
            api_key: R::API_KEY,
            api_version: R::API_VERSION,
            correlation_id,
            client_id: client_id.into(),
        }
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_i16(self.api_key.to_i16());
        buf.put_i16(self.api_version);
        buf.put_i32(self.correlation_id);
        put_string(buf, &self.client_id)
    }
}

/// Encode a complete length-prefixed request.
pub fn encode_request<R: ApiRequest>(header: &RequestHeader, request: &R) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    buf.put_i32(0);
    header.encode(&mut buf)?;
    request.encode_body(&mut buf)?;

    let length = checked_i32_len("request", buf.len() - LENGTH_PREFIX_SIZE)?;
    buf[..LENGTH_PREFIX_SIZE].copy_from_slice(&length.to_be_bytes());
    Ok(buf.freeze())
}
