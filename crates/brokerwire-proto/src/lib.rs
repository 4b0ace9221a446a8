//! Wire format for the broker request/response protocol.
//!
//! Every unit on the wire is a big-endian `int32` length followed by that many
//! bytes. Requests carry a fixed header (api key, api version, correlation id,
//! client id) and a typed body; responses echo the correlation id and carry a
//! body whose shape is determined by the request that produced it.
//!
//! Decoding never hides a cursor: every reader takes a buffer and an offset and
//! returns the value together with the offset just past it. Buffers are
//! [`bytes::Bytes`], so sub-regions (keys, values, message sets) are zero-copy
//! slices of the frame they came from.
//!
//! # Layers
//!
//! - [`primitives`]: fixed-width integers, strings, byte arrays, arrays
//! - [`requests`]: request header plus Metadata, Fetch and Produce bodies
//! - [`message_set`]: offset-tagged messages, truncation, nested compression
//! - [`responses`]: Fetch, Metadata and Produce bodies and the dispatch table
//! - [`frame`]: the response envelope (`length | correlation id | body`)
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api_key;
pub mod compression;
pub mod errors;
pub mod flags;
pub mod frame;
pub mod message_set;
pub mod primitives;
pub mod requests;
pub mod responses;

pub use api_key::ApiKey;
pub use compression::Compression;
pub use errors::{ProtocolError, Result};
pub use flags::Attributes;
pub use frame::Frame;
pub use message_set::{
    DecodeOptions, Message, MessageFailure, MessageSet, MessageSetEncoder, Record,
    decode_message_set,
};
pub use requests::{ApiRequest, RequestHeader, encode_request};
pub use responses::{Response, ResponseKind};
