//! Brokerwire connection core
//!
//! Per-connection protocol state, completely decoupled from I/O. The transport
//! hands in byte chunks and the current time; the state machines hand back
//! decoded frames and declarative actions.
//!
//! # Architecture
//!
//! Nothing in this crate blocks, sleeps, or owns a socket. The only point where
//! progress can stall is "not enough bytes yet", and that is expressed by the
//! [`FrameReader`] returning no frame until the next chunk arrives. Each
//! connection owns its reassembly buffer and correlation registry exclusively,
//! so connections run in parallel without coordination.
//!
//! # Components
//!
//! - [`reader`]: Frame reassembly state machine (split and pipelined frames)
//! - [`connection`]: Correlation registry, timeouts, connection lifecycle
//! - [`error`]: Connection error types

pub mod connection;
pub mod error;
pub mod reader;

pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionState};
pub use error::{ConnectionError, Result};
pub use reader::{FrameReader, ReaderState};
