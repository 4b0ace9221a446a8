//! Connection state machine.
//!
//! Owns everything that is scoped to one broker connection: the frame
//! reassembly buffer, the registry of requests waiting for a response, and the
//! correlation id counter. A `Connection` is created when the transport
//! connects and closed when it disconnects; nothing is shared between
//! connections.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods accept time as a parameter (no clock stored)
//! - Methods return `Vec<ConnectionAction>` describing what the driver must do
//! - The driver writes bytes, resolves futures, and reconnects as it sees fit
//!
//! Each pending request carries a caller-supplied token of type `T`: a oneshot
//! sender, a callback id, or `()` when the driver keeps its own bookkeeping.
//! The token is handed back in exactly one action: `Complete`, `TimedOut`, or
//! `Abandoned`.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────┐  close() / framing error  ┌────────┐
//! │ Open │──────────────────────────>│ Closed │
//! └──────┘                           └────────┘
//! ```
//!
//! A request whose deadline passes is removed by the next [`Connection::tick`]
//! or [`Connection::receive`].
//! A response arriving for it afterwards is discarded like any other frame
//! with an unknown correlation id.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use brokerwire_proto::{
    ApiRequest, DecodeOptions, Frame, ProtocolError, RequestHeader, Response, ResponseKind,
    encode_request, frame::DEFAULT_MAX_FRAME_SIZE,
};
use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::{
    error::{ConnectionError, Result},
    reader::FrameReader,
};

/// Actions returned by the connection state machine.
///
/// The driver executes these:
/// - `Send`: write the bytes to the transport
/// - `Complete` / `TimedOut` / `Abandoned`: resolve the request's token
/// - `Discarded`: log or count the dropped frame
/// - `Close`: tear down the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction<T> {
    /// Write an encoded request to the transport.
    Send {
        /// Correlation id assigned to the request.
        correlation_id: i32,
        /// Complete request, length prefix included.
        bytes: Bytes,
    },

    /// A response arrived for a pending request.
    Complete {
        /// Correlation id of the request.
        correlation_id: i32,
        /// Token registered with the request.
        token: T,
        /// Decoded body, or the error that stopped decoding.
        result: std::result::Result<Response, ProtocolError>,
    },

    /// A request passed its deadline without a response.
    TimedOut {
        /// Correlation id of the request.
        correlation_id: i32,
        /// Token registered with the request.
        token: T,
    },

    /// The connection closed with the request still pending.
    Abandoned {
        /// Correlation id of the request.
        correlation_id: i32,
        /// Token registered with the request.
        token: T,
    },

    /// A frame was dropped without affecting the connection.
    Discarded {
        /// Correlation id carried by the frame.
        correlation_id: i32,
        /// Why it was dropped.
        error: ConnectionError,
    },

    /// The connection can no longer be used.
    Close {
        /// Error that closed it.
        error: ConnectionError,
    },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepting requests and response bytes
    Open,
    /// Closed by the driver or by a framing error
    Closed,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Client id written into every request header
    pub client_id: String,
    /// Largest accepted response frame (bytes after the length prefix)
    pub max_frame_size: usize,
    /// How long a request may wait for its response
    pub request_timeout: Duration,
    /// Message set decoding options
    pub decode: DecodeOptions,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            client_id: "brokerwire".to_string(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            request_timeout: Duration::from_secs(30),
            decode: DecodeOptions::default(),
        }
    }
}

/// A request waiting for its response.
#[derive(Debug)]
struct PendingRequest<T> {
    /// Shape to decode the response body as
    kind: ResponseKind,
    /// When the request times out
    deadline: Instant,
    /// Caller's completion handle
    token: T,
}

/// Per-connection request/response state.
///
/// This is a pure state machine: no I/O, no clock. Time is passed to the
/// methods that need it.
#[derive(Debug)]
pub struct Connection<T = ()> {
    /// Current state
    state: ConnectionState,
    /// Configuration
    config: ConnectionConfig,
    /// Response frame reassembly
    reader: FrameReader,
    /// Requests waiting for a response, by correlation id
    pending: HashMap<i32, PendingRequest<T>>,
    /// Next correlation id to hand out
    next_correlation_id: i32,
}

impl<T> Connection<T> {
    /// Create an open connection.
    ///
    /// # Arguments
    /// * `config` - Connection configuration
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Open,
            reader: FrameReader::new(config.max_frame_size),
            config,
            pending: HashMap::new(),
            next_correlation_id: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of requests waiting for a response
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a request with this correlation id is waiting for a response
    pub fn is_pending(&self, correlation_id: i32) -> bool {
        self.pending.contains_key(&correlation_id)
    }

    /// Encode a request and register it as pending.
    ///
    /// Requests that expect no response (produce with `acks = 0`) are not
    /// registered and their token is dropped once the bytes are handed out.
    ///
    /// # Arguments
    /// * `request` - Request body
    /// * `token` - Handed back when the request completes, times out, or is
    ///   abandoned
    /// * `now` - Current time
    ///
    /// # Errors
    /// `InvalidState` if closed, `UnsupportedApi` if the response could not be
    /// decoded, `Encode` if the request does not fit the wire format
    pub fn send<R: ApiRequest>(
        &mut self,
        request: &R,
        token: T,
        now: Instant,
    ) -> Result<Vec<ConnectionAction<T>>> {
        self.ensure_open("send")?;

        let kind = if request.expects_response() {
            let kind = ResponseKind::lookup(R::API_KEY, R::API_VERSION)
                .map_err(ConnectionError::UnsupportedApi)?;
            Some(kind)
        } else {
            None
        };

        let correlation_id = self.allocate_correlation_id();
        let header = RequestHeader::for_request::<R>(correlation_id, self.config.client_id.as_str());
        let bytes = encode_request(&header, request).map_err(ConnectionError::Encode)?;

        if let Some(kind) = kind {
            let api_key = R::API_KEY;
            let deadline = now + self.config.request_timeout;
            self.pending.insert(correlation_id, PendingRequest { kind, deadline, token });
            debug!(correlation_id, %api_key, len = bytes.len(), "request pending");
        }

        Ok(vec![ConnectionAction::Send { correlation_id, bytes }])
    }

    /// Feed bytes from the transport.
    ///
    /// Requests whose deadline has passed by `now` time out first, so a frame
    /// arriving after the deadline is discarded even if `tick` has not run.
    /// Every frame the chunk completes is then matched to its pending request
    /// and decoded. Frames with an unknown correlation id are discarded. If the
    /// stream cannot be framed, the connection closes: pending requests are
    /// abandoned and a `Close` action is returned last.
    ///
    /// # Errors
    /// `InvalidState` if the connection is already closed
    pub fn receive(&mut self, chunk: &[u8], now: Instant) -> Result<Vec<ConnectionAction<T>>> {
        self.ensure_open("receive")?;

        let mut actions = self.tick(now);
        let (frames, failure) = self.reader.push(chunk);
        actions.reserve(frames.len());
        for frame in frames {
            let correlation_id = frame.correlation_id;
            match self.dispatch(frame) {
                Ok(action) => actions.push(action),
                Err(error) => {
                    warn!(correlation_id, %error, "discarding frame");
                    actions.push(ConnectionAction::Discarded { correlation_id, error });
                },
            }
        }

        if let Some(failure) = failure {
            error!(error = %failure, pending = self.pending.len(), "response stream unframeable");
            actions.extend(self.close());
            actions.push(ConnectionAction::Close { error: ConnectionError::Frame(failure) });
        }

        Ok(actions)
    }

    /// Match a complete frame to its pending request and decode it.
    ///
    /// # Errors
    /// `UnknownCorrelationId` if no request is waiting for this frame
    pub fn dispatch(&mut self, frame: Frame) -> Result<ConnectionAction<T>> {
        let correlation_id = frame.correlation_id;
        let pending = self
            .pending
            .remove(&correlation_id)
            .ok_or(ConnectionError::UnknownCorrelationId { correlation_id })?;

        let result = pending.kind.decode(&frame.body, &self.config.decode);
        match &result {
            Ok(_) => debug!(correlation_id, kind = ?pending.kind, "response decoded"),
            Err(error) => warn!(correlation_id, kind = ?pending.kind, %error, "response undecodable"),
        }

        Ok(ConnectionAction::Complete { correlation_id, token: pending.token, result })
    }

    /// Expire requests whose deadline has passed.
    ///
    /// Call this periodically. Expired requests are removed, so a response
    /// arriving later is discarded.
    pub fn tick(&mut self, now: Instant) -> Vec<ConnectionAction<T>> {
        let mut expired: Vec<i32> = self
            .pending
            .iter()
            .filter(|(_, pending)| now >= pending.deadline)
            .map(|(id, _)| *id)
            .collect();
        expired.sort_unstable();

        expired
            .into_iter()
            .filter_map(|correlation_id| {
                let pending = self.pending.remove(&correlation_id)?;
                warn!(correlation_id, kind = ?pending.kind, "request timed out");
                Some(ConnectionAction::TimedOut { correlation_id, token: pending.token })
            })
            .collect()
    }

    /// Transition to Closed state.
    ///
    /// Clears the reassembly buffer and abandons every pending request, in
    /// correlation id order. Closing twice returns nothing the second time.
    pub fn close(&mut self) -> Vec<ConnectionAction<T>> {
        self.state = ConnectionState::Closed;
        self.reader.reset();

        let mut abandoned: Vec<_> = self.pending.drain().collect();
        abandoned.sort_unstable_by_key(|(id, _)| *id);
        if !abandoned.is_empty() {
            debug!(count = abandoned.len(), "abandoning pending requests");
        }
        abandoned
            .into_iter()
            .map(|(correlation_id, pending)| ConnectionAction::Abandoned {
                correlation_id,
                token: pending.token,
            })
            .collect()
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        match self.state {
            ConnectionState::Open => Ok(()),
            state => Err(ConnectionError::InvalidState { state, operation }),
        }
    }

    /// Next non-negative correlation id not currently pending.
    fn allocate_correlation_id(&mut self) -> i32 {
        loop {
            let id = self.next_correlation_id;
            self.next_correlation_id = id.checked_add(1).unwrap_or(0);
            if !self.pending.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use brokerwire_proto::requests::{MetadataRequest, ProduceRequest};
    use bytes::BytesMut;

    use super::*;

    fn response_frame(correlation_id: i32, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        Frame::new(correlation_id, Bytes::copy_from_slice(body)).encode(&mut buf).unwrap();
        buf
    }

    /// Metadata v0 body with no brokers and no topics.
    const EMPTY_METADATA: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn connection_lifecycle() {
        let t0 = Instant::now();
        let mut conn: Connection<&str> = Connection::new(ConnectionConfig::default());
        assert_eq!(conn.state(), ConnectionState::Open);

        let actions = conn.send(&MetadataRequest::new(["a"]), "req", t0).unwrap();
        assert!(matches!(actions[0], ConnectionAction::Send { correlation_id: 0, .. }));
        assert!(conn.is_pending(0));

        let actions = conn.receive(&response_frame(0, &EMPTY_METADATA), t0).unwrap();
        assert_eq!(actions.len(), 1);
        let ConnectionAction::Complete { correlation_id, token, result } = &actions[0] else {
            panic!("expected completion, got {actions:?}");
        };
        assert_eq!((*correlation_id, *token), (0, "req"));
        assert_eq!(result.as_ref().map(Response::kind), Ok(ResponseKind::Metadata));
        assert_eq!(conn.pending_count(), 0);

        assert!(conn.close().is_empty());
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn send_encodes_with_client_id() {
        let config = ConnectionConfig { client_id: "!".to_string(), ..Default::default() };
        let mut conn: Connection = Connection::new(config);
        let actions = conn.send(&MetadataRequest::new(["11"]), (), Instant::now()).unwrap();
        let ConnectionAction::Send { bytes, .. } = &actions[0] else {
            panic!("expected send");
        };
        assert_eq!(
            bytes.as_ref(),
            &[0, 0, 0, 19, 0, 3, 0, 0, 0, 0, 0, 0, 0, 1, 33, 0, 0, 0, 1, 0, 2, 0x31, 0x31]
        );
    }

    #[test]
    fn unmatched_frame_is_discarded() {
        let t0 = Instant::now();
        let mut conn: Connection = Connection::new(ConnectionConfig::default());
        conn.send(&MetadataRequest::default(), (), t0).unwrap();

        let actions = conn.receive(&response_frame(42, &EMPTY_METADATA), t0).unwrap();
        assert_eq!(
            actions,
            vec![ConnectionAction::Discarded {
                correlation_id: 42,
                error: ConnectionError::UnknownCorrelationId { correlation_id: 42 },
            }]
        );
        assert_eq!(conn.state(), ConnectionState::Open);
        assert!(conn.is_pending(0));
    }

    #[test]
    fn timeout_removes_pending_request() {
        let t0 = Instant::now();
        let config =
            ConnectionConfig { request_timeout: Duration::from_secs(5), ..Default::default() };
        let mut conn: Connection<u8> = Connection::new(config);
        conn.send(&MetadataRequest::default(), 7, t0).unwrap();

        assert!(conn.tick(t0 + Duration::from_secs(4)).is_empty());
        let actions = conn.tick(t0 + Duration::from_secs(5));
        assert_eq!(actions, vec![ConnectionAction::TimedOut { correlation_id: 0, token: 7 }]);

        // Late response is not resurrected
        let actions = conn.receive(&response_frame(0, &EMPTY_METADATA), t0).unwrap();
        assert!(matches!(actions[0], ConnectionAction::Discarded { correlation_id: 0, .. }));
    }

    #[test]
    fn receive_expires_overdue_requests_before_dispatch() {
        let t0 = Instant::now();
        let config =
            ConnectionConfig { request_timeout: Duration::from_secs(5), ..Default::default() };
        let mut conn: Connection<u8> = Connection::new(config);
        conn.send(&MetadataRequest::default(), 1, t0).unwrap();
        conn.send(&MetadataRequest::default(), 2, t0 + Duration::from_secs(3)).unwrap();

        let mut chunk = response_frame(0, &EMPTY_METADATA);
        chunk.extend_from_slice(&response_frame(1, &EMPTY_METADATA));
        let actions = conn.receive(&chunk, t0 + Duration::from_secs(6)).unwrap();

        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], ConnectionAction::TimedOut { correlation_id: 0, token: 1 });
        assert!(matches!(actions[1], ConnectionAction::Discarded { correlation_id: 0, .. }));
        assert!(matches!(actions[2], ConnectionAction::Complete { correlation_id: 1, token: 2, .. }));
        assert_eq!(conn.pending_count(), 0);
    }

    #[test]
    fn framing_error_closes_and_abandons() {
        let t0 = Instant::now();
        let mut conn: Connection<char> = Connection::new(ConnectionConfig::default());
        conn.send(&MetadataRequest::default(), 'a', t0).unwrap();
        conn.send(&MetadataRequest::default(), 'b', t0).unwrap();

        let mut chunk = response_frame(1, &EMPTY_METADATA);
        chunk.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        let actions = conn.receive(&chunk, t0).unwrap();

        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], ConnectionAction::Complete { correlation_id: 1, token: 'b', .. }));
        assert_eq!(actions[1], ConnectionAction::Abandoned { correlation_id: 0, token: 'a' });
        assert!(matches!(
            &actions[2],
            ConnectionAction::Close { error } if error.is_fatal()
        ));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn closed_connection_rejects_operations() {
        let t0 = Instant::now();
        let mut conn: Connection = Connection::new(ConnectionConfig::default());
        conn.close();

        let expected =
            ConnectionError::InvalidState { state: ConnectionState::Closed, operation: "send" };
        assert_eq!(conn.send(&MetadataRequest::default(), (), t0), Err(expected));
        assert!(matches!(
            conn.receive(&[0, 0, 0, 4], t0),
            Err(ConnectionError::InvalidState { operation: "receive", .. })
        ));
        assert!(conn.tick(t0).is_empty());
    }

    #[test]
    fn fire_and_forget_produce_is_not_pending() {
        let mut conn: Connection = Connection::new(ConnectionConfig::default());
        let actions = conn.send(&ProduceRequest::new(0, 1000), (), Instant::now()).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(conn.pending_count(), 0);
    }

    #[test]
    fn correlation_ids_skip_pending_and_wrap() {
        let t0 = Instant::now();
        let mut conn: Connection = Connection::new(ConnectionConfig::default());
        conn.next_correlation_id = i32::MAX;
        conn.send(&MetadataRequest::default(), (), t0).unwrap();
        conn.send(&MetadataRequest::default(), (), t0).unwrap();
        assert!(conn.is_pending(i32::MAX));
        assert!(conn.is_pending(0));

        conn.next_correlation_id = i32::MAX;
        let actions = conn.send(&MetadataRequest::default(), (), t0).unwrap();
        assert!(matches!(actions[0], ConnectionAction::Send { correlation_id: 1, .. }));
    }

    #[test]
    fn decode_error_completes_with_error() {
        let t0 = Instant::now();
        let mut conn: Connection = Connection::new(ConnectionConfig::default());
        conn.send(&MetadataRequest::default(), (), t0).unwrap();

        let actions = conn.receive(&response_frame(0, &[0, 0, 0, 1]), t0).unwrap();
        assert!(matches!(
            &actions[0],
            ConnectionAction::Complete { result: Err(ProtocolError::TruncatedBuffer { .. }), .. }
        ));
        assert_eq!(conn.state(), ConnectionState::Open);
    }
}
