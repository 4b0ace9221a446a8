//! Frame reassembly.
//!
//! The transport delivers bytes in whatever chunks the network produced. A
//! chunk may hold part of a frame, exactly one frame, or several pipelined
//! frames with a partial one at the end. The [`FrameReader`] buffers chunks and
//! cuts complete frames out of them.
//!
//! # State Machine
//!
//! ```text
//!                 ≥4 bytes buffered           ≥length bytes buffered
//! ┌────────────────┐  valid length  ┌──────────────┐             ┌────────────┐
//! │ AwaitingLength │───────────────>│ AwaitingBody │────────────>│ FrameReady │
//! └────────────────┘                └──────────────┘             └────────────┘
//!        ↑   │ invalid length                                          │
//!        │   ↓                                                         │
//!        │ ┌────────┐                                                  │
//!        │ │ Failed │                          emit frame              │
//!        │ └────────┘                                                  │
//!        └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `FrameReady` is transient: [`FrameReader::poll_frame`] emits the frame and
//! is back in `AwaitingLength` before it returns. `Failed` is terminal; the
//! stream cannot be resynchronised once a length prefix is untrustworthy.

use brokerwire_proto::{
    Frame, ProtocolError,
    frame::{DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE},
};
use bytes::{Buf, BytesMut};
use tracing::trace;

/// Reassembly state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderState {
    /// Waiting for a complete length prefix.
    AwaitingLength,
    /// Length prefix consumed, waiting for the payload.
    AwaitingBody {
        /// Payload bytes still required in total (correlation id + body).
        length: usize,
    },
    /// An invalid length prefix was read; no further frames will be produced.
    Failed {
        /// The error that terminated the stream.
        error: ProtocolError,
    },
}

/// Cuts a chunked byte stream into frames.
#[derive(Debug)]
pub struct FrameReader {
    /// Bytes received but not yet emitted as frames
    buf: BytesMut,
    /// Current state
    state: ReaderState,
    /// Largest accepted length prefix
    max_frame_size: usize,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameReader {
    /// Create a reader accepting frames up to `max_frame_size` bytes after the
    /// length prefix.
    pub fn new(max_frame_size: usize) -> Self {
        Self { buf: BytesMut::new(), state: ReaderState::AwaitingLength, max_frame_size }
    }

    /// Current state.
    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    /// Bytes buffered but not yet part of an emitted frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Append a chunk from the transport. Ignored once the reader has failed.
    pub fn feed(&mut self, chunk: &[u8]) {
        if !matches!(self.state, ReaderState::Failed { .. }) {
            self.buf.extend_from_slice(chunk);
        }
    }

    /// Advance the state machine as far as the buffered bytes allow.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Once an invalid length
    /// has been read every call returns the same error.
    pub fn poll_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        loop {
            match self.state {
                ReaderState::Failed { ref error } => return Err(error.clone()),
                ReaderState::AwaitingLength => {
                    if self.buf.len() < LENGTH_PREFIX_SIZE {
                        return Ok(None);
                    }
                    let declared = self.buf.get_i32();
                    match Frame::validate_length(declared, self.max_frame_size) {
                        Ok(length) => self.state = ReaderState::AwaitingBody { length },
                        Err(error) => {
                            self.buf.clear();
                            self.state = ReaderState::Failed { error: error.clone() };
                            return Err(error);
                        },
                    }
                },
                ReaderState::AwaitingBody { length } => {
                    if self.buf.len() < length {
                        return Ok(None);
                    }
                    let payload = self.buf.split_to(length).freeze();
                    self.state = ReaderState::AwaitingLength;
                    let frame = Frame::from_payload(payload)?;
                    trace!(correlation_id = frame.correlation_id, len = length, "frame ready");
                    return Ok(Some(frame));
                },
            }
        }
    }

    /// Feed a chunk and collect every frame it completes.
    ///
    /// Frames completed before a failure are returned alongside it, so nothing
    /// that arrived intact is lost.
    pub fn push(&mut self, chunk: &[u8]) -> (Vec<Frame>, Option<ProtocolError>) {
        self.feed(chunk);
        let mut frames = Vec::new();
        for item in self.frames() {
            match item {
                Ok(frame) => frames.push(frame),
                Err(error) => return (frames, Some(error)),
            }
        }
        (frames, None)
    }

    /// Iterate over frames available from the buffered bytes.
    ///
    /// Ends when more bytes are needed, or after yielding the error that
    /// terminated the stream.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { reader: self, done: false }
    }

    /// Discard buffered bytes and return to `AwaitingLength`.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = ReaderState::AwaitingLength;
    }
}

/// Iterator over the frames currently available from a [`FrameReader`].
#[derive(Debug)]
pub struct Frames<'a> {
    reader: &'a mut FrameReader,
    done: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.poll_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            },
            Err(error) => {
                self.done = true;
                Some(Err(error))
            },
        }
    }
}

impl std::iter::FusedIterator for Frames<'_> {}
