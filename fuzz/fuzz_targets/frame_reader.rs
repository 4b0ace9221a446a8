//! Fuzz target for frame reassembly.
//!
//! The first byte picks a chunk size; the rest is the stream. Whatever the
//! chunking, the reader must produce the same frames it produces when given
//! the whole stream at once, and must never panic.

#![no_main]

use brokerwire_core::FrameReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&chunk, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk).max(1);

    let mut whole = FrameReader::new(1 << 16);
    let (expected, expected_error) = whole.push(stream);

    let mut split = FrameReader::new(1 << 16);
    let mut frames = Vec::new();
    let mut error = None;
    for piece in stream.chunks(chunk) {
        let (mut got, failure) = split.push(piece);
        frames.append(&mut got);
        if failure.is_some() {
            error = failure;
            break;
        }
    }

    assert_eq!(frames, expected);
    assert_eq!(error, expected_error);
});
