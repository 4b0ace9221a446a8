//! Fuzz target for message set decoding, nested compression included.

#![no_main]

use brokerwire_proto::{DecodeOptions, decode_message_set};
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let region = Bytes::copy_from_slice(data);
    let set = decode_message_set(&region, &DecodeOptions::default());

    assert!(set.discarded <= region.len());
    assert_eq!(set.size as usize, region.len());
});
