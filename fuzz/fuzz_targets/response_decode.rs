//! Fuzz target for response body decoding.
//!
//! Every supported response shape must either decode or return an error for
//! arbitrary input. Decoding the same bytes twice must agree.

#![no_main]

use brokerwire_proto::{DecodeOptions, ResponseKind};
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = Bytes::copy_from_slice(data);
    let options = DecodeOptions { verify_crc: true, ..DecodeOptions::default() };

    for kind in [ResponseKind::Fetch, ResponseKind::Metadata, ResponseKind::Produce] {
        let first = kind.decode(&body, &options);
        let second = kind.decode(&body, &options);
        assert_eq!(first, second);
    }
});
