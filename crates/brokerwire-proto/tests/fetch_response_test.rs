//! Fetch response decoding tests.
//!
//! Each fixture is a complete frame as a broker would send it: length prefix,
//! correlation id, then the fetch body.

use brokerwire_proto::{
    DecodeOptions, Frame, Message, MessageSetEncoder, ProtocolError, Record, ResponseKind,
    compression::Compression,
    responses::FetchResponse,
};
use bytes::{BufMut, Bytes, BytesMut};
use hex_literal::hex;
use proptest::prelude::*;

/// Strip the length prefix, check it, and split off the correlation id.
fn frame(wire: &[u8]) -> Frame {
    let (length, payload) = wire.split_at(4);
    let length = i32::from_be_bytes([length[0], length[1], length[2], length[3]]);
    assert_eq!(length as usize, payload.len(), "fixture length prefix");
    Frame::from_payload(Bytes::copy_from_slice(payload)).unwrap()
}

fn decode_fetch(frame: &Frame) -> FetchResponse {
    ResponseKind::Fetch
        .decode(&frame.body, &DecodeOptions::default())
        .unwrap()
        .into_fetch()
        .unwrap()
}

#[test]
fn empty_topic_list() {
    let frame = frame(&hex!("00000008 00000003 00000000"));
    assert_eq!(frame.correlation_id, 3);
    assert!(decode_fetch(&frame).topics.is_empty());
}

#[test]
fn topics_with_empty_partitions() {
    let frame = frame(&hex!(
        "00000017 00000007 00000002"
        "0001 21 00000000"
        "0002 2121 00000000"
    ));
    assert_eq!(frame.correlation_id, 7);

    let response = decode_fetch(&frame);
    assert_eq!(response.topics.len(), 2);
    assert_eq!(response.topics[0].name, "!");
    assert_eq!(response.topics[1].name, "!!");
    assert!(response.topics.iter().all(|t| t.partitions.is_empty()));
}

#[test]
fn partitions_with_empty_message_sets() {
    let frame = frame(&hex!(
        "00000033 00000009 00000001"
        "0001 21 00000002"
        "00000000 0001 0000000000000002 00000000"
        "00000001 0000 0000000000000009 00000000"
    ));
    assert_eq!(frame.correlation_id, 9);

    let response = decode_fetch(&frame);
    let partitions = &response.topics[0].partitions;
    assert_eq!(partitions.len(), 2);

    let (first, second) = (&partitions[0], &partitions[1]);
    assert_eq!((first.id, first.error_code), (0, 1));
    assert_eq!(first.high_watermark_offset.to_string(), "2");
    assert_eq!((second.id, second.error_code), (1, 0));
    assert_eq!(second.high_watermark_offset.to_string(), "9");
    for partition in partitions {
        assert_eq!(partition.message_set.size, 0);
        assert!(partition.message_set.messages.is_empty());
    }

    insta::assert_debug_snapshot!(first, @r#"
    PartitionResponse {
        id: 0,
        error_code: 1,
        high_watermark_offset: 2,
        message_set: MessageSet {
            size: 0,
            messages: [],
            failures: [],
            discarded: 0,
        },
    }
    "#);
}

#[test]
fn message_set_with_one_message() {
    let frame = frame(&hex!(
        "00000041 00000009 00000001"
        "0001 21 00000001"
        "00000000 0001 0000000000000002 00000020"
        "0000000000000001 00000014"
        "00000000 00 00 ffffffff 00000006 212122222323"
    ));
    assert_eq!(frame.correlation_id, 9);

    let response = decode_fetch(&frame);
    let partition = &response.topics[0].partitions[0];
    assert_eq!(partition.message_set.size, 32);
    assert_eq!(partition.message_set.messages.len(), 1);

    let message = &partition.message_set.messages[0];
    assert_eq!(message.offset.to_string(), "1");
    assert_eq!(message.key, None);
    assert_eq!(message.value.as_deref(), Some(&[0x21, 0x21, 0x22, 0x22, 0x23, 0x23][..]));
}

#[test]
fn trailing_partial_message_is_dropped() {
    // messageSetSize covers one full message plus the first 10 bytes of a
    // second one, as brokers do when the byte budget runs out mid-record.
    let frame = frame(&hex!(
        "0000004b 00000001 00000001"
        "0001 21 00000001"
        "00000000 0000 0000000000000002 0000002a"
        "0000000000000001 00000014"
        "00000000 00 00 ffffffff 00000006 212122222323"
        "0000000000000002 0000"
    ));
    let response = decode_fetch(&frame);
    let set = &response.topics[0].partitions[0].message_set;
    assert_eq!(set.size, 42);
    assert_eq!(set.messages.len(), 1);
    assert!(set.failures.is_empty());
    assert_eq!(set.discarded, 10);
}

#[test]
fn compressed_message_sets_are_flattened() {
    let records = [Record::value("one"), Record::keyed("k", "two"), Record::value("three")];
    for codec in [Compression::Gzip, Compression::Snappy] {
        let set = MessageSetEncoder::new(codec).with_base_offset(100).encode(&records).unwrap();

        let mut body = BytesMut::new();
        body.put_i32(1);
        body.put_i16(1);
        body.put_slice(b"t");
        body.put_i32(1);
        body.put_i32(0);
        body.put_i16(0);
        body.put_i64(103);
        body.put_i32(set.len() as i32);
        body.put_slice(&set);

        let options = DecodeOptions { verify_crc: true, ..DecodeOptions::default() };
        let response = ResponseKind::Fetch.decode(&body.freeze(), &options).unwrap();
        let response = response.into_fetch().unwrap();
        let messages: &[Message] = &response.topics[0].partitions[0].message_set.messages;

        let offsets: Vec<_> = messages.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, [100, 101, 102], "{codec:?}");
        assert_eq!(messages[1].key.as_deref(), Some(&b"k"[..]));
        assert_eq!(messages[2].value.as_deref(), Some(&b"three"[..]));
    }
}

#[test]
fn truncated_fixed_field_fails_the_decode() {
    let frame = frame(&hex!("0000000d 00000001 00000001 0001 21 0000"));
    let result = ResponseKind::Fetch.decode(&frame.body, &DecodeOptions::default());
    assert!(matches!(result, Err(ProtocolError::TruncatedBuffer { .. })));
}

#[test]
fn decoding_twice_gives_equal_results() {
    let frame = frame(&hex!(
        "00000041 00000009 00000001"
        "0001 21 00000001"
        "00000000 0001 0000000000000002 00000020"
        "0000000000000001 00000014"
        "00000000 00 00 ffffffff 00000006 212122222323"
    ));
    let first: FetchResponse = decode_fetch(&frame);
    let second: FetchResponse = decode_fetch(&frame);
    assert_eq!(first, second);
    assert_eq!(first.topics[0].partitions[0].message_set.messages.len(), 1);
}

proptest! {
    /// Arbitrary bodies either decode or fail cleanly.
    #[test]
    fn prop_arbitrary_body_never_panics(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let options = DecodeOptions { verify_crc: true, ..DecodeOptions::default() };
        let body = Bytes::from(body);
        for kind in [ResponseKind::Fetch, ResponseKind::Metadata, ResponseKind::Produce] {
            let _ = kind.decode(&body, &options);
        }
    }

    /// Message set regions are never read past their declared size.
    #[test]
    fn prop_message_set_consumes_within_region(
        values in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 1..8),
        cut in 0usize..64,
    ) {
        let records: Vec<_> = values.into_iter().map(Record::value).collect();
        let full = MessageSetEncoder::default().encode(&records).unwrap();
        let keep = full.len().saturating_sub(cut);
        let set = brokerwire_proto::decode_message_set(&full.slice(..keep), &DecodeOptions::default());

        prop_assert!(set.failures.is_empty());
        prop_assert!(set.messages.len() <= records.len());
        prop_assert!(set.discarded <= keep);
        if cut == 0 {
            prop_assert_eq!(set.messages.len(), records.len());
            prop_assert_eq!(set.discarded, 0);
        }
    }
}
