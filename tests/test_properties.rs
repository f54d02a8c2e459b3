//! Property-based tests for the wire protocol and builder pool invariants

use proptest::prelude::*;

use kvlink::pool::OperationBuilderPool;
use kvlink::protocol::{
    HEADER_LEN, OpCode, REQUEST_MAGIC, Request, ResponseHeader, Status, decode_rows, encode_rows,
};

fn arb_opcode() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::Get),
        Just(OpCode::Upsert),
        Just(OpCode::Remove),
        Just(OpCode::Noop),
        Just(OpCode::Hello),
        Just(OpCode::SelectBucket),
        Just(OpCode::Query),
    ]
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Success),
        Just(Status::KeyNotFound),
        Just(Status::KeyExists),
        Just(Status::ValueTooLarge),
        Just(Status::InvalidArguments),
        Just(Status::NotStored),
        Just(Status::UnknownCommand),
        Just(Status::Busy),
        Just(Status::TemporaryFailure),
    ]
}

proptest! {
    #[test]
    fn response_header_round_trips(
        opcode in arb_opcode(),
        status in arb_status(),
        key_len in 0u16..=512,
        extras_len in 0u8..=32,
        extra_value in 0u32..=4096,
        opaque in any::<u32>(),
        cas in any::<u64>(),
    ) {
        let header = ResponseHeader {
            opcode,
            status,
            key_len,
            extras_len,
            // Body always covers extras + key
            body_len: u32::from(key_len) + u32::from(extras_len) + extra_value,
            opaque,
            cas,
        };

        let raw = header.to_bytes();
        prop_assert_eq!(raw.len(), HEADER_LEN);
        prop_assert_eq!(ResponseHeader::parse(&raw).unwrap(), header);
    }

    #[test]
    fn status_wire_values_round_trip(value in any::<u16>()) {
        let status = Status::from_u16(value);
        prop_assert_eq!(status.as_u16(), value);
    }

    #[test]
    fn request_encoding_is_consistent(
        opcode in arb_opcode(),
        partition in any::<u16>(),
        opaque in any::<u32>(),
        cas in any::<u64>(),
        extras in proptest::collection::vec(any::<u8>(), 0..=64),
        key in proptest::collection::vec(any::<u8>(), 0..=250),
        value in proptest::collection::vec(any::<u8>(), 0..=2048),
    ) {
        let pool = OperationBuilderPool::new(1024 * 1024, 4);
        let mut builder = pool.rent(64);

        let request = Request {
            opcode,
            partition,
            opaque,
            cas,
            extras: &extras,
            key: &key,
            value: &value,
        };
        request.encode_into(&mut builder).unwrap();

        // Encoded frame has the advertised length and layout
        prop_assert_eq!(builder.len(), request.encoded_len());
        prop_assert_eq!(builder[0], REQUEST_MAGIC);
        prop_assert_eq!(builder[1], opcode.as_u8());
        prop_assert_eq!(
            u16::from_be_bytes([builder[2], builder[3]]) as usize,
            key.len()
        );
        prop_assert_eq!(builder[4] as usize, extras.len());
        prop_assert_eq!(
            u32::from_be_bytes([builder[8], builder[9], builder[10], builder[11]]) as usize,
            extras.len() + key.len() + value.len()
        );

        // Body sections appear in extras / key / value order
        let body = &builder[HEADER_LEN..];
        prop_assert_eq!(&body[..extras.len()], &extras[..]);
        prop_assert_eq!(&body[extras.len()..extras.len() + key.len()], &key[..]);
        prop_assert_eq!(&body[extras.len() + key.len()..], &value[..]);
    }

    #[test]
    fn rows_round_trip(
        rows in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..=128),
            0..=16,
        )
    ) {
        let encoded = encode_rows(&rows);
        prop_assert_eq!(decode_rows(&encoded).unwrap(), rows);
    }

    #[test]
    fn builder_pool_never_exceeds_retention_limit(
        max_retained in 1usize..=8,
        rent_counts in proptest::collection::vec(1usize..=16, 1..=8),
    ) {
        let pool = OperationBuilderPool::new(64 * 1024, max_retained);

        for count in rent_counts {
            let builders: Vec<_> = (0..count).map(|_| pool.rent(256)).collect();
            prop_assert!(pool.retained() <= max_retained);
            drop(builders);
            prop_assert!(pool.retained() <= max_retained);
        }
    }

    #[test]
    fn oversized_builders_are_never_retained(
        oversize in (64 * 1024 + 1)..=(256 * 1024usize),
    ) {
        let pool = OperationBuilderPool::new(64 * 1024, 8);

        let mut builder = pool.rent(64);
        builder.resize(oversize, 0);
        let before = pool.retained();
        drop(builder);

        // Returning an oversized builder must not grow the retained set
        prop_assert_eq!(pool.retained(), before);
    }
}
