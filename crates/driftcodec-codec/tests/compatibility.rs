mod common;

use bytes::Bytes;
use common::{manager, sample_order, Account, Marked, Order, Status, Widget, STRATEGIES};
use driftcodec_codec::{CodecConfig, CodecError, CodecManager, CodecStrategy};
use driftcodec_protocol::{FieldType, ListHeader, ProtocolError, ProtocolKind, ProtocolWriter};

const KINDS: [ProtocolKind; 2] = [ProtocolKind::Binary, ProtocolKind::Compact];

fn payload(kind: ProtocolKind, write: impl FnOnce(&mut ProtocolWriter<'_>)) -> Bytes {
    let mut output = kind.output();
    {
        let mut writer = ProtocolWriter::new(output.as_mut());
        writer.write_struct_begin("Payload").unwrap();
        write(&mut writer);
        writer.write_struct_end().unwrap();
    }
    output.take_bytes()
}

#[test]
fn trailing_unknown_field_is_skipped() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Widget>().unwrap();
        for kind in KINDS {
            let bytes = payload(kind, |w| {
                w.write_string_field("name", 1, "widget").unwrap();
                w.write_i32_field("count", 2, 7).unwrap();
                w.write_bool_field("extra", 99, true).unwrap();
            });
            assert_eq!(
                codec.decode(bytes, kind).unwrap(),
                Widget {
                    name: "widget".into(),
                    count: 7
                }
            );
        }
    }
}

#[test]
fn unknown_nested_struct_is_skipped() {
    let manager = manager(CodecStrategy::Compiled);
    let codec = manager.typed::<Widget>().unwrap();
    let bytes = payload(ProtocolKind::Compact, |w| {
        w.write_field_with::<driftcodec_protocol::ProtocolError, _>(
            "future",
            40,
            FieldType::Struct,
            |output| {
                let mut nested = ProtocolWriter::new(output);
                nested.write_struct_begin("Future")?;
                nested.write_i64_field("a", 1, 1)?;
                nested.write_struct_end()
            },
        )
        .unwrap();
        w.write_i32_field("count", 2, 3).unwrap();
    });
    let widget = codec.decode(bytes, ProtocolKind::Compact).unwrap();
    assert_eq!(widget.count, 3);
    assert_eq!(widget.name, "");
}

#[test]
fn missing_fields_keep_zero_values() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Widget>().unwrap();
        let bytes = payload(ProtocolKind::Binary, |w| {
            w.write_i32_field("count", 2, 11).unwrap();
        });
        assert_eq!(
            codec.decode(bytes, ProtocolKind::Binary).unwrap(),
            Widget {
                name: String::new(),
                count: 11
            }
        );
    }
}

#[test]
fn mismatched_wire_type_is_skipped() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Widget>().unwrap();
        let bytes = payload(ProtocolKind::Binary, |w| {
            w.write_i64_field("name", 1, 12).unwrap();
            w.write_i32_field("count", 2, 1).unwrap();
        });
        let widget = codec.decode(bytes, ProtocolKind::Binary).unwrap();
        assert_eq!(widget.name, "");
        assert_eq!(widget.count, 1);
    }
}

#[test]
fn void_fields_are_skipped_on_decode() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Marked>().unwrap();
        let bytes = codec.encode(&Marked { count: 7 }, ProtocolKind::Binary).unwrap();
        assert_eq!(
            bytes.as_ref(),
            [0x01, 0x00, 0x01, 0x08, 0x00, 0x02, 0, 0, 0, 0x07, 0x00]
        );
        assert_eq!(
            codec.decode(bytes.clone(), ProtocolKind::Binary).unwrap(),
            Marked { count: 7 }
        );

        let widget = manager
            .typed::<Widget>()
            .unwrap()
            .decode(bytes, ProtocolKind::Binary)
            .unwrap();
        assert_eq!(widget.count, 7);
    }
}

#[test]
fn void_fields_cannot_be_written_compact() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Marked>().unwrap();
        assert!(matches!(
            codec.encode(&Marked { count: 7 }, ProtocolKind::Compact),
            Err(CodecError::Protocol(ProtocolError::UnsupportedType {
                field_type: FieldType::Void,
                ..
            }))
        ));
    }
}

#[test]
fn required_field_enforcement() {
    let bytes = payload(ProtocolKind::Binary, |w| {
        w.write_i64_field("balance", 2, 100).unwrap();
    });

    for strategy in STRATEGIES {
        let strict = manager(strategy);
        let err = strict
            .typed::<Account>()
            .unwrap()
            .decode(bytes.clone(), ProtocolKind::Binary)
            .unwrap_err();
        assert!(
            matches!(err, CodecError::MissingRequiredField { ref field, id: 1, .. } if field == "owner"),
            "{err}"
        );

        let lenient = CodecManager::with_config(CodecConfig {
            strategy,
            enforce_required_fields: false,
        });
        let account = lenient
            .typed::<Account>()
            .unwrap()
            .decode(bytes.clone(), ProtocolKind::Binary)
            .unwrap();
        assert_eq!(
            account,
            Account {
                owner: String::new(),
                balance: 100
            }
        );
    }
}

#[test]
fn unknown_enum_value_is_dropped() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Order>().unwrap();
        let bytes = payload(ProtocolKind::Compact, |w| {
            w.write_i64_field("id", 1, 1).unwrap();
            w.write_i32_field("status", 2, 42).unwrap();
        });
        let order = codec.decode(bytes, ProtocolKind::Compact).unwrap();
        assert_eq!(order.id, 1);
        assert_eq!(order.status, Status::default());
    }
}

#[test]
fn unknown_enum_values_are_dropped_from_lists() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Order>().unwrap();
        let bytes = payload(ProtocolKind::Binary, |w| {
            w.write_i64_field("id", 1, 5).unwrap();
            w.write_field_with::<driftcodec_protocol::ProtocolError, _>(
                "history",
                6,
                FieldType::List,
                |output| {
                    output.write_list_begin(ListHeader::new(FieldType::I32, 4))?;
                    for value in [0, 7, 2, -1] {
                        output.write_i32(value)?;
                    }
                    output.write_list_end()
                },
            )
            .unwrap();
        });
        let order = codec.decode(bytes, ProtocolKind::Binary).unwrap();
        assert_eq!(order.id, 5);
        assert_eq!(order.history, vec![Status::Pending, Status::Delivered]);
    }
}

#[test]
fn container_element_type_mismatch_is_an_error() {
    let manager = manager(CodecStrategy::Compiled);
    let codec = manager.typed::<Order>().unwrap();
    let bytes = payload(ProtocolKind::Binary, |w| {
        w.write_field_with::<driftcodec_protocol::ProtocolError, _>(
            "tags",
            5,
            FieldType::Set,
            |output| {
                output.write_set_begin(ListHeader::new(FieldType::I64, 1))?;
                output.write_i64(9)?;
                output.write_set_end()
            },
        )
        .unwrap();
    });
    let err = codec.decode(bytes, ProtocolKind::Binary).unwrap_err();
    assert!(matches!(err, CodecError::Protocol(_)), "{err}");
}

#[test]
fn truncated_payload_is_a_protocol_error() {
    let manager = manager(CodecStrategy::Compiled);
    let codec = manager.typed::<Order>().unwrap();
    let bytes = codec.encode(&sample_order(), ProtocolKind::Binary).unwrap();
    let truncated = bytes.slice(..bytes.len() - 3);
    let err = codec.decode(truncated, ProtocolKind::Binary).unwrap_err();
    assert!(matches!(err, CodecError::Protocol(_)), "{err}");
}

#[test]
fn strategies_produce_identical_bytes() {
    let compiled = manager(CodecStrategy::Compiled);
    let reflective = manager(CodecStrategy::Reflective);
    let order = sample_order();
    for kind in KINDS {
        let a = compiled
            .typed::<Order>()
            .unwrap()
            .encode(&order, kind)
            .unwrap();
        let b = reflective
            .typed::<Order>()
            .unwrap()
            .encode(&order, kind)
            .unwrap();
        assert_eq!(a, b, "{kind}");

        let decoded = reflective
            .typed::<Order>()
            .unwrap()
            .decode(a, kind)
            .unwrap();
        assert_eq!(decoded, order);
    }
}

mod arbitrary_input {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn decoding_garbage_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            for strategy in STRATEGIES {
                let manager = manager(strategy);
                let codec = manager.typed::<Order>().unwrap();
                for kind in KINDS {
                    let _ = codec.decode(Bytes::from(bytes.clone()), kind);
                }
            }
        }

        #[test]
        fn truncations_of_valid_payloads_fail_cleanly(cut in 0usize..64) {
            let manager = manager(CodecStrategy::Compiled);
            let codec = manager.typed::<Order>().unwrap();
            let bytes = codec.encode(&sample_order(), ProtocolKind::Compact).unwrap();
            let cut = cut.min(bytes.len().saturating_sub(1));
            let truncated = bytes.slice(..cut);
            prop_assert!(codec.decode(truncated, ProtocolKind::Compact).is_err());
        }
    }
}
