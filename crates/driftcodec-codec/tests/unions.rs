mod common;

use bytes::Bytes;
use common::{manager, Choice, Event, Widget, STRATEGIES};
use driftcodec_codec::CodecError;
use driftcodec_protocol::{ProtocolKind, ProtocolWriter};

fn payload(write: impl FnOnce(&mut ProtocolWriter<'_>)) -> Bytes {
    let mut output = ProtocolKind::Binary.output();
    {
        let mut writer = ProtocolWriter::new(output.as_mut());
        writer.write_struct_begin("Payload").unwrap();
        write(&mut writer);
        writer.write_struct_end().unwrap();
    }
    output.take_bytes()
}

#[test]
fn enum_union_roundtrips_each_variant() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Event>().unwrap();
        let events = [
            Event::Created(Widget {
                name: "gear".into(),
                count: 12,
            }),
            Event::Deleted(77),
            Event::Renamed("cog".into()),
        ];
        for event in events {
            for kind in [ProtocolKind::Binary, ProtocolKind::Compact] {
                let bytes = codec.encode(&event, kind).unwrap();
                assert_eq!(codec.decode(bytes, kind).unwrap(), event, "{strategy:?}");
            }
        }
    }
}

#[test]
fn encoding_emits_exactly_the_active_field() {
    let manager = manager(driftcodec_codec::CodecStrategy::Compiled);
    let codec = manager.typed::<Event>().unwrap();
    let bytes = codec
        .encode(&Event::Deleted(5), ProtocolKind::Binary)
        .unwrap();
    let tree = driftcodec_protocol::describe(
        ProtocolKind::Binary.input(bytes).as_mut(),
        driftcodec_protocol::FieldType::Struct,
        64,
    )
    .unwrap();
    let driftcodec_protocol::WireValue::Struct(fields) = tree else {
        panic!("expected a struct");
    };
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].id, 2);
}

#[test]
fn active_field_without_value_is_an_error() {
    let unset = Choice {
        active: 2,
        ..Choice::default()
    };
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Choice>().unwrap();
        assert!(matches!(
            codec.encode(&unset, ProtocolKind::Binary),
            Err(CodecError::EmptyUnionField { field, id: 2, .. }) if field == "number"
        ));
    }
}

#[test]
fn two_fields_are_rejected() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Event>().unwrap();
        let bytes = payload(|w| {
            w.write_i64_field("deleted", 2, 1).unwrap();
            w.write_string_field("renamed", 3, "x").unwrap();
        });
        let err = codec.decode(bytes, ProtocolKind::Binary).unwrap_err();
        assert!(
            matches!(err, CodecError::UnionFieldCount { count: 2, .. }),
            "{err}"
        );
    }
}

#[test]
fn unknown_fields_do_not_count() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Event>().unwrap();
        let bytes = payload(|w| {
            w.write_i64_field("deleted", 2, 9).unwrap();
            w.write_bool_field("future", 50, true).unwrap();
        });
        assert_eq!(
            codec.decode(bytes, ProtocolKind::Binary).unwrap(),
            Event::Deleted(9)
        );
    }
}

#[test]
fn empty_union_without_constructor_is_an_error() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Event>().unwrap();
        let err = codec
            .decode(payload(|_| {}), ProtocolKind::Binary)
            .unwrap_err();
        assert!(matches!(err, CodecError::EmptyUnion { .. }), "{err}");
    }
}

#[test]
fn struct_shaped_union_tracks_the_active_field() {
    for strategy in STRATEGIES {
        let manager = manager(strategy);
        let codec = manager.typed::<Choice>().unwrap();

        let choice = Choice {
            active: 2,
            text: None,
            number: Some(-3),
        };
        let bytes = codec.encode(&choice, ProtocolKind::Compact).unwrap();
        assert_eq!(codec.decode(bytes, ProtocolKind::Compact).unwrap(), choice);

        let empty = codec
            .decode(payload(|_| {}), ProtocolKind::Binary)
            .unwrap();
        assert_eq!(empty, Choice::default());

        let bytes = codec
            .encode(&Choice::default(), ProtocolKind::Binary)
            .unwrap();
        assert_eq!(bytes, payload(|_| {}));
    }
}
