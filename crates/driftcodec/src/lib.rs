//! Schema-evolution tolerant Thrift serialization for native Rust types.
//!
//! Types describe their fields once; driftcodec derives validated metadata,
//! builds a codec per type and reads/writes the field-framed binary and
//! compact layouts. Readers and writers built from different versions of a
//! type interoperate: unknown fields are skipped, missing fields keep their
//! zero value, unknown enum constants are dropped.
//!
//! # Crate Structure
//!
//! - [`protocol`]: Wire types, binary and compact layouts, schema-less skip/transcode
//! - [`metadata`]: Type descriptions, value model and the metadata catalog
//! - [`codec`]: Codecs and the codec registry
//!
//! ```
//! use driftcodec::metadata::{Construction, Describe, FieldDescription, StructDescription, TypeRef};
//! use driftcodec::{deserialize, serialize, CodecManager, ProtocolKind};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Widget {
//!     name: String,
//!     count: i32,
//! }
//!
//! impl Describe for Widget {
//!     fn describe() -> StructDescription {
//!         StructDescription::structure::<Widget>("Widget")
//!             .constructor(Construction::default_of::<Widget>())
//!             .field(
//!                 FieldDescription::new(1, "name", TypeRef::String)
//!                     .setter(|w: &mut Widget, v: String| w.name = v)
//!                     .getter(|w: &Widget| Some(w.name.clone())),
//!             )
//!             .field(
//!                 FieldDescription::new(2, "count", TypeRef::I32)
//!                     .setter(|w: &mut Widget, v: i32| w.count = v)
//!                     .getter(|w: &Widget| Some(w.count)),
//!             )
//!     }
//! }
//!
//! let manager = CodecManager::new();
//! let widget = Widget { name: "widget".into(), count: 7 };
//! let bytes = serialize(&manager, &widget, ProtocolKind::Compact)?;
//! let decoded: Widget = deserialize(&manager, bytes, ProtocolKind::Compact)?;
//! assert_eq!(decoded, widget);
//! # Ok::<(), driftcodec::CodecError>(())
//! ```

use bytes::Bytes;

/// Re-export protocol types.
pub mod protocol {
    pub use driftcodec_protocol::*;
}

/// Re-export metadata types.
pub mod metadata {
    pub use driftcodec_metadata::*;
}

/// Re-export codec types.
pub mod codec {
    pub use driftcodec_codec::*;
}

pub use driftcodec_codec::{
    CodecConfig, CodecError, CodecManager, CodecStrategy, StructCodecHandle, ThriftCodec,
};
pub use driftcodec_metadata::{Describe, DescribeEnum, ThriftCatalog};
pub use driftcodec_protocol::ProtocolKind;

/// Encode `value` as a standalone struct in the `kind` layout.
pub fn serialize<T: Describe>(
    manager: &CodecManager,
    value: &T,
    kind: ProtocolKind,
) -> Result<Bytes, CodecError> {
    manager.typed::<T>()?.encode(value, kind)
}

/// Decode a standalone struct in the `kind` layout.
pub fn deserialize<T: Describe>(
    manager: &CodecManager,
    bytes: impl Into<Bytes>,
    kind: ProtocolKind,
) -> Result<T, CodecError> {
    manager.typed::<T>()?.decode(bytes, kind)
}

#[cfg(test)]
mod tests {
    use super::metadata::{Construction, FieldDescription, StructDescription, TypeRef};
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Ping {
        seq: i64,
    }

    impl Describe for Ping {
        fn describe() -> StructDescription {
            StructDescription::structure::<Ping>("Ping")
                .constructor(Construction::default_of::<Ping>())
                .field(
                    FieldDescription::new(1, "seq", TypeRef::I64)
                        .setter(|p: &mut Ping, v: i64| p.seq = v)
                        .getter(|p: &Ping| Some(p.seq)),
                )
        }
    }

    #[test]
    fn helpers_roundtrip() {
        let manager = CodecManager::new();
        for kind in [ProtocolKind::Binary, ProtocolKind::Compact] {
            let bytes = serialize(&manager, &Ping { seq: 41 }, kind).unwrap();
            let ping: Ping = deserialize(&manager, bytes, kind).unwrap();
            assert_eq!(ping, Ping { seq: 41 });
        }
    }

    #[test]
    fn binary_layout_is_stable() {
        let manager = CodecManager::new();
        let bytes = serialize(&manager, &Ping { seq: 1 }, ProtocolKind::Binary).unwrap();
        // i64 field header, big-endian value, STOP
        assert_eq!(
            bytes.as_ref(),
            [0x0a, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x00]
        );
    }
}
