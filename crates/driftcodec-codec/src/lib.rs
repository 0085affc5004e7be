//! Codecs for driftcodec.
//!
//! [`CodecManager`] hands out a [`ThriftCodec`] per [`ThriftType`](driftcodec_metadata::ThriftType):
//! fixed codecs for scalars, composed codecs for containers, enums and
//! coercions, and derived codecs for structs and unions built from catalog
//! metadata, either interpreted ([`CodecStrategy::Reflective`]) or
//! specialized per type ([`CodecStrategy::Compiled`], the default). Both
//! strategies produce identical bytes and identical decoded instances.
//!
//! Decoding is tolerant of schema drift: unknown fields are skipped, missing
//! fields keep their zero value, and unknown enum constants are dropped.

pub mod codec;
pub mod coercion;
pub mod compiler;
pub mod config;
pub mod container;
pub mod enums;
pub mod error;
mod internal;
pub mod manager;
pub mod primitive;
pub mod reflective;

pub use codec::{CodecRef, ErasedCodec, StructCodecHandle, ThriftCodec, TypedCodec};
pub use coercion::CoercionCodec;
pub use compiler::{CodecCompiler, CompiledStructCodec, CompiledUnionCodec};
pub use config::{CodecConfig, CodecStrategy};
pub use container::{ListCodec, MapCodec, SetCodec};
pub use enums::EnumCodec;
pub use error::{CodecError, Result};
pub use manager::CodecManager;
pub use primitive::PrimitiveCodec;
pub use reflective::{ReflectiveStructCodec, ReflectiveUnionCodec};
