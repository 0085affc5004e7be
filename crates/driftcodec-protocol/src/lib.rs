//! Field-framed wire protocols for driftcodec.
//!
//! A struct on the wire is a sequence of `(field type, field id, value)`
//! tuples terminated by a STOP marker; containers carry an element-type and
//! count header followed by their elements. Two concrete byte layouts are
//! provided:
//! - [`binary`]: fixed-width big-endian fields
//! - [`compact`]: zig-zag varints with delta-encoded field ids
//!
//! Codecs never see the layout: they talk to [`ProtocolInput`] /
//! [`ProtocolOutput`], usually through the struct-scoped [`ProtocolReader`] and
//! [`ProtocolWriter`] cursors.

pub mod binary;
pub mod compact;
pub mod config;
pub mod error;
pub mod kind;
pub mod reader;
pub mod traits;
pub mod types;
pub mod util;
pub mod writer;

pub use binary::{BinaryInput, BinaryOutput};
pub use compact::{CompactInput, CompactOutput};
pub use config::{
    ProtocolConfig, DEFAULT_MAX_CONTAINER_SIZE, DEFAULT_MAX_SKIP_DEPTH, DEFAULT_MAX_STRING_SIZE,
};
pub use error::{ProtocolError, Result};
pub use kind::ProtocolKind;
pub use reader::ProtocolReader;
pub use traits::{ProtocolInput, ProtocolOutput};
pub use types::{
    FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, MessageKind, SetHeader,
};
pub use util::{describe, skip, transcode, WireField, WireValue};
pub use writer::ProtocolWriter;
