use std::fmt;

use crate::error::{ProtocolError, Result};

/// Wire-level type tag carried by field, element and key/value headers.
///
/// Strings and binary share the `String` tag; only the codec layer knows which
/// one a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl FieldType {
    /// Decode a type tag as used by the binary layout.
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Stop,
            1 => Self::Void,
            2 => Self::Bool,
            3 => Self::Byte,
            4 => Self::Double,
            6 => Self::I16,
            8 => Self::I32,
            10 => Self::I64,
            11 => Self::String,
            12 => Self::Struct,
            13 => Self::Map,
            14 => Self::Set,
            15 => Self::List,
            other => return Err(ProtocolError::InvalidFieldType(other)),
        })
    }

    /// The binary-layout type tag.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Double => "double",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::String => "string",
            Self::Struct => "struct",
            Self::Map => "map",
            Self::Set => "set",
            Self::List => "list",
        }
    }

    /// True for list, set and map.
    pub fn is_container(self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Map)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field header as seen on the wire. A `Stop` header terminates a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub field_type: FieldType,
    pub id: i16,
}

impl FieldHeader {
    /// The header terminating every struct.
    pub const STOP: FieldHeader = FieldHeader {
        field_type: FieldType::Stop,
        id: 0,
    };

    pub fn new(field_type: FieldType, id: i16) -> Self {
        Self { field_type, id }
    }

    pub fn is_stop(&self) -> bool {
        self.field_type == FieldType::Stop
    }
}

/// Header of a list or set: element type followed by a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub element_type: FieldType,
    pub size: usize,
}

impl ListHeader {
    pub fn new(element_type: FieldType, size: usize) -> Self {
        Self { element_type, size }
    }
}

/// Sets share the list header shape.
pub type SetHeader = ListHeader;

/// Header of a map: key type, value type and entry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key_type: FieldType,
    pub value_type: FieldType,
    pub size: usize,
}

impl MapHeader {
    pub fn new(key_type: FieldType, value_type: FieldType, size: usize) -> Self {
        Self {
            key_type,
            value_type,
            size,
        }
    }
}

/// Kind of an RPC message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageKind {
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            1 => Self::Call,
            2 => Self::Reply,
            3 => Self::Exception,
            4 => Self::Oneway,
            other => return Err(ProtocolError::InvalidMessageKind(other)),
        })
    }
}

/// RPC message envelope written ahead of the argument or result struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub kind: MessageKind,
    pub sequence_id: i32,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, kind: MessageKind, sequence_id: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            sequence_id,
        }
    }
}

/// Convert a wire count into a `usize`, rejecting negatives.
pub(crate) fn checked_len(len: i64) -> Result<usize> {
    usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_tags_roundtrip() {
        for ty in [
            FieldType::Stop,
            FieldType::Void,
            FieldType::Bool,
            FieldType::Byte,
            FieldType::Double,
            FieldType::I16,
            FieldType::I32,
            FieldType::I64,
            FieldType::String,
            FieldType::Struct,
            FieldType::Map,
            FieldType::Set,
            FieldType::List,
        ] {
            assert_eq!(FieldType::from_u8(ty.as_u8()).unwrap(), ty);
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(matches!(
            FieldType::from_u8(5),
            Err(ProtocolError::InvalidFieldType(5))
        ));
        assert!(matches!(
            FieldType::from_u8(0xFF),
            Err(ProtocolError::InvalidFieldType(0xFF))
        ));
    }

    #[test]
    fn negative_length_rejected() {
        assert!(matches!(
            checked_len(-1),
            Err(ProtocolError::NegativeLength(-1))
        ));
        assert_eq!(checked_len(3).unwrap(), 3);
    }

    #[test]
    fn container_types() {
        assert!(FieldType::Map.is_container());
        assert!(!FieldType::Struct.is_container());
    }
}
