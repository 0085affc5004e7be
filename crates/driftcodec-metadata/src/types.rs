use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use driftcodec_protocol::FieldType;

use crate::coercion::TypeCoercion;
use crate::description::TypeKey;
use crate::metadata::{EnumMetadata, StructMetadata};

/// Resolved structural type of a field or top-level value.
///
/// Struct, union and enum variants carry their metadata; equality and hashing
/// use the native type identity only, so a `ThriftType` is a cheap cache key.
#[derive(Clone)]
pub enum ThriftType {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Void,
    Enum(Arc<EnumMetadata>),
    Struct(Arc<StructMetadata>),
    Union(Arc<StructMetadata>),
    List(Box<ThriftType>),
    Set(Box<ThriftType>),
    Map(Box<ThriftType>, Box<ThriftType>),
    /// A native type carried on the wire as the coercion's wire type.
    Coerced(Arc<TypeCoercion>),
}

impl ThriftType {
    pub fn list(element: ThriftType) -> Self {
        ThriftType::List(Box::new(element))
    }

    pub fn set(element: ThriftType) -> Self {
        ThriftType::Set(Box::new(element))
    }

    pub fn map(key: ThriftType, value: ThriftType) -> Self {
        ThriftType::Map(Box::new(key), Box::new(value))
    }

    /// Type tag used in field and container headers.
    pub fn protocol_type(&self) -> FieldType {
        match self {
            ThriftType::Bool => FieldType::Bool,
            ThriftType::Byte => FieldType::Byte,
            ThriftType::I16 => FieldType::I16,
            ThriftType::I32 | ThriftType::Enum(_) => FieldType::I32,
            ThriftType::I64 => FieldType::I64,
            ThriftType::Double => FieldType::Double,
            ThriftType::String | ThriftType::Binary => FieldType::String,
            ThriftType::Void => FieldType::Void,
            ThriftType::Struct(_) | ThriftType::Union(_) => FieldType::Struct,
            ThriftType::List(_) => FieldType::List,
            ThriftType::Set(_) => FieldType::Set,
            ThriftType::Map(_, _) => FieldType::Map,
            ThriftType::Coerced(coercion) => coercion.wire_type().protocol_type(),
        }
    }

    pub fn struct_metadata(&self) -> Option<&Arc<StructMetadata>> {
        match self {
            ThriftType::Struct(metadata) | ThriftType::Union(metadata) => Some(metadata),
            _ => None,
        }
    }

    pub fn enum_metadata(&self) -> Option<&Arc<EnumMetadata>> {
        match self {
            ThriftType::Enum(metadata) => Some(metadata),
            _ => None,
        }
    }

    pub fn coercion(&self) -> Option<&Arc<TypeCoercion>> {
        match self {
            ThriftType::Coerced(coercion) => Some(coercion),
            _ => None,
        }
    }

    /// Native type identity for struct, union, enum and coerced types.
    pub fn type_key(&self) -> Option<TypeKey> {
        match self {
            ThriftType::Enum(metadata) => Some(metadata.key()),
            ThriftType::Struct(metadata) | ThriftType::Union(metadata) => Some(metadata.key()),
            ThriftType::Coerced(coercion) => Some(coercion.native_type()),
            _ => None,
        }
    }
}

impl PartialEq for ThriftType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ThriftType::List(a), ThriftType::List(b)) | (ThriftType::Set(a), ThriftType::Set(b)) => {
                a == b
            }
            (ThriftType::Map(ka, va), ThriftType::Map(kb, vb)) => ka == kb && va == vb,
            _ => mem::discriminant(self) == mem::discriminant(other) && self.type_key() == other.type_key(),
        }
    }
}

impl Eq for ThriftType {}

impl Hash for ThriftType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            ThriftType::List(element) | ThriftType::Set(element) => element.hash(state),
            ThriftType::Map(key, value) => {
                key.hash(state);
                value.hash(state);
            }
            other => other.type_key().hash(state),
        }
    }
}

impl fmt::Display for ThriftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThriftType::Bool => f.write_str("bool"),
            ThriftType::Byte => f.write_str("byte"),
            ThriftType::I16 => f.write_str("i16"),
            ThriftType::I32 => f.write_str("i32"),
            ThriftType::I64 => f.write_str("i64"),
            ThriftType::Double => f.write_str("double"),
            ThriftType::String => f.write_str("string"),
            ThriftType::Binary => f.write_str("binary"),
            ThriftType::Void => f.write_str("void"),
            ThriftType::Enum(metadata) => write!(f, "enum {}", metadata.name()),
            ThriftType::Struct(metadata) => write!(f, "struct {}", metadata.name()),
            ThriftType::Union(metadata) => write!(f, "union {}", metadata.name()),
            ThriftType::List(element) => write!(f, "list<{element}>"),
            ThriftType::Set(element) => write!(f, "set<{element}>"),
            ThriftType::Map(key, value) => write!(f, "map<{key}, {value}>"),
            ThriftType::Coerced(coercion) => {
                write!(f, "{} as {}", coercion.native_type(), coercion.wire_type())
            }
        }
    }
}

impl fmt::Debug for ThriftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
