/// Errors raised while reading or writing framed wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended before a complete value could be read.
    #[error("unexpected end of buffer (needed {needed} bytes, {remaining} remaining)")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A type code on the wire does not name a known field type.
    #[error("invalid field type {0:#04x}")]
    InvalidFieldType(u8),

    /// A length or element count was negative.
    #[error("negative length {0}")]
    NegativeLength(i64),

    /// A length or element count exceeds the configured limit.
    #[error("{what} size {size} exceeds limit {max}")]
    SizeLimit {
        what: &'static str,
        size: usize,
        max: usize,
    },

    /// A string value was not valid UTF-8.
    #[error("string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The message envelope carried an unsupported version word.
    #[error("bad message version {0:#010x}")]
    BadVersion(u32),

    /// The message envelope carried an unknown message kind.
    #[error("invalid message kind {0}")]
    InvalidMessageKind(u8),

    /// A variable-length integer did not terminate within its width.
    #[error("variable-length integer overflow")]
    VarintOverflow,

    /// Nested values exceed the configured recursion limit.
    #[error("nesting depth exceeds limit {0}")]
    DepthLimit(usize),

    /// A container header declared an element type other than the expected one.
    #[error("expected {expected} elements, found {actual}")]
    ElementTypeMismatch {
        expected: crate::FieldType,
        actual: crate::FieldType,
    },

    /// The layout has no encoding for this type.
    #[error("{layout} layout cannot encode {field_type} values")]
    UnsupportedType {
        layout: &'static str,
        field_type: crate::FieldType,
    },

    /// A struct-scoped cursor was driven out of order.
    #[error("protocol cursor misuse: {0}")]
    Usage(&'static str),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
