use driftcodec_metadata::{BoxError, CatalogError, ValueError};
use driftcodec_protocol::ProtocolError;

/// Errors raised while resolving codecs or encoding/decoding a message.
///
/// `Protocol` and the request-level variants abort only the current message.
/// `Catalog` surfaces a configuration error from metadata derivation.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Malformed or non-conforming wire data.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid type description.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A REQUIRED field never arrived and enforcement is on.
    #[error("{struct_name}: required field {field:?} (id {id}) is missing")]
    MissingRequiredField {
        struct_name: String,
        field: String,
        id: i16,
    },

    /// A union payload carried more than one known field.
    #[error("{struct_name}: union carries {count} fields, expected at most one")]
    UnionFieldCount { struct_name: String, count: usize },

    /// A union payload carried no field and the union has no default
    /// constructor.
    #[error("{struct_name}: empty union cannot be constructed")]
    EmptyUnion { struct_name: String },

    /// The active union field has no value to encode.
    #[error("{struct_name}: active union field {field:?} (id {id}) is empty")]
    EmptyUnionField {
        struct_name: String,
        field: String,
        id: i16,
    },

    /// A user constructor, setter, method or builder failed.
    #[error("{struct_name}: construction failed: {source}")]
    Construction {
        struct_name: String,
        #[source]
        source: BoxError,
    },

    /// The builder step produced nothing, or an instance of another type.
    #[error("{struct_name}: builder returned {problem}")]
    BuilderResult { struct_name: String, problem: String },

    /// A value handed to a codec does not have the codec's shape.
    #[error(transparent)]
    ValueMismatch(#[from] ValueError),

    /// A coercion failed in either direction.
    #[error("coercion of {native} failed: {source}")]
    Coercion {
        native: String,
        #[source]
        source: BoxError,
    },
}

impl CodecError {
    /// Map an error returned by a user recipe.
    ///
    /// Codec errors raised inside a recipe (for example by a nested decode)
    /// pass through unchanged; anything else is attributed to `struct_name`.
    pub fn from_user(struct_name: &str, err: BoxError) -> Self {
        match err.downcast::<CodecError>() {
            Ok(codec) => *codec,
            Err(err) => match err.downcast::<ValueError>() {
                Ok(value) => CodecError::ValueMismatch(*value),
                Err(source) => CodecError::Construction {
                    struct_name: struct_name.to_string(),
                    source,
                },
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_codec_errors_pass_through() {
        let inner = CodecError::EmptyUnion {
            struct_name: "Inner".into(),
        };
        let mapped = CodecError::from_user("Outer", Box::new(inner));
        assert!(matches!(mapped, CodecError::EmptyUnion { ref struct_name } if struct_name == "Inner"));
    }

    #[test]
    fn other_errors_are_wrapped() {
        let mapped = CodecError::from_user("Widget", "boom".into());
        match mapped {
            CodecError::Construction {
                struct_name,
                source,
            } => {
                assert_eq!(struct_name, "Widget");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn value_errors_are_mismatches() {
        let mapped = CodecError::from_user(
            "Widget",
            Box::new(ValueError::MissingArgument { index: 2 }),
        );
        assert!(matches!(mapped, CodecError::ValueMismatch(_)));
    }
}
