/// Invalid type descriptions, detected when metadata is derived.
///
/// These are configuration errors: they surface the first time a type is
/// described, not per message, and the catalog caches them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Two fields of one struct share an id.
    #[error("{struct_name}: duplicate field id {id}")]
    DuplicateFieldId { struct_name: String, id: i16 },

    /// Two fields of one struct share a name.
    #[error("{struct_name}: duplicate field name {name:?}")]
    DuplicateFieldName { struct_name: String, name: String },

    /// A field id is negative.
    #[error("{struct_name}: field {name:?} has negative id {id}")]
    NegativeFieldId {
        struct_name: String,
        name: String,
        id: i16,
    },

    /// A field can neither be injected nor extracted.
    #[error("{struct_name}: field {name:?} (id {id}) has no injection and no extraction")]
    FieldWithoutAccessor {
        struct_name: String,
        name: String,
        id: i16,
    },

    /// A constructor, method or builder parameter names an undeclared field.
    #[error("{struct_name}: {recipe} parameter refers to unknown field id {id}")]
    UnknownParameterField {
        struct_name: String,
        recipe: String,
        id: i16,
    },

    /// A struct declares readable fields but no way to construct an instance.
    #[error("{struct_name}: no constructor declared")]
    MissingConstructor { struct_name: String },

    /// A union does not expose its active field id.
    #[error("{struct_name}: union has no discriminant extraction")]
    MissingDiscriminant { struct_name: String },

    /// A union field cannot be built: no dedicated constructor and no
    /// default constructor to inject into.
    #[error("{struct_name}: union field {name:?} has no constructor and the union has no default constructor")]
    UnconstructibleUnionField { struct_name: String, name: String },

    /// A description was built for a different native type than the one
    /// being described.
    #[error("{description} describes {described}, not {type_name}")]
    DescribedTypeMismatch {
        description: String,
        type_name: &'static str,
        described: &'static str,
    },

    /// The struct transitively contains itself.
    #[error("type cycle detected: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// A field declares a native type with no registered coercion.
    #[error("no coercion registered for native type {type_name}")]
    MissingCoercion { type_name: String },

    /// An enum mixes explicit and implicit values, or repeats a value or name.
    #[error("enum {enum_name}: {reason}")]
    InvalidEnum { enum_name: String, reason: String },

    /// A nested type failed to derive.
    #[error("{struct_name}.{field}: {source}")]
    Field {
        struct_name: String,
        field: String,
        #[source]
        source: Box<CatalogError>,
    },
}

impl CatalogError {
    /// The innermost error, looking through `Field` wrappers.
    pub fn root_cause(&self) -> &CatalogError {
        match self {
            CatalogError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Conversion failures between [`Value`](crate::Value) and native types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The value has a different shape than the native type expects.
    #[error("expected {expected} value, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An accessor was applied to an instance of another type.
    #[error("accessor expects an instance of {expected}")]
    TargetMismatch { expected: &'static str },

    /// An enum index does not name a constant of the native enum.
    #[error("enum {enum_name} has no constant at index {index}")]
    UnknownConstant {
        enum_name: &'static str,
        index: usize,
    },

    /// A required argument was not supplied.
    #[error("argument {index} is missing")]
    MissingArgument { index: usize },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
