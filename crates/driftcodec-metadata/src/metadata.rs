use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::access::{
    BoxError, Builder, Construction, Extraction, Injection, MethodInjection, UnionConstructFn,
};
use crate::description::{DiscriminantGetter, StructKind, TypeKey};
use crate::error::{CatalogError, Result};
use crate::types::ThriftType;
use crate::value::Value;

/// Id reserved for the synthetic union discriminant field.
pub const DISCRIMINANT_ID: i16 = i16::MIN;
pub const DISCRIMINANT_NAME: &str = "_union_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requiredness {
    Required,
    Optional,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Ordinary,
    UnionDiscriminant,
}

/// Resolved metadata of one field.
#[derive(Clone)]
pub struct FieldMetadata {
    pub(crate) id: i16,
    pub(crate) name: String,
    pub(crate) thrift_type: ThriftType,
    pub(crate) requiredness: Requiredness,
    pub(crate) kind: FieldKind,
    pub(crate) injections: Vec<Injection>,
    pub(crate) extraction: Option<Extraction>,
    pub(crate) union_constructor: Option<UnionConstructFn>,
    pub(crate) documentation: Vec<String>,
}

impl FieldMetadata {
    pub fn id(&self) -> i16 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    pub fn requiredness(&self) -> Requiredness {
        self.requiredness
    }

    pub fn is_required(&self) -> bool {
        self.requiredness == Requiredness::Required
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Injections in application order: constructor parameter, field
    /// assignment, method parameter, builder parameter.
    pub fn injections(&self) -> &[Injection] {
        &self.injections
    }

    /// The injection a decoded value of this field is handed to.
    pub fn primary_injection(&self) -> Option<&Injection> {
        self.injections.first()
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        self.extraction.as_ref()
    }

    pub fn union_constructor(&self) -> Option<&UnionConstructFn> {
        self.union_constructor.as_ref()
    }

    /// Whether a decoded value of this field can go anywhere.
    pub fn is_readable(&self) -> bool {
        !self.injections.is_empty() || self.union_constructor.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.extraction.is_some()
    }

    pub fn documentation(&self) -> &[String] {
        &self.documentation
    }

    pub fn extract(
        &self,
        instance: &(dyn Any + Send + Sync),
    ) -> std::result::Result<Option<Value>, BoxError> {
        match &self.extraction {
            Some(extraction) => extraction.extract(instance),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for FieldMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMetadata")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("thrift_type", &self.thrift_type)
            .field("requiredness", &self.requiredness)
            .field("kind", &self.kind)
            .field("injections", &self.injections)
            .field("extraction", &self.extraction)
            .field("union_constructor", &self.union_constructor.is_some())
            .finish()
    }
}

/// Resolved metadata of a struct or union.
pub struct StructMetadata {
    pub(crate) key: TypeKey,
    pub(crate) name: String,
    pub(crate) kind: StructKind,
    pub(crate) fields: Vec<FieldMetadata>,
    pub(crate) construction: Option<Construction>,
    pub(crate) methods: Vec<MethodInjection>,
    pub(crate) builder: Option<Builder>,
    pub(crate) discriminant: Option<FieldMetadata>,
    pub(crate) discriminant_getter: Option<DiscriminantGetter>,
    pub(crate) documentation: Vec<String>,
}

impl StructMetadata {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StructKind {
        self.kind
    }

    pub fn is_union(&self) -> bool {
        self.kind == StructKind::Union
    }

    /// Fields ordered by id.
    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    pub fn field(&self, id: i16) -> Option<&FieldMetadata> {
        self.fields
            .binary_search_by_key(&id, |field| field.id)
            .ok()
            .map(|index| &self.fields[index])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn construction(&self) -> Option<&Construction> {
        self.construction.as_ref()
    }

    pub fn methods(&self) -> &[MethodInjection] {
        &self.methods
    }

    pub fn builder(&self) -> Option<&Builder> {
        self.builder.as_ref()
    }

    /// Synthetic field through which a union exposes its active field id.
    pub fn discriminant(&self) -> Option<&FieldMetadata> {
        self.discriminant.as_ref()
    }

    /// Active field id of a union instance.
    pub fn active_field(
        &self,
        instance: &(dyn Any + Send + Sync),
    ) -> std::result::Result<Option<i16>, BoxError> {
        match &self.discriminant_getter {
            Some(getter) => getter(instance),
            None => Ok(None),
        }
    }

    pub fn documentation(&self) -> &[String] {
        &self.documentation
    }
}

impl fmt::Debug for StructMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructMetadata")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .field("construction", &self.construction)
            .field("methods", &self.methods)
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstantMetadata {
    pub name: String,
    pub value: i32,
}

/// Resolved enum metadata: the wire value of every constant.
#[derive(Debug)]
pub struct EnumMetadata {
    key: TypeKey,
    name: String,
    constants: Vec<EnumConstantMetadata>,
    explicit_values: bool,
    by_value: HashMap<i32, usize>,
    documentation: Vec<String>,
}

impl EnumMetadata {
    /// Validate constants and fix their wire values.
    ///
    /// Either every constant declares a value or none does; in the latter case
    /// the declaration ordinal is the wire value.
    pub(crate) fn new(
        key: TypeKey,
        name: String,
        constants: Vec<(String, Option<i32>)>,
        documentation: Vec<String>,
    ) -> Result<Self> {
        let invalid = |reason: String| CatalogError::InvalidEnum {
            enum_name: name.clone(),
            reason,
        };

        if constants.is_empty() {
            return Err(invalid("no constants declared".into()));
        }
        let explicit = constants.iter().filter(|(_, value)| value.is_some()).count();
        if explicit != 0 && explicit != constants.len() {
            return Err(invalid(
                "either all constants declare a value or none does".into(),
            ));
        }

        let mut resolved = Vec::with_capacity(constants.len());
        let mut by_value = HashMap::with_capacity(constants.len());
        for (ordinal, (constant, value)) in constants.into_iter().enumerate() {
            let value = match value {
                Some(value) => value,
                None => i32::try_from(ordinal).map_err(|_| invalid("too many constants".into()))?,
            };
            if resolved
                .iter()
                .any(|existing: &EnumConstantMetadata| existing.name == constant)
            {
                return Err(invalid(format!("duplicate constant name {constant:?}")));
            }
            if by_value.insert(value, ordinal).is_some() {
                return Err(invalid(format!("duplicate value {value}")));
            }
            resolved.push(EnumConstantMetadata {
                name: constant,
                value,
            });
        }

        Ok(Self {
            key,
            name,
            constants: resolved,
            explicit_values: explicit != 0,
            by_value,
            documentation,
        })
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constants(&self) -> &[EnumConstantMetadata] {
        &self.constants
    }

    pub fn has_explicit_values(&self) -> bool {
        self.explicit_values
    }

    /// Wire value of the constant at declaration `index`.
    pub fn wire_value(&self, index: usize) -> Option<i32> {
        self.constants.get(index).map(|constant| constant.value)
    }

    /// Declaration index of the constant carrying `value`, if known.
    pub fn index_of(&self, value: i32) -> Option<usize> {
        self.by_value.get(&value).copied()
    }

    pub fn documentation(&self) -> &[String] {
        &self.documentation
    }
}
