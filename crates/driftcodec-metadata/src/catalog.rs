use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::access::{BoxError, Extraction, GetterFn, Injection};
use crate::coercion::{float_coercion, system_time_coercion, TypeCoercion};
use crate::config::CatalogConfig;
use crate::description::{
    Describe, DescribeEnum, EnumRef, StructDescription, StructKind, StructRef, TypeKey, TypeRef,
};
use crate::error::{CatalogError, Result};
use crate::metadata::{
    EnumMetadata, FieldKind, FieldMetadata, Requiredness, StructMetadata, DISCRIMINANT_ID,
    DISCRIMINANT_NAME,
};
use crate::types::ThriftType;
use crate::value::{FromValue, IntoValue, Value};

/// Types currently being derived along one call chain, outermost first.
type DerivationStack = Vec<(TypeKey, String)>;

/// Derives and caches struct, union and enum metadata.
///
/// Derivation runs outside any cache lock and is published with an atomic
/// insert-if-absent, so concurrent first use may derive a type twice but
/// every caller observes the same cached `Arc`. Failures are cached too: a
/// type that fails to derive keeps failing with the same error.
pub struct ThriftCatalog {
    config: CatalogConfig,
    structs: DashMap<TypeKey, Result<Arc<StructMetadata>>>,
    enums: DashMap<TypeKey, Result<Arc<EnumMetadata>>>,
    coercions: DashMap<TypeKey, Arc<TypeCoercion>>,
}

impl ThriftCatalog {
    /// Create a catalog with default config.
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    /// Create a catalog with explicit config.
    pub fn with_config(config: CatalogConfig) -> Self {
        let catalog = Self {
            config,
            structs: DashMap::new(),
            enums: DashMap::new(),
            coercions: DashMap::new(),
        };
        if config.default_coercions {
            catalog.add_coercion(float_coercion());
            catalog.add_coercion(system_time_coercion());
        }
        catalog
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Metadata for a described struct or union.
    pub fn struct_metadata<T: Describe>(&self) -> Result<Arc<StructMetadata>> {
        self.struct_metadata_for(&StructRef::of::<T>())
    }

    pub fn struct_metadata_for(&self, reference: &StructRef) -> Result<Arc<StructMetadata>> {
        self.resolve_struct(reference, &mut Vec::new())
    }

    pub fn enum_metadata<T: DescribeEnum>(&self) -> Result<Arc<EnumMetadata>> {
        self.enum_metadata_for(&EnumRef::of::<T>())
    }

    pub fn enum_metadata_for(&self, reference: &EnumRef) -> Result<Arc<EnumMetadata>> {
        let key = reference.key();
        if let Some(cached) = self.enums.get(&key) {
            return cached.value().clone();
        }

        let description = reference.describe();
        let derived = if description.key != key {
            Err(CatalogError::DescribedTypeMismatch {
                description: description.name,
                type_name: key.name(),
                described: description.key.name(),
            })
        } else {
            EnumMetadata::new(
                key,
                description.name,
                description
                    .constants
                    .into_iter()
                    .map(|constant| (constant.name, constant.value))
                    .collect(),
                description.documentation,
            )
            .map(Arc::new)
        };

        match &derived {
            Ok(metadata) => tracing::debug!(
                enum_name = metadata.name(),
                constants = metadata.constants().len(),
                "derived enum metadata"
            ),
            Err(err) => tracing::debug!(enum_type = key.name(), error = %err, "enum derivation failed"),
        }

        let entry = self.enums.entry(key).or_insert(derived);
        entry.value().clone()
    }

    /// Resolve a declared type, deriving any struct, union or enum it names.
    pub fn thrift_type(&self, type_ref: &TypeRef) -> Result<ThriftType> {
        self.resolve_type(type_ref, &mut Vec::new())
    }

    /// Resolved type of a described struct or union.
    pub fn thrift_type_of<T: Describe>(&self) -> Result<ThriftType> {
        self.thrift_type(&TypeRef::record::<T>())
    }

    /// Register a conversion between native type `N` and wire type `W`.
    ///
    /// Fields declared as `TypeRef::native::<N>()` resolve to a coerced type.
    /// Register coercions before deriving the types that use them: metadata
    /// already cached keeps the coercion it was derived with.
    pub fn register_coercion<N, W, T, F>(
        &self,
        wire: TypeRef,
        to_wire: T,
        from_wire: F,
    ) -> Result<()>
    where
        N: Any + Send + Sync,
        W: FromValue + IntoValue,
        T: Fn(&N) -> Option<W> + Send + Sync + 'static,
        F: Fn(W) -> std::result::Result<N, BoxError> + Send + Sync + 'static,
    {
        let wire = self.thrift_type(&wire)?;
        self.add_coercion(TypeCoercion::new(wire, to_wire, from_wire));
        Ok(())
    }

    /// Register a prebuilt coercion, replacing any previous one for its
    /// native type.
    pub fn add_coercion(&self, coercion: TypeCoercion) {
        let native = coercion.native_type();
        let wire = coercion.wire_type().to_string();
        if self.coercions.insert(native, Arc::new(coercion)).is_some() {
            tracing::debug!(native = native.name(), wire = %wire, "replaced type coercion");
        } else {
            tracing::debug!(native = native.name(), wire = %wire, "registered type coercion");
        }
    }

    pub fn coercion(&self, native: &TypeKey) -> Option<Arc<TypeCoercion>> {
        self.coercions.get(native).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of struct and union types derived so far, failures included.
    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }

    fn resolve_type(&self, type_ref: &TypeRef, stack: &mut DerivationStack) -> Result<ThriftType> {
        Ok(match type_ref {
            TypeRef::Bool => ThriftType::Bool,
            TypeRef::Byte => ThriftType::Byte,
            TypeRef::I16 => ThriftType::I16,
            TypeRef::I32 => ThriftType::I32,
            TypeRef::I64 => ThriftType::I64,
            TypeRef::Double => ThriftType::Double,
            TypeRef::String => ThriftType::String,
            TypeRef::Binary => ThriftType::Binary,
            TypeRef::Void => ThriftType::Void,
            TypeRef::Enum(reference) => ThriftType::Enum(self.enum_metadata_for(reference)?),
            TypeRef::Struct(reference) => {
                let metadata = self.resolve_struct(reference, stack)?;
                if metadata.is_union() {
                    ThriftType::Union(metadata)
                } else {
                    ThriftType::Struct(metadata)
                }
            }
            TypeRef::List(element) => ThriftType::list(self.resolve_type(element, stack)?),
            TypeRef::Set(element) => ThriftType::set(self.resolve_type(element, stack)?),
            TypeRef::Map(key, value) => ThriftType::map(
                self.resolve_type(key, stack)?,
                self.resolve_type(value, stack)?,
            ),
            TypeRef::Native(native) => {
                let coercion = self
                    .coercion(native)
                    .ok_or_else(|| CatalogError::MissingCoercion {
                        type_name: native.name().to_string(),
                    })?;
                ThriftType::Coerced(coercion)
            }
        })
    }

    fn resolve_struct(
        &self,
        reference: &StructRef,
        stack: &mut DerivationStack,
    ) -> Result<Arc<StructMetadata>> {
        let key = reference.key();
        if let Some(cached) = self.structs.get(&key) {
            return cached.value().clone();
        }

        if let Some(start) = stack.iter().position(|(pending, _)| *pending == key) {
            let mut chain: Vec<String> = stack[start..].iter().map(|(_, name)| name.clone()).collect();
            chain.push(stack[start].1.clone());
            return Err(CatalogError::Cycle { chain });
        }

        let description = reference.describe();
        stack.push((key, description.name.clone()));
        let derived = self.derive_struct(key, description, stack);
        stack.pop();

        match &derived {
            Ok(metadata) => tracing::debug!(
                struct_name = metadata.name(),
                fields = metadata.fields().len(),
                union = metadata.is_union(),
                "derived struct metadata"
            ),
            Err(err) => tracing::debug!(struct_type = key.name(), error = %err, "struct derivation failed"),
        }

        let entry = self.structs.entry(key).or_insert(derived.map(Arc::new));
        entry.value().clone()
    }

    fn derive_struct(
        &self,
        key: TypeKey,
        description: StructDescription,
        stack: &mut DerivationStack,
    ) -> Result<StructMetadata> {
        if description.key != key {
            return Err(CatalogError::DescribedTypeMismatch {
                description: description.name,
                type_name: key.name(),
                described: description.key.name(),
            });
        }
        let StructDescription {
            name,
            kind,
            fields: described,
            construction,
            mut methods,
            builder,
            discriminant,
            discriminant_setter,
            documentation,
            ..
        } = description;

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for field in &described {
            if field.id < 0 {
                return Err(CatalogError::NegativeFieldId {
                    struct_name: name,
                    name: field.name.clone(),
                    id: field.id,
                });
            }
            if !ids.insert(field.id) {
                return Err(CatalogError::DuplicateFieldId {
                    struct_name: name,
                    id: field.id,
                });
            }
            if !names.insert(field.name.as_str()) {
                return Err(CatalogError::DuplicateFieldName {
                    struct_name: name,
                    name: field.name.clone(),
                });
            }
            if let Some(method) = &field.method_setter {
                methods.push(method.clone());
            }
        }

        let check_parameters = |recipe: String, parameters: &[i16]| -> Result<()> {
            match parameters.iter().find(|id| !ids.contains(*id)) {
                Some(&id) => Err(CatalogError::UnknownParameterField {
                    struct_name: name.clone(),
                    recipe,
                    id,
                }),
                None => Ok(()),
            }
        };
        if let Some(construction) = &construction {
            check_parameters("constructor".into(), construction.parameters())?;
        }
        for method in &methods {
            check_parameters(format!("method {}", method.name()), method.parameters())?;
        }
        if let Some(builder) = &builder {
            check_parameters("builder".into(), builder.parameters())?;
        }

        let mut fields = Vec::with_capacity(described.len());
        for field in described {
            let thrift_type =
                self.resolve_type(&field.type_ref, stack)
                    .map_err(|source| CatalogError::Field {
                        struct_name: name.clone(),
                        field: field.name.clone(),
                        source: Box::new(source),
                    })?;

            let mut injections = Vec::new();
            if let Some(construction) = &construction {
                injections.extend(
                    positions(construction.parameters(), field.id)
                        .map(|index| Injection::ConstructorParameter { index }),
                );
            }
            if let Some(setter) = field.setter {
                injections.push(Injection::Field { setter });
            }
            for (method, injection) in methods.iter().enumerate() {
                injections.extend(
                    positions(injection.parameters(), field.id)
                        .map(|index| Injection::Method { method, index }),
                );
            }
            if let Some(builder) = &builder {
                injections.extend(
                    positions(builder.parameters(), field.id)
                        .map(|index| Injection::BuilderParameter { index }),
                );
            }

            if injections.is_empty()
                && field.union_constructor.is_none()
                && field.extraction.is_none()
            {
                return Err(CatalogError::FieldWithoutAccessor {
                    struct_name: name,
                    name: field.name,
                    id: field.id,
                });
            }

            fields.push(FieldMetadata {
                id: field.id,
                name: field.name,
                thrift_type,
                requiredness: field.requiredness,
                kind: FieldKind::Ordinary,
                injections,
                extraction: field.extraction,
                union_constructor: field.union_constructor,
                documentation: field.documentation,
            });
        }
        fields.sort_by_key(|field| field.id);

        let mut discriminant_field = None;
        match kind {
            StructKind::Struct => {
                if construction.is_none() && fields.iter().any(|f| !f.injections.is_empty()) {
                    return Err(CatalogError::MissingConstructor { struct_name: name });
                }
            }
            StructKind::Union => {
                let Some(getter) = &discriminant else {
                    return Err(CatalogError::MissingDiscriminant { struct_name: name });
                };
                if construction.is_none() {
                    if let Some(field) = fields
                        .iter()
                        .find(|f| !f.injections.is_empty() && f.union_constructor.is_none())
                    {
                        return Err(CatalogError::UnconstructibleUnionField {
                            struct_name: name,
                            name: field.name.clone(),
                        });
                    }
                }

                let getter = Arc::clone(getter);
                let extract: GetterFn = Arc::new(move |instance: &(dyn Any + Send + Sync)| {
                    let active: std::result::Result<Option<i16>, BoxError> = getter(instance);
                    active.map(|id| id.map(Value::I16))
                });
                discriminant_field = Some(FieldMetadata {
                    id: DISCRIMINANT_ID,
                    name: DISCRIMINANT_NAME.to_string(),
                    thrift_type: ThriftType::I16,
                    requiredness: Requiredness::None,
                    kind: FieldKind::UnionDiscriminant,
                    injections: discriminant_setter
                        .map(|setter| vec![Injection::Field { setter }])
                        .unwrap_or_default(),
                    extraction: Some(Extraction::Method {
                        name: "discriminant".to_string(),
                        getter: extract,
                    }),
                    union_constructor: None,
                    documentation: Vec::new(),
                });
            }
        }

        Ok(StructMetadata {
            key,
            name,
            kind,
            fields,
            construction,
            methods,
            builder,
            discriminant: discriminant_field,
            discriminant_getter: discriminant,
            documentation,
        })
    }
}

impl Default for ThriftCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn positions(parameters: &[i16], id: i16) -> impl Iterator<Item = usize> + '_ {
    parameters
        .iter()
        .enumerate()
        .filter(move |(_, parameter)| **parameter == id)
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Construction;
    use crate::description::FieldDescription;

    #[derive(Default)]
    struct Pair {
        left: i32,
        right: i32,
    }

    impl Describe for Pair {
        fn describe() -> StructDescription {
            StructDescription::structure::<Pair>("Pair")
                .constructor(Construction::new(&[2], |args| {
                    Ok(Pair {
                        left: 0,
                        right: args.take(0)?,
                    })
                }))
                .field(
                    FieldDescription::new(2, "right", TypeRef::I32)
                        .getter(|p: &Pair| Some(p.right)),
                )
                .field(
                    FieldDescription::new(1, "left", TypeRef::I32)
                        .setter(|p: &mut Pair, v: i32| p.left = v)
                        .getter(|p: &Pair| Some(p.left)),
                )
        }
    }

    #[test]
    fn fields_sorted_with_injections() {
        let catalog = ThriftCatalog::new();
        let metadata = catalog.struct_metadata::<Pair>().unwrap();
        let ids: Vec<i16> = metadata.fields().iter().map(FieldMetadata::id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(matches!(
            metadata.field(2).unwrap().primary_injection(),
            Some(Injection::ConstructorParameter { index: 0 })
        ));
        assert!(matches!(
            metadata.field(1).unwrap().primary_injection(),
            Some(Injection::Field { .. })
        ));
        assert!(metadata.discriminant().is_none());
    }

    #[test]
    fn metadata_is_memoized() {
        let catalog = ThriftCatalog::new();
        let first = catalog.struct_metadata::<Pair>().unwrap();
        let second = catalog.struct_metadata::<Pair>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(catalog.struct_count(), 1);
    }

    #[test]
    fn default_coercions_follow_config() {
        let with = ThriftCatalog::new();
        assert!(with.coercion(&TypeKey::of::<f32>()).is_some());

        let without = ThriftCatalog::with_config(CatalogConfig {
            default_coercions: false,
        });
        let err = without.thrift_type(&TypeRef::native::<f32>()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingCoercion { .. }));
    }

    #[test]
    fn positions_of_parameters() {
        assert_eq!(positions(&[3, 1, 3], 3).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(positions(&[], 3).count(), 0);
    }
}
