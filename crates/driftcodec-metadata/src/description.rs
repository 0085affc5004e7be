//! Type descriptions: the input the catalog derives metadata from.
//!
//! A description is plain data plus recipes. It is produced by whatever front
//! end knows the native types (hand-written [`Describe`] impls, generated
//! code) and consumed by [`ThriftCatalog`](crate::ThriftCatalog) without
//! reinterpretation.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::access::{
    self, target_mut, target_ref, Arguments, BoxError, Builder, Construction, Extraction,
    GetterFn, Instance, MethodInjection, SetterFn, UnionConstructFn,
};
use crate::metadata::Requiredness;
use crate::value::{FromValue, IntoValue, Value};

/// Identity of a native type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full Rust type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A native struct or union that can describe itself.
pub trait Describe: Any + Send + Sync + Sized {
    fn describe() -> StructDescription;
}

/// A native enum that can describe its constants.
pub trait DescribeEnum: Any + Send + Sync + Sized {
    fn describe_enum() -> EnumDescription;
}

/// Lazy reference to a described struct or union.
///
/// The description is only produced when the catalog derives the type, which
/// is what lets self-referencing types be detected instead of recursing.
#[derive(Clone, Copy)]
pub struct StructRef {
    key: TypeKey,
    describe: fn() -> StructDescription,
}

impl StructRef {
    pub fn of<T: Describe>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            describe: T::describe,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn describe(&self) -> StructDescription {
        (self.describe)()
    }
}

impl fmt::Debug for StructRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructRef({})", self.key)
    }
}

#[derive(Clone, Copy)]
pub struct EnumRef {
    key: TypeKey,
    describe: fn() -> EnumDescription,
}

impl EnumRef {
    pub fn of<T: DescribeEnum>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            describe: T::describe_enum,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn describe(&self) -> EnumDescription {
        (self.describe)()
    }
}

impl fmt::Debug for EnumRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnumRef({})", self.key)
    }
}

/// Declared type of a field, before resolution.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Void,
    Enum(EnumRef),
    Struct(StructRef),
    List(Box<TypeRef>),
    Set(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    /// A native type converted through a registered coercion.
    Native(TypeKey),
}

impl TypeRef {
    /// A described struct or union.
    pub fn record<T: Describe>() -> Self {
        TypeRef::Struct(StructRef::of::<T>())
    }

    pub fn of_enum<T: DescribeEnum>() -> Self {
        TypeRef::Enum(EnumRef::of::<T>())
    }

    pub fn native<T: Any>() -> Self {
        TypeRef::Native(TypeKey::of::<T>())
    }

    pub fn list(element: TypeRef) -> Self {
        TypeRef::List(Box::new(element))
    }

    pub fn set(element: TypeRef) -> Self {
        TypeRef::Set(Box::new(element))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map(Box::new(key), Box::new(value))
    }
}

/// Whether a description is a plain struct or a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    Struct,
    Union,
}

pub type DiscriminantGetter =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<Option<i16>, BoxError> + Send + Sync>;

/// Description of one field.
#[derive(Clone)]
pub struct FieldDescription {
    pub(crate) id: i16,
    pub(crate) name: String,
    pub(crate) type_ref: TypeRef,
    pub(crate) requiredness: Requiredness,
    pub(crate) setter: Option<SetterFn>,
    pub(crate) method_setter: Option<MethodInjection>,
    pub(crate) extraction: Option<Extraction>,
    pub(crate) union_constructor: Option<UnionConstructFn>,
    pub(crate) documentation: Vec<String>,
}

impl FieldDescription {
    pub fn new(id: i16, name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            id,
            name: name.into(),
            type_ref,
            requiredness: Requiredness::None,
            setter: None,
            method_setter: None,
            extraction: None,
            union_constructor: None,
            documentation: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.requiredness = Requiredness::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.requiredness = Requiredness::Optional;
        self
    }

    /// Inject by assigning to the instance.
    pub fn setter<T, V, F>(mut self, f: F) -> Self
    where
        T: Any,
        V: FromValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.setter = Some(access::setter(f));
        self
    }

    /// Inject through a fallible single-argument method.
    pub fn method_setter<T, V, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        T: Any,
        V: FromValue,
        F: Fn(&mut T, V) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let method = MethodInjection::new(name, &[self.id], move |target: &mut T, args| {
            f(target, args.require(0)?)
        });
        self.method_setter = Some(method);
        self
    }

    /// Extract by reading the instance.
    pub fn getter<T, V, F>(mut self, f: F) -> Self
    where
        T: Any,
        V: IntoValue,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        self.extraction = Some(Extraction::Field {
            getter: access::getter(f),
        });
        self
    }

    /// Extract through a fallible accessor method.
    pub fn method_getter<T, V, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        T: Any,
        V: IntoValue,
        F: Fn(&T) -> Result<Option<V>, BoxError> + Send + Sync + 'static,
    {
        let getter: GetterFn = Arc::new(
            move |target: &(dyn Any + Send + Sync)| -> Result<Option<Value>, BoxError> {
                Ok(f(target_ref::<T>(target)?)?.map(IntoValue::into_value))
            },
        );
        self.extraction = Some(Extraction::Method {
            name: name.into(),
            getter,
        });
        self
    }

    /// Union only: build the union directly from this field's value.
    pub fn union_constructor<T, V, F>(mut self, f: F) -> Self
    where
        T: Any + Send + Sync,
        V: FromValue,
        F: Fn(V) -> T + Send + Sync + 'static,
    {
        self.union_constructor = Some(Arc::new(
            move |value: Value| -> Result<Instance, BoxError> {
                Ok(Box::new(f(V::from_value(value)?)))
            },
        ));
        self
    }

    pub fn doc(mut self, line: impl Into<String>) -> Self {
        self.documentation.push(line.into());
        self
    }

    pub fn id(&self) -> i16 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for FieldDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescription")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_ref", &self.type_ref)
            .field("requiredness", &self.requiredness)
            .finish_non_exhaustive()
    }
}

/// Description of a struct or union.
#[derive(Clone)]
pub struct StructDescription {
    pub(crate) key: TypeKey,
    pub(crate) name: String,
    pub(crate) kind: StructKind,
    pub(crate) fields: Vec<FieldDescription>,
    pub(crate) construction: Option<Construction>,
    pub(crate) methods: Vec<MethodInjection>,
    pub(crate) builder: Option<Builder>,
    pub(crate) discriminant: Option<DiscriminantGetter>,
    pub(crate) discriminant_setter: Option<SetterFn>,
    pub(crate) documentation: Vec<String>,
}

impl StructDescription {
    pub fn structure<T: Any>(name: impl Into<String>) -> Self {
        Self::with_kind::<T>(name, StructKind::Struct)
    }

    pub fn union<T: Any>(name: impl Into<String>) -> Self {
        Self::with_kind::<T>(name, StructKind::Union)
    }

    fn with_kind<T: Any>(name: impl Into<String>, kind: StructKind) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            name: name.into(),
            kind,
            fields: Vec::new(),
            construction: None,
            methods: Vec::new(),
            builder: None,
            discriminant: None,
            discriminant_setter: None,
            documentation: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescription) -> Self {
        self.fields.push(field);
        self
    }

    pub fn constructor(mut self, construction: Construction) -> Self {
        self.construction = Some(construction);
        self
    }

    /// A method taking the values of `parameters` (field ids), invoked after
    /// construction when at least one of them arrived.
    pub fn method<T, F>(mut self, name: impl Into<String>, parameters: &[i16], f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T, &mut Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.methods.push(MethodInjection::new(name, parameters, f));
        self
    }

    pub fn builder(mut self, builder: Builder) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Union only: id of the active field, `None` when empty.
    pub fn discriminant<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Option<i16> + Send + Sync + 'static,
    {
        self.discriminant = Some(Arc::new(
            move |target: &(dyn Any + Send + Sync)| -> Result<Option<i16>, BoxError> {
                Ok(f(target_ref::<T>(target)?))
            },
        ));
        self
    }

    /// Union only: record the active field id on a freshly built instance.
    pub fn discriminant_setter<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T, i16) + Send + Sync + 'static,
    {
        self.discriminant_setter = Some(Arc::new(
            move |target: &mut (dyn Any + Send + Sync), value: Value| -> Result<(), BoxError> {
                let target = target_mut::<T>(target)?;
                f(target, i16::from_value(value)?);
                Ok(())
            },
        ));
        self
    }

    pub fn doc(mut self, line: impl Into<String>) -> Self {
        self.documentation.push(line.into());
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StructKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldDescription] {
        &self.fields
    }
}

impl fmt::Debug for StructDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDescription")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    pub value: Option<i32>,
}

/// Description of an enum: its constants in declaration order.
#[derive(Debug, Clone)]
pub struct EnumDescription {
    pub(crate) key: TypeKey,
    pub(crate) name: String,
    pub(crate) constants: Vec<EnumConstant>,
    pub(crate) documentation: Vec<String>,
}

impl EnumDescription {
    pub fn new<T: Any>(name: impl Into<String>) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            name: name.into(),
            constants: Vec::new(),
            documentation: Vec::new(),
        }
    }

    /// A constant whose wire value is its declaration ordinal.
    pub fn constant(mut self, name: impl Into<String>) -> Self {
        self.constants.push(EnumConstant {
            name: name.into(),
            value: None,
        });
        self
    }

    /// A constant with an explicit wire value.
    pub fn constant_value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.constants.push(EnumConstant {
            name: name.into(),
            value: Some(value),
        });
        self
    }

    pub fn doc(mut self, line: impl Into<String>) -> Self {
        self.documentation.push(line.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constants(&self) -> &[EnumConstant] {
        &self.constants
    }
}

/// Implement [`FromValue`] and [`IntoValue`] for a native enum by listing its
/// constants in declaration order. The order must match the enum's
/// description.
#[macro_export]
macro_rules! enum_value {
    ($ty:ty { $($constant:expr),+ $(,)? }) => {
        impl $ty {
            #[doc(hidden)]
            const __DRIFTCODEC_CONSTANTS: &'static [$ty] = &[$($constant),+];
        }

        impl $crate::FromValue for $ty {
            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::ValueError> {
                let index = value.into_enum_index()?;
                <$ty>::__DRIFTCODEC_CONSTANTS
                    .get(index)
                    .copied()
                    .ok_or($crate::ValueError::UnknownConstant {
                        enum_name: ::std::any::type_name::<$ty>(),
                        index,
                    })
            }
        }

        impl $crate::IntoValue for $ty {
            fn into_value(self) -> $crate::Value {
                let index = <$ty>::__DRIFTCODEC_CONSTANTS
                    .iter()
                    .position(|constant| *constant == self)
                    .unwrap_or(usize::MAX);
                $crate::Value::Enum(index)
            }
        }
    };
}
