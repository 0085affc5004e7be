use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use bytes::Bytes;

use crate::error::ValueError;

/// A decoded value in flight between codecs and native instances.
///
/// Scalars and containers are structural. Struct instances, union instances
/// and natively coerced values travel as opaque [`ObjectValue`]s. Enum
/// constants travel as their declaration index; the mapping to a wire value
/// belongs to the enum codec.
#[derive(Debug)]
pub enum Value {
    Void,
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Bytes),
    Enum(usize),
    Object(ObjectValue),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Wrap a native instance.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(ObjectValue::new(value))
    }

    /// Short name of this value's shape, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Enum(_) => "enum",
            Value::Object(object) => object.type_name(),
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    /// Unwrap an opaque instance of `T`.
    pub fn into_object<T: Any>(self) -> Result<T, ValueError> {
        match self {
            Value::Object(object) => object.downcast::<T>().map_err(|object| ValueError::Mismatch {
                expected: std::any::type_name::<T>(),
                found: object.type_name(),
            }),
            other => Err(ValueError::Mismatch {
                expected: std::any::type_name::<T>(),
                found: other.kind_name(),
            }),
        }
    }

    /// Declaration index of an enum constant.
    pub fn into_enum_index(self) -> Result<usize, ValueError> {
        match self {
            Value::Enum(index) => Ok(index),
            other => Err(mismatch("enum", &other)),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ValueError {
    ValueError::Mismatch {
        expected,
        found: found.kind_name(),
    }
}

/// An opaque native instance: a struct, a union, or a coerced native value.
pub struct ObjectValue {
    type_name: &'static str,
    inner: Box<dyn Any + Send + Sync>,
}

impl ObjectValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Box::new(value),
        }
    }

    /// Wrap an already boxed instance, e.g. the output of a constructor.
    pub fn from_box(type_name: &'static str, inner: Box<dyn Any + Send + Sync>) -> Self {
        Self { type_name, inner }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type id of the wrapped instance (not of the box).
    pub fn instance_type_id(&self) -> TypeId {
        Any::type_id(&*self.inner)
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.inner
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Take the instance out, or hand the object back if it holds another type.
    pub fn downcast<T: Any>(self) -> Result<T, ObjectValue> {
        let type_name = self.type_name;
        match self.inner.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(inner) => Err(ObjectValue { type_name, inner }),
        }
    }

    pub fn into_box(self) -> Box<dyn Any + Send + Sync> {
        self.inner
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectValue<{}>", self.type_name)
    }
}

/// Conversion from a decoded [`Value`] into a native type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

/// Conversion from a native type into a [`Value`] for encoding.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

macro_rules! scalar_value {
    ($($ty:ty => $variant:ident, $name:literal;)+) => {$(
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(mismatch($name, &other)),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    )+};
}

scalar_value! {
    bool => Bool, "bool";
    i8 => Byte, "byte";
    i16 => I16, "i16";
    i32 => I32, "i32";
    i64 => I64, "i64";
    f64 => Double, "double";
    String => String, "string";
    Bytes => Binary, "binary";
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Void => Ok(()),
            other => Err(mismatch("void", &other)),
        }
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Void
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        T::from_value(value).map(Some)
    }
}

fn elements(expected: &'static str, value: Value) -> Result<Vec<Value>, ValueError> {
    match value {
        Value::List(items) | Value::Set(items) => Ok(items),
        other => Err(mismatch(expected, &other)),
    }
}

fn entries(value: Value) -> Result<Vec<(Value, Value)>, ValueError> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(mismatch("map", &other)),
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements("list", value)?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue + Eq + Hash> FromValue for HashSet<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements("set", value)?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: IntoValue> IntoValue for HashSet<T> {
    fn into_value(self) -> Value {
        Value::Set(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements("set", value)?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: IntoValue> IntoValue for BTreeSet<T> {
    fn into_value(self) -> Value {
        Value::Set(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<K: FromValue + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for HashMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

/// Implement [`FromValue`] and [`IntoValue`] for native types that travel as
/// opaque objects (described structs and unions, coerced natives).
#[macro_export]
macro_rules! object_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::FromValue for $ty {
            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::ValueError> {
                value.into_object::<$ty>()
            }
        }

        impl $crate::IntoValue for $ty {
            fn into_value(self) -> $crate::Value {
                $crate::Value::object(self)
            }
        }
    )+};
}

object_value!(f32, std::time::SystemTime);
