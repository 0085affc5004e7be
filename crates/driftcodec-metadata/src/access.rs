//! Injection, extraction and construction recipes.
//!
//! Recipes are type-erased closures built from typed ones at description
//! time. Every recipe checks the concrete type of the instance it is handed
//! and reports [`ValueError::TargetMismatch`] instead of panicking.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::ValueError;
use crate::value::{FromValue, IntoValue, Value};

/// Error returned by user supplied recipes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An instance under construction or being encoded.
pub type Instance = Box<dyn Any + Send + Sync>;

pub type SetterFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Value) -> Result<(), BoxError> + Send + Sync>;
pub type GetterFn =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<Option<Value>, BoxError> + Send + Sync>;
pub type MethodFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), &mut Arguments) -> Result<(), BoxError> + Send + Sync>;
pub type ConstructFn = Arc<dyn Fn(&mut Arguments) -> Result<Instance, BoxError> + Send + Sync>;
pub type BuildFn =
    Arc<dyn Fn(Instance, &mut Arguments) -> Result<Option<Instance>, BoxError> + Send + Sync>;
pub type UnionConstructFn = Arc<dyn Fn(Value) -> Result<Instance, BoxError> + Send + Sync>;

pub(crate) fn target_mut<T: Any>(
    target: &mut (dyn Any + Send + Sync),
) -> Result<&mut T, ValueError> {
    target.downcast_mut::<T>().ok_or(ValueError::TargetMismatch {
        expected: std::any::type_name::<T>(),
    })
}

pub(crate) fn target_ref<T: Any>(target: &(dyn Any + Send + Sync)) -> Result<&T, ValueError> {
    target.downcast_ref::<T>().ok_or(ValueError::TargetMismatch {
        expected: std::any::type_name::<T>(),
    })
}

/// Wrap a typed setter.
pub fn setter<T, V, F>(f: F) -> SetterFn
where
    T: Any,
    V: FromValue,
    F: Fn(&mut T, V) + Send + Sync + 'static,
{
    Arc::new(
        move |target: &mut (dyn Any + Send + Sync), value: Value| -> Result<(), BoxError> {
            let target = target_mut::<T>(target)?;
            f(target, V::from_value(value)?);
            Ok(())
        },
    )
}

/// Wrap a typed getter. `None` means the field is absent and is not written.
pub fn getter<T, V, F>(f: F) -> GetterFn
where
    T: Any,
    V: IntoValue,
    F: Fn(&T) -> Option<V> + Send + Sync + 'static,
{
    Arc::new(
        move |target: &(dyn Any + Send + Sync)| -> Result<Option<Value>, BoxError> {
            Ok(f(target_ref::<T>(target)?).map(IntoValue::into_value))
        },
    )
}

/// Positional arguments for constructors, methods and builders.
///
/// Slot `i` holds the decoded value of the field bound to parameter `i`, or
/// nothing if that field did not arrive.
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    /// All slots empty.
    pub fn with_len(len: usize) -> Self {
        Self {
            values: (0..len).map(|_| None).collect(),
        }
    }

    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = Some(value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_present(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    pub fn any_present(&self) -> bool {
        self.values.iter().any(Option::is_some)
    }

    pub fn take_value(&mut self, index: usize) -> Option<Value> {
        self.values.get_mut(index).and_then(Option::take)
    }

    /// Take argument `index`, falling back to the type's zero value.
    pub fn take<V: FromValue + Default>(&mut self, index: usize) -> Result<V, ValueError> {
        match self.take_value(index) {
            Some(value) => V::from_value(value),
            None => Ok(V::default()),
        }
    }

    pub fn take_opt<V: FromValue>(&mut self, index: usize) -> Result<Option<V>, ValueError> {
        self.take_value(index).map(V::from_value).transpose()
    }

    /// Take argument `index`, failing if it did not arrive.
    pub fn require<V: FromValue>(&mut self, index: usize) -> Result<V, ValueError> {
        let value = self
            .take_value(index)
            .ok_or(ValueError::MissingArgument { index })?;
        V::from_value(value)
    }
}

/// How a decoded value gets into a new instance.
#[derive(Clone)]
pub enum Injection {
    /// Positional constructor argument.
    ConstructorParameter { index: usize },
    /// Direct field assignment.
    Field { setter: SetterFn },
    /// Parameter `index` of method `method` in the struct's method list.
    Method { method: usize, index: usize },
    /// Positional argument of the post-construction builder step.
    BuilderParameter { index: usize },
}

impl Injection {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Injection::ConstructorParameter { .. } => "constructor",
            Injection::Field { .. } => "field",
            Injection::Method { .. } => "method",
            Injection::BuilderParameter { .. } => "builder",
        }
    }
}

impl fmt::Debug for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injection::ConstructorParameter { index } => {
                write!(f, "ConstructorParameter({index})")
            }
            Injection::Field { .. } => f.write_str("Field"),
            Injection::Method { method, index } => write!(f, "Method({method}, {index})"),
            Injection::BuilderParameter { index } => write!(f, "BuilderParameter({index})"),
        }
    }
}

/// How a value is pulled out of an instance for encoding.
#[derive(Clone)]
pub enum Extraction {
    Field { getter: GetterFn },
    Method { name: String, getter: GetterFn },
}

impl Extraction {
    pub fn extract(&self, instance: &(dyn Any + Send + Sync)) -> Result<Option<Value>, BoxError> {
        match self {
            Extraction::Field { getter } | Extraction::Method { getter, .. } => getter(instance),
        }
    }
}

impl fmt::Debug for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::Field { .. } => f.write_str("Field"),
            Extraction::Method { name, .. } => write!(f, "Method({name})"),
        }
    }
}

/// A method invoked after construction with one or more field values.
#[derive(Clone)]
pub struct MethodInjection {
    name: String,
    parameters: Vec<i16>,
    invoke: MethodFn,
}

impl MethodInjection {
    pub fn new<T, F>(name: impl Into<String>, parameters: &[i16], f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T, &mut Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters: parameters.to_vec(),
            invoke: Arc::new(
                move |target: &mut (dyn Any + Send + Sync),
                      args: &mut Arguments|
                      -> Result<(), BoxError> { f(target_mut::<T>(target)?, args) },
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field ids bound to each parameter position.
    pub fn parameters(&self) -> &[i16] {
        &self.parameters
    }

    pub fn invoke(
        &self,
        target: &mut (dyn Any + Send + Sync),
        args: &mut Arguments,
    ) -> Result<(), BoxError> {
        (self.invoke)(target, args)
    }
}

impl fmt::Debug for MethodInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInjection")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// The recipe that creates a new instance from positional field values.
#[derive(Clone)]
pub struct Construction {
    parameters: Vec<i16>,
    construct: ConstructFn,
    produces: &'static str,
}

impl Construction {
    /// `T::default()`, no parameters.
    pub fn default_of<T: Default + Any + Send + Sync>() -> Self {
        Self {
            parameters: Vec::new(),
            construct: Arc::new(|_: &mut Arguments| -> Result<Instance, BoxError> {
                Ok(Box::new(T::default()))
            }),
            produces: std::any::type_name::<T>(),
        }
    }

    /// A constructor taking the fields listed in `parameters`, in order.
    pub fn new<T, F>(parameters: &[i16], f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            parameters: parameters.to_vec(),
            construct: Arc::new(move |args: &mut Arguments| -> Result<Instance, BoxError> {
                Ok(Box::new(f(args)?) as Instance)
            }),
            produces: std::any::type_name::<T>(),
        }
    }

    pub fn parameters(&self) -> &[i16] {
        &self.parameters
    }

    /// Name of the type the constructor produces.
    pub fn produces(&self) -> &'static str {
        self.produces
    }

    pub fn construct(&self, args: &mut Arguments) -> Result<Instance, BoxError> {
        (self.construct)(args)
    }
}

impl fmt::Debug for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Construction")
            .field("parameters", &self.parameters)
            .field("produces", &self.produces)
            .finish()
    }
}

/// Post-construction step turning the constructed instance (typically a
/// builder object) into the final struct.
#[derive(Clone)]
pub struct Builder {
    parameters: Vec<i16>,
    build: BuildFn,
}

impl Builder {
    pub fn new<B, R, F>(parameters: &[i16], f: F) -> Self
    where
        B: Any + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(B, &mut Arguments) -> Result<Option<R>, BoxError> + Send + Sync + 'static,
    {
        Self {
            parameters: parameters.to_vec(),
            build: Arc::new(
                move |instance: Instance,
                      args: &mut Arguments|
                      -> Result<Option<Instance>, BoxError> {
                    let builder =
                        instance
                            .downcast::<B>()
                            .map_err(|_| ValueError::TargetMismatch {
                                expected: std::any::type_name::<B>(),
                            })?;
                    Ok(f(*builder, args)?.map(|built| Box::new(built) as Instance))
                },
            ),
        }
    }

    pub fn parameters(&self) -> &[i16] {
        &self.parameters
    }

    pub fn build(
        &self,
        instance: Instance,
        args: &mut Arguments,
    ) -> Result<Option<Instance>, BoxError> {
        (self.build)(instance, args)
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("parameters", &self.parameters)
            .finish()
    }
}
