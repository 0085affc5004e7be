use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::access::BoxError;
use crate::description::TypeKey;
use crate::error::ValueError;
use crate::types::ThriftType;
use crate::value::{FromValue, IntoValue, Value};

type ToWireFn = Arc<dyn Fn(&Value) -> Result<Option<Value>, BoxError> + Send + Sync>;
type FromWireFn = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// Bidirectional conversion between a native type and a wire type.
///
/// Native values travel as opaque objects; the wire side is an ordinary
/// value of `wire_type`. A `None` from the native-to-wire direction means
/// "absent": the field is omitted.
pub struct TypeCoercion {
    native: TypeKey,
    wire: ThriftType,
    to_wire: ToWireFn,
    from_wire: FromWireFn,
}

impl TypeCoercion {
    pub fn new<N, W, T, F>(wire: ThriftType, to_wire: T, from_wire: F) -> Self
    where
        N: Any + Send + Sync,
        W: FromValue + IntoValue,
        T: Fn(&N) -> Option<W> + Send + Sync + 'static,
        F: Fn(W) -> Result<N, BoxError> + Send + Sync + 'static,
    {
        Self {
            native: TypeKey::of::<N>(),
            wire,
            to_wire: Arc::new(move |value: &Value| -> Result<Option<Value>, BoxError> {
                let native = value
                    .as_object()
                    .and_then(|object| object.downcast_ref::<N>())
                    .ok_or(ValueError::Mismatch {
                        expected: std::any::type_name::<N>(),
                        found: value.kind_name(),
                    })?;
                Ok(to_wire(native).map(IntoValue::into_value))
            }),
            from_wire: Arc::new(move |value: Value| -> Result<Value, BoxError> {
                let native = from_wire(W::from_value(value)?)?;
                Ok(Value::object(native))
            }),
        }
    }

    pub fn native_type(&self) -> TypeKey {
        self.native
    }

    pub fn wire_type(&self) -> &ThriftType {
        &self.wire
    }

    pub fn to_wire(&self, native: &Value) -> Result<Option<Value>, BoxError> {
        (self.to_wire)(native)
    }

    pub fn from_wire(&self, wire: Value) -> Result<Value, BoxError> {
        (self.from_wire)(wire)
    }
}

impl fmt::Debug for TypeCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCoercion")
            .field("native", &self.native)
            .field("wire", &self.wire)
            .finish()
    }
}

/// `f32` carried as `double`.
pub fn float_coercion() -> TypeCoercion {
    TypeCoercion::new(
        ThriftType::Double,
        |value: &f32| Some(f64::from(*value)),
        |wire: f64| Ok(wire as f32),
    )
}

/// `SystemTime` carried as `i64` milliseconds since the Unix epoch.
pub fn system_time_coercion() -> TypeCoercion {
    TypeCoercion::new(ThriftType::I64, system_time_to_millis, millis_to_system_time)
}

fn system_time_to_millis(time: &SystemTime) -> Option<i64> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).ok(),
        Err(before) => i64::try_from(before.duration().as_millis())
            .ok()
            .map(|millis| -millis),
    }
}

fn millis_to_system_time(millis: i64) -> Result<SystemTime, BoxError> {
    let offset = Duration::from_millis(millis.unsigned_abs());
    let time = if millis >= 0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    };
    time.ok_or_else(|| format!("timestamp {millis}ms is out of range").into())
}
