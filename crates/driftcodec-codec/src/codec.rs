use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use driftcodec_metadata::{ThriftType, Value, ValueError};
use driftcodec_protocol::{ProtocolInput, ProtocolKind, ProtocolOutput};

use crate::error::{CodecError, Result};

/// Reads and writes values of one [`ThriftType`].
///
/// A codec reads exactly one value of its type from the input positioned at
/// the value's first byte and leaves the input positioned after it. Codecs are
/// immutable once created and may be used from any number of threads.
pub trait ThriftCodec: Send + Sync {
    fn thrift_type(&self) -> &ThriftType;

    /// Decode one value. `Ok(None)` means the value was consumed but has no
    /// native representation (an enum constant unknown to this reader); the
    /// enclosing struct or container drops it.
    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>>;

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()>;

    /// Encode a borrowed native instance without wrapping it in a [`Value`].
    /// Only struct-like codecs support this.
    fn write_object(
        &self,
        instance: &(dyn Any + Send + Sync),
        output: &mut dyn ProtocolOutput,
    ) -> Result<()> {
        let _ = (instance, output);
        Err(CodecError::ValueMismatch(ValueError::Mismatch {
            expected: "structural value",
            found: "native instance",
        }))
    }
}

/// Shared handle to a type-erased codec.
pub type CodecRef = Arc<dyn ThriftCodec>;

/// A hand-written codec for a native type `T`.
///
/// Register one with
/// [`CodecManager::add_typed_codec`](crate::CodecManager::add_typed_codec)
/// to override the derived codec for `thrift_type()`.
pub trait TypedCodec<T>: Send + Sync {
    fn thrift_type(&self) -> &ThriftType;
    fn read(&self, input: &mut dyn ProtocolInput) -> Result<T>;
    fn write(&self, value: &T, output: &mut dyn ProtocolOutput) -> Result<()>;
}

/// Adapts a [`TypedCodec`] to the erased [`ThriftCodec`] interface. Values
/// cross the boundary as opaque objects.
pub struct ErasedCodec<T, C> {
    inner: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> ErasedCodec<T, C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T, C> ThriftCodec for ErasedCodec<T, C>
where
    T: Any + Send + Sync,
    C: TypedCodec<T>,
{
    fn thrift_type(&self) -> &ThriftType {
        self.inner.thrift_type()
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        Ok(Some(Value::object(self.inner.read(input)?)))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        let native = value
            .as_object()
            .and_then(|object| object.downcast_ref::<T>())
            .ok_or(ValueError::Mismatch {
                expected: std::any::type_name::<T>(),
                found: value.kind_name(),
            })?;
        self.inner.write(native, output)
    }

    fn write_object(
        &self,
        instance: &(dyn Any + Send + Sync),
        output: &mut dyn ProtocolOutput,
    ) -> Result<()> {
        let native = instance
            .downcast_ref::<T>()
            .ok_or(ValueError::TargetMismatch {
                expected: std::any::type_name::<T>(),
            })?;
        self.inner.write(native, output)
    }
}

/// Typed view of a struct or union codec.
pub struct StructCodecHandle<T> {
    codec: CodecRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StructCodecHandle<T> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> StructCodecHandle<T> {
    pub fn new(codec: CodecRef) -> Self {
        Self {
            codec,
            _marker: PhantomData,
        }
    }

    pub fn codec(&self) -> &CodecRef {
        &self.codec
    }

    pub fn read(&self, input: &mut dyn ProtocolInput) -> Result<T> {
        let value = self.codec.read(input)?.ok_or(ValueError::Mismatch {
            expected: std::any::type_name::<T>(),
            found: "nothing",
        })?;
        Ok(value.into_object::<T>()?)
    }

    pub fn write(&self, value: &T, output: &mut dyn ProtocolOutput) -> Result<()> {
        self.codec.write_object(value, output)
    }

    /// Encode `value` as a standalone struct in the given layout.
    pub fn encode(&self, value: &T, kind: ProtocolKind) -> Result<Bytes> {
        let mut output = kind.output();
        self.write(value, output.as_mut())?;
        Ok(output.take_bytes())
    }

    /// Decode a standalone struct in the given layout.
    pub fn decode(&self, bytes: impl Into<Bytes>, kind: ProtocolKind) -> Result<T> {
        let mut input = kind.input(bytes);
        self.read(input.as_mut())
    }
}
