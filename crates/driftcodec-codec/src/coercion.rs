use std::sync::Arc;

use driftcodec_metadata::{BoxError, ThriftType, TypeCoercion, Value};
use driftcodec_protocol::{ProtocolInput, ProtocolOutput};

use crate::codec::{CodecRef, ThriftCodec};
use crate::error::{CodecError, Result};

/// Wraps the wire type's codec with a native conversion.
pub struct CoercionCodec {
    thrift_type: ThriftType,
    coercion: Arc<TypeCoercion>,
    wire: CodecRef,
}

impl CoercionCodec {
    pub fn new(coercion: Arc<TypeCoercion>, wire: CodecRef) -> Self {
        Self {
            thrift_type: ThriftType::Coerced(Arc::clone(&coercion)),
            coercion,
            wire,
        }
    }

    pub fn coercion(&self) -> &Arc<TypeCoercion> {
        &self.coercion
    }

    pub fn wire_codec(&self) -> &CodecRef {
        &self.wire
    }

    /// Native value to wire value. `None` means the native value stands for
    /// "absent".
    pub fn to_wire(&self, native: &Value) -> Result<Option<Value>> {
        self.coercion
            .to_wire(native)
            .map_err(|source| self.failure(source))
    }

    fn failure(&self, source: BoxError) -> CodecError {
        CodecError::Coercion {
            native: self.coercion.native_type().name().to_string(),
            source,
        }
    }
}

impl ThriftCodec for CoercionCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let Some(wire) = self.wire.read(input)? else {
            return Ok(None);
        };
        self.coercion
            .from_wire(wire)
            .map(Some)
            .map_err(|source| self.failure(source))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        match self.to_wire(value)? {
            Some(wire) => self.wire.write(&wire, output),
            None => Err(self.failure(
                "value maps to no wire value outside a struct field".into(),
            )),
        }
    }
}
