use driftcodec_metadata::{ThriftType, Value, ValueError};
use driftcodec_protocol::{ProtocolInput, ProtocolOutput};

use crate::codec::ThriftCodec;
use crate::error::Result;

/// Codec for the scalar types and `void`.
#[derive(Debug)]
pub struct PrimitiveCodec {
    thrift_type: ThriftType,
}

impl PrimitiveCodec {
    /// Returns `None` for non-scalar types.
    pub fn new(thrift_type: ThriftType) -> Option<Self> {
        match thrift_type {
            ThriftType::Bool
            | ThriftType::Byte
            | ThriftType::I16
            | ThriftType::I32
            | ThriftType::I64
            | ThriftType::Double
            | ThriftType::String
            | ThriftType::Binary
            | ThriftType::Void => Some(Self { thrift_type }),
            _ => None,
        }
    }

    /// Callers guarantee `thrift_type` is a scalar.
    pub(crate) fn scalar(thrift_type: ThriftType) -> Self {
        Self { thrift_type }
    }

    fn mismatch(&self, value: &Value) -> ValueError {
        ValueError::Mismatch {
            expected: scalar_name(&self.thrift_type),
            found: value.kind_name(),
        }
    }
}

fn scalar_name(thrift_type: &ThriftType) -> &'static str {
    match thrift_type {
        ThriftType::Bool => "bool",
        ThriftType::Byte => "byte",
        ThriftType::I16 => "i16",
        ThriftType::I32 => "i32",
        ThriftType::I64 => "i64",
        ThriftType::Double => "double",
        ThriftType::String => "string",
        ThriftType::Binary => "binary",
        _ => "void",
    }
}

impl ThriftCodec for PrimitiveCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let value = match self.thrift_type {
            ThriftType::Bool => Value::Bool(input.read_bool()?),
            ThriftType::Byte => Value::Byte(input.read_byte()?),
            ThriftType::I16 => Value::I16(input.read_i16()?),
            ThriftType::I32 => Value::I32(input.read_i32()?),
            ThriftType::I64 => Value::I64(input.read_i64()?),
            ThriftType::Double => Value::Double(input.read_double()?),
            ThriftType::String => Value::String(input.read_string()?),
            ThriftType::Binary => Value::Binary(input.read_binary()?),
            _ => Value::Void,
        };
        Ok(Some(value))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        match (&self.thrift_type, value) {
            (ThriftType::Bool, Value::Bool(v)) => output.write_bool(*v)?,
            (ThriftType::Byte, Value::Byte(v)) => output.write_byte(*v)?,
            (ThriftType::I16, Value::I16(v)) => output.write_i16(*v)?,
            (ThriftType::I32, Value::I32(v)) => output.write_i32(*v)?,
            (ThriftType::I64, Value::I64(v)) => output.write_i64(*v)?,
            (ThriftType::Double, Value::Double(v)) => output.write_double(*v)?,
            (ThriftType::String, Value::String(v)) => output.write_string(v)?,
            (ThriftType::Binary, Value::Binary(v)) => output.write_binary(v)?,
            (ThriftType::Void, _) => {}
            _ => return Err(self.mismatch(value).into()),
        }
        Ok(())
    }
}
