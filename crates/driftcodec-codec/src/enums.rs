use std::sync::Arc;

use driftcodec_metadata::{EnumMetadata, ThriftType, Value, ValueError};
use driftcodec_protocol::{ProtocolInput, ProtocolOutput};

use crate::codec::ThriftCodec;
use crate::error::Result;

/// Enum constants travel as `i32`: the explicit value when the enum declares
/// one, the declaration ordinal otherwise.
///
/// A wire value with no matching constant decodes to nothing, so a newer
/// writer's constants do not break an older reader.
pub struct EnumCodec {
    thrift_type: ThriftType,
    metadata: Arc<EnumMetadata>,
}

impl EnumCodec {
    pub fn new(metadata: Arc<EnumMetadata>) -> Self {
        Self {
            thrift_type: ThriftType::Enum(Arc::clone(&metadata)),
            metadata,
        }
    }
}

impl ThriftCodec for EnumCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let wire = input.read_i32()?;
        match self.metadata.index_of(wire) {
            Some(index) => Ok(Some(Value::Enum(index))),
            None => {
                tracing::warn!(
                    enum_name = self.metadata.name(),
                    value = wire,
                    "dropping unknown enum value"
                );
                Ok(None)
            }
        }
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        let Value::Enum(index) = value else {
            return Err(ValueError::Mismatch {
                expected: "enum",
                found: value.kind_name(),
            }
            .into());
        };
        let wire = self
            .metadata
            .wire_value(*index)
            .ok_or(ValueError::UnknownConstant {
                enum_name: self.metadata.key().name(),
                index: *index,
            })?;
        output.write_i32(wire)?;
        Ok(())
    }
}
