//! Pieces shared by the reflective and compiled struct codecs.

use std::any::Any;
use std::sync::Arc;

use driftcodec_metadata::access::SetterFn;
use driftcodec_metadata::{
    Arguments, Builder, Injection, Instance, ObjectValue, StructMetadata, TypeCoercion, TypeKey,
    Value, ValueError,
};
use driftcodec_protocol::{FieldType, ProtocolInput, ProtocolReader, ProtocolWriter};

use crate::codec::CodecRef;
use crate::error::{CodecError, Result};

/// Codec for one struct field. Coerced fields also carry the wire codec so a
/// native value that maps to "absent" can be omitted instead of written.
#[derive(Clone)]
pub(crate) struct FieldCodec {
    codec: CodecRef,
    coercion: Option<(Arc<TypeCoercion>, CodecRef)>,
}

impl FieldCodec {
    pub(crate) fn new(codec: CodecRef, coercion: Option<(Arc<TypeCoercion>, CodecRef)>) -> Self {
        Self { codec, coercion }
    }

    pub(crate) fn wire_type(&self) -> FieldType {
        self.codec.thrift_type().protocol_type()
    }

    pub(crate) fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        self.codec.read(input)
    }

    pub(crate) fn write_field(
        &self,
        writer: &mut ProtocolWriter<'_>,
        name: &str,
        id: i16,
        value: &Value,
    ) -> Result<()> {
        match &self.coercion {
            Some((coercion, wire)) => {
                let converted = coercion
                    .to_wire(value)
                    .map_err(|source| CodecError::Coercion {
                        native: coercion.native_type().name().to_string(),
                        source,
                    })?;
                let Some(wire_value) = converted else {
                    return Ok(());
                };
                writer.write_field_with(name, id, wire.thrift_type().protocol_type(), |output| {
                    wire.write(&wire_value, output)
                })
            }
            None => writer.write_field_with(name, id, self.wire_type(), |output| {
                self.codec.write(value, output)
            }),
        }
    }
}

/// Walk the fields of one struct. Fields that `resolve` does not know, and
/// fields whose wire type disagrees with the declared one, are skipped.
pub(crate) fn read_fields<'c, K: Copy>(
    input: &mut dyn ProtocolInput,
    struct_name: &str,
    resolve: impl Fn(i16) -> Option<(K, &'c FieldCodec)>,
    mut accept: impl FnMut(K, Value),
) -> Result<()> {
    let mut reader = ProtocolReader::new(input);
    reader.read_struct_begin()?;
    while reader.next_field()? {
        let id = reader.field_id()?;
        let Some((key, codec)) = resolve(id) else {
            tracing::trace!(struct_name, field_id = id, "skipping unknown field");
            reader.skip_field_data()?;
            continue;
        };
        if let Some(Some(value)) = reader.read_field_with(codec.wire_type(), |input| codec.read(input))? {
            accept(key, value);
        }
    }
    reader.read_struct_end()?;
    Ok(())
}

pub(crate) fn missing_required(struct_name: &str, field: &str, id: i16) -> CodecError {
    CodecError::MissingRequiredField {
        struct_name: struct_name.to_string(),
        field: field.to_string(),
        id,
    }
}

/// Run the builder step and check that it produced an instance of `key`.
pub(crate) fn finish_builder(
    struct_name: &str,
    key: TypeKey,
    builder: &Builder,
    instance: Instance,
    mut args: Arguments,
) -> Result<Instance> {
    let built = builder
        .build(instance, &mut args)
        .map_err(|err| CodecError::from_user(struct_name, err))?;
    let Some(built) = built else {
        return Err(CodecError::BuilderResult {
            struct_name: struct_name.to_string(),
            problem: "no instance".to_string(),
        });
    };
    if Any::type_id(&*built) != key.id() {
        return Err(CodecError::BuilderResult {
            struct_name: struct_name.to_string(),
            problem: format!("an instance of another type, expected {key}"),
        });
    }
    Ok(built)
}

/// Setter of the synthetic discriminant field, if the union declares one.
pub(crate) fn discriminant_setter(metadata: &StructMetadata) -> Option<SetterFn> {
    match metadata.discriminant()?.primary_injection()? {
        Injection::Field { setter } => Some(Arc::clone(setter)),
        _ => None,
    }
}

pub(crate) fn set_discriminant(
    struct_name: &str,
    setter: Option<&SetterFn>,
    instance: &mut Instance,
    active: Option<i16>,
) -> Result<()> {
    if let (Some(setter), Some(id)) = (setter, active) {
        setter(&mut **instance, Value::I16(id))
            .map_err(|err| CodecError::from_user(struct_name, err))?;
    }
    Ok(())
}

pub(crate) fn instance_of(value: &Value) -> Result<&(dyn Any + Send + Sync)> {
    match value {
        Value::Object(object) => Ok(object.as_any()),
        other => Err(ValueError::Mismatch {
            expected: "struct",
            found: other.kind_name(),
        }
        .into()),
    }
}

pub(crate) fn wrap(key: TypeKey, instance: Instance) -> Value {
    Value::Object(ObjectValue::from_box(key.name(), instance))
}

pub(crate) fn no_constructor(struct_name: &str) -> CodecError {
    CodecError::Construction {
        struct_name: struct_name.to_string(),
        source: "type declares no constructor".into(),
    }
}
