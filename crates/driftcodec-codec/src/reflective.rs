use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use driftcodec_metadata::access::SetterFn;
use driftcodec_metadata::{Arguments, Injection, Instance, StructMetadata, ThriftType, Value};
use driftcodec_protocol::{ProtocolInput, ProtocolOutput, ProtocolWriter};

use crate::codec::ThriftCodec;
use crate::error::{CodecError, Result};
use crate::internal::{self, FieldCodec};

/// Build a field-value map into a new instance by walking the metadata's
/// injection recipes.
fn assemble(metadata: &StructMetadata, mut data: HashMap<i16, Value>) -> Result<Instance> {
    let struct_name = metadata.name();
    let user = |err| CodecError::from_user(struct_name, err);
    let construction = metadata
        .construction()
        .ok_or_else(|| internal::no_constructor(struct_name))?;

    let mut constructor_args = Arguments::with_len(construction.parameters().len());
    let mut method_args: Vec<Arguments> = metadata
        .methods()
        .iter()
        .map(|method| Arguments::with_len(method.parameters().len()))
        .collect();
    let mut builder_args =
        Arguments::with_len(metadata.builder().map_or(0, |b| b.parameters().len()));
    let mut assignments = Vec::new();

    for field in metadata.fields() {
        let Some(value) = data.remove(&field.id()) else {
            continue;
        };
        match field.primary_injection() {
            Some(Injection::ConstructorParameter { index }) => constructor_args.set(*index, value),
            Some(Injection::Field { setter }) => assignments.push((setter, value)),
            Some(Injection::Method { method, index }) => {
                if let Some(args) = method_args.get_mut(*method) {
                    args.set(*index, value);
                }
            }
            Some(Injection::BuilderParameter { index }) => builder_args.set(*index, value),
            None => {}
        }
    }

    let mut instance = construction.construct(&mut constructor_args).map_err(user)?;
    for (setter, value) in assignments {
        setter(&mut *instance, value).map_err(user)?;
    }
    for (method, mut args) in metadata.methods().iter().zip(method_args) {
        if args.any_present() {
            method.invoke(&mut *instance, &mut args).map_err(user)?;
        }
    }
    match metadata.builder() {
        Some(builder) => {
            internal::finish_builder(struct_name, metadata.key(), builder, instance, builder_args)
        }
        None => Ok(instance),
    }
}

/// Interprets struct metadata on every call.
pub struct ReflectiveStructCodec {
    thrift_type: ThriftType,
    metadata: Arc<StructMetadata>,
    fields: HashMap<i16, FieldCodec>,
    enforce_required: bool,
}

impl ReflectiveStructCodec {
    pub(crate) fn new(
        metadata: Arc<StructMetadata>,
        fields: HashMap<i16, FieldCodec>,
        enforce_required: bool,
    ) -> Self {
        Self {
            thrift_type: ThriftType::Struct(Arc::clone(&metadata)),
            metadata,
            fields,
            enforce_required,
        }
    }

    fn readable(&self, id: i16) -> Option<(i16, &FieldCodec)> {
        let field = self.metadata.field(id)?;
        if !field.is_readable() {
            return None;
        }
        self.fields.get(&id).map(|codec| (id, codec))
    }
}

impl ThriftCodec for ReflectiveStructCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let struct_name = self.metadata.name();
        let mut data = HashMap::new();
        internal::read_fields(
            input,
            struct_name,
            |id| self.readable(id),
            |id, value| {
                data.insert(id, value);
            },
        )?;

        if self.enforce_required {
            for field in self.metadata.fields() {
                if field.is_required() && field.is_readable() && !data.contains_key(&field.id()) {
                    return Err(internal::missing_required(struct_name, field.name(), field.id()));
                }
            }
        }

        let instance = assemble(&self.metadata, data)?;
        Ok(Some(internal::wrap(self.metadata.key(), instance)))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        self.write_object(internal::instance_of(value)?, output)
    }

    fn write_object(
        &self,
        instance: &(dyn Any + Send + Sync),
        output: &mut dyn ProtocolOutput,
    ) -> Result<()> {
        let struct_name = self.metadata.name();
        let mut writer = ProtocolWriter::new(output);
        writer.write_struct_begin(struct_name)?;
        for field in self.metadata.fields() {
            let Some(codec) = self.fields.get(&field.id()) else {
                continue;
            };
            let value = field
                .extract(instance)
                .map_err(|err| CodecError::from_user(struct_name, err))?;
            if let Some(value) = value {
                codec.write_field(&mut writer, field.name(), field.id(), &value)?;
            }
        }
        writer.write_struct_end()?;
        Ok(())
    }
}

/// Interprets union metadata on every call.
pub struct ReflectiveUnionCodec {
    thrift_type: ThriftType,
    metadata: Arc<StructMetadata>,
    fields: HashMap<i16, FieldCodec>,
    discriminant_setter: Option<SetterFn>,
}

impl ReflectiveUnionCodec {
    pub(crate) fn new(metadata: Arc<StructMetadata>, fields: HashMap<i16, FieldCodec>) -> Self {
        Self {
            thrift_type: ThriftType::Union(Arc::clone(&metadata)),
            discriminant_setter: internal::discriminant_setter(&metadata),
            metadata,
            fields,
        }
    }
}

impl ThriftCodec for ReflectiveUnionCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let struct_name = self.metadata.name();
        let mut data = HashMap::new();
        internal::read_fields(
            input,
            struct_name,
            |id| {
                let field = self.metadata.field(id)?;
                if !field.is_readable() {
                    return None;
                }
                self.fields.get(&id).map(|codec| (id, codec))
            },
            |id, value| {
                data.insert(id, value);
            },
        )?;

        if data.len() > 1 {
            return Err(CodecError::UnionFieldCount {
                struct_name: struct_name.to_string(),
                count: data.len(),
            });
        }

        let received = data.drain().next();
        let active = received.as_ref().map(|(id, _)| *id);
        let mut instance = match received {
            Some((id, value)) => {
                let constructor = self
                    .metadata
                    .field(id)
                    .and_then(|field| field.union_constructor());
                match constructor {
                    Some(constructor) => constructor(value)
                        .map_err(|err| CodecError::from_user(struct_name, err))?,
                    None => assemble(&self.metadata, HashMap::from([(id, value)]))?,
                }
            }
            None => {
                if self.metadata.construction().is_none() {
                    return Err(CodecError::EmptyUnion {
                        struct_name: struct_name.to_string(),
                    });
                }
                assemble(&self.metadata, data)?
            }
        };
        internal::set_discriminant(
            struct_name,
            self.discriminant_setter.as_ref(),
            &mut instance,
            active,
        )?;
        Ok(Some(internal::wrap(self.metadata.key(), instance)))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        self.write_object(internal::instance_of(value)?, output)
    }

    fn write_object(
        &self,
        instance: &(dyn Any + Send + Sync),
        output: &mut dyn ProtocolOutput,
    ) -> Result<()> {
        let struct_name = self.metadata.name();
        let user = |err| CodecError::from_user(struct_name, err);
        let active = self.metadata.active_field(instance).map_err(user)?;

        let mut writer = ProtocolWriter::new(output);
        writer.write_struct_begin(struct_name)?;
        if let Some(id) = active {
            match (self.metadata.field(id), self.fields.get(&id)) {
                (Some(field), Some(codec)) => {
                    let Some(value) = field.extract(instance).map_err(user)? else {
                        return Err(CodecError::EmptyUnionField {
                            struct_name: struct_name.to_string(),
                            field: field.name().to_string(),
                            id,
                        });
                    };
                    codec.write_field(&mut writer, field.name(), id, &value)?;
                }
                _ => tracing::warn!(
                    struct_name,
                    field_id = id,
                    "active union field is not declared"
                ),
            }
        }
        writer.write_struct_end()?;
        Ok(())
    }
}
