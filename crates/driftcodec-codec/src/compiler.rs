//! Per-type specialized struct and union codecs.
//!
//! Compilation resolves every field codec up front and fixes the id-to-slot
//! dispatch and the injection plan, so decoding a message is a table lookup
//! per field followed by a straight walk over pre-bound recipes.
//!
//! ```text
//! ResolvingFieldCodecs -> EmittingRead -> EmittingWrite -> Binding -> Ready
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use driftcodec_metadata::access::{SetterFn, UnionConstructFn};
use driftcodec_metadata::{
    Arguments, Builder, Construction, Extraction, Injection, Instance, MethodInjection,
    StructMetadata, ThriftType, TypeKey, Value,
};
use driftcodec_protocol::{ProtocolInput, ProtocolOutput, ProtocolWriter};

use crate::codec::{CodecRef, ThriftCodec};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::internal::{self, FieldCodec};
use crate::manager::CodecManager;

/// Largest field id served by the direct lookup table.
const DENSE_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompileStage {
    ResolvingFieldCodecs,
    EmittingRead,
    EmittingWrite,
    Binding,
    Ready,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileStage::ResolvingFieldCodecs => "resolving-field-codecs",
            CompileStage::EmittingRead => "emitting-read",
            CompileStage::EmittingWrite => "emitting-write",
            CompileStage::Binding => "binding",
            CompileStage::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Field id to slot index.
#[derive(Debug)]
enum Dispatch {
    Dense(Vec<Option<usize>>),
    /// Sorted by id.
    Sparse(Vec<(i16, usize)>),
}

impl Dispatch {
    fn build(mut entries: Vec<(i16, usize)>) -> Self {
        let max_id = entries
            .iter()
            .filter_map(|(id, _)| usize::try_from(*id).ok())
            .max();
        let all_small = entries.iter().all(|(id, _)| *id >= 0);
        match max_id {
            Some(max) if all_small && max < DENSE_LIMIT => {
                let mut table = vec![None; max + 1];
                for (id, slot) in entries {
                    if let Some(entry) = usize::try_from(id).ok().and_then(|i| table.get_mut(i)) {
                        *entry = Some(slot);
                    }
                }
                Dispatch::Dense(table)
            }
            _ => {
                entries.sort_unstable_by_key(|(id, _)| *id);
                Dispatch::Sparse(entries)
            }
        }
    }

    fn slot(&self, id: i16) -> Option<usize> {
        match self {
            Dispatch::Dense(table) => usize::try_from(id)
                .ok()
                .and_then(|index| table.get(index))
                .copied()
                .flatten(),
            Dispatch::Sparse(entries) => entries
                .binary_search_by_key(&id, |(id, _)| *id)
                .ok()
                .and_then(|index| entries.get(index))
                .map(|(_, slot)| *slot),
        }
    }

    fn is_dense(&self) -> bool {
        matches!(self, Dispatch::Dense(_))
    }
}

/// Where a decoded field value goes.
enum Target {
    Constructor(usize),
    Setter(SetterFn),
    Method { method: usize, index: usize },
    Builder(usize),
    /// Only reachable through a union constructor.
    Unbound,
}

impl From<Option<&Injection>> for Target {
    fn from(injection: Option<&Injection>) -> Self {
        match injection {
            Some(Injection::ConstructorParameter { index }) => Target::Constructor(*index),
            Some(Injection::Field { setter }) => Target::Setter(Arc::clone(setter)),
            Some(Injection::Method { method, index }) => Target::Method {
                method: *method,
                index: *index,
            },
            Some(Injection::BuilderParameter { index }) => Target::Builder(*index),
            None => Target::Unbound,
        }
    }
}

struct ReadPlan {
    field: usize,
    target: Target,
    union_constructor: Option<UnionConstructFn>,
}

struct ReadSlot {
    id: i16,
    name: String,
    required: bool,
    target: Target,
    union_constructor: Option<UnionConstructFn>,
    codec: FieldCodec,
}

struct WriteSlot {
    id: i16,
    name: String,
    extraction: Extraction,
    codec: FieldCodec,
}

/// Pre-bound construction recipes of one type.
struct Assembly {
    struct_name: String,
    key: TypeKey,
    construction: Option<Construction>,
    methods: Vec<MethodInjection>,
    builder: Option<Builder>,
}

impl Assembly {
    fn new(metadata: &StructMetadata) -> Self {
        Self {
            struct_name: metadata.name().to_string(),
            key: metadata.key(),
            construction: metadata.construction().cloned(),
            methods: metadata.methods().to_vec(),
            builder: metadata.builder().cloned(),
        }
    }

    fn user_error(&self, err: driftcodec_metadata::BoxError) -> CodecError {
        CodecError::from_user(&self.struct_name, err)
    }

    /// Consume the scratch values into a new instance.
    fn assemble(&self, slots: &[ReadSlot], scratch: &mut [Option<Value>]) -> Result<Instance> {
        let construction = self
            .construction
            .as_ref()
            .ok_or_else(|| internal::no_constructor(&self.struct_name))?;

        let mut constructor_args = Arguments::with_len(construction.parameters().len());
        let mut method_args: Vec<Arguments> = self
            .methods
            .iter()
            .map(|method| Arguments::with_len(method.parameters().len()))
            .collect();
        let mut builder_args =
            Arguments::with_len(self.builder.as_ref().map_or(0, |b| b.parameters().len()));
        let mut assignments = Vec::new();

        for (slot, value) in slots.iter().zip(scratch.iter_mut()) {
            let Some(value) = value.take() else {
                continue;
            };
            match &slot.target {
                Target::Constructor(index) => constructor_args.set(*index, value),
                Target::Setter(setter) => assignments.push((setter, value)),
                Target::Method { method, index } => {
                    if let Some(args) = method_args.get_mut(*method) {
                        args.set(*index, value);
                    }
                }
                Target::Builder(index) => builder_args.set(*index, value),
                Target::Unbound => {}
            }
        }

        let mut instance = construction
            .construct(&mut constructor_args)
            .map_err(|err| self.user_error(err))?;
        for (setter, value) in assignments {
            setter(&mut *instance, value).map_err(|err| self.user_error(err))?;
        }
        for (method, mut args) in self.methods.iter().zip(method_args) {
            if args.any_present() {
                method
                    .invoke(&mut *instance, &mut args)
                    .map_err(|err| self.user_error(err))?;
            }
        }
        match &self.builder {
            Some(builder) => internal::finish_builder(
                &self.struct_name,
                self.key,
                builder,
                instance,
                builder_args,
            ),
            None => Ok(instance),
        }
    }
}

fn empty_scratch(len: usize) -> Vec<Option<Value>> {
    (0..len).map(|_| None).collect()
}

/// Produces compiled codecs for struct and union metadata.
#[derive(Debug, Clone)]
pub struct CodecCompiler {
    enforce_required: bool,
}

impl CodecCompiler {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            enforce_required: config.enforce_required_fields,
        }
    }

    /// Compile a codec for `metadata`. Field codecs are resolved through
    /// `manager`, so nested types share the manager's cached codecs.
    pub fn compile(
        &self,
        manager: &CodecManager,
        metadata: &Arc<StructMetadata>,
    ) -> Result<CodecRef> {
        let struct_name = metadata.name();
        let enter = |stage: CompileStage| tracing::trace!(struct_name, %stage, "compiling codec");

        enter(CompileStage::ResolvingFieldCodecs);
        let codecs = metadata
            .fields()
            .iter()
            .map(|field| manager.field_codec(field.thrift_type()))
            .collect::<Result<Vec<_>>>()?;

        enter(CompileStage::EmittingRead);
        let read_plans: Vec<ReadPlan> = metadata
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| field.is_readable())
            .map(|(position, field)| ReadPlan {
                field: position,
                target: Target::from(field.primary_injection()),
                union_constructor: field.union_constructor().cloned(),
            })
            .collect();

        enter(CompileStage::EmittingWrite);
        let write_plans: Vec<(usize, Extraction)> = metadata
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(position, field)| {
                field
                    .extraction()
                    .map(|extraction| (position, extraction.clone()))
            })
            .collect();

        enter(CompileStage::Binding);
        let fields = metadata.fields();
        let mut read_slots = Vec::with_capacity(read_plans.len());
        for plan in read_plans {
            let (Some(field), Some(codec)) = (fields.get(plan.field), codecs.get(plan.field)) else {
                continue;
            };
            read_slots.push(ReadSlot {
                id: field.id(),
                name: field.name().to_string(),
                required: field.is_required(),
                target: plan.target,
                union_constructor: plan.union_constructor,
                codec: codec.clone(),
            });
        }
        let mut write_slots = Vec::with_capacity(write_plans.len());
        for (position, extraction) in write_plans {
            let (Some(field), Some(codec)) = (fields.get(position), codecs.get(position)) else {
                continue;
            };
            write_slots.push(WriteSlot {
                id: field.id(),
                name: field.name().to_string(),
                extraction,
                codec: codec.clone(),
            });
        }
        let read_dispatch = Dispatch::build(
            read_slots
                .iter()
                .enumerate()
                .map(|(slot, read)| (read.id, slot))
                .collect(),
        );
        let assembly = Assembly::new(metadata);

        let codec: CodecRef = if metadata.is_union() {
            let write_dispatch = Dispatch::build(
                write_slots
                    .iter()
                    .enumerate()
                    .map(|(slot, write)| (write.id, slot))
                    .collect(),
            );
            Arc::new(CompiledUnionCodec {
                thrift_type: ThriftType::Union(Arc::clone(metadata)),
                metadata: Arc::clone(metadata),
                read_dispatch,
                read_slots,
                write_dispatch,
                write_slots,
                assembly,
                discriminant_setter: internal::discriminant_setter(metadata),
            })
        } else {
            let required = read_slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.required)
                .map(|(index, _)| index)
                .collect();
            tracing::debug!(
                struct_name,
                fields = read_slots.len(),
                dense = read_dispatch.is_dense(),
                "compiled struct codec"
            );
            Arc::new(CompiledStructCodec {
                thrift_type: ThriftType::Struct(Arc::clone(metadata)),
                metadata: Arc::clone(metadata),
                read_dispatch,
                read_slots,
                required,
                write_slots,
                assembly,
                enforce_required: self.enforce_required,
            })
        };
        enter(CompileStage::Ready);
        Ok(codec)
    }
}

pub struct CompiledStructCodec {
    thrift_type: ThriftType,
    metadata: Arc<StructMetadata>,
    read_dispatch: Dispatch,
    read_slots: Vec<ReadSlot>,
    /// Indices into `read_slots`.
    required: Vec<usize>,
    write_slots: Vec<WriteSlot>,
    assembly: Assembly,
    enforce_required: bool,
}

impl CompiledStructCodec {
    fn resolve(&self, id: i16) -> Option<(usize, &FieldCodec)> {
        let slot = self.read_dispatch.slot(id)?;
        self.read_slots.get(slot).map(|read| (slot, &read.codec))
    }
}

impl ThriftCodec for CompiledStructCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let struct_name = self.metadata.name();
        let mut scratch = empty_scratch(self.read_slots.len());
        internal::read_fields(
            input,
            struct_name,
            |id| self.resolve(id),
            |slot, value| {
                if let Some(entry) = scratch.get_mut(slot) {
                    *entry = Some(value);
                }
            },
        )?;

        if self.enforce_required {
            for &index in &self.required {
                if let (Some(None), Some(slot)) = (scratch.get(index), self.read_slots.get(index)) {
                    return Err(internal::missing_required(struct_name, &slot.name, slot.id));
                }
            }
        }

        let instance = self.assembly.assemble(&self.read_slots, &mut scratch)?;
        Ok(Some(internal::wrap(self.assembly.key, instance)))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        self.write_object(internal::instance_of(value)?, output)
    }

    fn write_object(
        &self,
        instance: &(dyn Any + Send + Sync),
        output: &mut dyn ProtocolOutput,
    ) -> Result<()> {
        let mut writer = ProtocolWriter::new(output);
        writer.write_struct_begin(self.metadata.name())?;
        for slot in &self.write_slots {
            let value = slot
                .extraction
                .extract(instance)
                .map_err(|err| self.assembly.user_error(err))?;
            if let Some(value) = value {
                slot.codec.write_field(&mut writer, &slot.name, slot.id, &value)?;
            }
        }
        writer.write_struct_end()?;
        Ok(())
    }
}

pub struct CompiledUnionCodec {
    thrift_type: ThriftType,
    metadata: Arc<StructMetadata>,
    read_dispatch: Dispatch,
    read_slots: Vec<ReadSlot>,
    write_dispatch: Dispatch,
    write_slots: Vec<WriteSlot>,
    assembly: Assembly,
    discriminant_setter: Option<SetterFn>,
}

impl ThriftCodec for CompiledUnionCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let struct_name = self.metadata.name();
        let mut scratch = empty_scratch(self.read_slots.len());
        let mut received = 0usize;
        internal::read_fields(
            input,
            struct_name,
            |id| {
                let slot = self.read_dispatch.slot(id)?;
                self.read_slots.get(slot).map(|read| (slot, &read.codec))
            },
            |slot, value| {
                if let Some(entry) = scratch.get_mut(slot) {
                    if entry.replace(value).is_none() {
                        received += 1;
                    }
                }
            },
        )?;

        if received > 1 {
            return Err(CodecError::UnionFieldCount {
                struct_name: struct_name.to_string(),
                count: received,
            });
        }

        let active = scratch.iter().position(Option::is_some);
        let mut instance = match active.and_then(|index| self.read_slots.get(index)) {
            Some(slot) => match (&slot.union_constructor, active) {
                (Some(constructor), Some(index)) => {
                    let value = scratch
                        .get_mut(index)
                        .and_then(Option::take)
                        .unwrap_or(Value::Void);
                    constructor(value).map_err(|err| self.assembly.user_error(err))?
                }
                _ => self.assembly.assemble(&self.read_slots, &mut scratch)?,
            },
            None => {
                if self.assembly.construction.is_none() {
                    return Err(CodecError::EmptyUnion {
                        struct_name: struct_name.to_string(),
                    });
                }
                self.assembly.assemble(&self.read_slots, &mut scratch)?
            }
        };
        let active_id = active
            .and_then(|index| self.read_slots.get(index))
            .map(|slot| slot.id);
        internal::set_discriminant(
            struct_name,
            self.discriminant_setter.as_ref(),
            &mut instance,
            active_id,
        )?;
        Ok(Some(internal::wrap(self.assembly.key, instance)))
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
        let active = self
            .metadata
            .active_field(instance)
            .map_err(|err| self.assembly.user_error(err))?;

        let mut writer = ProtocolWriter::new(output);
        writer.write_struct_begin(struct_name)?;
        if let Some(id) = active {
            match self
                .write_dispatch
                .slot(id)
                .and_then(|slot| self.write_slots.get(slot))
            {
                Some(slot) => {
                    let value = slot
                        .extraction
                        .extract(instance)
                        .map_err(|err| self.assembly.user_error(err))?;
                    let Some(value) = value else {
                        return Err(CodecError::EmptyUnionField {
                            struct_name: struct_name.to_string(),
                            field: slot.name.clone(),
                            id,
                        });
                    };
                    slot.codec.write_field(&mut writer, &slot.name, id, &value)?;
                }
                None => tracing::warn!(
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
