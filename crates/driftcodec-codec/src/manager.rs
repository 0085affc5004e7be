use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use driftcodec_metadata::{Describe, ThriftCatalog, ThriftType, TypeRef};

use crate::codec::{CodecRef, ErasedCodec, StructCodecHandle, TypedCodec};
use crate::coercion::CoercionCodec;
use crate::compiler::CodecCompiler;
use crate::config::{CodecConfig, CodecStrategy};
use crate::container::{ListCodec, MapCodec, SetCodec};
use crate::enums::EnumCodec;
use crate::error::Result;
use crate::internal::FieldCodec;
use crate::primitive::PrimitiveCodec;
use crate::reflective::{ReflectiveStructCodec, ReflectiveUnionCodec};

/// Thread-safe registry of codecs keyed by [`ThriftType`].
///
/// Explicitly registered codecs always win over derived ones and are never
/// replaced. Derived codecs are created on first request and cached; when two
/// threads race on the same type both may build a codec, but only the first
/// one published is ever returned.
pub struct CodecManager {
    catalog: Arc<ThriftCatalog>,
    config: CodecConfig,
    compiler: CodecCompiler,
    registered: DashMap<ThriftType, CodecRef>,
    cache: DashMap<ThriftType, CodecRef>,
}

impl CodecManager {
    /// Create a manager with default config and a fresh catalog.
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self::with_catalog(Arc::new(ThriftCatalog::new()), config)
    }

    /// Create a manager sharing an existing catalog.
    pub fn with_catalog(catalog: Arc<ThriftCatalog>, config: CodecConfig) -> Self {
        Self {
            catalog,
            compiler: CodecCompiler::new(&config),
            config,
            registered: DashMap::new(),
            cache: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<ThriftCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Register an explicit codec for its type, replacing any earlier
    /// explicit registration.
    pub fn add_codec(&self, codec: CodecRef) {
        let thrift_type = codec.thrift_type().clone();
        tracing::debug!(thrift_type = %thrift_type, "registering explicit codec");
        self.registered.insert(thrift_type, codec);
    }

    pub fn add_typed_codec<T, C>(&self, codec: C)
    where
        T: Any + Send + Sync,
        C: TypedCodec<T> + 'static,
    {
        self.add_codec(Arc::new(ErasedCodec::<T, C>::new(codec)));
    }

    /// Codec for `thrift_type`, creating and caching it if needed.
    pub fn get_codec(&self, thrift_type: &ThriftType) -> Result<CodecRef> {
        if let Some(codec) = self.registered.get(thrift_type) {
            return Ok(Arc::clone(codec.value()));
        }
        if let Some(codec) = self.cache.get(thrift_type) {
            return Ok(Arc::clone(codec.value()));
        }

        let created = self.create_codec(thrift_type)?;
        let published = self
            .cache
            .entry(thrift_type.clone())
            .or_insert(created)
            .value()
            .clone();
        Ok(published)
    }

    /// Codec for a declared type reference.
    pub fn codec_for_ref(&self, type_ref: &TypeRef) -> Result<CodecRef> {
        let thrift_type = self.catalog.thrift_type(type_ref)?;
        self.get_codec(&thrift_type)
    }

    /// Codec for the struct or union `T`.
    pub fn codec_for<T: Describe>(&self) -> Result<CodecRef> {
        self.codec_for_ref(&TypeRef::record::<T>())
    }

    /// Typed handle to the codec for `T`.
    pub fn typed<T: Describe>(&self) -> Result<StructCodecHandle<T>> {
        Ok(StructCodecHandle::new(self.codec_for::<T>()?))
    }

    /// Number of derived codecs created so far.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn field_codec(&self, thrift_type: &ThriftType) -> Result<FieldCodec> {
        let codec = self.get_codec(thrift_type)?;
        let coercion = match thrift_type {
            ThriftType::Coerced(coercion) => {
                Some((Arc::clone(coercion), self.get_codec(coercion.wire_type())?))
            }
            _ => None,
        };
        Ok(FieldCodec::new(codec, coercion))
    }

    fn create_codec(&self, thrift_type: &ThriftType) -> Result<CodecRef> {
        let codec: CodecRef = match thrift_type {
            ThriftType::Enum(metadata) => Arc::new(EnumCodec::new(Arc::clone(metadata))),
            ThriftType::Struct(metadata) | ThriftType::Union(metadata) => {
                match self.config.strategy {
                    CodecStrategy::Compiled => self.compiler.compile(self, metadata)?,
                    CodecStrategy::Reflective => {
                        let mut fields = HashMap::with_capacity(metadata.fields().len());
                        for field in metadata.fields() {
                            fields.insert(field.id(), self.field_codec(field.thrift_type())?);
                        }
                        if metadata.is_union() {
                            Arc::new(ReflectiveUnionCodec::new(Arc::clone(metadata), fields))
                        } else {
                            Arc::new(ReflectiveStructCodec::new(
                                Arc::clone(metadata),
                                fields,
                                self.config.enforce_required_fields,
                            ))
                        }
                    }
                }
            }
            ThriftType::List(element) => Arc::new(ListCodec::new(self.get_codec(element)?)),
            ThriftType::Set(element) => Arc::new(SetCodec::new(self.get_codec(element)?)),
            ThriftType::Map(key, value) => Arc::new(MapCodec::new(
                self.get_codec(key)?,
                self.get_codec(value)?,
            )),
            ThriftType::Coerced(coercion) => Arc::new(CoercionCodec::new(
                Arc::clone(coercion),
                self.get_codec(coercion.wire_type())?,
            )),
            ThriftType::Bool
            | ThriftType::Byte
            | ThriftType::I16
            | ThriftType::I32
            | ThriftType::I64
            | ThriftType::Double
            | ThriftType::String
            | ThriftType::Binary
            | ThriftType::Void => Arc::new(PrimitiveCodec::scalar(thrift_type.clone())),
        };
        tracing::debug!(thrift_type = %thrift_type, "created codec");
        Ok(codec)
    }
}

impl Default for CodecManager {
    fn default() -> Self {
        Self::new()
    }
}
