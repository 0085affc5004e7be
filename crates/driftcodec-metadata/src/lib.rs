//! Type descriptions and derived metadata for driftcodec.
//!
//! Native types describe themselves ([`Describe`], [`DescribeEnum`]) as field
//! lists with ids, declared types and access recipes. [`ThriftCatalog`] turns a
//! description into validated, cached [`StructMetadata`] / [`EnumMetadata`]
//! and resolves declared [`TypeRef`]s into [`ThriftType`]s.
//!
//! Decoded data travels as [`Value`]: structural for scalars and containers,
//! opaque ([`ObjectValue`]) for struct, union and coerced native instances.

pub mod access;
pub mod catalog;
pub mod coercion;
pub mod config;
pub mod description;
pub mod error;
pub mod metadata;
pub mod types;
pub mod value;

pub use access::{
    Arguments, BoxError, Builder, Construction, Extraction, Injection, Instance, MethodInjection,
};
pub use catalog::ThriftCatalog;
pub use coercion::TypeCoercion;
pub use config::CatalogConfig;
pub use description::{
    Describe, DescribeEnum, EnumConstant, EnumDescription, EnumRef, FieldDescription,
    StructDescription, StructKind, StructRef, TypeKey, TypeRef,
};
pub use error::{CatalogError, Result, ValueError};
pub use metadata::{
    EnumConstantMetadata, EnumMetadata, FieldKind, FieldMetadata, Requiredness, StructMetadata,
    DISCRIMINANT_ID, DISCRIMINANT_NAME,
};
pub use types::ThriftType;
pub use value::{FromValue, IntoValue, ObjectValue, Value};
