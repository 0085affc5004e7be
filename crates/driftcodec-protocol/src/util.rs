//! Schema-less walks over wire data: skip, transcode and describe.

use bytes::Bytes;

use crate::error::{ProtocolError, Result};
use crate::traits::{ProtocolInput, ProtocolOutput};
use crate::types::{FieldType, ListHeader, MapHeader};

/// Consume one value of type `field_type` without interpreting it.
///
/// Recursion is bounded by `max_depth`; every loop is bounded by the counts
/// read from the wire, and every read either consumes bytes or fails, so a
/// skip always terminates.
pub fn skip(input: &mut dyn ProtocolInput, field_type: FieldType, max_depth: usize) -> Result<()> {
    if max_depth == 0 {
        return Err(ProtocolError::DepthLimit(input.config().max_skip_depth));
    }
    let depth = max_depth - 1;

    match field_type {
        FieldType::Void => {}
        FieldType::Bool => {
            input.read_bool()?;
        }
        FieldType::Byte => {
            input.read_byte()?;
        }
        FieldType::I16 => {
            input.read_i16()?;
        }
        FieldType::I32 => {
            input.read_i32()?;
        }
        FieldType::I64 => {
            input.read_i64()?;
        }
        FieldType::Double => {
            input.read_double()?;
        }
        FieldType::String => {
            input.read_binary()?;
        }
        FieldType::Struct => {
            input.read_struct_begin()?;
            loop {
                let header = input.read_field_begin()?;
                if header.is_stop() {
                    break;
                }
                skip(input, header.field_type, depth)?;
                input.read_field_end()?;
            }
            input.read_struct_end()?;
        }
        FieldType::Map => {
            let header = input.read_map_begin()?;
            for _ in 0..header.size {
                skip(input, header.key_type, depth)?;
                skip(input, header.value_type, depth)?;
            }
            input.read_map_end()?;
        }
        FieldType::List => {
            let header = input.read_list_begin()?;
            for _ in 0..header.size {
                skip(input, header.element_type, depth)?;
            }
            input.read_list_end()?;
        }
        FieldType::Set => {
            let header = input.read_set_begin()?;
            for _ in 0..header.size {
                skip(input, header.element_type, depth)?;
            }
            input.read_set_end()?;
        }
        FieldType::Stop => {
            return Err(ProtocolError::InvalidFieldType(field_type.as_u8()));
        }
    }
    Ok(())
}

/// Copy one value of type `field_type` from `input` to `output`.
///
/// The two sides may use different layouts; nothing but the wire shape is
/// needed. Field names are not carried on the wire and are written empty.
pub fn transcode(
    input: &mut dyn ProtocolInput,
    output: &mut dyn ProtocolOutput,
    field_type: FieldType,
    max_depth: usize,
) -> Result<()> {
    if max_depth == 0 {
        return Err(ProtocolError::DepthLimit(input.config().max_skip_depth));
    }
    let depth = max_depth - 1;

    match field_type {
        FieldType::Void => Ok(()),
        FieldType::Bool => output.write_bool(input.read_bool()?),
        FieldType::Byte => output.write_byte(input.read_byte()?),
        FieldType::I16 => output.write_i16(input.read_i16()?),
        FieldType::I32 => output.write_i32(input.read_i32()?),
        FieldType::I64 => output.write_i64(input.read_i64()?),
        FieldType::Double => output.write_double(input.read_double()?),
        FieldType::String => output.write_binary(&input.read_binary()?),
        FieldType::Struct => {
            input.read_struct_begin()?;
            output.write_struct_begin("")?;
            loop {
                let header = input.read_field_begin()?;
                if header.is_stop() {
                    break;
                }
                output.write_field_begin("", header.field_type, header.id)?;
                transcode(input, output, header.field_type, depth)?;
                output.write_field_end()?;
                input.read_field_end()?;
            }
            output.write_field_stop()?;
            input.read_struct_end()?;
            output.write_struct_end()
        }
        FieldType::Map => {
            let header = input.read_map_begin()?;
            output.write_map_begin(header)?;
            for _ in 0..header.size {
                transcode(input, output, header.key_type, depth)?;
                transcode(input, output, header.value_type, depth)?;
            }
            input.read_map_end()?;
            output.write_map_end()
        }
        FieldType::List => {
            let header = input.read_list_begin()?;
            output.write_list_begin(header)?;
            for _ in 0..header.size {
                transcode(input, output, header.element_type, depth)?;
            }
            input.read_list_end()?;
            output.write_list_end()
        }
        FieldType::Set => {
            let header = input.read_set_begin()?;
            output.write_set_begin(header)?;
            for _ in 0..header.size {
                transcode(input, output, header.element_type, depth)?;
            }
            input.read_set_end()?;
            output.write_set_end()
        }
        FieldType::Stop => Err(ProtocolError::InvalidFieldType(field_type.as_u8())),
    }
}

/// One field of a [`WireValue::Struct`].
#[derive(Debug, Clone, PartialEq)]
pub struct WireField {
    pub id: i16,
    pub value: WireValue,
}

/// A value decoded without metadata, keeping only what the wire says.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Present on the wire with no payload.
    Void,
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    /// Strings and binary are indistinguishable on the wire.
    Binary(Bytes),
    Struct(Vec<WireField>),
    List {
        element_type: FieldType,
        elements: Vec<WireValue>,
    },
    Set {
        element_type: FieldType,
        elements: Vec<WireValue>,
    },
    Map {
        key_type: FieldType,
        value_type: FieldType,
        entries: Vec<(WireValue, WireValue)>,
    },
}

impl WireValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            WireValue::Void => FieldType::Void,
            WireValue::Bool(_) => FieldType::Bool,
            WireValue::Byte(_) => FieldType::Byte,
            WireValue::I16(_) => FieldType::I16,
            WireValue::I32(_) => FieldType::I32,
            WireValue::I64(_) => FieldType::I64,
            WireValue::Double(_) => FieldType::Double,
            WireValue::Binary(_) => FieldType::String,
            WireValue::Struct(_) => FieldType::Struct,
            WireValue::List { .. } => FieldType::List,
            WireValue::Set { .. } => FieldType::Set,
            WireValue::Map { .. } => FieldType::Map,
        }
    }
}

/// Decode one value of type `field_type` into a [`WireValue`] tree.
pub fn describe(
    input: &mut dyn ProtocolInput,
    field_type: FieldType,
    max_depth: usize,
) -> Result<WireValue> {
    if max_depth == 0 {
        return Err(ProtocolError::DepthLimit(input.config().max_skip_depth));
    }
    let depth = max_depth - 1;

    Ok(match field_type {
        FieldType::Void => WireValue::Void,
        FieldType::Bool => WireValue::Bool(input.read_bool()?),
        FieldType::Byte => WireValue::Byte(input.read_byte()?),
        FieldType::I16 => WireValue::I16(input.read_i16()?),
        FieldType::I32 => WireValue::I32(input.read_i32()?),
        FieldType::I64 => WireValue::I64(input.read_i64()?),
        FieldType::Double => WireValue::Double(input.read_double()?),
        FieldType::String => WireValue::Binary(input.read_binary()?),
        FieldType::Struct => {
            let mut fields = Vec::new();
            input.read_struct_begin()?;
            loop {
                let header = input.read_field_begin()?;
                if header.is_stop() {
                    break;
                }
                let value = describe(input, header.field_type, depth)?;
                input.read_field_end()?;
                fields.push(WireField {
                    id: header.id,
                    value,
                });
            }
            input.read_struct_end()?;
            WireValue::Struct(fields)
        }
        FieldType::Map => {
            let MapHeader {
                key_type,
                value_type,
                size,
            } = input.read_map_begin()?;
            let mut entries = Vec::with_capacity(size.min(1024));
            for _ in 0..size {
                let key = describe(input, key_type, depth)?;
                let value = describe(input, value_type, depth)?;
                entries.push((key, value));
            }
            input.read_map_end()?;
            WireValue::Map {
                key_type,
                value_type,
                entries,
            }
        }
        FieldType::List => {
            let ListHeader { element_type, size } = input.read_list_begin()?;
            let elements = describe_elements(input, element_type, size, depth)?;
            input.read_list_end()?;
            WireValue::List {
                element_type,
                elements,
            }
        }
        FieldType::Set => {
            let ListHeader { element_type, size } = input.read_set_begin()?;
            let elements = describe_elements(input, element_type, size, depth)?;
            input.read_set_end()?;
            WireValue::Set {
                element_type,
                elements,
            }
        }
        FieldType::Stop => {
            return Err(ProtocolError::InvalidFieldType(field_type.as_u8()));
        }
    })
}

fn describe_elements(
    input: &mut dyn ProtocolInput,
    element_type: FieldType,
    size: usize,
    depth: usize,
) -> Result<Vec<WireValue>> {
    let mut elements = Vec::with_capacity(size.min(1024));
    for _ in 0..size {
        elements.push(describe(input, element_type, depth)?);
    }
    Ok(elements)
}
