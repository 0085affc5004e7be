//! Variable-length layout.
//!
//! Integers are zig-zag varints, field ids are delta-encoded against the
//! previous field of the same struct, and boolean fields carry their value in
//! the field header type nibble.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::traits::{wire_len, ProtocolInput, ProtocolOutput};
use crate::types::{
    checked_len, FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, MessageKind,
    SetHeader,
};

pub const PROTOCOL_ID: u8 = 0x82;
const VERSION: u8 = 1;
const VERSION_MASK: u8 = 0x1F;
const KIND_SHIFT: u8 = 5;

const TYPE_STOP: u8 = 0x00;
const TYPE_BOOL_TRUE: u8 = 0x01;
const TYPE_BOOL_FALSE: u8 = 0x02;
const TYPE_BYTE: u8 = 0x03;
const TYPE_I16: u8 = 0x04;
const TYPE_I32: u8 = 0x05;
const TYPE_I64: u8 = 0x06;
const TYPE_DOUBLE: u8 = 0x07;
const TYPE_BINARY: u8 = 0x08;
const TYPE_LIST: u8 = 0x09;
const TYPE_SET: u8 = 0x0A;
const TYPE_MAP: u8 = 0x0B;
const TYPE_STRUCT: u8 = 0x0C;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Compact has no void tag; a void value would be read back as a struct.
fn compact_type(field_type: FieldType) -> Result<u8> {
    Ok(match field_type {
        FieldType::Stop => TYPE_STOP,
        FieldType::Bool => TYPE_BOOL_TRUE,
        FieldType::Byte => TYPE_BYTE,
        FieldType::I16 => TYPE_I16,
        FieldType::I32 => TYPE_I32,
        FieldType::I64 => TYPE_I64,
        FieldType::Double => TYPE_DOUBLE,
        FieldType::String => TYPE_BINARY,
        FieldType::List => TYPE_LIST,
        FieldType::Set => TYPE_SET,
        FieldType::Map => TYPE_MAP,
        FieldType::Struct => TYPE_STRUCT,
        FieldType::Void => {
            return Err(ProtocolError::UnsupportedType {
                layout: "compact",
                field_type,
            })
        }
    })
}

fn field_type(compact: u8) -> Result<FieldType> {
    Ok(match compact {
        TYPE_STOP => FieldType::Stop,
        TYPE_BOOL_TRUE | TYPE_BOOL_FALSE => FieldType::Bool,
        TYPE_BYTE => FieldType::Byte,
        TYPE_I16 => FieldType::I16,
        TYPE_I32 => FieldType::I32,
        TYPE_I64 => FieldType::I64,
        TYPE_DOUBLE => FieldType::Double,
        TYPE_BINARY => FieldType::String,
        TYPE_LIST => FieldType::List,
        TYPE_SET => FieldType::Set,
        TYPE_MAP => FieldType::Map,
        TYPE_STRUCT => FieldType::Struct,
        other => return Err(ProtocolError::InvalidFieldType(other)),
    })
}

fn zigzag_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

fn unzigzag_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

fn zigzag_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn unzigzag_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Reads the compact layout from a fully buffered message.
pub struct CompactInput {
    buf: Bytes,
    config: ProtocolConfig,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
    pending_bool: Option<bool>,
}

impl CompactInput {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self::with_config(buf, ProtocolConfig::default())
    }

    pub fn with_config(buf: impl Into<Bytes>, config: ProtocolConfig) -> Self {
        Self {
            buf: buf.into(),
            config,
            last_field_id: 0,
            field_id_stack: Vec::new(),
            pending_bool: None,
        }
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::UnexpectedEof {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn read_varint_64(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(ProtocolError::VarintOverflow);
            }
        }
    }

    fn read_varint_32(&mut self) -> Result<u32> {
        let mut result = 0u32;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            result |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 35 {
                return Err(ProtocolError::VarintOverflow);
            }
        }
    }

    fn read_size(&mut self) -> Result<usize> {
        let size = self.read_varint_32()?;
        let size = checked_len(i64::from(size as i32))?;
        self.config.check_container(size)
    }

    fn read_collection_begin(&mut self) -> Result<ListHeader> {
        let header = self.read_u8()?;
        let element_type = field_type(header & 0x0F)?;
        let short_size = usize::from(header >> 4);
        let size = if short_size == 0x0F {
            self.read_size()?
        } else {
            short_size
        };
        Ok(ListHeader { element_type, size })
    }
}

impl ProtocolInput for CompactInput {
    fn read_message_begin(&mut self) -> Result<MessageHeader> {
        let protocol_id = self.read_u8()?;
        if protocol_id != PROTOCOL_ID {
            return Err(ProtocolError::BadVersion(u32::from(protocol_id)));
        }
        let version_and_kind = self.read_u8()?;
        if version_and_kind & VERSION_MASK != VERSION {
            return Err(ProtocolError::BadVersion(u32::from(version_and_kind)));
        }
        let kind = MessageKind::from_u8(version_and_kind >> KIND_SHIFT)?;
        let sequence_id = self.read_varint_32()? as i32;
        let name = self.read_string()?;
        Ok(MessageHeader {
            name,
            kind,
            sequence_id,
        })
    }

    fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.last_field_id = self.field_id_stack.pop().unwrap_or(0);
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader> {
        let header = self.read_u8()?;
        let compact = header & 0x0F;
        if compact == TYPE_STOP {
            return Ok(FieldHeader::STOP);
        }

        let delta = header >> 4;
        let id = if delta == 0 {
            self.read_i16()?
        } else {
            self.last_field_id.wrapping_add(i16::from(delta))
        };

        let field_type = field_type(compact)?;
        if field_type == FieldType::Bool {
            self.pending_bool = Some(compact == TYPE_BOOL_TRUE);
        }
        self.last_field_id = id;
        Ok(FieldHeader { field_type, id })
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader> {
        let size = self.read_size()?;
        if size == 0 {
            return Ok(MapHeader::new(FieldType::Stop, FieldType::Stop, 0));
        }
        let types = self.read_u8()?;
        Ok(MapHeader {
            key_type: field_type(types >> 4)?,
            value_type: field_type(types & 0x0F)?,
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader> {
        self.read_collection_begin()
    }

    fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetHeader> {
        self.read_collection_begin()
    }

    fn read_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        if let Some(value) = self.pending_bool.take() {
            return Ok(value);
        }
        Ok(self.read_u8()? == TYPE_BOOL_TRUE)
    }

    fn read_byte(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(unzigzag_32(self.read_varint_32()?) as i16)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(unzigzag_32(self.read_varint_32()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(unzigzag_64(self.read_varint_64()?))
    }

    fn read_double(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    fn read_string(&mut self) -> Result<String> {
        let raw = self.read_binary()?;
        Ok(std::str::from_utf8(&raw)?.to_owned())
    }

    fn read_binary(&mut self) -> Result<Bytes> {
        let len = self.read_varint_32()?;
        let len = checked_len(i64::from(len as i32))?;
        let len = self.config.check_string(len)?;
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}

/// Writes the compact layout into an outbound buffer.
pub struct CompactOutput {
    buf: BytesMut,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
    pending_bool_field: Option<i16>,
}

impl CompactOutput {
    pub fn new() -> Self {
        Self::with_buffer(BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY))
    }

    pub fn with_buffer(buf: BytesMut) -> Self {
        Self {
            buf,
            last_field_id: 0,
            field_id_stack: Vec::new(),
            pending_bool_field: None,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn write_varint_32(&mut self, mut n: u32) {
        while n >= 0x80 {
            self.buf.put_u8((n as u8 & 0x7F) | 0x80);
            n >>= 7;
        }
        self.buf.put_u8(n as u8);
    }

    fn write_varint_64(&mut self, mut n: u64) {
        while n >= 0x80 {
            self.buf.put_u8((n as u8 & 0x7F) | 0x80);
            n >>= 7;
        }
        self.buf.put_u8(n as u8);
    }

    fn write_field_header(&mut self, compact: u8, id: i16) {
        let delta = i32::from(id) - i32::from(self.last_field_id);
        if delta > 0 && delta <= 15 {
            self.buf.put_u8(((delta as u8) << 4) | compact);
        } else {
            self.buf.put_u8(compact);
            self.write_varint_32(zigzag_32(i32::from(id)));
        }
        self.last_field_id = id;
    }

    fn write_collection_begin(&mut self, header: ListHeader) -> Result<()> {
        let compact = compact_type(header.element_type)?;
        if header.size < 15 {
            self.buf.put_u8(((header.size as u8) << 4) | compact);
        } else {
            self.buf.put_u8(0xF0 | compact);
            self.write_varint_32(wire_len("list", header.size)? as u32);
        }
        Ok(())
    }
}

impl Default for CompactOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolOutput for CompactOutput {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<()> {
        self.buf.put_u8(PROTOCOL_ID);
        self.buf
            .put_u8((VERSION & VERSION_MASK) | ((header.kind as u8) << KIND_SHIFT));
        self.write_varint_32(header.sequence_id as u32);
        self.write_string(&header.name)
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.last_field_id = self.field_id_stack.pop().unwrap_or(0);
        Ok(())
    }

    fn write_field_begin(&mut self, _name: &str, field_type: FieldType, id: i16) -> Result<()> {
        if field_type == FieldType::Bool {
            self.pending_bool_field = Some(id);
            return Ok(());
        }
        self.write_field_header(compact_type(field_type)?, id);
        Ok(())
    }

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<()> {
        self.buf.put_u8(TYPE_STOP);
        Ok(())
    }

    fn write_map_begin(&mut self, header: MapHeader) -> Result<()> {
        if header.size == 0 {
            self.buf.put_u8(0);
            return Ok(());
        }
        let key = compact_type(header.key_type)?;
        let value = compact_type(header.value_type)?;
        self.write_varint_32(wire_len("map", header.size)? as u32);
        self.buf.put_u8((key << 4) | value);
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_list_begin(&mut self, header: ListHeader) -> Result<()> {
        self.write_collection_begin(header)
    }

    fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_set_begin(&mut self, header: SetHeader) -> Result<()> {
        self.write_collection_begin(header)
    }

    fn write_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        let compact = if value {
            TYPE_BOOL_TRUE
        } else {
            TYPE_BOOL_FALSE
        };
        match self.pending_bool_field.take() {
            Some(id) => self.write_field_header(compact, id),
            None => self.buf.put_u8(compact),
        }
        Ok(())
    }

    fn write_byte(&mut self, value: i8) -> Result<()> {
        self.buf.put_i8(value);
        Ok(())
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_varint_32(zigzag_32(i32::from(value)));
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_varint_32(zigzag_32(value));
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_varint_64(zigzag_64(value));
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.buf.put_f64_le(value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_binary(value.as_bytes())
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.write_varint_32(wire_len("binary", value.len())? as u32);
        self.buf.put_slice(value);
        Ok(())
    }

    fn take_bytes(&mut self) -> Bytes {
        self.last_field_id = 0;
        self.field_id_stack.clear();
        self.pending_bool_field = None;
        self.buf.split().freeze()
    }
}
