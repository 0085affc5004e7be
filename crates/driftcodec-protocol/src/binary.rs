//! Fixed-width big-endian layout.
//!
//! ```text
//! field     : type (1B) | id (2B BE) | value
//! stop      : 0x00
//! string    : length (4B BE) | bytes
//! list/set  : element type (1B) | count (4B BE) | elements
//! map       : key type (1B) | value type (1B) | count (4B BE) | entries
//! message   : 0x8001 | 0x00 | kind (1B) | name | sequence id (4B BE)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::traits::{wire_len, ProtocolInput, ProtocolOutput};
use crate::types::{
    checked_len, FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, MessageKind,
    SetHeader,
};

/// Strict message version word.
pub const VERSION_1: u32 = 0x8001_0000;
const VERSION_MASK: u32 = 0xFFFF_0000;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Reads the binary layout from a fully buffered message.
pub struct BinaryInput {
    buf: Bytes,
    config: ProtocolConfig,
}

impl BinaryInput {
    /// Create an input with default limits.
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self::with_config(buf, ProtocolConfig::default())
    }

    /// Create an input with explicit limits.
    pub fn with_config(buf: impl Into<Bytes>, config: ProtocolConfig) -> Self {
        Self {
            buf: buf.into(),
            config,
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

    fn read_field_type(&mut self) -> Result<FieldType> {
        self.ensure(1)?;
        FieldType::from_u8(self.buf.get_u8())
    }

    fn read_size(&mut self) -> Result<usize> {
        let size = checked_len(i64::from(self.read_i32()?))?;
        self.config.check_container(size)
    }

    fn read_raw(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }
}

impl ProtocolInput for BinaryInput {
    fn read_message_begin(&mut self) -> Result<MessageHeader> {
        let word = self.read_i32()?;
        if word < 0 {
            let word = word as u32;
            if word & VERSION_MASK != VERSION_1 {
                return Err(ProtocolError::BadVersion(word));
            }
            let kind = MessageKind::from_u8((word & 0xFF) as u8)?;
            let name = self.read_string()?;
            let sequence_id = self.read_i32()?;
            return Ok(MessageHeader {
                name,
                kind,
                sequence_id,
            });
        }

        // Pre-versioned envelopes start with the bare name length.
        let len = self.config.check_string(checked_len(i64::from(word))?)?;
        let name = std::str::from_utf8(&self.read_raw(len)?)?.to_owned();
        self.ensure(1)?;
        let kind = MessageKind::from_u8(self.buf.get_u8())?;
        let sequence_id = self.read_i32()?;
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
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader> {
        let field_type = self.read_field_type()?;
        if field_type == FieldType::Stop {
            return Ok(FieldHeader::STOP);
        }
        let id = self.read_i16()?;
        Ok(FieldHeader { field_type, id })
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader> {
        let key_type = self.read_field_type()?;
        let value_type = self.read_field_type()?;
        let size = self.read_size()?;
        Ok(MapHeader {
            key_type,
            value_type,
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader> {
        let element_type = self.read_field_type()?;
        let size = self.read_size()?;
        Ok(ListHeader { element_type, size })
    }

    fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetHeader> {
        self.read_list_begin()
    }

    fn read_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    fn read_byte(&mut self) -> Result<i8> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    fn read_double(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    fn read_string(&mut self) -> Result<String> {
        let raw = self.read_binary()?;
        Ok(std::str::from_utf8(&raw)?.to_owned())
    }

    fn read_binary(&mut self) -> Result<Bytes> {
        let len = checked_len(i64::from(self.read_i32()?))?;
        let len = self.config.check_string(len)?;
        self.read_raw(len)
    }

    fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}

/// Writes the binary layout into an outbound buffer.
pub struct BinaryOutput {
    buf: BytesMut,
}

impl BinaryOutput {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write into an existing buffer, appending after its current contents.
    pub fn with_buffer(buf: BytesMut) -> Self {
        Self { buf }
    }

    /// Consume the output and return the encoded bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for BinaryOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolOutput for BinaryOutput {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<()> {
        self.buf.put_u32(VERSION_1 | header.kind as u32);
        self.write_string(&header.name)?;
        self.buf.put_i32(header.sequence_id);
        Ok(())
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_begin(&mut self, _name: &str, field_type: FieldType, id: i16) -> Result<()> {
        self.buf.put_u8(field_type.as_u8());
        self.buf.put_i16(id);
        Ok(())
    }

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<()> {
        self.buf.put_u8(FieldType::Stop.as_u8());
        Ok(())
    }

    fn write_map_begin(&mut self, header: MapHeader) -> Result<()> {
        self.buf.put_u8(header.key_type.as_u8());
        self.buf.put_u8(header.value_type.as_u8());
        self.buf.put_i32(wire_len("map", header.size)?);
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_list_begin(&mut self, header: ListHeader) -> Result<()> {
        self.buf.put_u8(header.element_type.as_u8());
        self.buf.put_i32(wire_len("list", header.size)?);
        Ok(())
    }

    fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_set_begin(&mut self, header: SetHeader) -> Result<()> {
        self.write_list_begin(header)
    }

    fn write_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.buf.put_u8(u8::from(value));
        Ok(())
    }

    fn write_byte(&mut self, value: i8) -> Result<()> {
        self.buf.put_i8(value);
        Ok(())
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.buf.put_i16(value);
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.buf.put_i32(value);
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.buf.put_i64(value);
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.buf.put_f64(value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_binary(value.as_bytes())
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.buf.put_i32(wire_len("binary", value.len())?);
        self.buf.put_slice(value);
        Ok(())
    }

    fn take_bytes(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_header_layout() {
        let mut out = BinaryOutput::new();
        out.write_field_begin("name", FieldType::String, 1).unwrap();
        out.write_string("ab").unwrap();
        out.write_field_stop().unwrap();

        let bytes = out.into_bytes();
        assert_eq!(
            bytes.as_ref(),
            &[0x0B, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, b'a', b'b', 0x00]
        );
    }

    #[test]
    fn read_field_header_and_stop() {
        let mut input = BinaryInput::new(vec![0x08, 0x00, 0x02, 0, 0, 0, 7, 0x00]);
        let header = input.read_field_begin().unwrap();
        assert_eq!(header, FieldHeader::new(FieldType::I32, 2));
        assert_eq!(input.read_i32().unwrap(), 7);
        assert!(input.read_field_begin().unwrap().is_stop());
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn truncated_value_is_eof() {
        let mut input = BinaryInput::new(vec![0x00, 0x01]);
        let err = input.read_i32().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedEof {
                needed: 4,
                remaining: 2
            }
        ));
    }

    #[test]
    fn negative_string_length_rejected() {
        let mut input = BinaryInput::new(vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            input.read_string(),
            Err(ProtocolError::NegativeLength(-1))
        ));
    }

    #[test]
    fn string_limit_enforced() {
        let config = ProtocolConfig {
            max_string_size: 2,
            ..ProtocolConfig::default()
        };
        let mut out = BinaryOutput::new();
        out.write_string("abc").unwrap();
        let mut input = BinaryInput::with_config(out.into_bytes(), config);
        assert!(matches!(
            input.read_string(),
            Err(ProtocolError::SizeLimit { what: "string", .. })
        ));
    }

    #[test]
    fn message_envelope_roundtrip() {
        let header = MessageHeader::new("getWidget", MessageKind::Call, 42);
        let mut out = BinaryOutput::new();
        out.write_message_begin(&header).unwrap();

        let mut input = BinaryInput::new(out.into_bytes());
        assert_eq!(input.read_message_begin().unwrap(), header);
    }

    #[test]
    fn unversioned_message_envelope() {
        let mut raw = BytesMut::new();
        raw.put_i32(3);
        raw.put_slice(b"get");
        raw.put_u8(MessageKind::Reply as u8);
        raw.put_i32(9);

        let mut input = BinaryInput::new(raw.freeze());
        let header = input.read_message_begin().unwrap();
        assert_eq!(header, MessageHeader::new("get", MessageKind::Reply, 9));
    }

    #[test]
    fn bad_version_rejected() {
        let mut raw = BytesMut::new();
        raw.put_u32(0x8002_0001);
        let mut input = BinaryInput::new(raw.freeze());
        assert!(matches!(
            input.read_message_begin(),
            Err(ProtocolError::BadVersion(0x8002_0001))
        ));
    }

    #[test]
    fn take_bytes_resets_output() {
        let mut out = BinaryOutput::new();
        out.write_i16(1).unwrap();
        assert_eq!(out.take_bytes().len(), 2);
        assert!(out.is_empty());
    }
}
