use bytes::Bytes;

use crate::config::ProtocolConfig;
use crate::error::Result;
use crate::types::{FieldHeader, FieldType, ListHeader, MapHeader, MessageHeader, SetHeader};

/// Low-level reading half of a concrete byte layout.
///
/// Implementations own the choice of encoding; everything above this trait is
/// layout agnostic. An input is bound to one buffered message and is never
/// shared between concurrent decodes.
pub trait ProtocolInput {
    fn read_message_begin(&mut self) -> Result<MessageHeader>;
    fn read_message_end(&mut self) -> Result<()>;

    fn read_struct_begin(&mut self) -> Result<()>;
    fn read_struct_end(&mut self) -> Result<()>;

    /// Read the next field header. A `Stop` header ends the struct.
    fn read_field_begin(&mut self) -> Result<FieldHeader>;
    fn read_field_end(&mut self) -> Result<()>;

    fn read_map_begin(&mut self) -> Result<MapHeader>;
    fn read_map_end(&mut self) -> Result<()>;
    fn read_list_begin(&mut self) -> Result<ListHeader>;
    fn read_list_end(&mut self) -> Result<()>;
    fn read_set_begin(&mut self) -> Result<SetHeader>;
    fn read_set_end(&mut self) -> Result<()>;

    fn read_bool(&mut self) -> Result<bool>;
    fn read_byte(&mut self) -> Result<i8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_binary(&mut self) -> Result<Bytes>;

    /// Limits applied to this input.
    fn config(&self) -> &ProtocolConfig;

    /// Bytes not yet consumed.
    fn remaining(&self) -> usize;
}

/// Low-level writing half of a concrete byte layout.
pub trait ProtocolOutput {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<()>;
    fn write_message_end(&mut self) -> Result<()>;

    fn write_struct_begin(&mut self, name: &str) -> Result<()>;
    fn write_struct_end(&mut self) -> Result<()>;

    fn write_field_begin(&mut self, name: &str, field_type: FieldType, id: i16) -> Result<()>;
    fn write_field_end(&mut self) -> Result<()>;
    fn write_field_stop(&mut self) -> Result<()>;

    fn write_map_begin(&mut self, header: MapHeader) -> Result<()>;
    fn write_map_end(&mut self) -> Result<()>;
    fn write_list_begin(&mut self, header: ListHeader) -> Result<()>;
    fn write_list_end(&mut self) -> Result<()>;
    fn write_set_begin(&mut self, header: SetHeader) -> Result<()>;
    fn write_set_end(&mut self) -> Result<()>;

    fn write_bool(&mut self, value: bool) -> Result<()>;
    fn write_byte(&mut self, value: i8) -> Result<()>;
    fn write_i16(&mut self, value: i16) -> Result<()>;
    fn write_i32(&mut self, value: i32) -> Result<()>;
    fn write_i64(&mut self, value: i64) -> Result<()>;
    fn write_double(&mut self, value: f64) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_binary(&mut self, value: &[u8]) -> Result<()>;

    /// Take everything written so far, leaving the output empty.
    fn take_bytes(&mut self) -> Bytes;
}

/// Reject lengths the wire cannot represent as a signed 32-bit count.
pub(crate) fn wire_len(what: &'static str, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| crate::ProtocolError::SizeLimit {
        what,
        size: len,
        max: i32::MAX as usize,
    })
}
