use bytes::Bytes;

use crate::error::{ProtocolError, Result};
use crate::traits::ProtocolInput;
use crate::types::{FieldHeader, FieldType};
use crate::util::skip;

/// Struct-scoped field cursor over a [`ProtocolInput`].
///
/// Drives the `read_struct_begin` / `next_field` / `read_*_field` /
/// `read_struct_end` sequence for one struct. Every field header returned by
/// [`next_field`](Self::next_field) must be consumed, either by a typed read or
/// by [`skip_field_data`](Self::skip_field_data), before the next call.
///
/// Typed reads check the wire type: a field carrying a different type than
/// expected is skipped and reported as absent instead of failing the message.
pub struct ProtocolReader<'p> {
    input: &'p mut dyn ProtocolInput,
    current: Option<FieldHeader>,
    stopped: bool,
}

impl<'p> ProtocolReader<'p> {
    pub fn new(input: &'p mut dyn ProtocolInput) -> Self {
        Self {
            input,
            current: None,
            stopped: false,
        }
    }

    pub fn read_struct_begin(&mut self) -> Result<()> {
        self.current = None;
        self.stopped = false;
        self.input.read_struct_begin()
    }

    /// Fails unless the STOP marker has been consumed.
    pub fn read_struct_end(&mut self) -> Result<()> {
        if !self.stopped {
            return Err(ProtocolError::Usage(
                "read_struct_end called before the STOP marker was consumed",
            ));
        }
        self.current = None;
        self.input.read_struct_end()
    }

    /// Advance past the next field header. Returns false at the STOP marker.
    pub fn next_field(&mut self) -> Result<bool> {
        if self.stopped {
            return Ok(false);
        }
        if self.current.is_some() {
            return Err(ProtocolError::Usage(
                "next_field called before the current field was consumed",
            ));
        }

        let header = self.input.read_field_begin()?;
        if header.is_stop() {
            self.stopped = true;
            return Ok(false);
        }
        self.current = Some(header);
        Ok(true)
    }

    /// Id of the field returned by the last `next_field`.
    pub fn field_id(&self) -> Result<i16> {
        self.current_header().map(|header| header.id)
    }

    /// Wire type of the field returned by the last `next_field`.
    pub fn field_type(&self) -> Result<FieldType> {
        self.current_header().map(|header| header.field_type)
    }

    /// Skip the current field's value, whatever its shape.
    pub fn skip_field_data(&mut self) -> Result<()> {
        let header = self.take_current()?;
        let depth = self.input.config().max_skip_depth;
        skip(&mut *self.input, header.field_type, depth)?;
        self.input.read_field_end()
    }

    pub fn read_bool_field(&mut self) -> Result<Option<bool>> {
        self.read_field_with(FieldType::Bool, |input| input.read_bool())
    }

    pub fn read_byte_field(&mut self) -> Result<Option<i8>> {
        self.read_field_with(FieldType::Byte, |input| input.read_byte())
    }

    pub fn read_i16_field(&mut self) -> Result<Option<i16>> {
        self.read_field_with(FieldType::I16, |input| input.read_i16())
    }

    pub fn read_i32_field(&mut self) -> Result<Option<i32>> {
        self.read_field_with(FieldType::I32, |input| input.read_i32())
    }

    pub fn read_i64_field(&mut self) -> Result<Option<i64>> {
        self.read_field_with(FieldType::I64, |input| input.read_i64())
    }

    pub fn read_double_field(&mut self) -> Result<Option<f64>> {
        self.read_field_with(FieldType::Double, |input| input.read_double())
    }

    pub fn read_string_field(&mut self) -> Result<Option<String>> {
        self.read_field_with(FieldType::String, |input| input.read_string())
    }

    pub fn read_binary_field(&mut self) -> Result<Option<Bytes>> {
        self.read_field_with(FieldType::String, |input| input.read_binary())
    }

    /// Read the current field through `read` when its wire type is `expected`.
    ///
    /// Struct, container and enum fields use this to hand the input to their
    /// codec. On a type mismatch the field is skipped and `Ok(None)` returned.
    pub fn read_field_with<T, E, F>(
        &mut self,
        expected: FieldType,
        read: F,
    ) -> std::result::Result<Option<T>, E>
    where
        E: From<ProtocolError>,
        F: FnOnce(&mut dyn ProtocolInput) -> std::result::Result<T, E>,
    {
        let header = self.current_header()?;
        if header.field_type != expected {
            tracing::trace!(
                field_id = header.id,
                expected = %expected,
                actual = %header.field_type,
                "skipping field with mismatched wire type"
            );
            self.skip_field_data()?;
            return Ok(None);
        }

        self.current = None;
        let value = read(&mut *self.input)?;
        self.input.read_field_end()?;
        Ok(Some(value))
    }

    fn current_header(&self) -> Result<FieldHeader> {
        self.current
            .ok_or(ProtocolError::Usage("no current field; call next_field first"))
    }

    fn take_current(&mut self) -> Result<FieldHeader> {
        let header = self.current_header()?;
        self.current = None;
        Ok(header)
    }
}
