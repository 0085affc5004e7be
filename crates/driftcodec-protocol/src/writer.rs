use crate::error::{ProtocolError, Result};
use crate::traits::ProtocolOutput;
use crate::types::FieldType;

/// Struct-scoped field writer over a [`ProtocolOutput`].
///
/// Mirrors [`ProtocolReader`](crate::ProtocolReader): every field helper
/// frames the value with its header. Absent values are simply not written.
pub struct ProtocolWriter<'p> {
    output: &'p mut dyn ProtocolOutput,
    open: bool,
}

impl<'p> ProtocolWriter<'p> {
    pub fn new(output: &'p mut dyn ProtocolOutput) -> Self {
        Self {
            output,
            open: false,
        }
    }

    pub fn write_struct_begin(&mut self, name: &str) -> Result<()> {
        self.open = true;
        self.output.write_struct_begin(name)
    }

    /// Emits the STOP marker and closes the struct.
    pub fn write_struct_end(&mut self) -> Result<()> {
        if !self.open {
            return Err(ProtocolError::Usage(
                "write_struct_end called without write_struct_begin",
            ));
        }
        self.open = false;
        self.output.write_field_stop()?;
        self.output.write_struct_end()
    }

    pub fn write_bool_field(&mut self, name: &str, id: i16, value: bool) -> Result<()> {
        self.write_field_with(name, id, FieldType::Bool, |output| output.write_bool(value))
    }

    pub fn write_byte_field(&mut self, name: &str, id: i16, value: i8) -> Result<()> {
        self.write_field_with(name, id, FieldType::Byte, |output| output.write_byte(value))
    }

    pub fn write_i16_field(&mut self, name: &str, id: i16, value: i16) -> Result<()> {
        self.write_field_with(name, id, FieldType::I16, |output| output.write_i16(value))
    }

    pub fn write_i32_field(&mut self, name: &str, id: i16, value: i32) -> Result<()> {
        self.write_field_with(name, id, FieldType::I32, |output| output.write_i32(value))
    }

    pub fn write_i64_field(&mut self, name: &str, id: i16, value: i64) -> Result<()> {
        self.write_field_with(name, id, FieldType::I64, |output| output.write_i64(value))
    }

    pub fn write_double_field(&mut self, name: &str, id: i16, value: f64) -> Result<()> {
        self.write_field_with(name, id, FieldType::Double, |output| {
            output.write_double(value)
        })
    }

    pub fn write_string_field(&mut self, name: &str, id: i16, value: &str) -> Result<()> {
        self.write_field_with(name, id, FieldType::String, |output| {
            output.write_string(value)
        })
    }

    pub fn write_binary_field(&mut self, name: &str, id: i16, value: &[u8]) -> Result<()> {
        self.write_field_with(name, id, FieldType::String, |output| {
            output.write_binary(value)
        })
    }

    /// Frame a field whose value is written by `write`, typically a codec.
    pub fn write_field_with<E, F>(
        &mut self,
        name: &str,
        id: i16,
        field_type: FieldType,
        write: F,
    ) -> std::result::Result<(), E>
    where
        E: From<ProtocolError>,
        F: FnOnce(&mut dyn ProtocolOutput) -> std::result::Result<(), E>,
    {
        self.output.write_field_begin(name, field_type, id)?;
        write(&mut *self.output)?;
        self.output.write_field_end()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryInput, BinaryOutput};
    use crate::compact::{CompactInput, CompactOutput};
    use crate::reader::ProtocolReader;
    use crate::traits::ProtocolInput;

    fn write_sample(output: &mut dyn ProtocolOutput) {
        let mut writer = ProtocolWriter::new(output);
        writer.write_struct_begin("Sample").unwrap();
        writer.write_string_field("name", 1, "widget").unwrap();
        writer.write_i32_field("count", 2, 7).unwrap();
        writer.write_bool_field("active", 3, true).unwrap();
        writer.write_struct_end().unwrap();
    }

    fn read_sample(input: &mut dyn ProtocolInput) -> (String, i32, bool) {
        let mut reader = ProtocolReader::new(input);
        let mut name = String::new();
        let mut count = 0;
        let mut active = false;
        reader.read_struct_begin().unwrap();
        while reader.next_field().unwrap() {
            match reader.field_id().unwrap() {
                1 => name = reader.read_string_field().unwrap().unwrap(),
                2 => count = reader.read_i32_field().unwrap().unwrap(),
                3 => active = reader.read_bool_field().unwrap().unwrap(),
                _ => reader.skip_field_data().unwrap(),
            }
        }
        reader.read_struct_end().unwrap();
        (name, count, active)
    }

    #[test]
    fn binary_struct_roundtrip() {
        let mut output = BinaryOutput::new();
        write_sample(&mut output);
        let mut input = BinaryInput::new(output.into_bytes());
        assert_eq!(read_sample(&mut input), ("widget".to_string(), 7, true));
    }

    #[test]
    fn compact_struct_roundtrip() {
        let mut output = CompactOutput::new();
        write_sample(&mut output);
        let mut input = CompactInput::new(output.into_bytes());
        assert_eq!(read_sample(&mut input), ("widget".to_string(), 7, true));
    }

    #[test]
    fn end_without_begin_is_usage_error() {
        let mut output = BinaryOutput::new();
        let mut writer = ProtocolWriter::new(&mut output);
        assert!(matches!(
            writer.write_struct_end(),
            Err(ProtocolError::Usage(_))
        ));
    }
}
