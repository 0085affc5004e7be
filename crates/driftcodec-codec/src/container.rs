use driftcodec_metadata::{ThriftType, Value, ValueError};
use driftcodec_protocol::{
    FieldType, ListHeader, MapHeader, ProtocolError, ProtocolInput, ProtocolOutput,
};

use crate::codec::{CodecRef, ThriftCodec};
use crate::error::Result;

/// Elements of a non-empty container must carry the declared wire type.
/// Empty containers may carry anything: the compact layout omits the type.
fn check_element_type(expected: FieldType, actual: FieldType, size: usize) -> Result<()> {
    if size > 0 && expected != actual {
        return Err(ProtocolError::ElementTypeMismatch { expected, actual }.into());
    }
    Ok(())
}

fn elements<'v>(value: &'v Value, expected: &'static str) -> Result<&'v [Value]> {
    match value {
        Value::List(items) | Value::Set(items) => Ok(items),
        other => Err(ValueError::Mismatch {
            expected,
            found: other.kind_name(),
        }
        .into()),
    }
}

/// `list<E>`. Elements whose codec yields nothing are dropped.
pub struct ListCodec {
    thrift_type: ThriftType,
    element: CodecRef,
}

impl ListCodec {
    pub fn new(element: CodecRef) -> Self {
        Self {
            thrift_type: ThriftType::list(element.thrift_type().clone()),
            element,
        }
    }
}

impl ThriftCodec for ListCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let header = input.read_list_begin()?;
        let expected = self.element.thrift_type().protocol_type();
        check_element_type(expected, header.element_type, header.size)?;

        let mut items = Vec::with_capacity(header.size.min(input.remaining()));
        for _ in 0..header.size {
            if let Some(item) = self.element.read(input)? {
                items.push(item);
            }
        }
        input.read_list_end()?;
        Ok(Some(Value::List(items)))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        let items = elements(value, "list")?;
        let element_type = self.element.thrift_type().protocol_type();
        output.write_list_begin(ListHeader::new(element_type, items.len()))?;
        for item in items {
            self.element.write(item, output)?;
        }
        output.write_list_end()?;
        Ok(())
    }
}

/// `set<E>`. Order is whatever the native collection yields.
pub struct SetCodec {
    thrift_type: ThriftType,
    element: CodecRef,
}

impl SetCodec {
    pub fn new(element: CodecRef) -> Self {
        Self {
            thrift_type: ThriftType::set(element.thrift_type().clone()),
            element,
        }
    }
}

impl ThriftCodec for SetCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let header = input.read_set_begin()?;
        let expected = self.element.thrift_type().protocol_type();
        check_element_type(expected, header.element_type, header.size)?;

        let mut items = Vec::with_capacity(header.size.min(input.remaining()));
        for _ in 0..header.size {
            if let Some(item) = self.element.read(input)? {
                items.push(item);
            }
        }
        input.read_set_end()?;
        Ok(Some(Value::Set(items)))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        let items = elements(value, "set")?;
        let element_type = self.element.thrift_type().protocol_type();
        output.write_set_begin(ListHeader::new(element_type, items.len()))?;
        for item in items {
            self.element.write(item, output)?;
        }
        output.write_set_end()?;
        Ok(())
    }
}

/// `map<K, V>`. An entry is dropped when either side yields nothing.
pub struct MapCodec {
    thrift_type: ThriftType,
    key: CodecRef,
    value: CodecRef,
}

impl MapCodec {
    pub fn new(key: CodecRef, value: CodecRef) -> Self {
        Self {
            thrift_type: ThriftType::map(key.thrift_type().clone(), value.thrift_type().clone()),
            key,
            value,
        }
    }
}

impl ThriftCodec for MapCodec {
    fn thrift_type(&self) -> &ThriftType {
        &self.thrift_type
    }

    fn read(&self, input: &mut dyn ProtocolInput) -> Result<Option<Value>> {
        let header = input.read_map_begin()?;
        check_element_type(
            self.key.thrift_type().protocol_type(),
            header.key_type,
            header.size,
        )?;
        check_element_type(
            self.value.thrift_type().protocol_type(),
            header.value_type,
            header.size,
        )?;

        let mut entries = Vec::with_capacity(header.size.min(input.remaining()));
        for _ in 0..header.size {
            let key = self.key.read(input)?;
            let value = self.value.read(input)?;
            if let (Some(key), Some(value)) = (key, value) {
                entries.push((key, value));
            }
        }
        input.read_map_end()?;
        Ok(Some(Value::Map(entries)))
    }

    fn write(&self, value: &Value, output: &mut dyn ProtocolOutput) -> Result<()> {
        let Value::Map(entries) = value else {
            return Err(ValueError::Mismatch {
                expected: "map",
                found: value.kind_name(),
            }
            .into());
        };
        output.write_map_begin(MapHeader::new(
            self.key.thrift_type().protocol_type(),
            self.value.thrift_type().protocol_type(),
            entries.len(),
        ))?;
        for (key, value) in entries {
            self.key.write(key, output)?;
            self.value.write(value, output)?;
        }
        output.write_map_end()?;
        Ok(())
    }
}
