use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use driftcodec_protocol::{ProtocolKind, WireValue};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One flattened node of a dumped payload.
#[derive(Debug, Serialize, PartialEq)]
pub struct FieldRow {
    pub path: String,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub value: String,
}

#[derive(Serialize)]
struct DumpOutput<'a> {
    protocol: &'a str,
    size: usize,
    fields: &'a [FieldRow],
}

/// Flatten a struct tree into rows addressed by field-id paths such as
/// `3[0].1` (field 3, element 0, field 1) or `4{1}.value`.
pub fn flatten(tree: &WireValue) -> Vec<FieldRow> {
    let mut rows = Vec::new();
    if let WireValue::Struct(fields) = tree {
        for field in fields {
            flatten_into(&field.id.to_string(), &field.value, &mut rows);
        }
    } else {
        flatten_into("", tree, &mut rows);
    }
    rows
}

fn flatten_into(path: &str, value: &WireValue, rows: &mut Vec<FieldRow>) {
    let field_type = value.field_type().name();
    match value {
        WireValue::Struct(fields) => {
            rows.push(FieldRow {
                path: path.to_string(),
                field_type,
                value: format!("<{} fields>", fields.len()),
            });
            for field in fields {
                flatten_into(&format!("{path}.{}", field.id), &field.value, rows);
            }
        }
        WireValue::List {
            element_type,
            elements,
        }
        | WireValue::Set {
            element_type,
            elements,
        } => {
            rows.push(FieldRow {
                path: path.to_string(),
                field_type,
                value: format!("<{} x {element_type}>", elements.len()),
            });
            for (index, element) in elements.iter().enumerate() {
                flatten_into(&format!("{path}[{index}]"), element, rows);
            }
        }
        WireValue::Map {
            key_type,
            value_type,
            entries,
        } => {
            rows.push(FieldRow {
                path: path.to_string(),
                field_type,
                value: format!("<{} x {key_type} -> {value_type}>", entries.len()),
            });
            for (index, (key, value)) in entries.iter().enumerate() {
                flatten_into(&format!("{path}{{{index}}}.key"), key, rows);
                flatten_into(&format!("{path}{{{index}}}.value"), value, rows);
            }
        }
        scalar => rows.push(FieldRow {
            path: path.to_string(),
            field_type,
            value: scalar_text(scalar),
        }),
    }
}

fn scalar_text(value: &WireValue) -> String {
    match value {
        WireValue::Bool(v) => v.to_string(),
        WireValue::Byte(v) => v.to_string(),
        WireValue::I16(v) => v.to_string(),
        WireValue::I32(v) => v.to_string(),
        WireValue::I64(v) => v.to_string(),
        WireValue::Double(v) => v.to_string(),
        WireValue::Binary(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => format!("{text:?}"),
            Err(_) => format!("0x{}", hex::encode(bytes)),
        },
        _ => String::new(),
    }
}

pub fn print_dump(tree: &WireValue, payload: &[u8], kind: ProtocolKind, format: OutputFormat) {
    let rows = flatten(tree);
    match format {
        OutputFormat::Json => {
            let out = DumpOutput {
                protocol: kind.name(),
                size: payload.len(),
                fields: &rows,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "TYPE", "VALUE"]);
            for row in &rows {
                table.add_row(vec![
                    row.path.clone(),
                    row.field_type.to_string(),
                    row.value.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} payload, {} bytes", kind, payload.len());
            for row in &rows {
                let depth = row.path.matches(['.', '[']).count();
                println!(
                    "{:indent$}{} ({}) = {}",
                    "",
                    row.path,
                    row.field_type,
                    row.value,
                    indent = depth * 2
                );
            }
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
