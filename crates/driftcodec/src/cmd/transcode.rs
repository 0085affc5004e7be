use comfy_table::{presets::UTF8_FULL, Table};
use driftcodec_protocol::{transcode, FieldType, ProtocolKind};
use serde::Serialize;

use crate::cmd::{read_payload, write_payload, TranscodeArgs};
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_raw, OutputFormat};

#[derive(Serialize)]
struct TranscodeOutput<'a> {
    from: &'a str,
    to: &'a str,
    input_size: usize,
    output_size: usize,
    output: String,
}

pub fn run(args: TranscodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = read_payload(&args.input, args.hex)?;
    let rewritten = rewrite(&payload, args.from, args.to)?;
    write_payload(&args.output, &rewritten, args.hex)?;
    tracing::debug!(
        from = %args.from,
        to = %args.to,
        input_size = payload.len(),
        output_size = rewritten.len(),
        "transcoded payload"
    );

    match format {
        OutputFormat::Json => {
            let out = TranscodeOutput {
                from: args.from.name(),
                to: args.to.name(),
                input_size: payload.len(),
                output_size: rewritten.len(),
                output: args.output.display().to_string(),
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
                .set_header(vec!["FROM", "TO", "IN BYTES", "OUT BYTES", "OUTPUT"])
                .add_row(vec![
                    args.from.to_string(),
                    args.to.to_string(),
                    payload.len().to_string(),
                    rewritten.len().to_string(),
                    args.output.display().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} ({} bytes) -> {} ({} bytes) written to {}",
                args.from,
                payload.len(),
                args.to,
                rewritten.len(),
                args.output.display()
            );
        }
        OutputFormat::Raw => print_raw(&rewritten),
    }
    Ok(SUCCESS)
}

/// Rewrite one struct payload from layout `from` into layout `to`.
fn rewrite(payload: &[u8], from: ProtocolKind, to: ProtocolKind) -> CliResult<Vec<u8>> {
    let mut input = from.input(payload.to_vec());
    let mut output = to.output();
    let max_depth = input.config().max_skip_depth;
    transcode(input.as_mut(), output.as_mut(), FieldType::Struct, max_depth)
        .map_err(|err| protocol_error("transcode failed", err))?;
    Ok(output.take_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use driftcodec_protocol::ProtocolWriter;

    use super::*;

    fn sample(kind: ProtocolKind) -> Vec<u8> {
        let mut output = kind.output();
        {
            let mut writer = ProtocolWriter::new(output.as_mut());
            writer.write_struct_begin("Sample").unwrap();
            writer.write_string_field("name", 1, "widget").unwrap();
            writer.write_i32_field("count", 2, 7).unwrap();
            writer.write_bool_field("active", 3, true).unwrap();
            writer.write_struct_end().unwrap();
        }
        output.take_bytes().to_vec()
    }

    #[test]
    fn binary_to_compact_matches_native_compact() {
        let rewritten = rewrite(
            &sample(ProtocolKind::Binary),
            ProtocolKind::Binary,
            ProtocolKind::Compact,
        )
        .unwrap();
        assert_eq!(rewritten, sample(ProtocolKind::Compact));
    }

    #[test]
    fn garbage_is_data_invalid() {
        let err = rewrite(&[0x0b, 0x00], ProtocolKind::Binary, ProtocolKind::Compact).unwrap_err();
        assert_eq!(err.code, crate::exit::DATA_INVALID);
    }
}
