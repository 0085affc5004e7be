use driftcodec_protocol::{describe, FieldType};

use crate::cmd::{read_payload, DumpArgs};
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_dump, OutputFormat};

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = read_payload(&args.path, args.hex)?;
    let mut input = args.protocol.input(payload.clone());
    let max_depth = input.config().max_skip_depth;
    let tree = describe(input.as_mut(), FieldType::Struct, max_depth)
        .map_err(|err| protocol_error("decode failed", err))?;

    let trailing = input.remaining();
    if trailing > 0 {
        tracing::warn!(trailing, "payload has bytes after the struct");
    }
    tracing::debug!(protocol = %args.protocol, size = payload.len(), "dumped payload");

    print_dump(&tree, &payload, args.protocol, format);
    Ok(SUCCESS)
}
