use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::{Args, Subcommand};
use driftcodec_protocol::ProtocolKind;

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};
use crate::output::OutputFormat;

pub mod dump;
pub mod transcode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the field tree of one struct payload without a schema.
    Dump(DumpArgs),
    /// Rewrite a struct payload into another protocol layout.
    Transcode(TranscodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Dump(args) => dump::run(args, format),
        Command::Transcode(args) => transcode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Payload file.
    pub path: PathBuf,
    /// Protocol layout of the payload.
    #[arg(long, short = 'p', default_value = "binary")]
    pub protocol: ProtocolKind,
    /// The file holds hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct TranscodeArgs {
    /// Payload file to read.
    pub input: PathBuf,
    /// File to write the rewritten payload to.
    pub output: PathBuf,
    /// Protocol layout of the input.
    #[arg(long, default_value = "binary")]
    pub from: ProtocolKind,
    /// Protocol layout of the output.
    #[arg(long, default_value = "compact")]
    pub to: ProtocolKind,
    /// Read and write hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Read a payload file, decoding hex text when asked. Whitespace in hex text
/// is ignored.
pub fn read_payload(path: &Path, hex_text: bool) -> CliResult<Bytes> {
    let raw = fs::read(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    if !hex_text {
        return Ok(Bytes::from(raw));
    }
    let text: String = String::from_utf8_lossy(&raw).split_whitespace().collect();
    hex::decode(text).map(Bytes::from).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("{} is not valid hex: {err}", path.display()),
        )
    })
}

pub fn write_payload(path: &Path, payload: &[u8], hex_text: bool) -> CliResult<()> {
    let result = if hex_text {
        fs::write(path, format!("{}\n", hex::encode(payload)))
    } else {
        fs::write(path, payload)
    };
    result.map_err(|err| io_error(&format!("failed writing {}", path.display()), err))
}
