use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::binary::{BinaryInput, BinaryOutput};
use crate::compact::{CompactInput, CompactOutput};
use crate::config::ProtocolConfig;
use crate::traits::{ProtocolInput, ProtocolOutput};

/// Concrete byte layout selected at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolKind {
    #[default]
    Binary,
    Compact,
}

impl ProtocolKind {
    /// Bind an input of this layout to a buffered message.
    pub fn input(self, buf: impl Into<Bytes>) -> Box<dyn ProtocolInput> {
        self.input_with_config(buf, ProtocolConfig::default())
    }

    pub fn input_with_config(
        self,
        buf: impl Into<Bytes>,
        config: ProtocolConfig,
    ) -> Box<dyn ProtocolInput> {
        match self {
            ProtocolKind::Binary => Box::new(BinaryInput::with_config(buf, config)),
            ProtocolKind::Compact => Box::new(CompactInput::with_config(buf, config)),
        }
    }

    /// Create an empty output of this layout.
    pub fn output(self) -> Box<dyn ProtocolOutput> {
        match self {
            ProtocolKind::Binary => Box::new(BinaryOutput::new()),
            ProtocolKind::Compact => Box::new(CompactOutput::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProtocolKind::Binary => "binary",
            ProtocolKind::Compact => "compact",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(ProtocolKind::Binary),
            "compact" => Ok(ProtocolKind::Compact),
            other => Err(format!("unknown protocol: {other}")),
        }
    }
}
