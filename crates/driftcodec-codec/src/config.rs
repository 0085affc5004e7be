/// How struct and union codecs are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecStrategy {
    /// Specialized per type: field dispatch and injection plans fixed at
    /// codec creation.
    #[default]
    Compiled,
    /// Interpret the metadata on every call.
    Reflective,
}

/// Codec manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub strategy: CodecStrategy,
    /// Fail decoding when a REQUIRED field is absent. When off, the field is
    /// left at its zero value like any other missing field.
    pub enforce_required_fields: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            strategy: CodecStrategy::Compiled,
            enforce_required_fields: true,
        }
    }
}
