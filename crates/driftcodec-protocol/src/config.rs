/// Default maximum string or binary size: 16 MiB.
pub const DEFAULT_MAX_STRING_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum number of container elements.
pub const DEFAULT_MAX_CONTAINER_SIZE: usize = 1024 * 1024;

/// Default maximum nesting depth for type-directed skipping.
pub const DEFAULT_MAX_SKIP_DEPTH: usize = 64;

/// Limits applied by protocol readers to untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Maximum string or binary length in bytes. Default: 16 MiB.
    pub max_string_size: usize,
    /// Maximum element count of a list, set or map.
    pub max_container_size: usize,
    /// Maximum nesting depth when skipping or transcoding unknown values.
    pub max_skip_depth: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_container_size: DEFAULT_MAX_CONTAINER_SIZE,
            max_skip_depth: DEFAULT_MAX_SKIP_DEPTH,
        }
    }
}

impl ProtocolConfig {
    pub(crate) fn check_string(&self, size: usize) -> crate::Result<usize> {
        if size > self.max_string_size {
            return Err(crate::ProtocolError::SizeLimit {
                what: "string",
                size,
                max: self.max_string_size,
            });
        }
        Ok(size)
    }

    pub(crate) fn check_container(&self, size: usize) -> crate::Result<usize> {
        if size > self.max_container_size {
            return Err(crate::ProtocolError::SizeLimit {
                what: "container",
                size,
                max: self.max_container_size,
            });
        }
        Ok(size)
    }
}
