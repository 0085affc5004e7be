/// Catalog configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Register the built-in coercions (`f32` as `double`, `SystemTime` as
    /// `i64` epoch milliseconds) when the catalog is created.
    pub default_coercions: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_coercions: true,
        }
    }
}
