//! Configuration for the mapping compiler.

/// Configuration for a single generation run
#[derive(Debug, Clone)]
pub struct MapGenConfig {
    /// Fail on field pairs the analyzer cannot classify instead of
    /// falling back to identity passthrough
    pub fail_on_unclassified: bool,
    /// Recursion bound for nested discovery when a field carries no
    /// explicit depth hint
    pub default_max_depth: usize,
    /// Log every chosen conversion at debug level
    pub log_conversions: bool,
}

impl Default for MapGenConfig {
    fn default() -> Self {
        Self {
            fail_on_unclassified: false,
            default_max_depth: 8,
            log_conversions: true,
        }
    }
}
