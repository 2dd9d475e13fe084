//! Error handling for the mapping compiler.

use thiserror::Error;

/// Diagnostics raised while resolving, analyzing or emitting a mapping.
///
/// Everything here is fatal for the schema pair being processed; the
/// generator records the failure in the report and moves on to the next
/// domain schema.
#[derive(Debug, Error)]
pub enum MapGenError {
    /// A schema name that does not resolve to any declaration
    #[error("unresolvable schema reference '{0}'")]
    UnresolvableSchema(String),

    /// An enum name that does not resolve to any declaration
    #[error("unresolvable enum reference '{0}'")]
    UnresolvableEnum(String),

    /// A cycle in an `extends` chain
    #[error("inheritance cycle through schema '{0}'")]
    InheritanceCycle(String),

    /// Strict mode: a transfer field whose bound name has no domain counterpart
    #[error("transfer schema '{schema}': field '{field}' binds to '{bound}', which does not exist in domain schema '{domain}'")]
    UnboundField {
        /// The transfer schema being resolved
        schema: String,
        /// The offending transfer field
        field: String,
        /// The bound domain field name that failed to resolve
        bound: String,
        /// The domain schema searched
        domain: String,
    },

    /// Temporal conversion declared without a format pattern
    #[error("field '{field}': temporal conversion requires a format pattern")]
    MissingTemporalFormat {
        /// The field missing the pattern
        field: String,
    },

    /// A format pattern that fails self-validation
    #[error("field '{field}': invalid temporal format pattern '{pattern}'")]
    InvalidTemporalFormat {
        /// The field carrying the pattern
        field: String,
        /// The rejected pattern
        pattern: String,
    },

    /// A nested transfer type that cannot be default-constructed
    #[error("nested transfer type '{0}' has no parameterless constructor")]
    MissingDefaultCtor(String),

    /// An unclassifiable field pair, surfaced only when configured to fail
    #[error("field '{field}': no conversion from {source_ty} to {target_ty}")]
    UnclassifiedPair {
        /// The transfer field
        field: String,
        /// Source type rendering
        source_ty: String,
        /// Target type rendering
        target_ty: String,
    },

    /// Error writing generated modules or the report
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mapping compiler operations
pub type Result<T> = std::result::Result<T, MapGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclassified_pair_message_names_both_types() {
        let err = MapGenError::UnclassifiedPair {
            field: "value".to_string(),
            source_ty: "text".to_string(),
            target_ty: "f64".to_string(),
        };
        assert_eq!(err.to_string(), "field 'value': no conversion from text to f64");
    }
}
