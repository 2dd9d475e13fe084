//! Classification of bound field pairs into conversions
//!
//! Mirrors the compatibility check: an exact structural match is identity,
//! a known pairing picks its conversion, and anything else is left
//! unclassified for the configured fallback policy.

use crate::error::Result;
use crate::schema::{Direction, FieldDeclaration, TypeDescriptor};

use super::temporal::require_pattern;

/// The conversion strategy chosen for one bound field pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// Structurally identical types, direct passthrough
    Identity,
    /// Primitive <-> boxed form of the same primitive, passthrough
    PrimitiveCoercion,
    /// String source parsed into the enum target by exact variant name
    StringToEnum(String),
    /// Enum source converted to its textual name
    EnumToString(String),
    /// Distinct enum types converted via textual name, no structural
    /// validation
    EnumToEnum {
        /// Source enum type name
        source: String,
        /// Target enum type name
        target: String,
    },
    /// String parsed into a temporal value with a declared pattern
    StringToTemporal {
        /// Date or datetime
        kind: crate::schema::TemporalKind,
        /// Validated strftime pattern
        pattern: String,
    },
    /// Temporal value formatted into a string with a declared pattern
    TemporalToString {
        /// Date or datetime
        kind: crate::schema::TemporalKind,
        /// Validated strftime pattern
        pattern: String,
    },
    /// Nested object conversion through a discovered mapping task
    Nested {
        /// Transfer-side type name
        transfer: String,
        /// Domain-side type name
        domain: String,
    },
    /// Collection whose elements convert through a discovered mapping task
    NestedCollection {
        /// Transfer-side element type name
        transfer: String,
        /// Domain-side element type name
        domain: String,
    },
    /// No known conversion; falls back per configuration
    Unclassified,
}

/// Pluggable compatibility test for nested type pair names.
///
/// The default heuristic matches by name similarity; a stricter
/// schema-declared predicate can replace it without touching discovery or
/// emission.
pub trait NameCompatibility {
    /// Whether two type names refer to compatible nested shapes
    fn compatible(&self, a: &str, b: &str) -> bool;
}

/// Name-similarity heuristic: same base name after stripping a known role
/// suffix, or one name being a prefix/suffix of the other.
#[derive(Debug, Clone)]
pub struct SuffixStripping {
    suffixes: Vec<String>,
}

impl Default for SuffixStripping {
    fn default() -> Self {
        Self {
            suffixes: [
                "Dto", "Request", "Response", "Create", "Update", "View", "Entity", "Model",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

impl SuffixStripping {
    /// Heuristic with a custom role-suffix list
    #[must_use]
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    fn base<'a>(&self, name: &'a str) -> &'a str {
        for suffix in &self.suffixes {
            if name.len() > suffix.len() {
                if let Some(stripped) = name.strip_suffix(suffix.as_str()) {
                    return stripped;
                }
            }
        }
        name
    }
}

impl NameCompatibility for SuffixStripping {
    fn compatible(&self, a: &str, b: &str) -> bool {
        if self.base(a) == self.base(b) {
            return true;
        }
        a.starts_with(b) || b.starts_with(a) || a.ends_with(b) || b.ends_with(a)
    }
}

// Orients a nested pair so the key is always (transfer type, domain type),
// whichever side the conversion reads from.
fn pair_names(source: &str, target: &str, direction: Direction) -> (String, String) {
    match direction {
        Direction::Inbound => (source.to_string(), target.to_string()),
        Direction::Outbound => (target.to_string(), source.to_string()),
    }
}

/// Classify the conversion for one bound pair.
///
/// `source`/`target` are ordered by conversion direction: transfer ->
/// domain for inbound, domain -> transfer for outbound. `field` is the
/// transfer-side declaration carrying the directives. Temporal pairings
/// validate their pattern here, at discovery time.
pub fn classify(
    field: &FieldDeclaration,
    source: &TypeDescriptor,
    target: &TypeDescriptor,
    direction: Direction,
    predicate: &dyn NameCompatibility,
) -> Result<Conversion> {
    use TypeDescriptor as T;

    if source == target {
        return Ok(Conversion::Identity);
    }

    let conversion = match (source, target) {
        (T::Primitive(a), T::Boxed(b)) | (T::Boxed(a), T::Primitive(b)) if a == b => {
            Conversion::PrimitiveCoercion
        }
        (T::Text, T::Enum(name)) => Conversion::StringToEnum(name.clone()),
        (T::Enum(name), T::Text) => Conversion::EnumToString(name.clone()),
        (T::Enum(a), T::Enum(b)) => Conversion::EnumToEnum {
            source: a.clone(),
            target: b.clone(),
        },
        (T::Text, T::Temporal(kind)) => Conversion::StringToTemporal {
            kind: *kind,
            pattern: require_pattern(&field.name, field.temporal_format.as_deref())?,
        },
        (T::Temporal(kind), T::Text) => Conversion::TemporalToString {
            kind: *kind,
            pattern: require_pattern(&field.name, field.temporal_format.as_deref())?,
        },
        (T::Schema(a), T::Schema(b)) => {
            // An explicit nested annotation takes precedence over the
            // heuristic compatibility test.
            if field.nested.is_some() || predicate.compatible(a, b) {
                let (transfer, domain) = pair_names(a, b, direction);
                Conversion::Nested { transfer, domain }
            } else {
                Conversion::Unclassified
            }
        }
        (T::Collection(a), T::Collection(b)) => match (a.as_ref(), b.as_ref()) {
            (T::Schema(a), T::Schema(b))
                if field.nested.is_some() || predicate.compatible(a, b) =>
            {
                let (transfer, domain) = pair_names(a, b, direction);
                Conversion::NestedCollection { transfer, domain }
            }
            _ => Conversion::Unclassified,
        },
        _ => Conversion::Unclassified,
    };
    Ok(conversion)
}
