//! Default literal rendering and discovery-time parse checks
//!
//! Literals are rendered as type-appropriate Rust source expressions. The
//! parse check is precise for built-in numeric/boolean targets only; other
//! target types are unchecked and their literal is emitted verbatim.

use log::warn;

use crate::schema::{PrimitiveType, TemporalKind, TypeDescriptor};

/// Check a default literal against its target field type.
///
/// A non-parseable literal is a warning, never an error; generation
/// proceeds and the literal is emitted anyway.
pub fn check_default(field: &str, literal: &str, target: &TypeDescriptor) {
    let parseable = match target {
        TypeDescriptor::Primitive(p) | TypeDescriptor::Boxed(p) => match p {
            PrimitiveType::I32 => literal.parse::<i32>().is_ok(),
            PrimitiveType::I64 => literal.parse::<i64>().is_ok(),
            PrimitiveType::F32 => literal.parse::<f32>().is_ok(),
            PrimitiveType::F64 => literal.parse::<f64>().is_ok(),
            PrimitiveType::Bool => literal.parse::<bool>().is_ok(),
        },
        // other types are unchecked
        _ => true,
    };
    if !parseable {
        warn!(
            "field '{field}': default literal '{literal}' does not parse as {target}, emitting it anyway"
        );
    }
}

/// Render a default literal as a Rust expression of the target type.
///
/// `pattern` is the temporal format pattern in scope for the binding, used
/// when the target is temporal.
#[must_use]
pub fn render_default(literal: &str, target: &TypeDescriptor, pattern: Option<&str>) -> String {
    match target {
        TypeDescriptor::Primitive(p) | TypeDescriptor::Boxed(p) => match p {
            PrimitiveType::Bool => literal.to_string(),
            // a type suffix keeps the literal unambiguous in the
            // generated assignment
            _ => format!("{literal}_{}", p.rust_name()),
        },
        TypeDescriptor::Text => format!("{literal:?}.to_string()"),
        TypeDescriptor::Enum(name) => format!("{name}::{literal}"),
        TypeDescriptor::Temporal(kind) => {
            let pattern = pattern.unwrap_or(match kind {
                TemporalKind::Date => "%Y-%m-%d",
                TemporalKind::DateTime => "%Y-%m-%dT%H:%M:%S",
            });
            // a bad default surfaces through the module's own error
            // path, like every other temporal conversion
            format!(
                "{}::parse_from_str({literal:?}, {pattern:?}).map_err(|_| MappingError::InvalidTemporalValue({pattern:?}, {literal:?}.to_string()))?",
                kind.rust_name()
            )
        }
        // unchecked targets carry the literal through verbatim
        TypeDescriptor::Collection(_) | TypeDescriptor::Schema(_) => literal.to_string(),
    }
}
