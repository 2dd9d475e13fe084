//! Schema declaration model for the mapping compiler
//!
//! Declarations form an immutable snapshot built once per run by the
//! surrounding framework. The introspector, resolver and discoverer only
//! ever read from it.

pub mod introspect;
pub mod resolve;

pub use introspect::SchemaRegistry;
pub use resolve::{BoundPair, resolve_pairs};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar primitive kinds, in their non-nullable form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Boolean
    Bool,
}

impl PrimitiveType {
    /// The Rust spelling of this primitive in generated code
    #[must_use]
    pub const fn rust_name(self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
        }
    }
}

/// Temporal kinds supported by the temporal<->string conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalKind {
    /// Calendar date
    Date,
    /// Date and time of day
    DateTime,
}

impl TemporalKind {
    /// The Rust spelling of this temporal type in generated code
    #[must_use]
    pub const fn rust_name(self) -> &'static str {
        match self {
            Self::Date => "chrono::NaiveDate",
            Self::DateTime => "chrono::NaiveDateTime",
        }
    }
}

/// The declared type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// Non-nullable scalar
    Primitive(PrimitiveType),
    /// Boxed (nullable) form of a scalar
    Boxed(PrimitiveType),
    /// Text value
    Text,
    /// Date or datetime value
    Temporal(TemporalKind),
    /// Reference to a declared enum type
    Enum(String),
    /// List-like collection of an element type
    Collection(Box<TypeDescriptor>),
    /// Reference to a declared schema type
    Schema(String),
}

impl TypeDescriptor {
    /// Whether this is a boolean field, for accessor naming
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(
            self,
            Self::Primitive(PrimitiveType::Bool) | Self::Boxed(PrimitiveType::Bool)
        )
    }

    /// Whether generated code can copy values of this type bitwise
    #[must_use]
    pub const fn is_copy(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::Temporal(_))
    }

    /// The Rust spelling of this type in generated code, without the
    /// `Option` wrapper nullability adds
    #[must_use]
    pub fn rust_name(&self) -> String {
        match self {
            Self::Primitive(p) => p.rust_name().to_string(),
            Self::Boxed(p) => format!("Option<{}>", p.rust_name()),
            Self::Text => "String".to_string(),
            Self::Temporal(k) => k.rust_name().to_string(),
            Self::Enum(name) | Self::Schema(name) => name.clone(),
            Self::Collection(elem) => format!("Vec<{}>", elem.rust_name()),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p.rust_name()),
            Self::Boxed(p) => write!(f, "boxed {}", p.rust_name()),
            Self::Text => write!(f, "text"),
            Self::Temporal(TemporalKind::Date) => write!(f, "date"),
            Self::Temporal(TemporalKind::DateTime) => write!(f, "datetime"),
            Self::Enum(name) => write!(f, "enum {name}"),
            Self::Collection(elem) => write!(f, "collection<{elem}>"),
            Self::Schema(name) => write!(f, "schema {name}"),
        }
    }
}

/// Supported string transformers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transform {
    /// Uppercase the value
    Uppercase,
    /// Lowercase the value
    Lowercase,
    /// Trim surrounding whitespace
    Trim,
}

/// What a nested conversion produces when the source value is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsencePolicy {
    /// Leave the target untouched (null semantics)
    Null,
    /// Produce an empty collection
    EmptyCollection,
}

/// Explicit nested-mapping directive on a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedHint {
    /// Maximum recursion depth below this field; exceeding it is a
    /// silent hard stop
    pub max_depth: Option<usize>,
    /// Behavior when the source value is absent
    pub absence: AbsencePolicy,
}

impl Default for NestedHint {
    fn default() -> Self {
        Self {
            max_depth: None,
            absence: AbsencePolicy::Null,
        }
    }
}

/// A declared instance field with its optional mapping directives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDeclaration {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeDescriptor,
    /// Whether the field can be absent
    pub nullable: bool,
    /// Static/constant field, excluded from introspection
    pub constant: bool,
    /// Override of the bound domain field name
    pub binding: Option<String>,
    /// Drop this field from resolution entirely
    pub ignore: bool,
    /// Default literal applied when the source value is absent
    pub default: Option<String>,
    /// Format pattern for temporal<->string conversions
    pub temporal_format: Option<String>,
    /// String transformer applied after conversion
    pub transform: Option<Transform>,
    /// Explicit nested-mapping directive
    pub nested: Option<NestedHint>,
}

impl FieldDeclaration {
    /// Create a field declaration with no directives
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            constant: false,
            binding: None,
            ignore: false,
            default: None,
            temporal_format: None,
            transform: None,
            nested: None,
        }
    }

    /// Mark the field nullable
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the field static/constant
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Override the bound domain field name
    #[must_use]
    pub fn bound_to(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }

    /// Drop the field from resolution
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Declare a default literal
    #[must_use]
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    /// Declare a temporal format pattern
    #[must_use]
    pub fn with_format(mut self, pattern: impl Into<String>) -> Self {
        self.temporal_format = Some(pattern.into());
        self
    }

    /// Declare a string transformer
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach an explicit nested-mapping directive
    #[must_use]
    pub fn with_nested(mut self, hint: NestedHint) -> Self {
        self.nested = Some(hint);
        self
    }

    /// The accessor name in the source framework's convention:
    /// `get` + capitalized field name, or `is` + capitalized name for
    /// boolean fields
    #[must_use]
    pub fn accessor_name(&self) -> String {
        let prefix = if self.ty.is_boolean() { "is" } else { "get" };
        let mut out = String::with_capacity(prefix.len() + self.name.len());
        out.push_str(prefix);
        let mut chars = self.name.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
        out
    }

    /// The domain field name this field binds to: explicit override if
    /// present, else the field's own name
    #[must_use]
    pub fn bound_name(&self) -> &str {
        self.binding.as_deref().unwrap_or(&self.name)
    }

    /// Whether generated code represents the field as an `Option`
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.nullable || matches!(self.ty, TypeDescriptor::Boxed(_))
    }
}

/// Whether a transfer schema feeds the domain or is produced from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Request shape converted into the domain
    Inbound,
    /// Response shape produced from the domain
    Outbound,
}

/// The role a schema declaration plays in mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaRole {
    /// Internal persisted entity shape
    Domain,
    /// A plain type participating only through nested discovery
    Plain,
    /// Externally-facing shape paired with a domain schema
    Transfer {
        /// The paired domain schema name
        domain: String,
        /// Inbound or outbound
        direction: Direction,
        /// Require every field to bind or fail generation
        strict: bool,
    },
}

/// A named type with its ordered field declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDeclaration {
    /// Type name
    pub name: String,
    /// Mapping role
    pub role: SchemaRole,
    /// Parent type, walked upward during introspection
    pub extends: Option<String>,
    /// Ordered declared fields (own fields only; inherited fields come
    /// from the parent chain)
    pub fields: Vec<FieldDeclaration>,
    /// Whether the type can be default-constructed
    pub has_default_ctor: bool,
}

impl SchemaDeclaration {
    /// Declare a domain schema
    pub fn domain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: SchemaRole::Domain,
            extends: None,
            fields: Vec::new(),
            has_default_ctor: true,
        }
    }

    /// Declare a plain type, visible to nested discovery only
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: SchemaRole::Plain,
            extends: None,
            fields: Vec::new(),
            has_default_ctor: true,
        }
    }

    /// Declare an inbound transfer schema paired with a domain schema
    pub fn inbound(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::transfer(name, domain, Direction::Inbound)
    }

    /// Declare an outbound transfer schema paired with a domain schema
    pub fn outbound(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::transfer(name, domain, Direction::Outbound)
    }

    fn transfer(name: impl Into<String>, domain: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            role: SchemaRole::Transfer {
                domain: domain.into(),
                direction,
                strict: false,
            },
            extends: None,
            fields: Vec::new(),
            has_default_ctor: true,
        }
    }

    /// Enable strict resolution for a transfer schema; no-op on domain
    /// schemas
    #[must_use]
    pub fn strict(mut self) -> Self {
        if let SchemaRole::Transfer { strict, .. } = &mut self.role {
            *strict = true;
        }
        self
    }

    /// Declare the parent type
    #[must_use]
    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Append a field declaration
    #[must_use]
    pub fn with_field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark the type as lacking a parameterless constructor
    #[must_use]
    pub fn without_default_ctor(mut self) -> Self {
        self.has_default_ctor = false;
        self
    }

    /// Whether this is a transfer schema for the given direction
    #[must_use]
    pub fn is_transfer(&self, wanted: Direction) -> bool {
        matches!(&self.role, SchemaRole::Transfer { direction, .. } if *direction == wanted)
    }
}

/// A declared enum type with its ordered variant names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDeclaration {
    /// Type name
    pub name: String,
    /// Ordered variant names
    pub variants: Vec<String>,
}

impl EnumDeclaration {
    /// Declare an enum with its variants
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}
