//! mapgen: compile-step generation of transfer <-> domain conversions.
//!
//! The crate reads declared transfer schemas (wire-facing DTO shapes) and
//! domain schemas (entities), analyzes every bound field pair, and renders
//! plain Rust conversion modules so that no reflection or runtime mapping
//! machinery is needed where the mappings are used.
//!
//! The pipeline runs in four stages over an immutable [`SchemaRegistry`]
//! snapshot:
//!
//! 1. introspection: inheritance chains are flattened into effective
//!    field lists ([`schema::introspect`])
//! 2. resolution: transfer fields are paired with their bound domain
//!    fields ([`schema::resolve`])
//! 3. analysis: each pair is classified into a conversion strategy
//!    ([`analyze`])
//! 4. discovery and emission: nested pairs are walked into a
//!    [`MappingPlan`] and rendered as source text ([`discover`], [`emit`])
//!
//! [`Generator`] ties the stages together and produces a
//! [`GenerationReport`] alongside the generated modules.
//!
//! ```no_run
//! use mapgen::{
//!     FieldDeclaration, Generator, MapGenConfig, SchemaDeclaration, SchemaRegistry,
//!     TypeDescriptor,
//! };
//!
//! let mut registry = SchemaRegistry::new();
//! registry.declare(
//!     SchemaDeclaration::domain("User")
//!         .with_field(FieldDeclaration::new("name", TypeDescriptor::Text)),
//! );
//! registry.declare(
//!     SchemaDeclaration::inbound("UserCreate", "User")
//!         .with_field(FieldDeclaration::new("name", TypeDescriptor::Text)),
//! );
//!
//! let generator = Generator::new(registry, MapGenConfig::default());
//! let report = generator.run_to_dir(std::path::Path::new("generated"))?;
//! assert_eq!(report.schema_count, 1);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod analyze;
pub mod config;
pub mod discover;
pub mod emit;
pub mod error;
pub mod generator;
pub mod report;
pub mod schema;

pub use analyze::{Conversion, NameCompatibility, SuffixStripping};
pub use config::MapGenConfig;
pub use discover::{FieldBinding, MappingPlan, MappingTask};
pub use emit::GeneratedModule;
pub use error::{MapGenError, Result};
pub use generator::{Generated, Generator};
pub use report::{GenerationReport, SchemaReport};
pub use schema::{
    AbsencePolicy, Direction, EnumDeclaration, FieldDeclaration, NestedHint, PrimitiveType,
    SchemaDeclaration, SchemaRegistry, SchemaRole, TemporalKind, Transform, TypeDescriptor,
};
