//! Schema introspection over the declaration registry
//!
//! The registry is the immutable snapshot of every schema and enum
//! declaration discovered for one run. Introspection walks a type's
//! inheritance chain upward and returns its ordered instance fields.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{MapGenError, Result};

use super::{Direction, EnumDeclaration, FieldDeclaration, SchemaDeclaration, SchemaRole};

/// The immutable snapshot of all declarations for one run
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: FxHashMap<String, SchemaDeclaration>,
    enums: FxHashMap<String, EnumDeclaration>,
    // declaration order, for deterministic iteration and emission
    order: Vec<String>,
}

impl SchemaRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema declaration
    pub fn declare(&mut self, schema: SchemaDeclaration) -> &mut Self {
        self.order.push(schema.name.clone());
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// Register an enum declaration
    pub fn declare_enum(&mut self, decl: EnumDeclaration) -> &mut Self {
        self.enums.insert(decl.name.clone(), decl);
        self
    }

    /// Look up a schema declaration, failing on an unresolvable reference
    pub fn schema(&self, name: &str) -> Result<&SchemaDeclaration> {
        self.schemas
            .get(name)
            .ok_or_else(|| MapGenError::UnresolvableSchema(name.to_string()))
    }

    /// Look up a schema declaration without raising a diagnostic
    #[must_use]
    pub fn get_schema(&self, name: &str) -> Option<&SchemaDeclaration> {
        self.schemas.get(name)
    }

    /// Look up an enum declaration, failing on an unresolvable reference
    pub fn enum_decl(&self, name: &str) -> Result<&EnumDeclaration> {
        self.enums
            .get(name)
            .ok_or_else(|| MapGenError::UnresolvableEnum(name.to_string()))
    }

    /// All domain schemas in declaration order
    pub fn domain_schemas(&self) -> impl Iterator<Item = &SchemaDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.schemas.get(name))
            .filter(|schema| schema.role == SchemaRole::Domain)
    }

    /// All transfer schemas paired with the given domain schema, in
    /// declaration order
    #[must_use]
    pub fn transfer_schemas_for(&self, domain_name: &str) -> Vec<&SchemaDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.schemas.get(name))
            .filter(|schema| {
                matches!(&schema.role, SchemaRole::Transfer { domain, .. } if domain == domain_name)
            })
            .collect()
    }

    /// Transfer schemas paired with the given domain schema for one direction
    #[must_use]
    pub fn transfer_schemas_in(
        &self,
        domain_name: &str,
        direction: Direction,
    ) -> Vec<&SchemaDeclaration> {
        self.transfer_schemas_for(domain_name)
            .into_iter()
            .filter(|schema| schema.is_transfer(direction))
            .collect()
    }

    /// The ordered declared instance fields of a type, inherited fields
    /// first, excluding static/constant fields.
    ///
    /// Walks the `extends` chain upward until the universal root (a
    /// declaration with no parent). An unknown type name is a fatal
    /// unresolvable-schema error, never a silent empty result.
    pub fn introspect(&self, name: &str) -> Result<Vec<&FieldDeclaration>> {
        let mut seen = FxHashSet::default();
        let mut chain = Vec::new();
        let mut current = Some(name);
        while let Some(type_name) = current {
            if !seen.insert(type_name) {
                return Err(MapGenError::InheritanceCycle(type_name.to_string()));
            }
            let decl = self.schema(type_name)?;
            chain.push(decl);
            current = decl.extends.as_deref();
        }

        let mut fields = Vec::new();
        for decl in chain.iter().rev() {
            fields.extend(decl.fields.iter().filter(|field| !field.constant));
        }
        Ok(fields)
    }

    /// The full (inherited) field set of a type, keyed by name
    pub fn field_map(&self, name: &str) -> Result<FxHashMap<&str, &FieldDeclaration>> {
        Ok(self
            .introspect(name)?
            .into_iter()
            .map(|field| (field.name.as_str(), field))
            .collect())
    }
}
