//! Field correspondence resolution between transfer and domain schemas
//!
//! For every transfer field the bound domain field name is the explicit
//! binding override if present, else the field's own name. Strict mode
//! turns an unresolved binding into a diagnostic naming the field;
//! non-strict mode drops it silently. Ignored fields are always dropped.

use log::debug;

use crate::error::{MapGenError, Result};

use super::{FieldDeclaration, SchemaDeclaration, SchemaRegistry, SchemaRole};

/// A transfer field paired with the domain field it binds to
#[derive(Debug, Clone, Copy)]
pub struct BoundPair<'r> {
    /// The transfer-side field
    pub transfer: &'r FieldDeclaration,
    /// The domain-side field
    pub domain: &'r FieldDeclaration,
}

/// Resolve every field of a transfer schema against a domain schema.
///
/// Resolution works against the domain schema's full inherited field set.
/// The strict flag comes from the transfer schema's declaration; plain
/// (non-transfer) nested types resolve non-strictly.
pub fn resolve_pairs<'r>(
    registry: &'r SchemaRegistry,
    transfer: &'r SchemaDeclaration,
    domain_name: &str,
) -> Result<Vec<BoundPair<'r>>> {
    let strict = matches!(&transfer.role, SchemaRole::Transfer { strict: true, .. });
    let domain_fields = registry.field_map(domain_name)?;
    let transfer_fields = registry.introspect(&transfer.name)?;

    let mut pairs = Vec::with_capacity(transfer_fields.len());
    for field in transfer_fields {
        if field.ignore {
            debug!(
                "{}.{}: ignored, dropping binding",
                transfer.name, field.name
            );
            continue;
        }

        let bound = field.bound_name();
        match domain_fields.get(bound) {
            Some(domain_field) => {
                debug!(
                    "{}.{} ({}) -> {}.{}",
                    transfer.name,
                    field.name,
                    field.accessor_name(),
                    domain_name,
                    domain_field.name
                );
                pairs.push(BoundPair {
                    transfer: field,
                    domain: domain_field,
                });
            }
            None if strict => {
                return Err(MapGenError::UnboundField {
                    schema: transfer.name.clone(),
                    field: field.name.clone(),
                    bound: bound.to_string(),
                    domain: domain_name.to_string(),
                });
            }
            None => {
                debug!(
                    "{}.{}: no domain field '{}' in {}, dropping binding",
                    transfer.name, field.name, bound, domain_name
                );
            }
        }
    }
    Ok(pairs)
}
