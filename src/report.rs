//! Generation report
//!
//! Summarizes one generator run: which domain schemas produced modules,
//! how many conversion functions each direction got, and which schemas
//! failed and why. Serialized to JSON next to the generated modules.

use serde::{Deserialize, Serialize};

/// Outcome for a single domain schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Domain schema name
    pub domain: String,
    /// Generated module name, empty when the schema failed
    pub module: String,
    /// Root transfer schema names converted toward the domain
    pub inbound: Vec<String>,
    /// Root transfer schema names converted away from the domain
    pub outbound: Vec<String>,
    /// Diagnostics for transfer pairs (or the whole schema) that were
    /// dropped from generation
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<String>,
}

/// Summary of a full generator run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Number of domain schemas that produced a module
    pub schema_count: usize,
    /// Per-schema outcomes, in declaration order
    pub schemas: Vec<SchemaReport>,
}

impl GenerationReport {
    /// True when at least one schema recorded a dropped pair
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.schemas.iter().any(|s| !s.failures.is_empty())
    }

    /// Names of schemas that recorded failures, in declaration order
    #[must_use]
    pub fn failed_schemas(&self) -> Vec<&str> {
        self.schemas
            .iter()
            .filter(|s| !s.failures.is_empty())
            .map(|s| s.domain.as_str())
            .collect()
    }
}
