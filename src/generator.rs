//! Generator facade
//!
//! The single entry point tying the pipeline together: takes a declared
//! schema registry, discovers the mapping plan for every domain schema,
//! emits one module per schema, and produces a generation report. A
//! failing transfer pair is recorded and dropped so the remaining pairs
//! and schemas still generate.

use std::fs;
use std::path::Path;

use anyhow::Context;
use log::{error, info};

use crate::analyze::{NameCompatibility, SuffixStripping};
use crate::config::MapGenConfig;
use crate::discover::discover_plan;
use crate::emit::{GeneratedModule, emit_module};
use crate::report::{GenerationReport, SchemaReport};
use crate::schema::{Direction, SchemaRegistry};

/// File name for the serialized report
pub const REPORT_FILE: &str = "generation_report.json";

/// Output of one generator run
#[derive(Debug)]
pub struct Generated {
    /// Rendered modules, in domain declaration order
    pub modules: Vec<GeneratedModule>,
    /// Per-schema summary
    pub report: GenerationReport,
}

struct SchemaOutcome {
    module: Option<GeneratedModule>,
    inbound: Vec<String>,
    outbound: Vec<String>,
    failures: Vec<String>,
}

/// Drives discovery and emission over a schema registry
pub struct Generator {
    registry: SchemaRegistry,
    config: MapGenConfig,
    predicate: Box<dyn NameCompatibility>,
}

impl Generator {
    /// Create a generator with the default name-similarity predicate
    #[must_use]
    pub fn new(registry: SchemaRegistry, config: MapGenConfig) -> Self {
        Self {
            registry,
            config,
            predicate: Box::new(SuffixStripping::default()),
        }
    }

    /// Replace the nested-shape compatibility predicate
    #[must_use]
    pub fn with_predicate(mut self, predicate: Box<dyn NameCompatibility>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Generate modules for every declared domain schema.
    ///
    /// Transfer pairs whose discovery fails are recorded in the report
    /// with their error message and do not stop the run; the rest of the
    /// schema's pairs still produce a module.
    pub fn run(&self) -> Generated {
        let mut modules = Vec::new();
        let mut report = GenerationReport::default();

        let domains: Vec<String> = self
            .registry
            .domain_schemas()
            .map(|schema| schema.name.clone())
            .collect();
        info!("generating mappings for {} domain schemas", domains.len());

        for domain in &domains {
            match self.generate_one(domain) {
                Ok(outcome) => {
                    if outcome.module.is_none() && outcome.failures.is_empty() {
                        info!("domain schema '{domain}' has no transfer schemas, skipping");
                    }
                    report.schemas.push(SchemaReport {
                        domain: domain.clone(),
                        module: outcome
                            .module
                            .as_ref()
                            .map(|m| m.name.clone())
                            .unwrap_or_default(),
                        inbound: outcome.inbound,
                        outbound: outcome.outbound,
                        failures: outcome.failures,
                    });
                    if let Some(module) = outcome.module {
                        modules.push(module);
                    }
                }
                Err(err) => {
                    error!("generation failed for domain schema '{domain}': {err}");
                    report.schemas.push(SchemaReport {
                        domain: domain.clone(),
                        module: String::new(),
                        inbound: Vec::new(),
                        outbound: Vec::new(),
                        failures: vec![err.to_string()],
                    });
                }
            }
        }
        report.schema_count = modules.len();
        Generated { modules, report }
    }

    /// Generate and write every module plus the JSON report under `dir`.
    ///
    /// This is the only place the crate touches the filesystem.
    pub fn run_to_dir(&self, dir: &Path) -> anyhow::Result<GenerationReport> {
        let generated = self.run();
        fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        for module in &generated.modules {
            let path = dir.join(module.file_name());
            fs::write(&path, &module.source)
                .with_context(|| format!("writing generated module {}", path.display()))?;
        }
        let report_path = dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(&generated.report)
            .context("serializing generation report")?;
        fs::write(&report_path, json)
            .with_context(|| format!("writing report {}", report_path.display()))?;
        info!(
            "wrote {} modules and report to {}",
            generated.modules.len(),
            dir.display()
        );
        Ok(generated.report)
    }

    fn generate_one(&self, domain: &str) -> crate::error::Result<SchemaOutcome> {
        let plan = discover_plan(&self.registry, &self.config, self.predicate.as_ref(), domain)?;
        let failures = plan
            .failures
            .iter()
            .map(|f| format!("transfer schema '{}': {}", f.transfer, f.error))
            .collect();
        if plan.tasks.is_empty() {
            return Ok(SchemaOutcome {
                module: None,
                inbound: Vec::new(),
                outbound: Vec::new(),
                failures,
            });
        }
        let root_names = |direction| {
            plan.roots()
                .filter(|task| task.direction == Some(direction))
                .map(|task| task.transfer.clone())
                .collect::<Vec<String>>()
        };
        let inbound = root_names(Direction::Inbound);
        let outbound = root_names(Direction::Outbound);
        let module = emit_module(&self.registry, &plan)?;
        Ok(SchemaOutcome {
            module: Some(module),
            inbound,
            outbound,
            failures,
        })
    }

    /// The registry this generator runs over
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}
