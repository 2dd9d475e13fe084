//! Code emission
//!
//! Consumes the mapping plan for one domain schema and renders its
//! generated module: public conversion functions for every root transfer
//! schema, private helpers for every nested task, shared temporal pattern
//! constants, and dispatch entry points routing transfer instances by
//! runtime type test.

pub mod literals;

use itertools::Itertools;
use log::info;
use rustc_hash::FxHashMap;

use crate::analyze::Conversion;
use crate::discover::{FieldBinding, MappingPlan, MappingTask};
use crate::error::Result;
use crate::schema::{
    AbsencePolicy, Direction, SchemaRegistry, TemporalKind, Transform, TypeDescriptor,
};

/// One rendered module, ready to be written next to the domain schema
#[derive(Debug, Clone)]
pub struct GeneratedModule {
    /// The domain schema the module belongs to
    pub domain: String,
    /// Module name, derived deterministically from the domain schema name
    pub name: String,
    /// Rendered Rust source
    pub source: String,
}

impl GeneratedModule {
    /// File name for this module
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.rs", self.name)
    }
}

// The error enum every generated module carries. Static text, shared by
// all modules.
const MAPPING_ERROR_DECL: &str = r#"/// Runtime failure raised by the generated conversions.
#[derive(Debug)]
pub enum MappingError {
    /// A transfer instance not registered with this module
    UnsupportedTransferType(&'static str),
    /// A name absent from the target enum's value set
    UnknownEnumVariant(&'static str, String),
    /// A value that does not match its declared temporal pattern
    InvalidTemporalValue(&'static str, String),
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedTransferType(domain) => {
                write!(f, "unsupported transfer type for domain '{domain}'")
            }
            Self::UnknownEnumVariant(ty, name) => {
                write!(f, "unknown variant '{name}' for enum {ty}")
            }
            Self::InvalidTemporalValue(pattern, value) => {
                write!(f, "value '{value}' does not match pattern '{pattern}'")
            }
        }
    }
}

impl std::error::Error for MappingError {}
"#;

/// Render the generated module for one mapping plan.
///
/// The caller skips plans without tasks; a domain schema with no declared
/// transfer schemas gets no module.
pub fn emit_module(registry: &SchemaRegistry, plan: &MappingPlan) -> Result<GeneratedModule> {
    let module_name = format!("{}_mappings", snake_case(&plan.domain));
    let consts = pattern_constants(plan);

    let mut out = String::new();
    line(
        &mut out,
        &format!(
            "//! Generated conversions for the `{}` domain schema.",
            plan.domain
        ),
    );
    line(&mut out, "//!");
    line(
        &mut out,
        "//! Generated by mapgen; do not edit. The transfer and domain types",
    );
    line(
        &mut out,
        "//! are expected to be in scope in the parent module.",
    );
    line(&mut out, "#![allow(dead_code)]");
    line(&mut out, "");
    let has_dispatch = plan
        .roots()
        .any(|task| task.direction == Some(Direction::Inbound));
    if has_dispatch {
        line(&mut out, "use std::any::Any;");
    }
    line(&mut out, "use std::fmt;");
    line(&mut out, "");
    line(&mut out, "use super::*;");
    line(&mut out, "");
    out.push_str(MAPPING_ERROR_DECL);
    line(&mut out, "");

    // one shared constant per distinct temporal pattern
    for (pattern, name) in consts.iter().sorted_by_key(|(_, name)| name.clone()) {
        line(&mut out, &format!("const {name}: &str = {pattern:?};"));
    }
    if !consts.is_empty() {
        line(&mut out, "");
    }

    for task in plan.roots() {
        emit_task_fns(&mut out, task, true, &consts);
    }
    emit_dispatch(&mut out, plan);
    for task in plan.nested() {
        emit_task_fns(&mut out, task, false, &consts);
    }
    emit_enum_helpers(&mut out, registry, plan)?;
    emit_temporal_helpers(&mut out, plan);

    info!(
        "emitted module '{module_name}' for domain schema '{}' ({} tasks)",
        plan.domain,
        plan.tasks.len()
    );
    Ok(GeneratedModule {
        domain: plan.domain.clone(),
        name: module_name,
        source: out,
    })
}

/// Convert a type name to its snake_case function-name form
#[must_use]
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
            if i > 0 && (prev_lower || next_lower) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

fn line(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}

fn task_bindings(task: &MappingTask) -> impl Iterator<Item = &FieldBinding> {
    task.to_domain
        .iter()
        .chain(task.to_transfer.iter())
        .flatten()
}

fn conversion_pattern(conversion: &Conversion) -> Option<&str> {
    match conversion {
        Conversion::StringToTemporal { pattern, .. }
        | Conversion::TemporalToString { pattern, .. } => Some(pattern),
        _ => None,
    }
}

// pattern -> shared constant name, numbered in first-appearance order
fn pattern_constants(plan: &MappingPlan) -> FxHashMap<String, String> {
    plan.tasks
        .iter()
        .flat_map(task_bindings)
        .filter_map(|binding| conversion_pattern(&binding.conversion))
        .unique()
        .enumerate()
        .map(|(i, pattern)| (pattern.to_string(), format!("TEMPORAL_FORMAT_{i}")))
        .collect()
}

fn emit_task_fns(
    out: &mut String,
    task: &MappingTask,
    public: bool,
    consts: &FxHashMap<String, String>,
) {
    let vis = if public { "pub " } else { "" };
    let t = snake_case(&task.transfer);
    let d = snake_case(&task.domain);
    let transfer = &task.transfer;
    let domain = &task.domain;

    if let Some(bindings) = &task.to_domain {
        line(
            out,
            &format!("{vis}fn {t}_to_{d}(src: &{transfer}) -> Result<{domain}, MappingError> {{"),
        );
        line(out, &format!("    let mut dst = {domain}::default();"));
        line(out, &format!("    apply_{t}(src, &mut dst)?;"));
        line(out, "    Ok(dst)");
        line(out, "}");
        line(out, "");

        line(
            out,
            &format!(
                "{vis}fn apply_{t}(src: &{transfer}, dst: &mut {domain}) -> Result<(), MappingError> {{"
            ),
        );
        render_assignments(out, bindings, true, consts);
        line(out, "    Ok(())");
        line(out, "}");
        line(out, "");

        line(
            out,
            &format!(
                "{vis}fn {t}_list_to_{d}(items: &[{transfer}]) -> Result<Vec<{domain}>, MappingError> {{"
            ),
        );
        line(out, &format!("    items.iter().map({t}_to_{d}).collect()"));
        line(out, "}");
        line(out, "");
    }

    if let Some(bindings) = &task.to_transfer {
        line(
            out,
            &format!("{vis}fn {d}_to_{t}(src: &{domain}) -> Result<{transfer}, MappingError> {{"),
        );
        line(out, &format!("    let mut dst = {transfer}::default();"));
        render_assignments(out, bindings, false, consts);
        line(out, "    Ok(dst)");
        line(out, "}");
        line(out, "");

        line(
            out,
            &format!(
                "{vis}fn {d}_list_to_{t}(items: &[{domain}]) -> Result<Vec<{transfer}>, MappingError> {{"
            ),
        );
        line(out, &format!("    items.iter().map({d}_to_{t}).collect()"));
        line(out, "}");
        line(out, "");
    }
}

fn emit_dispatch(out: &mut String, plan: &MappingPlan) {
    let inbound: Vec<&MappingTask> = plan
        .roots()
        .filter(|task| task.direction == Some(Direction::Inbound))
        .collect();
    if inbound.is_empty() {
        return;
    }
    let domain = &plan.domain;
    let d = snake_case(domain);

    line(
        out,
        &format!("pub fn to_domain(transfer: &dyn Any) -> Result<{domain}, MappingError> {{"),
    );
    for task in &inbound {
        let t = snake_case(&task.transfer);
        line(
            out,
            &format!(
                "    if let Some(src) = transfer.downcast_ref::<{}>() {{",
                task.transfer
            ),
        );
        line(out, &format!("        return {t}_to_{d}(src);"));
        line(out, "    }");
    }
    line(
        out,
        &format!("    Err(MappingError::UnsupportedTransferType({domain:?}))"),
    );
    line(out, "}");
    line(out, "");

    line(
        out,
        &format!(
            "pub fn apply_update(transfer: &dyn Any, dst: &mut {domain}) -> Result<(), MappingError> {{"
        ),
    );
    for task in &inbound {
        let t = snake_case(&task.transfer);
        line(
            out,
            &format!(
                "    if let Some(src) = transfer.downcast_ref::<{}>() {{",
                task.transfer
            ),
        );
        line(out, &format!("        return apply_{t}(src, dst);"));
        line(out, "    }");
    }
    line(
        out,
        &format!("    Err(MappingError::UnsupportedTransferType({domain:?}))"),
    );
    line(out, "}");
    line(out, "");
}

fn render_assignments(
    out: &mut String,
    bindings: &[FieldBinding],
    toward_domain: bool,
    consts: &FxHashMap<String, String>,
) {
    for binding in bindings {
        let target = &binding.target_name;
        if binding.source_optional {
            line(
                out,
                &format!("    if let Some(value) = &src.{} {{", binding.source_name),
            );
            let expr = wrap_target(binding, value_expr(binding, "value", true, toward_domain, consts));
            line(out, &format!("        dst.{target} = {expr};"));
            if let Some(default) = &binding.default {
                let rendered = literals::render_default(
                    default,
                    &binding.target_ty,
                    conversion_pattern(&binding.conversion),
                );
                let rendered = if binding.target_optional {
                    format!("Some({rendered})")
                } else {
                    rendered
                };
                line(out, "    } else {");
                line(out, &format!("        dst.{target} = {rendered};"));
                line(out, "    }");
            } else if binding.absence == AbsencePolicy::EmptyCollection
                && matches!(binding.target_ty, TypeDescriptor::Collection(_))
            {
                line(out, "    } else {");
                line(out, &format!("        dst.{target} = Vec::new();"));
                line(out, "    }");
            } else {
                line(out, "    }");
            }
        } else {
            let access = format!("src.{}", binding.source_name);
            let expr =
                wrap_target(binding, value_expr(binding, &access, false, toward_domain, consts));
            line(out, &format!("    dst.{target} = {expr};"));
        }
    }
}

fn wrap_target(binding: &FieldBinding, expr: String) -> String {
    if binding.target_optional {
        format!("Some({expr})")
    } else {
        expr
    }
}

// Renders the owned target-typed value for one binding. `access` is the
// source expression; `borrowed` means it is the `value` binding of an
// if-let over an optional field.
fn value_expr(
    binding: &FieldBinding,
    access: &str,
    borrowed: bool,
    toward_domain: bool,
    consts: &FxHashMap<String, String>,
) -> String {
    let reference = if borrowed {
        access.to_string()
    } else {
        format!("&{access}")
    };

    let base = match &binding.conversion {
        Conversion::Identity | Conversion::Unclassified | Conversion::PrimitiveCoercion => {
            if let Some(transform) = binding.transform {
                return render_transform(access, transform);
            }
            let scalar_copy = matches!(
                binding.source_ty,
                TypeDescriptor::Primitive(_) | TypeDescriptor::Boxed(_) | TypeDescriptor::Temporal(_)
            );
            if scalar_copy {
                if borrowed {
                    format!("*{access}")
                } else {
                    access.to_string()
                }
            } else {
                format!("{access}.clone()")
            }
        }
        Conversion::StringToEnum(name) => {
            format!("parse_{}({access}.as_str())?", snake_case(name))
        }
        Conversion::EnumToString(name) => {
            format!("{}_name({reference}).to_string()", snake_case(name))
        }
        Conversion::EnumToEnum { source, target } => {
            format!(
                "{}_to_{}({reference})",
                snake_case(source),
                snake_case(target)
            )
        }
        Conversion::StringToTemporal { kind, pattern } => {
            format!(
                "{}({reference}, {})?",
                parse_helper_name(*kind),
                consts[pattern.as_str()]
            )
        }
        Conversion::TemporalToString { pattern, .. } => {
            format!("{access}.format({}).to_string()", consts[pattern.as_str()])
        }
        Conversion::Nested { transfer, domain } => {
            format!(
                "{}({reference})?",
                nested_helper_name(transfer, domain, toward_domain)
            )
        }
        Conversion::NestedCollection { transfer, domain } => {
            format!(
                "{access}.iter().map({}).collect::<Result<Vec<_>, _>>()?",
                nested_helper_name(transfer, domain, toward_domain)
            )
        }
    };

    match binding.transform {
        Some(transform) if !matches!(binding.conversion, Conversion::Identity) => {
            render_transform(&base, transform)
        }
        _ => base,
    }
}

fn render_transform(expr: &str, transform: Transform) -> String {
    match transform {
        Transform::Uppercase => format!("{expr}.to_uppercase()"),
        Transform::Lowercase => format!("{expr}.to_lowercase()"),
        Transform::Trim => format!("{expr}.trim().to_string()"),
    }
}

const fn parse_helper_name(kind: TemporalKind) -> &'static str {
    match kind {
        TemporalKind::Date => "parse_date",
        TemporalKind::DateTime => "parse_datetime",
    }
}

fn nested_helper_name(transfer: &str, domain: &str, toward_domain: bool) -> String {
    if toward_domain {
        format!("{}_to_{}", snake_case(transfer), snake_case(domain))
    } else {
        format!("{}_to_{}", snake_case(domain), snake_case(transfer))
    }
}

// Enum conversion helpers needed by the plan, in first-appearance order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EnumHelper {
    Parse(String),
    Name(String),
    Convert(String, String),
}

fn emit_enum_helpers(
    out: &mut String,
    registry: &SchemaRegistry,
    plan: &MappingPlan,
) -> Result<()> {
    let helpers: Vec<EnumHelper> = plan
        .tasks
        .iter()
        .flat_map(task_bindings)
        .filter_map(|binding| match &binding.conversion {
            Conversion::StringToEnum(name) => Some(EnumHelper::Parse(name.clone())),
            Conversion::EnumToString(name) => Some(EnumHelper::Name(name.clone())),
            Conversion::EnumToEnum { source, target } => {
                Some(EnumHelper::Convert(source.clone(), target.clone()))
            }
            _ => None,
        })
        .unique()
        .collect();

    for helper in helpers {
        match helper {
            EnumHelper::Parse(name) => {
                let decl = registry.enum_decl(&name)?;
                line(
                    out,
                    &format!(
                        "fn parse_{}(value: &str) -> Result<{name}, MappingError> {{",
                        snake_case(&name)
                    ),
                );
                line(out, "    match value {");
                for variant in &decl.variants {
                    line(out, &format!("        {variant:?} => Ok({name}::{variant}),"));
                }
                line(
                    out,
                    &format!(
                        "        other => Err(MappingError::UnknownEnumVariant({name:?}, other.to_string())),"
                    ),
                );
                line(out, "    }");
                line(out, "}");
                line(out, "");
            }
            EnumHelper::Name(name) => {
                let decl = registry.enum_decl(&name)?;
                line(
                    out,
                    &format!(
                        "fn {}_name(value: &{name}) -> &'static str {{",
                        snake_case(&name)
                    ),
                );
                line(out, "    match value {");
                for variant in &decl.variants {
                    line(out, &format!("        {name}::{variant} => {variant:?},"));
                }
                line(out, "    }");
                line(out, "}");
                line(out, "");
            }
            EnumHelper::Convert(source, target) => {
                // arms come from the source variant set; the target is
                // not structurally validated
                let decl = registry.enum_decl(&source)?;
                line(
                    out,
                    &format!(
                        "fn {}_to_{}(value: &{source}) -> {target} {{",
                        snake_case(&source),
                        snake_case(&target)
                    ),
                );
                line(out, "    match value {");
                for variant in &decl.variants {
                    line(
                        out,
                        &format!("        {source}::{variant} => {target}::{variant},"),
                    );
                }
                line(out, "    }");
                line(out, "}");
                line(out, "");
            }
        }
    }
    Ok(())
}

fn emit_temporal_helpers(out: &mut String, plan: &MappingPlan) {
    let kinds: Vec<TemporalKind> = plan
        .tasks
        .iter()
        .flat_map(task_bindings)
        .filter_map(|binding| match &binding.conversion {
            Conversion::StringToTemporal { kind, .. } => Some(*kind),
            _ => None,
        })
        .unique()
        .collect();

    for kind in kinds {
        let rust = kind.rust_name();
        line(
            out,
            &format!(
                "fn {}(value: &str, pattern: &'static str) -> Result<{rust}, MappingError> {{",
                parse_helper_name(kind)
            ),
        );
        line(out, &format!("    {rust}::parse_from_str(value, pattern)"));
        line(
            out,
            "        .map_err(|_| MappingError::InvalidTemporalValue(pattern, value.to_string()))",
        );
        line(out, "}");
        line(out, "");
    }
}
