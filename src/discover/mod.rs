//! Nested mapping discovery
//!
//! From every root mapping task this walks the bound field pairs, registers
//! a task for each nested type pair, and recurses. An explicit arena of
//! discovered pair keys guarantees each pair is registered exactly once;
//! the active traversal stack cuts reference cycles; declared and default
//! depth limits bound the recursion, with an exceeded limit being a silent
//! hard stop rather than an error.

use log::{debug, warn};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::analyze::{Conversion, NameCompatibility, classify};
use crate::config::MapGenConfig;
use crate::emit::literals::check_default;
use crate::error::{MapGenError, Result};
use crate::schema::{
    AbsencePolicy, BoundPair, Direction, SchemaRegistry, Transform, TypeDescriptor, resolve_pairs,
};

/// Identity of a mapping task: the (transfer, domain) type pair
pub type TaskKey = (String, String);

/// One resolved field pairing with its chosen conversion, ready to emit
#[derive(Debug, Clone)]
pub struct FieldBinding {
    /// Field name read on the source struct
    pub source_name: String,
    /// Field name written on the target struct
    pub target_name: String,
    /// Source field type
    pub source_ty: TypeDescriptor,
    /// Target field type
    pub target_ty: TypeDescriptor,
    /// Whether the source field is an `Option` in generated code
    pub source_optional: bool,
    /// Whether the target field is an `Option` in generated code
    pub target_optional: bool,
    /// Chosen conversion strategy
    pub conversion: Conversion,
    /// String transformer applied after conversion
    pub transform: Option<Transform>,
    /// Default literal applied when the source value is absent
    pub default: Option<String>,
    /// Behavior when a nested source value is absent
    pub absence: AbsencePolicy,
}

/// A discovered (transfer, domain) task with its analyzed binding sets.
///
/// Root tasks carry the binding set for their declared direction only;
/// nested tasks carry both, since their private helpers follow all four
/// emission patterns.
#[derive(Debug, Clone)]
pub struct MappingTask {
    /// Transfer-side type name
    pub transfer: String,
    /// Domain-side type name
    pub domain: String,
    /// Whether this task came from a declared transfer schema
    pub root: bool,
    /// Declared direction, for root tasks
    pub direction: Option<Direction>,
    /// Bindings writing the domain side
    pub to_domain: Option<Vec<FieldBinding>>,
    /// Bindings writing the transfer side
    pub to_transfer: Option<Vec<FieldBinding>>,
}

impl MappingTask {
    /// The pair identity of this task
    #[must_use]
    pub fn key(&self) -> TaskKey {
        (self.transfer.clone(), self.domain.clone())
    }
}

/// A root pair dropped from the plan by a fatal diagnostic
#[derive(Debug, Clone)]
pub struct PairFailure {
    /// The transfer schema whose pair failed
    pub transfer: String,
    /// The diagnostic message
    pub error: String,
}

/// The full mapping plan for one domain schema, consumed once by the
/// emitter
#[derive(Debug, Clone)]
pub struct MappingPlan {
    /// The domain schema this plan belongs to
    pub domain: String,
    /// Root tasks followed by nested tasks in discovery order
    pub tasks: Vec<MappingTask>,
    /// Root pairs dropped by a diagnostic, in declaration order
    pub failures: Vec<PairFailure>,
}

impl MappingPlan {
    /// Root tasks in declaration order
    pub fn roots(&self) -> impl Iterator<Item = &MappingTask> {
        self.tasks.iter().filter(|task| task.root)
    }

    /// Nested tasks in discovery order
    pub fn nested(&self) -> impl Iterator<Item = &MappingTask> {
        self.tasks.iter().filter(|task| !task.root)
    }
}

/// Arena of discovered pair keys, threaded by reference through the
/// traversal
#[derive(Debug, Default)]
struct DiscoveryArena {
    visited: FxHashSet<TaskKey>,
}

impl DiscoveryArena {
    fn register(&mut self, key: &TaskKey) -> bool {
        self.visited.insert(key.clone())
    }
}

/// Discover the mapping plan for one domain schema: every root task from
/// its declared transfer schemas plus every transitively nested task.
///
/// A diagnostic raised while discovering one root pair drops that pair
/// only: its partial tasks are rolled back, the failure is recorded on
/// the plan, and the remaining transfer schemas still discover. Only a
/// dangling domain reference fails the whole plan.
pub fn discover_plan(
    registry: &SchemaRegistry,
    config: &MapGenConfig,
    predicate: &dyn NameCompatibility,
    domain_name: &str,
) -> Result<MappingPlan> {
    // fail early on a dangling domain reference
    registry.schema(domain_name)?;

    let mut arena = DiscoveryArena::default();
    let mut stack: SmallVec<[TaskKey; 8]> = SmallVec::new();
    let mut tasks = Vec::new();
    let mut failures = Vec::new();

    for transfer in registry.transfer_schemas_for(domain_name) {
        let key = (transfer.name.clone(), domain_name.to_string());
        let direction = match &transfer.role {
            crate::schema::SchemaRole::Transfer { direction, .. } => *direction,
            _ => continue,
        };
        let tasks_mark = tasks.len();
        let visited_snapshot = arena.visited.clone();
        if !arena.register(&key) {
            continue;
        }
        let outcome = discover_task(
            registry,
            config,
            predicate,
            &mut arena,
            &mut stack,
            &mut tasks,
            key,
            Some(direction),
            config.default_max_depth,
        );
        if let Err(err) = outcome {
            warn!(
                "transfer schema '{}' -> '{domain_name}': {err}, dropping this pair",
                transfer.name
            );
            tasks.truncate(tasks_mark);
            arena.visited = visited_snapshot;
            stack.clear();
            failures.push(PairFailure {
                transfer: transfer.name.clone(),
                error: err.to_string(),
            });
        }
    }

    widen_root_orientations(registry, config, predicate, &mut tasks)?;

    Ok(MappingPlan {
        domain: domain_name.to_string(),
        tasks,
        failures,
    })
}

// A nested reference to a pair that is also a root demands the orientation
// the root's declared direction left out. Widening adds the missing
// binding set; iterated to a fixpoint since a widened set can reference
// further root pairs.
fn widen_root_orientations(
    registry: &SchemaRegistry,
    config: &MapGenConfig,
    predicate: &dyn NameCompatibility,
    tasks: &mut [MappingTask],
) -> Result<()> {
    let existing: FxHashSet<TaskKey> = tasks.iter().map(MappingTask::key).collect();
    loop {
        let mut need_to_domain: FxHashSet<TaskKey> = FxHashSet::default();
        let mut need_to_transfer: FxHashSet<TaskKey> = FxHashSet::default();
        for task in tasks.iter() {
            collect_nested_keys(task.to_domain.as_deref(), &mut need_to_domain);
            collect_nested_keys(task.to_transfer.as_deref(), &mut need_to_transfer);
        }

        let mut changed = false;
        for task in tasks.iter_mut() {
            let key = task.key();
            if task.to_domain.is_none() && need_to_domain.contains(&key) {
                task.to_domain =
                    Some(oriented_bindings(registry, config, predicate, &key, true, &existing)?);
                changed = true;
            }
            if task.to_transfer.is_none() && need_to_transfer.contains(&key) {
                task.to_transfer =
                    Some(oriented_bindings(registry, config, predicate, &key, false, &existing)?);
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
    }
}

fn collect_nested_keys(bindings: Option<&[FieldBinding]>, out: &mut FxHashSet<TaskKey>) {
    for binding in bindings.into_iter().flatten() {
        if let Conversion::Nested { transfer, domain }
        | Conversion::NestedCollection { transfer, domain } = &binding.conversion
        {
            out.insert((transfer.clone(), domain.clone()));
        }
    }
}

// Builds one orientation's bindings for an already-discovered pair.
// Nested references to pairs without a task (depth-cut subtrees) are
// dropped so the emitted module never calls an undefined helper.
fn oriented_bindings(
    registry: &SchemaRegistry,
    config: &MapGenConfig,
    predicate: &dyn NameCompatibility,
    key: &TaskKey,
    toward_domain: bool,
    existing: &FxHashSet<TaskKey>,
) -> Result<Vec<FieldBinding>> {
    let transfer = registry.schema(&key.0)?;
    let pairs = resolve_pairs(registry, transfer, &key.1)?;
    let mut bindings = build_bindings(config, predicate, &pairs, toward_domain)?;
    bindings.retain(|binding| match &binding.conversion {
        Conversion::Nested { transfer, domain }
        | Conversion::NestedCollection { transfer, domain } => {
            existing.contains(&(transfer.clone(), domain.clone()))
        }
        _ => true,
    });
    Ok(bindings)
}

#[allow(clippy::too_many_arguments)]
fn discover_task(
    registry: &SchemaRegistry,
    config: &MapGenConfig,
    predicate: &dyn NameCompatibility,
    arena: &mut DiscoveryArena,
    stack: &mut SmallVec<[TaskKey; 8]>,
    out: &mut Vec<MappingTask>,
    key: TaskKey,
    direction: Option<Direction>,
    depth_left: usize,
) -> Result<()> {
    let (transfer_name, domain_name) = key.clone();
    let transfer = registry.schema(&transfer_name)?;
    let pairs = resolve_pairs(registry, transfer, &domain_name)?;

    let mut to_domain = match direction {
        Some(Direction::Outbound) => None,
        _ => Some(build_bindings(config, predicate, &pairs, true)?),
    };
    let mut to_transfer = match direction {
        Some(Direction::Inbound) => None,
        _ => Some(build_bindings(config, predicate, &pairs, false)?),
    };

    // Child pairs with their per-field depth budgets. A pair the depth
    // limit cuts before it ever got a task is recorded so its bindings
    // can be dropped; the emitted module must never call an undefined
    // helper.
    let mut children: Vec<(TaskKey, usize)> = Vec::new();
    let mut seen_children: FxHashSet<TaskKey> = FxHashSet::default();
    let mut cut: FxHashSet<TaskKey> = FxHashSet::default();
    for (bindings, toward_domain) in [(&to_domain, true), (&to_transfer, false)] {
        for binding in bindings.iter().flatten() {
            let child = match &binding.conversion {
                Conversion::Nested { transfer, domain }
                | Conversion::NestedCollection { transfer, domain } => {
                    (transfer.clone(), domain.clone())
                }
                _ => continue,
            };
            if !seen_children.insert(child.clone()) {
                continue;
            }
            // the declared limit belongs to the transfer-side field of
            // this binding, which side that is depends on orientation
            let transfer_field = if toward_domain {
                &binding.source_name
            } else {
                &binding.target_name
            };
            let declared_limit = pairs
                .iter()
                .find(|pair| pair.transfer.name == *transfer_field)
                .and_then(|pair| pair.transfer.nested.as_ref())
                .and_then(|hint| hint.max_depth);
            let budget = declared_limit.map_or(depth_left, |limit| limit.min(depth_left));
            if budget == 0 && !stack.contains(&child) && !arena.visited.contains(&child) {
                // declared or default depth limit reached: hard stop,
                // not an error
                debug!(
                    "depth limit reached before {} <-> {}, dropping the field pair",
                    child.0, child.1
                );
                cut.insert(child);
                continue;
            }
            children.push((child, budget));
        }
    }
    if !cut.is_empty() {
        for bindings in [&mut to_domain, &mut to_transfer] {
            if let Some(bindings) = bindings {
                bindings.retain(|binding| match &binding.conversion {
                    Conversion::Nested { transfer, domain }
                    | Conversion::NestedCollection { transfer, domain } => {
                        !cut.contains(&(transfer.clone(), domain.clone()))
                    }
                    _ => true,
                });
            }
        }
    }

    out.push(MappingTask {
        transfer: transfer_name.clone(),
        domain: domain_name.clone(),
        root: direction.is_some(),
        direction,
        to_domain,
        to_transfer,
    });

    stack.push(key);
    for (child, budget) in children {
        if stack.contains(&child) {
            debug!(
                "cycle cut: {} <-> {} already on the traversal stack",
                child.0, child.1
            );
            continue;
        }
        if !arena.register(&child) {
            continue;
        }
        let nested_transfer = registry.schema(&child.0)?;
        if !nested_transfer.has_default_ctor {
            stack.pop();
            return Err(MapGenError::MissingDefaultCtor(child.0.clone()));
        }
        discover_task(
            registry,
            config,
            predicate,
            arena,
            stack,
            out,
            child,
            None,
            budget - 1,
        )?;
    }
    stack.pop();
    Ok(())
}

// Builds the binding set for one conversion orientation. `toward_domain`
// selects transfer -> domain (inbound orientation) or domain -> transfer.
fn build_bindings(
    config: &MapGenConfig,
    predicate: &dyn NameCompatibility,
    pairs: &[BoundPair<'_>],
    toward_domain: bool,
) -> Result<Vec<FieldBinding>> {
    let orientation = if toward_domain {
        Direction::Inbound
    } else {
        Direction::Outbound
    };

    let mut bindings = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (source, target) = if toward_domain {
            (pair.transfer, pair.domain)
        } else {
            (pair.domain, pair.transfer)
        };

        let conversion = classify(pair.transfer, &source.ty, &target.ty, orientation, predicate)?;
        if conversion == Conversion::Unclassified {
            if config.fail_on_unclassified {
                return Err(MapGenError::UnclassifiedPair {
                    field: pair.transfer.name.clone(),
                    source_ty: source.ty.to_string(),
                    target_ty: target.ty.to_string(),
                });
            }
            warn!(
                "field '{}': no conversion from {} to {}, falling back to identity passthrough",
                pair.transfer.name, source.ty, target.ty
            );
        } else if config.log_conversions {
            debug!(
                "field '{}': {:?} ({} -> {})",
                pair.transfer.name, conversion, source.ty, target.ty
            );
        }

        let mut transform = pair.transfer.transform;
        if transform.is_some() && target.ty != TypeDescriptor::Text {
            warn!(
                "field '{}': transformer declared but the target is {}, dropping it",
                pair.transfer.name, target.ty
            );
            transform = None;
        }

        let default = if toward_domain {
            if let Some(literal) = &pair.transfer.default {
                check_default(&pair.transfer.name, literal, &target.ty);
                Some(literal.clone())
            } else {
                None
            }
        } else {
            None
        };

        bindings.push(FieldBinding {
            source_name: source.name.clone(),
            target_name: target.name.clone(),
            source_ty: source.ty.clone(),
            target_ty: target.ty.clone(),
            source_optional: source.is_optional(),
            target_optional: target.is_optional(),
            conversion,
            transform,
            default,
            absence: pair
                .transfer
                .nested
                .as_ref()
                .map_or(AbsencePolicy::Null, |hint| hint.absence),
        });
    }
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::SuffixStripping;
    use crate::schema::{FieldDeclaration, NestedHint, SchemaDeclaration};

    fn nested_registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry.declare(
            SchemaDeclaration::domain("Address")
                .with_field(FieldDeclaration::new("street", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::domain("User")
                .with_field(FieldDeclaration::new("name", TypeDescriptor::Text))
                .with_field(FieldDeclaration::new(
                    "address",
                    TypeDescriptor::Schema("Address".into()),
                )),
        );
        registry.declare(
            SchemaDeclaration::plain("AddressDto")
                .with_field(FieldDeclaration::new("street", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::inbound("UserCreate", "User")
                .with_field(FieldDeclaration::new("name", TypeDescriptor::Text))
                .with_field(FieldDeclaration::new(
                    "address",
                    TypeDescriptor::Schema("AddressDto".into()),
                )),
        );
        registry
    }

    #[test]
    fn test_nested_pair_registered_exactly_once() {
        let mut registry = nested_registry();
        // a second root reaching the same nested pair
        registry.declare(
            SchemaDeclaration::inbound("UserUpdate", "User").with_field(FieldDeclaration::new(
                "address",
                TypeDescriptor::Schema("AddressDto".into()),
            )),
        );

        let config = MapGenConfig::default();
        let predicate = SuffixStripping::default();
        let plan = discover_plan(&registry, &config, &predicate, "User").unwrap();

        let keys: Vec<TaskKey> = plan.tasks.iter().map(MappingTask::key).collect();
        assert_eq!(
            keys,
            vec![
                ("UserCreate".to_string(), "User".to_string()),
                ("AddressDto".to_string(), "Address".to_string()),
                ("UserUpdate".to_string(), "User".to_string()),
            ]
        );
        assert!(plan.tasks[0].root);
        let nested = &plan.tasks[1];
        assert!(!nested.root);
        // nested helpers carry both binding sets
        assert!(nested.to_domain.is_some());
        assert!(nested.to_transfer.is_some());
    }

    #[test]
    fn test_cycle_terminates() {
        let mut registry = SchemaRegistry::new();
        registry.declare(
            SchemaDeclaration::domain("Node").with_field(FieldDeclaration::new(
                "next",
                TypeDescriptor::Schema("Node".into()),
            )),
        );
        registry.declare(
            SchemaDeclaration::inbound("NodeDto", "Node").with_field(FieldDeclaration::new(
                "next",
                TypeDescriptor::Schema("NodeDto".into()),
            )),
        );

        let config = MapGenConfig::default();
        let predicate = SuffixStripping::default();
        let plan = discover_plan(&registry, &config, &predicate, "Node").unwrap();
        // the self-referential pair appears exactly once
        assert_eq!(plan.tasks.len(), 1);
    }

    #[test]
    fn test_declared_depth_is_a_hard_stop() {
        let mut registry = SchemaRegistry::new();
        registry.declare(
            SchemaDeclaration::domain("Leaf")
                .with_field(FieldDeclaration::new("value", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::domain("Branch").with_field(FieldDeclaration::new(
                "leaf",
                TypeDescriptor::Schema("Leaf".into()),
            )),
        );
        registry.declare(
            SchemaDeclaration::domain("Tree").with_field(FieldDeclaration::new(
                "branch",
                TypeDescriptor::Schema("Branch".into()),
            )),
        );
        registry.declare(
            SchemaDeclaration::plain("LeafDto")
                .with_field(FieldDeclaration::new("value", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::plain("BranchDto").with_field(FieldDeclaration::new(
                "leaf",
                TypeDescriptor::Schema("LeafDto".into()),
            )),
        );
        registry.declare(
            SchemaDeclaration::inbound("TreeDto", "Tree").with_field(
                FieldDeclaration::new("branch", TypeDescriptor::Schema("BranchDto".into()))
                    .with_nested(NestedHint {
                        max_depth: Some(1),
                        ..NestedHint::default()
                    }),
            ),
        );

        let config = MapGenConfig::default();
        let predicate = SuffixStripping::default();
        let plan = discover_plan(&registry, &config, &predicate, "Tree").unwrap();
        let keys: Vec<TaskKey> = plan.tasks.iter().map(MappingTask::key).collect();
        // BranchDto is reached at depth 1; LeafDto would be depth 2 and is cut
        assert_eq!(
            keys,
            vec![
                ("TreeDto".to_string(), "Tree".to_string()),
                ("BranchDto".to_string(), "Branch".to_string()),
            ]
        );

        // the cut pair's bindings go with it, so nothing references a
        // task that was never discovered
        let branch = &plan.tasks[1];
        assert!(branch.to_domain.as_ref().unwrap().is_empty());
        assert!(branch.to_transfer.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_declared_depth_belongs_to_the_transfer_field() {
        let mut registry = SchemaRegistry::new();
        registry.declare(
            SchemaDeclaration::plain("Inner")
                .with_field(FieldDeclaration::new("value", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::plain("InnerDto")
                .with_field(FieldDeclaration::new("value", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::domain("Outer")
                .with_field(FieldDeclaration::new(
                    "data",
                    TypeDescriptor::Schema("Inner".into()),
                ))
                .with_field(FieldDeclaration::new("note", TypeDescriptor::Text)),
        );
        // "data" is an unrelated text field that happens to share its name
        // with the domain field the nested "payload" field binds to; its
        // depth limit must not leak onto the payload pair
        registry.declare(
            SchemaDeclaration::outbound("OuterView", "Outer")
                .with_field(
                    FieldDeclaration::new("data", TypeDescriptor::Text)
                        .bound_to("note")
                        .with_nested(NestedHint {
                            max_depth: Some(0),
                            ..NestedHint::default()
                        }),
                )
                .with_field(
                    FieldDeclaration::new("payload", TypeDescriptor::Schema("InnerDto".into()))
                        .bound_to("data"),
                ),
        );

        let config = MapGenConfig::default();
        let predicate = SuffixStripping::default();
        let plan = discover_plan(&registry, &config, &predicate, "Outer").unwrap();
        let keys: Vec<TaskKey> = plan.tasks.iter().map(MappingTask::key).collect();
        assert_eq!(
            keys,
            vec![
                ("OuterView".to_string(), "Outer".to_string()),
                ("InnerDto".to_string(), "Inner".to_string()),
            ]
        );
        // the payload binding survives with its nested conversion intact
        let bindings = plan.tasks[0].to_transfer.as_ref().unwrap();
        assert!(bindings.iter().any(|b| b.target_name == "payload"
            && matches!(b.conversion, Conversion::Nested { .. })));
    }

    #[test]
    fn test_root_pair_reached_as_nested_gains_missing_orientation() {
        let mut registry = SchemaRegistry::new();
        registry.declare(
            SchemaDeclaration::domain("User")
                .with_field(FieldDeclaration::new("name", TypeDescriptor::Text))
                .with_field(FieldDeclaration::new(
                    "creator",
                    TypeDescriptor::Schema("User".into()),
                )),
        );
        registry.declare(
            SchemaDeclaration::inbound("UserCreate", "User")
                .with_field(FieldDeclaration::new("name", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::outbound("UserView", "User")
                .with_field(FieldDeclaration::new("name", TypeDescriptor::Text))
                .with_field(FieldDeclaration::new(
                    "creator",
                    TypeDescriptor::Schema("UserCreate".into()),
                )),
        );

        let config = MapGenConfig::default();
        let predicate = SuffixStripping::default();
        let plan = discover_plan(&registry, &config, &predicate, "User").unwrap();

        // UserView's creator field references the (UserCreate, User) root
        // pair in the to-transfer orientation, which the inbound root's
        // declared direction left out: the root is widened to carry it
        let create = plan
            .tasks
            .iter()
            .find(|task| task.transfer == "UserCreate")
            .unwrap();
        assert!(create.root);
        assert!(create.to_domain.is_some());
        assert!(create.to_transfer.is_some());
    }

    #[test]
    fn test_missing_default_ctor_drops_the_pair() {
        let mut registry = nested_registry();
        registry.declare(
            SchemaDeclaration::plain("ProfileDto")
                .without_default_ctor()
                .with_field(FieldDeclaration::new("bio", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::domain("Profile")
                .with_field(FieldDeclaration::new("bio", TypeDescriptor::Text)),
        );
        registry.declare(
            SchemaDeclaration::inbound("AccountDto", "Account").with_field(
                FieldDeclaration::new("profile", TypeDescriptor::Schema("ProfileDto".into())),
            ),
        );
        registry.declare(
            SchemaDeclaration::domain("Account").with_field(FieldDeclaration::new(
                "profile",
                TypeDescriptor::Schema("Profile".into()),
            )),
        );

        let config = MapGenConfig::default();
        let predicate = SuffixStripping::default();
        let plan = discover_plan(&registry, &config, &predicate, "Account").unwrap();

        // the pair is dropped with its partial tasks rolled back, and the
        // failure is recorded on the plan
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].transfer, "AccountDto");
        assert!(plan.failures[0].error.contains("ProfileDto"));
    }
}
