//! # Generation Plan
//!
//! The structured hand-off to an emitter: every emit-eligible entity in
//! scheduled order, operations with their variants per context, and the
//! diagnostics of the run.
//!
//! Entries carry names, never arena ids, so a plan is meaningful without
//! the store that produced it. The plan never contains formatted code.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity::{Category, CreationCategory, Entity, EntityKind, OperationClass};
use crate::naming::NamingConvention;
use crate::scheduler::{Partition, Scheduler};
use crate::signature::{Context, ResolutionIndex, Resolver, SignatureVariant};
use crate::store::EntityStore;
use crate::types::{EntityId, TypeRef};
use serde::{Deserialize, Serialize};

// =============================================================================
// PLAN TYPES
// =============================================================================

/// Names and conditional-compilation data shared by every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub current: String,
    pub original: String,
    /// Platform guard.
    pub protect: Option<String>,
    /// Feature or extension introducing the entity.
    pub origin: Option<String>,
    /// Curated spellings of the aliases.
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedBundle {
    pub entry: PlanEntry,
    /// `feature` or `extension`.
    pub category: Category,
    pub number: String,
    pub depends: Vec<String>,
    pub promoted_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEnum {
    pub entry: PlanEntry,
    pub bitmask: bool,
    /// Core values first, then extension values, in declaration order.
    pub values: Vec<PlannedValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedValue {
    pub entry: PlanEntry,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedRecord {
    pub entry: PlanEntry,
    pub members: Vec<PlannedMember>,
    pub is_union: bool,
    pub returned_only: bool,
    /// Curated structure type tag (`eFenceCreateInfo`).
    pub structure_type: Option<String>,
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMember {
    pub name: String,
    /// Curated type spelling.
    pub ty: String,
    pub pointers: u8,
    pub is_const: bool,
    pub fixed_len: Option<String>,
    pub optional: bool,
    pub len: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedHandle {
    pub entry: PlanEntry,
    /// Superclass; `None` for loader-owned handles.
    pub parent: Option<String>,
    pub dispatchable: bool,
    pub creation: CreationCategory,
    pub second_owner: Option<String>,
    /// Whether a unique wrapper can release the handle.
    pub unique: bool,
    pub operations: Vec<PlannedOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOperation {
    pub entry: PlanEntry,
    pub class: OperationClass,
    /// Variants per context; contexts where resolution failed are absent.
    pub contexts: Vec<ContextVariants>,
}

impl PlannedOperation {
    /// Variants resolved in `context`, if any.
    #[must_use]
    pub fn variants(&self, context: &str) -> Option<&[SignatureVariant]> {
        self.contexts
            .iter()
            .find(|c| c.context == context)
            .map(|c| c.variants.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextVariants {
    pub context: String,
    pub variants: Vec<SignatureVariant>,
}

/// Everything an emitter needs, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPlan {
    /// Target API.
    pub api: String,
    /// Names of the contexts variants were resolved in.
    pub contexts: Vec<String>,
    pub bundles: Vec<PlannedBundle>,
    pub enums: Vec<PlannedEnum>,
    pub records: Vec<PlannedRecord>,
    pub handles: Vec<PlannedHandle>,
    /// Operations owned by no handle.
    pub loader: Vec<PlannedOperation>,
    pub diagnostics: Diagnostics,
}

impl GenerationPlan {
    /// Every operation, handle-owned first, then loader scope.
    pub fn operations(&self) -> impl Iterator<Item = &PlannedOperation> {
        self.handles
            .iter()
            .flat_map(|h| h.operations.iter())
            .chain(self.loader.iter())
    }

    /// Find an operation by either spelling.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&PlannedOperation> {
        self.operations()
            .find(|op| op.entry.current == name || op.entry.original == name)
    }

    /// Total number of variants over all operations and contexts.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.operations()
            .flat_map(|op| op.contexts.iter())
            .map(|c| c.variants.len())
            .sum()
    }
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Builds a [`GenerationPlan`] from a bound store.
pub struct Planner<'a> {
    store: &'a EntityStore,
    naming: &'a NamingConvention,
    index: ResolutionIndex,
}

impl<'a> Planner<'a> {
    #[must_use]
    pub fn new(store: &'a EntityStore, naming: &'a NamingConvention) -> Self {
        Self {
            store,
            naming,
            index: ResolutionIndex::build(store, naming),
        }
    }

    /// Schedule, resolve and collect every emit-eligible entity.
    ///
    /// Cycles and resolution failures are recorded in `diagnostics`; the
    /// returned plan carries a copy of the sink as it stands afterwards.
    pub fn assemble(&self, contexts: &[Context], diagnostics: &mut Diagnostics) -> GenerationPlan {
        let mut plan = GenerationPlan {
            api: self.naming.api.clone(),
            contexts: contexts.iter().map(|c| c.name.clone()).collect(),
            ..GenerationPlan::default()
        };

        for partition in Partition::ALL {
            let schedule = Scheduler::schedule(self.store, self.naming, partition);
            if let Some(cycle) = schedule.cycle_diagnostic(self.store, partition) {
                diagnostics.push(cycle);
            }
            // Stuck entities are still emitted, after the ordered ones.
            let ordered = schedule
                .order
                .iter()
                .chain(schedule.stuck.iter().map(|(id, _)| id))
                .filter_map(|id| self.store.entity(*id));
            match partition {
                Partition::Bundles => {
                    plan.bundles = ordered.filter_map(|e| self.bundle(e)).collect();
                }
                Partition::Records => {
                    plan.records = ordered.filter_map(|e| self.record(e)).collect();
                }
                Partition::Handles => {
                    plan.handles = ordered
                        .filter_map(|e| self.handle(e, contexts, diagnostics))
                        .collect();
                }
            }
        }

        plan.enums = self
            .store
            .of_category(Category::Enum)
            .filter(|e| e.is_emit_eligible())
            .filter_map(|e| self.enumeration(e))
            .collect();

        let resolver = Resolver::new(self.store, self.naming, &self.index);
        plan.loader = self
            .store
            .loader_commands()
            .iter()
            .filter_map(|id| self.store.entity(*id))
            .filter(|e| e.is_emit_eligible())
            .map(|e| self.operation(&resolver, e, contexts, diagnostics))
            .collect();

        plan.diagnostics = diagnostics.clone();
        tracing::info!(
            bundles = plan.bundles.len(),
            enums = plan.enums.len(),
            records = plan.records.len(),
            handles = plan.handles.len(),
            variants = plan.variant_count(),
            "plan assembled"
        );
        plan
    }

    fn entry(&self, entity: &Entity) -> PlanEntry {
        PlanEntry {
            current: entity.name.current.clone(),
            original: entity.name.original.clone(),
            protect: entity.protect.clone(),
            origin: entity.origin.map(|o| self.store.name_of(o)),
            aliases: entity.aliases.iter().map(|a| a.current.clone()).collect(),
        }
    }

    fn names(&self, ids: &[EntityId]) -> Vec<String> {
        ids.iter().map(|id| self.store.name_of(*id)).collect()
    }

    fn current_name(&self, id: EntityId) -> Option<String> {
        self.store.entity(id).map(|e| e.name.current.clone())
    }

    fn bundle(&self, entity: &Entity) -> Option<PlannedBundle> {
        let (EntityKind::Feature(bundle) | EntityKind::Extension(bundle)) = &entity.kind else {
            return None;
        };
        Some(PlannedBundle {
            entry: self.entry(entity),
            category: entity.category(),
            number: bundle.number.clone(),
            depends: self.names(&bundle.depends),
            promoted_to: bundle.promoted_to.clone(),
        })
    }

    fn enumeration(&self, entity: &Entity) -> Option<PlannedEnum> {
        let EntityKind::Enum(enumeration) = &entity.kind else {
            return None;
        };
        let extension_values = self.store.of_category(Category::EnumValue).filter(|v| {
            matches!(&v.kind, EntityKind::EnumValue(value) if value.extension && value.parent == Some(entity.id))
        });
        let values = enumeration
            .values
            .iter()
            .filter_map(|id| self.store.entity(*id))
            .chain(extension_values)
            .filter(|v| v.is_emit_eligible())
            .map(|v| PlannedValue {
                entry: self.entry(v),
                value: match &v.kind {
                    EntityKind::EnumValue(value) => value.value.clone(),
                    _ => None,
                },
            })
            .collect();
        Some(PlannedEnum {
            entry: self.entry(entity),
            bitmask: enumeration.bitmask,
            values,
        })
    }

    fn record(&self, entity: &Entity) -> Option<PlannedRecord> {
        let record = entity.as_record()?;
        let members = record
            .members
            .iter()
            .map(|m| PlannedMember {
                name: m.name.clone(),
                ty: self.type_name(&m.ty),
                pointers: m.ty.pointers,
                is_const: m.ty.is_const,
                fixed_len: m.ty.fixed_len.clone(),
                optional: m.optional,
                len: m.len.clone(),
            })
            .collect();
        let structure_type = record.structure_type.as_ref().map(|tag| {
            self.store
                .lookup(tag)
                .and_then(|id| self.current_name(id))
                .unwrap_or_else(|| {
                    self.naming
                        .enum_value_name(tag, &self.naming.type_tag_enum, self.store.tags())
                })
        });
        Some(PlannedRecord {
            entry: self.entry(entity),
            members,
            is_union: record.is_union,
            returned_only: record.returned_only,
            structure_type,
            extends: record
                .extends
                .iter()
                .filter_map(|id| self.current_name(*id))
                .collect(),
        })
    }

    fn handle(
        &self,
        entity: &Entity,
        contexts: &[Context],
        diagnostics: &mut Diagnostics,
    ) -> Option<PlannedHandle> {
        let handle = entity.as_handle()?;
        let resolver = Resolver::new(self.store, self.naming, &self.index);
        let operations = handle
            .commands
            .iter()
            .filter_map(|id| self.store.entity(*id))
            .filter(|e| e.is_emit_eligible())
            .map(|e| self.operation(&resolver, e, contexts, diagnostics))
            .collect();
        Some(PlannedHandle {
            entry: self.entry(entity),
            parent: handle.parent.and_then(|p| self.current_name(p)),
            dispatchable: handle.dispatchable,
            creation: handle.creation,
            second_owner: handle.second_owner.and_then(|p| self.current_name(p)),
            unique: handle
                .deleter
                .and_then(|d| self.store.entity(d))
                .is_some_and(Entity::is_emit_eligible),
            operations,
        })
    }

    fn operation(
        &self,
        resolver: &Resolver<'_>,
        entity: &Entity,
        contexts: &[Context],
        diagnostics: &mut Diagnostics,
    ) -> PlannedOperation {
        let mut planned = PlannedOperation {
            entry: self.entry(entity),
            class: entity
                .as_operation()
                .map_or(OperationClass::Unknown, |op| op.class),
            contexts: Vec::with_capacity(contexts.len()),
        };
        for context in contexts {
            match resolver.resolve(entity.id, context) {
                Ok(resolution) => {
                    for reason in resolution.degraded {
                        diagnostics.push(Diagnostic::VariantDegraded {
                            operation: entity.name.original.clone(),
                            context: context.name.clone(),
                            reason,
                        });
                    }
                    planned.contexts.push(ContextVariants {
                        context: context.name.clone(),
                        variants: resolution.variants,
                    });
                }
                Err(error) => diagnostics.push(Diagnostic::ResolutionInfeasible {
                    operation: entity.name.original.clone(),
                    context: context.name.clone(),
                    reason: error.to_string(),
                }),
            }
        }
        planned
    }

    fn type_name(&self, ty: &TypeRef) -> String {
        ty.entity
            .and_then(|id| self.current_name(id))
            .unwrap_or_else(|| self.naming.type_name(&ty.name))
    }
}

// =============================================================================
// TESTS
// =============================================================================
