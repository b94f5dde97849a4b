//! # Signature Resolver
//!
//! Derives the call forms of one bound operation in one context.
//!
//! Resolution has two stages:
//! 1. Analysis, independent of the context: anchor parameter, owned-value
//!    substitutions, outputs, created handle and its indirect owner
//! 2. Synthesis, per context: variant plans by operation class, each turned
//!    into arguments, a return type, a body strategy and a status check
//!
//! The substitution map is computed once per operation, so every context
//! substitutes the same field for the same parameter; a parameter matching
//! a field ambiguously fails resolution instead of being guessed.

use super::context::Context;
use super::index::ResolutionIndex;
use super::variant::{
    Argument, ArgumentOrigin, ArgumentShape, Assignment, BodyStrategy, DefaultValue, Deleter,
    OwnedValue, OwnerSource, Ownership, ReturnType, SignatureVariant, StatusCheck, ValueType,
    VariantKind,
};
use crate::entity::{Category, Entity, LengthBinding, Operation, ParamFlags, Parameter};
use crate::naming::{lower_first, singular, NamingConvention};
use crate::primitives::UNIQUE_SUFFIX;
use crate::store::EntityStore;
use crate::types::{EntityId, TypeRef};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Upper bound on superclass chain walks.
const MAX_SUPERCLASS_DEPTH: usize = 16;

/// Reasons an operation yields no variants in a context.
///
/// Never fatal to a run: the caller records a diagnostic and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Not an operation: {0}")]
    NotAnOperation(String),

    #[error("Operation has not been bound: {0}")]
    NotBound(String),

    #[error("No anchor parameter in {0}")]
    NoAnchor(String),

    #[error("Ambiguous substitution in {operation}: {field:?} matches {params:?}")]
    AmbiguousSubstitution {
        operation: String,
        field: OwnedValue,
        params: Vec<String>,
    },

    #[error("Ambiguous indirect owner in {operation}: {candidates:?}")]
    AmbiguousIndirectOwner {
        operation: String,
        candidates: Vec<String>,
    },

    #[error("Unsupported multi-handle output in {operation}: {handles:?}")]
    UnsupportedMultiHandleOutput {
        operation: String,
        handles: Vec<String>,
    },
}

/// Variants of one operation in one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub variants: Vec<SignatureVariant>,
    /// Variants produced in a reduced form, with the reason.
    pub degraded: Vec<String>,
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// The handle a constructor produces.
#[derive(Debug, Clone, Copy)]
struct Created {
    param: usize,
    handle: EntityId,
    /// Input parameter owning the new handle (closest superclass).
    owner_param: Option<usize>,
}

/// Context-independent facts about one operation.
struct Analysis<'a> {
    entity: &'a Entity,
    op: &'a Operation,
    owner: Option<&'a Entity>,
    substitutions: BTreeMap<usize, OwnedValue>,
    allocator: Option<usize>,
    /// Last parameter that is neither the allocator nor a length.
    anchor: usize,
    /// Non-length outputs, in parameter order.
    outputs: Vec<usize>,
    created: Option<Created>,
    returns_status: bool,
    has_incomplete: bool,
}

impl Analysis<'_> {
    fn param(&self, index: usize) -> Option<&Parameter> {
        self.op.params.get(index)
    }

    fn several_successes(&self) -> bool {
        self.returns_status && self.op.success_codes.len() > 1
    }
}

/// Output arrays returned by a variant, and how they are sized.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fill {
    Query {
        count: usize,
        arrays: Vec<usize>,
        retry: bool,
    },
    Sized {
        count: LengthBinding,
        arrays: Vec<usize>,
    },
}

impl Fill {
    fn arrays(&self) -> &[usize] {
        match self {
            Self::Query { arrays, .. } | Self::Sized { arrays, .. } => arrays,
        }
    }
}

/// Shape of one variant before it is materialized.
#[derive(Debug, Clone)]
struct Plan {
    kind: VariantKind,
    name: String,
    fill: Option<Fill>,
    /// Length parameter collapsed to one element.
    single: Option<usize>,
    /// Output threaded through a structure chain.
    chain: Option<usize>,
    /// Destroyed handle made non-optional.
    required: Option<usize>,
}

impl Plan {
    fn new(kind: VariantKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            fill: None,
            single: None,
            chain: None,
            required: None,
        }
    }

    fn fills(&self, index: usize) -> bool {
        self.fill.as_ref().is_some_and(|f| f.arrays().contains(&index))
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Synthesizes signature variants over a read-only store.
pub struct Resolver<'a> {
    store: &'a EntityStore,
    naming: &'a NamingConvention,
    index: &'a ResolutionIndex,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(
        store: &'a EntityStore,
        naming: &'a NamingConvention,
        index: &'a ResolutionIndex,
    ) -> Self {
        Self {
            store,
            naming,
            index,
        }
    }

    /// Resolve the variants of operation `id` in `context`.
    pub fn resolve(&self, id: EntityId, context: &Context) -> Result<Resolution, ResolveError> {
        let analysis = self.analyze(id)?;
        let mut resolution = Resolution::default();

        let class = analysis.op.class;
        if class.is_destructor() {
            if context.is_raii() {
                return Ok(resolution);
            }
            self.destructor_variants(&analysis, context, &mut resolution);
        } else if class.is_constructor() && analysis.created.is_some() {
            self.constructor_variants(&analysis, context, &mut resolution);
        } else {
            self.general_variants(&analysis, context, &mut resolution);
        }

        tracing::trace!(
            operation = %analysis.entity.name,
            context = %context.name,
            variants = resolution.variants.len(),
            "resolved"
        );
        Ok(resolution)
    }

    fn analyze(&self, id: EntityId) -> Result<Analysis<'a>, ResolveError> {
        let entity = self
            .store
            .entity(id)
            .ok_or_else(|| ResolveError::NotAnOperation(id.to_string()))?;
        let op = entity
            .as_operation()
            .ok_or_else(|| ResolveError::NotAnOperation(entity.name.original.clone()))?;
        let name = &entity.name.original;
        if !op.bound {
            return Err(ResolveError::NotBound(name.clone()));
        }

        let owner = op.owner.and_then(|o| self.store.entity(o));
        let (substitutions, allocator) = self.substitutions(name, op, owner)?;

        // Owned values may anchor: `vkDestroyDevice` is anchored on its self handle.
        let anchor = op
            .params
            .iter()
            .enumerate()
            .rev()
            .find(|(i, p)| Some(*i) != allocator && p.sizes.is_empty())
            .map(|(i, _)| i)
            .ok_or_else(|| ResolveError::NoAnchor(name.clone()))?;

        let outputs: Vec<usize> = op
            .params
            .iter()
            .enumerate()
            .filter(|(i, p)| p.is_output() && p.sizes.is_empty() && !substitutions.contains_key(i))
            .map(|(i, _)| i)
            .collect();

        let output_handles: BTreeSet<EntityId> = outputs
            .iter()
            .filter_map(|&i| op.params[i].ty.entity)
            .filter(|&e| self.is_handle(e))
            .collect();
        if output_handles.len() > 1 {
            return Err(ResolveError::UnsupportedMultiHandleOutput {
                operation: name.clone(),
                handles: output_handles.iter().map(|h| self.store.name_of(*h)).collect(),
            });
        }

        let created = if op.class.is_constructor() {
            self.created(name, op, &outputs)?
        } else {
            None
        };

        Ok(Analysis {
            entity,
            op,
            owner,
            substitutions,
            allocator,
            anchor,
            outputs,
            created,
            returns_status: op.return_type.name == self.naming.status_enum,
            has_incomplete: op
                .success_codes
                .iter()
                .any(|c| *c == self.naming.incomplete_status),
        })
    }

    /// Map parameters to the owned values they can be substituted with.
    fn substitutions(
        &self,
        operation: &str,
        op: &Operation,
        owner: Option<&Entity>,
    ) -> Result<(BTreeMap<usize, OwnedValue>, Option<usize>), ResolveError> {
        let mut map = BTreeMap::new();

        let mut fields: Vec<(OwnedValue, Vec<usize>)> = Vec::new();
        if let Some(owner) = owner {
            let by_value = |target: Option<EntityId>| -> Vec<usize> {
                let Some(target) = target else {
                    return Vec::new();
                };
                op.params
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| {
                        p.ty.entity == Some(target) && p.ty.pointers == 0 && !p.is_array()
                    })
                    .map(|(i, _)| i)
                    .collect()
            };
            let handle = owner.as_handle();
            fields.push((OwnedValue::SelfHandle, by_value(Some(owner.id))));
            fields.push((OwnedValue::Superclass, by_value(handle.and_then(|h| h.parent))));
            fields.push((
                OwnedValue::SecondOwner,
                by_value(handle.and_then(|h| h.second_owner)),
            ));
        }
        let allocators: Vec<usize> = op
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.ty.name == self.naming.allocator_type && p.ty.pointers > 0)
            .map(|(i, _)| i)
            .collect();
        fields.push((OwnedValue::Allocator, allocators));

        let mut allocator = None;
        for (field, candidates) in fields {
            match candidates.as_slice() {
                [] => {}
                [single] => {
                    map.insert(*single, field);
                    if field == OwnedValue::Allocator {
                        allocator = Some(*single);
                    }
                }
                several => {
                    return Err(ResolveError::AmbiguousSubstitution {
                        operation: operation.to_string(),
                        field,
                        params: several.iter().map(|&i| op.params[i].name.clone()).collect(),
                    });
                }
            }
        }
        Ok((map, allocator))
    }

    /// Find the created handle and its closest owning parameter.
    fn created(
        &self,
        operation: &str,
        op: &Operation,
        outputs: &[usize],
    ) -> Result<Option<Created>, ResolveError> {
        let Some((param, handle)) = outputs.iter().find_map(|&i| {
            op.params[i]
                .ty
                .entity
                .filter(|&e| self.is_handle(e))
                .map(|e| (i, e))
        }) else {
            return Ok(None);
        };

        let chain = self.superclass_chain(handle);
        let mut best: Option<(usize, Vec<usize>)> = None;
        for (i, p) in op.params.iter().enumerate() {
            if p.is_output() || p.ty.pointers > 0 {
                continue;
            }
            let Some(distance) = p
                .ty
                .entity
                .and_then(|e| chain.iter().position(|c| *c == e))
            else {
                continue;
            };
            if best.as_ref().is_none_or(|(d, _)| distance < *d) {
                best = Some((distance, vec![i]));
            } else if let Some((d, params)) = &mut best {
                if *d == distance {
                    params.push(i);
                }
            }
        }

        let owner_param = match best {
            None => None,
            Some((_, params)) if params.len() == 1 => params.first().copied(),
            Some((_, params)) => {
                return Err(ResolveError::AmbiguousIndirectOwner {
                    operation: operation.to_string(),
                    candidates: params.iter().map(|&i| op.params[i].name.clone()).collect(),
                });
            }
        };
        Ok(Some(Created {
            param,
            handle,
            owner_param,
        }))
    }

    /// Parent, grandparent, ... of `handle`.
    fn superclass_chain(&self, handle: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut current = self
            .store
            .entity(handle)
            .and_then(|e| e.as_handle())
            .and_then(|h| h.parent);
        while let Some(parent) = current {
            if chain.contains(&parent) || chain.len() >= MAX_SUPERCLASS_DEPTH {
                break;
            }
            chain.push(parent);
            current = self
                .store
                .entity(parent)
                .and_then(|e| e.as_handle())
                .and_then(|h| h.parent);
        }
        chain
    }

    fn is_handle(&self, id: EntityId) -> bool {
        self.store
            .entity(id)
            .is_some_and(|e| e.category() == Category::Handle)
    }

    // =========================================================================
    // VARIANT PLANS
    // =========================================================================

    fn destructor_variants(&self, a: &Analysis<'_>, ctx: &Context, out: &mut Resolution) {
        let name = &a.entity.name.current;
        out.variants
            .push(self.materialize(a, ctx, &Plan::new(VariantKind::Default, name)));

        let Some(key) = ResolutionIndex::overload_key(self.store, self.naming, a.entity.id) else {
            return;
        };
        if self.index.overload_provider(&key) != Some(a.entity.id) {
            return;
        }
        let destroyed = Some(a.anchor)
            .filter(|&i| a.op.params[i].ty.entity == Some(key.handle))
            .or_else(|| a.op.params.iter().rposition(|p| p.ty.entity == Some(key.handle)));
        let mut plan = Plan::new(VariantKind::HandleOverload, lower_first(a.op.class.verb()));
        plan.required = destroyed;
        out.variants.push(self.materialize(a, ctx, &plan));
    }

    fn constructor_variants(&self, a: &Analysis<'_>, ctx: &Context, out: &mut Resolution) {
        let Some(created) = a.created else {
            return;
        };
        let name = &a.entity.name.current;
        let created_param = &a.op.params[created.param];

        let mut plans = Vec::new();
        let mut default = Plan::new(VariantKind::Default, name);
        if created_param.is_array() {
            default.fill = created_param.length.clone().map(|count| Fill::Sized {
                count,
                arrays: vec![created.param],
            });
        }
        plans.push(default.clone());

        if default.fill.is_some() {
            if let Some(LengthBinding::Param(length)) = created_param.length {
                if ctx.return_single_item {
                    let mut single = Plan::new(
                        VariantKind::SingleItem,
                        singular(name, self.store.tags()),
                    );
                    single.single = Some(length);
                    plans.push(single);
                }
            }
            if ctx.add_allocator_param {
                let mut bulk = default.clone();
                bulk.kind = VariantKind::BulkWithAllocator;
                plans.push(bulk);
            }
        }

        let borrowed: Vec<SignatureVariant> = plans
            .iter()
            .map(|plan| self.materialize(a, ctx, plan))
            .collect();
        let deleter = self.deleter(a, ctx, created);

        if ctx.is_raii() {
            out.variants.extend(borrowed.into_iter().map(|v| {
                Self::owning(v, Ownership::Raii, ReturnType::Owning, created, deleter.clone())
            }));
            return;
        }

        let unique = if ctx.in_unique_wrapper {
            Vec::new()
        } else {
            match &deleter {
                Some(deleter) => borrowed
                    .iter()
                    .cloned()
                    .map(|mut v| {
                        v.name.push_str(UNIQUE_SUFFIX);
                        Self::owning(
                            v,
                            Ownership::Unique,
                            ReturnType::Unique,
                            created,
                            Some(deleter.clone()),
                        )
                    })
                    .collect(),
                None => Vec::new(),
            }
        };
        out.variants.extend(borrowed);
        out.variants.extend(unique);
    }

    fn general_variants(&self, a: &Analysis<'_>, ctx: &Context, out: &mut Resolution) {
        let name = &a.entity.name.current;
        out.variants
            .push(self.materialize(a, ctx, &Plan::new(VariantKind::Default, name)));

        if let Some(fill) = self.bulk_fill(a, ctx, &mut out.degraded) {
            let mut bulk = Plan::new(VariantKind::Bulk, name);
            bulk.fill = Some(fill.clone());
            out.variants.push(self.materialize(a, ctx, &bulk));

            if ctx.add_allocator_param {
                bulk.kind = VariantKind::BulkWithAllocator;
                out.variants.push(self.materialize(a, ctx, &bulk));
            }

            let chained = fill
                .arrays()
                .first()
                .copied()
                .filter(|&i| self.is_extendable_param(a, i));
            if ctx.build_structure_chain {
                if let Some(chain) = chained {
                    let mut plan = Plan::new(VariantKind::BulkStructureChain, name);
                    plan.fill = Some(fill);
                    plan.chain = Some(chain);
                    out.variants.push(self.materialize(a, ctx, &plan));
                }
            }
        }

        if ctx.build_structure_chain {
            let value_outputs: Vec<usize> = a
                .outputs
                .iter()
                .copied()
                .filter(|&i| !a.op.params[i].is_array())
                .collect();
            if let [single] = value_outputs.as_slice() {
                if self.is_extendable_param(a, *single) {
                    let mut plan = Plan::new(VariantKind::StructureChain, name);
                    plan.chain = Some(*single);
                    out.variants.push(self.materialize(a, ctx, &plan));
                }
            }
        }
    }

    /// How the bulk variant sizes its returned arrays, if it has any.
    fn bulk_fill(
        &self,
        a: &Analysis<'_>,
        ctx: &Context,
        degraded: &mut Vec<String>,
    ) -> Option<Fill> {
        let params = &a.op.params;
        let binding = a
            .outputs
            .iter()
            .map(|&i| &params[i])
            .find(|p| p.is_array() && p.length.is_some())?
            .length
            .clone()?;
        let arrays: Vec<usize> = a
            .outputs
            .iter()
            .copied()
            .filter(|&i| params[i].is_array() && params[i].length.as_ref() == Some(&binding))
            .collect();

        let fill = match binding {
            LengthBinding::Param(count) if params[count].is_output() => {
                if !a.returns_status {
                    Fill::Query {
                        count,
                        arrays,
                        retry: false,
                    }
                } else if a.has_incomplete {
                    Fill::Query {
                        count,
                        arrays,
                        retry: true,
                    }
                } else {
                    degraded.push(format!(
                        "{} [{}]: no {} status, bulk call takes the count from the caller",
                        a.entity.name, ctx.name, self.naming.incomplete_status
                    ));
                    Fill::Sized {
                        count: LengthBinding::Param(count),
                        arrays,
                    }
                }
            }
            count => Fill::Sized { count, arrays },
        };
        Some(fill)
    }

    fn is_extendable_param(&self, a: &Analysis<'_>, index: usize) -> bool {
        a.param(index)
            .and_then(|p| p.ty.entity)
            .is_some_and(|e| self.index.is_extendable(e))
    }

    fn deleter(&self, a: &Analysis<'_>, ctx: &Context, created: Created) -> Option<Deleter> {
        let handle = self.store.entity(created.handle)?.as_handle()?;
        let deleter = self
            .store
            .entity(handle.deleter?)
            .filter(|d| d.is_emit_eligible())?;
        let op = deleter.as_operation()?;
        let owner = created.owner_param.map(|p| match a.substitutions.get(&p) {
            Some(field) if ctx.provides(*field) => OwnerSource::Owned(*field),
            _ => OwnerSource::Param(p),
        });
        Some(Deleter {
            operation: deleter.name.current.clone(),
            class: op.class,
            owner,
            pool: handle
                .second_owner
                .and_then(|p| self.store.entity(p))
                .map(|p| p.name.current.clone()),
            allocator: op
                .params
                .iter()
                .any(|p| p.ty.name == self.naming.allocator_type),
        })
    }

    /// Wrap the created handles of `variant` with their deleter.
    fn owning(
        mut variant: SignatureVariant,
        ownership: Ownership,
        wrap: fn(Box<ReturnType>) -> ReturnType,
        created: Created,
        deleter: Option<Deleter>,
    ) -> SignatureVariant {
        variant.ownership = ownership;
        variant.return_type = variant.return_type.wrap_handles(wrap, created.handle);
        variant.body = BodyStrategy::Owning {
            deleter,
            inner: Box::new(variant.body),
        };
        variant
    }

    // =========================================================================
    // MATERIALIZATION
    // =========================================================================

    fn materialize(&self, a: &Analysis<'_>, ctx: &Context, plan: &Plan) -> SignatureVariant {
        let mut arguments: Vec<Argument> = a
            .op
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let (shape, assignment, default) = self.treatment(a, ctx, plan, i, p);
                Argument {
                    name: p.display_name.clone(),
                    origin: ArgumentOrigin::Param(i),
                    shape,
                    default,
                    ignored: assignment != Assignment::Public,
                    assignment,
                }
            })
            .collect();

        if plan.kind == VariantKind::BulkWithAllocator {
            let element = plan
                .fill
                .as_ref()
                .and_then(|f| f.arrays().first().copied())
                .and_then(|i| a.param(i))
                .map(|p| self.value_type(&p.ty, 1))
                .unwrap_or_else(|| ValueType {
                    name: "void".to_string(),
                    entity: None,
                });
            let type_base = element.name.trim_end_matches('*');
            arguments.push(Argument {
                name: format!("{}Allocator", lower_first(type_base)),
                origin: ArgumentOrigin::SequenceAllocator,
                shape: ArgumentShape::SequenceAllocator(element),
                default: Some(DefaultValue::DefaultAllocator),
                assignment: Assignment::Public,
                ignored: false,
            });
        }

        let dispatch_owned = ctx.provides(OwnedValue::Dispatch);
        arguments.push(Argument {
            name: "dispatch".to_string(),
            origin: ArgumentOrigin::Dispatch,
            shape: ArgumentShape::Dispatcher,
            default: (!dispatch_owned).then_some(DefaultValue::DefaultDispatcher),
            assignment: if dispatch_owned {
                Assignment::Owned(OwnedValue::Dispatch)
            } else {
                Assignment::Public
            },
            ignored: dispatch_owned,
        });

        let value = self.return_value(a, plan, &arguments);
        let has_results = value.is_some();
        let return_type = match value {
            Some(value) if a.several_successes() => ReturnType::WithStatus(Box::new(value)),
            Some(value) => value,
            None if a.several_successes() => ReturnType::Status,
            None => ReturnType::Void,
        };

        let body = match &plan.fill {
            Some(Fill::Query {
                count,
                arrays,
                retry,
            }) => BodyStrategy::QueryThenFill {
                count: *count,
                arrays: arrays.clone(),
                retry_on_incomplete: *retry,
            },
            Some(Fill::Sized { count, arrays }) => BodyStrategy::SizedFill {
                count: count.clone(),
                arrays: arrays.clone(),
            },
            None if has_results => BodyStrategy::CallAndReturn,
            None => BodyStrategy::Call,
        };

        SignatureVariant {
            name: plan.name.clone(),
            kind: plan.kind,
            ownership: Ownership::Borrowed,
            is_static: ctx.force_static || a.owner.is_none(),
            return_type,
            arguments,
            body,
            status_check: self.status_check(a, ctx),
        }
    }

    /// Shape, assignment and default of parameter `i` under `plan`.
    fn treatment(
        &self,
        a: &Analysis<'_>,
        ctx: &Context,
        plan: &Plan,
        i: usize,
        p: &Parameter,
    ) -> (ArgumentShape, Assignment, Option<DefaultValue>) {
        let value = self.value_type(&p.ty, 0);
        let pointee = self.value_type(&p.ty, 1);

        if let Some(field) = a.substitutions.get(&i) {
            if ctx.provides(*field) {
                return (ArgumentShape::Value(value), Assignment::Owned(*field), None);
            }
        }
        if a.allocator == Some(i) {
            return (
                ArgumentShape::OptionalReference(pointee),
                Assignment::Public,
                Some(DefaultValue::Null),
            );
        }
        if !p.sizes.is_empty() {
            return self.length_treatment(a, plan, i, p, value, pointee);
        }
        if p.is_array() {
            return self.array_treatment(a, plan, i, p, pointee);
        }
        if p.flags.contains(ParamFlags::STRING) {
            let default = p.optional.then_some(DefaultValue::Null);
            return (ArgumentShape::Str, Assignment::Public, default);
        }
        if p.is_output() {
            return (ArgumentShape::Value(pointee), Assignment::ResultSlot, None);
        }
        if p.ty.pointers == 0 {
            let nullable = p.optional && p.flags.contains(ParamFlags::HANDLE);
            let default = (nullable && plan.required != Some(i)).then_some(DefaultValue::Null);
            return (ArgumentShape::Value(value), Assignment::Public, default);
        }
        if p.ty.pointers == 1 && p.flags.contains(ParamFlags::STRUCT) {
            return if p.optional {
                (
                    ArgumentShape::OptionalReference(pointee),
                    Assignment::Public,
                    Some(DefaultValue::Null),
                )
            } else {
                (ArgumentShape::Reference(pointee), Assignment::Public, None)
            };
        }
        (
            ArgumentShape::Pointer {
                pointee,
                mutable: !p.ty.is_const,
            },
            Assignment::Public,
            p.optional.then_some(DefaultValue::Null),
        )
    }

    fn length_treatment(
        &self,
        a: &Analysis<'_>,
        plan: &Plan,
        i: usize,
        p: &Parameter,
        value: ValueType,
        pointee: ValueType,
    ) -> (ArgumentShape, Assignment, Option<DefaultValue>) {
        if plan.single == Some(i) {
            return (ArgumentShape::Value(value), Assignment::One, None);
        }
        if p.is_output() {
            return match &plan.fill {
                Some(Fill::Query { count, .. }) if *count == i => {
                    (ArgumentShape::Value(pointee), Assignment::CountSlot, None)
                }
                Some(Fill::Sized {
                    count: LengthBinding::Param(count),
                    ..
                }) if *count == i => (ArgumentShape::Value(pointee), Assignment::Public, None),
                _ => (
                    ArgumentShape::Pointer {
                        pointee,
                        mutable: true,
                    },
                    Assignment::Public,
                    None,
                ),
            };
        }
        match p.sizes.iter().find(|&&j| self.is_public_span(a, plan, j)) {
            Some(&span) => (ArgumentShape::Value(value), Assignment::LengthOf(span), None),
            None => (ArgumentShape::Value(value), Assignment::Public, None),
        }
    }

    fn array_treatment(
        &self,
        a: &Analysis<'_>,
        plan: &Plan,
        i: usize,
        p: &Parameter,
        pointee: ValueType,
    ) -> (ArgumentShape, Assignment, Option<DefaultValue>) {
        if plan.fills(i) {
            return (ArgumentShape::Value(pointee), Assignment::ResultSlot, None);
        }
        let collapsed = matches!(
            (&p.length, plan.single),
            (Some(LengthBinding::Param(length)), Some(single)) if *length == single
        );
        if collapsed {
            return if p.is_output() {
                (ArgumentShape::Value(pointee), Assignment::ResultSlot, None)
            } else {
                (ArgumentShape::Reference(pointee), Assignment::Public, None)
            };
        }
        if self.is_public_span(a, plan, i) {
            return (
                ArgumentShape::Span {
                    element: pointee,
                    mutable: p.is_output(),
                },
                Assignment::Public,
                None,
            );
        }
        (
            ArgumentShape::Pointer {
                pointee,
                mutable: p.is_output(),
            },
            Assignment::Public,
            (p.optional || p.is_output()).then_some(DefaultValue::Null),
        )
    }

    /// Check whether array `j` is passed as a caller-supplied span.
    fn is_public_span(&self, a: &Analysis<'_>, plan: &Plan, j: usize) -> bool {
        let Some(p) = a.param(j) else {
            return false;
        };
        let Some(length) = &p.length else {
            return false;
        };
        if !p.is_array() || plan.fills(j) {
            return false;
        }
        if let LengthBinding::Param(count) = length {
            if plan.single == Some(*count) {
                return false;
            }
            if p.is_output() && a.param(*count).is_some_and(|c| c.is_output()) {
                return false;
            }
        }
        true
    }

    fn return_value(
        &self,
        a: &Analysis<'_>,
        plan: &Plan,
        arguments: &[Argument],
    ) -> Option<ReturnType> {
        let mut values = Vec::new();
        if !a.returns_status && !a.op.return_type.is_void() {
            values.push(ReturnType::Value(self.value_type(&a.op.return_type, 0)));
        }
        for argument in arguments {
            let ArgumentOrigin::Param(i) = argument.origin else {
                continue;
            };
            if argument.assignment != Assignment::ResultSlot {
                continue;
            }
            let element = match (&argument.shape, plan.chain == Some(i)) {
                (_, true) => ReturnType::StructureChain,
                (ArgumentShape::Value(value), false) => ReturnType::Value(value.clone()),
                _ => continue,
            };
            if plan.fills(i) {
                values.push(ReturnType::Sequence(Box::new(element)));
            } else {
                values.push(element);
            }
        }
        match values.len() {
            0 => None,
            1 => values.pop(),
            _ => Some(ReturnType::Tuple(values)),
        }
    }

    fn status_check(&self, a: &Analysis<'_>, ctx: &Context) -> StatusCheck {
        if !a.returns_status {
            return StatusCheck::None;
        }
        let codes: Vec<&String> = if a.op.success_codes.is_empty() {
            vec![&self.naming.success_status]
        } else {
            a.op.success_codes.iter().collect()
        };
        let accepted = codes
            .into_iter()
            .map(|code| match self.store.lookup(code).and_then(|id| self.store.entity(id)) {
                Some(value) => value.name.current.clone(),
                None => self.naming.enum_value_name(
                    code,
                    &self.naming.status_enum,
                    self.store.tags(),
                ),
            })
            .collect();
        let owner = a
            .owner
            .map(|o| format!("{}::", o.name.current))
            .unwrap_or_default();
        StatusCheck::Inline {
            accepted,
            tag: format!(
                "{}::{}{}",
                ctx.namespace(self.naming),
                owner,
                a.entity.name.current
            ),
        }
    }

    /// Curated type of `ty` with `strip` pointer levels removed.
    fn value_type(&self, ty: &TypeRef, strip: u8) -> ValueType {
        let base = match ty.entity.and_then(|e| self.store.entity(e)) {
            Some(entity) => entity.name.current.clone(),
            None => self.naming.type_name(&ty.name),
        };
        let stars = ty.pointers.saturating_sub(strip) as usize;
        ValueType {
            name: format!("{base}{}", "*".repeat(stars)),
            entity: ty.entity,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
