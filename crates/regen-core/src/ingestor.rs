//! # Ingestor Module
//!
//! Turns a [`RawRegistry`] into a populated [`EntityStore`].
//!
//! Ingestion runs in fixed phases:
//! 1. Declare every entity (names in both spellings, kind payloads)
//! 2. Register aliases
//! 3. Resolve name references to arena ids
//! 4. Record feature/extension membership (supported, origin, protect)
//! 5. Assign commands to handles and finalize handles
//! 6. Build dependency edges
//!
//! An unknown reference is a diagnostic: only the affected edge is skipped.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity::{
    Bitmask, Bundle, Category, CreationCategory, EntityKind, EnumValue, Enumeration, Handle,
    Member, Operation, OperationClass, Parameter, Platform, Record,
};
use crate::naming::NamingConvention;
use crate::primitives::is_c_primitive;
use crate::raw::{RawEntity, RawEnum, RawExtension, RawFeature, RawField, RawRegistry};
use crate::store::EntityStore;
use crate::types::{EntityId, EntityName, RegenError, TypeRef};
use std::collections::{BTreeMap, BTreeSet};

/// Raw records paired with the ids they were declared under.
#[derive(Default)]
struct Declared<'a> {
    entities: Vec<(EntityId, &'a RawEntity)>,
    features: Vec<(EntityId, &'a RawFeature)>,
    extensions: Vec<(EntityId, &'a RawExtension)>,
}

/// The Ingestor builds the entity store from tokenized registry records.
pub struct Ingestor;

impl Ingestor {
    /// Ingest a registry.
    ///
    /// Returns the store and the diagnostics found on the way. Fails only on
    /// duplicate declarations.
    pub fn ingest(
        raw: &RawRegistry,
        naming: &NamingConvention,
    ) -> Result<(EntityStore, Diagnostics), RegenError> {
        let mut store = EntityStore::new();
        let mut diagnostics = Diagnostics::new();
        store.set_tags(raw.tags.iter().cloned());

        let declared = Self::declare(&mut store, raw, naming)?;
        Self::declare_aliases(&mut store, raw, naming, &mut diagnostics)?;
        Self::resolve_references(&mut store, &declared, &mut diagnostics)?;
        Self::record_memberships(&mut store)?;
        Self::assign_commands(&mut store)?;
        Self::build_edges(&mut store, &mut diagnostics)?;

        tracing::info!(
            entities = store.len(),
            diagnostics = diagnostics.len(),
            "registry ingested"
        );
        Ok((store, diagnostics))
    }

    // =========================================================================
    // PHASE 1: DECLARATION
    // =========================================================================

    fn declare<'a>(
        store: &mut EntityStore,
        raw: &'a RawRegistry,
        naming: &NamingConvention,
    ) -> Result<Declared<'a>, RegenError> {
        let mut declared = Declared::default();

        for platform in &raw.platforms {
            let id = store.insert(
                EntityName::verbatim(&platform.name),
                EntityKind::Platform(Platform {
                    protect: platform.protect.clone(),
                }),
            )?;
            store.get_mut(id)?.supported = true;
        }

        for entity in &raw.entities {
            let id = match entity {
                RawEntity::Alias(_) => continue,
                RawEntity::Enum(raw_enum) => Self::declare_enum(store, raw_enum, naming)?,
                other => {
                    let (name, kind) = Self::declared_kind(store, other, naming);
                    store.insert(name, kind)?
                }
            };
            declared.entities.push((id, entity));
        }

        for feature in &raw.features {
            let id = store.insert(
                EntityName::verbatim(&feature.name),
                EntityKind::Feature(Bundle {
                    number: feature.number.clone(),
                    ..Bundle::default()
                }),
            )?;
            store.get_mut(id)?.supported = feature.api.iter().any(|api| *api == naming.api);
            declared.features.push((id, feature));
        }

        for extension in &raw.extensions {
            let id = store.insert(
                EntityName::verbatim(&extension.name),
                EntityKind::Extension(Bundle {
                    number: extension.number.to_string(),
                    promoted_to: extension.promoted_to.clone(),
                    ..Bundle::default()
                }),
            )?;
            store.get_mut(id)?.supported =
                extension.supported.iter().any(|api| *api == naming.api);
            declared.extensions.push((id, extension));
        }

        tracing::debug!(entities = store.len(), "declared");
        Ok(declared)
    }

    fn declare_enum(
        store: &mut EntityStore,
        raw: &RawEnum,
        naming: &NamingConvention,
    ) -> Result<EntityId, RegenError> {
        let enum_id = store.insert(
            EntityName::new(naming.type_name(&raw.name), raw.name.clone()),
            EntityKind::Enum(Enumeration {
                values: Vec::new(),
                bitmask: raw.bitmask,
            }),
        )?;

        let mut values = Vec::with_capacity(raw.values.len());
        for value in &raw.values {
            let current = naming.enum_value_name(&value.name, &raw.name, store.tags());
            let id = store.insert(
                EntityName::new(current, value.name.clone()),
                EntityKind::EnumValue(EnumValue {
                    parent: Some(enum_id),
                    value: value.value.clone(),
                    extension: false,
                }),
            )?;
            values.push(id);
        }

        if let EntityKind::Enum(enumeration) = &mut store.get_mut(enum_id)?.kind {
            enumeration.values = values;
        }
        Ok(enum_id)
    }

    fn declared_kind(
        store: &EntityStore,
        raw: &RawEntity,
        naming: &NamingConvention,
    ) -> (EntityName, EntityKind) {
        let type_name = |name: &str| EntityName::new(naming.type_name(name), name);
        match raw {
            RawEntity::Basetype(named) => (type_name(&named.name), EntityKind::Basetype),
            RawEntity::External(named) => (EntityName::verbatim(&named.name), EntityKind::External),
            RawEntity::Handle(handle) => (
                type_name(&handle.name),
                EntityKind::Handle(Handle {
                    parent: None,
                    dispatchable: handle.dispatchable,
                    creation: CreationCategory::None,
                    second_owner: None,
                    deleter: None,
                    commands: Vec::new(),
                }),
            ),
            RawEntity::Struct(record) => {
                let members = record
                    .members
                    .iter()
                    .map(|m| Member {
                        name: m.name.clone(),
                        ty: type_ref(m),
                        optional: m.optional,
                        len: m.len.clone(),
                    })
                    .collect();
                let structure_type = record
                    .members
                    .iter()
                    .find(|m| m.name == "sType")
                    .and_then(|m| m.values.clone());
                (
                    type_name(&record.name),
                    EntityKind::Record(Record {
                        members,
                        is_union: record.is_union,
                        returned_only: record.returned_only,
                        extends: Vec::new(),
                        structure_type,
                    }),
                )
            }
            RawEntity::Bitmask(bitmask) => (
                type_name(&bitmask.name),
                EntityKind::Bitmask(Bitmask { bits: None }),
            ),
            RawEntity::EnumValue(value) => {
                let current = naming.enum_value_name(&value.name, &value.extends, store.tags());
                (
                    EntityName::new(current, value.name.clone()),
                    EntityKind::EnumValue(EnumValue {
                        parent: store.lookup(&value.extends),
                        value: value.value.clone(),
                        extension: true,
                    }),
                )
            }
            RawEntity::Command(command) => {
                let params = command
                    .params
                    .iter()
                    .map(|p| {
                        let mut param =
                            Parameter::new(p.name.clone(), naming.param_name(&p.name), type_ref(p));
                        param.optional = p.optional;
                        param.len = p.len.clone();
                        param
                    })
                    .collect();
                (
                    EntityName::new(naming.command_name(&command.name), command.name.clone()),
                    EntityKind::Command(Operation {
                        params,
                        return_type: TypeRef::named(command.return_type.clone()),
                        success_codes: command.success_codes.clone(),
                        error_codes: command.error_codes.clone(),
                        class: OperationClass::classify(naming.command_stem(&command.name)),
                        owner: None,
                        bound: false,
                    }),
                )
            }
            // Enums and aliases are declared elsewhere.
            RawEntity::Enum(raw_enum) => (type_name(&raw_enum.name), EntityKind::Basetype),
            RawEntity::Alias(alias) => (type_name(&alias.name), EntityKind::Basetype),
        }
    }

    // =========================================================================
    // PHASE 2: ALIASES
    // =========================================================================

    fn declare_aliases(
        store: &mut EntityStore,
        raw: &RawRegistry,
        naming: &NamingConvention,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), RegenError> {
        for entity in &raw.entities {
            let RawEntity::Alias(alias) = entity else {
                continue;
            };
            let Some(target) = store.lookup(&alias.target) else {
                diagnostics.push(Diagnostic::MissingReference {
                    entity: alias.name.clone(),
                    reference: alias.target.clone(),
                });
                continue;
            };
            let current = match &store.get(target)?.kind {
                EntityKind::Command(_) => naming.command_name(&alias.name),
                EntityKind::EnumValue(value) => {
                    let parent = value.parent.map(|p| store.name_of(p)).unwrap_or_default();
                    naming.enum_value_name(&alias.name, &parent, store.tags())
                }
                _ => naming.type_name(&alias.name),
            };
            store.add_alias(EntityName::new(current, alias.name.clone()), &alias.target);
        }
        Ok(())
    }

    // =========================================================================
    // PHASE 3: REFERENCES
    // =========================================================================

    fn resolve_references(
        store: &mut EntityStore,
        declared: &Declared<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), RegenError> {
        for &(id, raw) in &declared.entities {
            let owner = store.name_of(id);
            // Take the payload out so the store stays readable while it is rewritten.
            let mut kind = std::mem::replace(&mut store.get_mut(id)?.kind, EntityKind::Basetype);
            match (&mut kind, raw) {
                (EntityKind::Handle(handle), RawEntity::Handle(raw)) => {
                    handle.parent = raw
                        .parent
                        .as_deref()
                        .and_then(|p| Self::reference(store, &owner, p, diagnostics));
                }
                (EntityKind::Record(record), RawEntity::Struct(raw)) => {
                    for member in &mut record.members {
                        Self::resolve_type(store, &owner, &mut member.ty, diagnostics);
                    }
                    record.extends = raw
                        .extends
                        .iter()
                        .filter_map(|e| Self::reference(store, &owner, e, diagnostics))
                        .collect();
                }
                (EntityKind::Bitmask(bitmask), RawEntity::Bitmask(raw)) => {
                    bitmask.bits = raw
                        .bits
                        .as_deref()
                        .and_then(|b| Self::reference(store, &owner, b, diagnostics));
                }
                (EntityKind::EnumValue(value), RawEntity::EnumValue(raw)) => {
                    if value.parent.is_none() {
                        value.parent = Self::reference(store, &owner, &raw.extends, diagnostics);
                    }
                }
                (EntityKind::Command(op), _) => {
                    for param in &mut op.params {
                        Self::resolve_type(store, &owner, &mut param.ty, diagnostics);
                    }
                    Self::resolve_type(store, &owner, &mut op.return_type, diagnostics);
                }
                _ => {}
            }
            store.get_mut(id)?.kind = kind;
        }

        let bundles = declared
            .features
            .iter()
            .map(|&(id, f)| (id, &f.depends, &f.requires, None))
            .chain(
                declared
                    .extensions
                    .iter()
                    .map(|&(id, e)| (id, &e.depends, &e.requires, e.platform.as_deref())),
            );
        for (id, depends, requires, platform) in bundles {
            let owner = store.name_of(id);
            let depends: Vec<EntityId> = depends
                .iter()
                .filter_map(|d| Self::reference(store, &owner, d, diagnostics))
                .collect();
            let requires: Vec<EntityId> = requires
                .iter()
                .filter_map(|r| Self::reference(store, &owner, r, diagnostics))
                .collect();
            let platform = platform.and_then(|p| Self::reference(store, &owner, p, diagnostics));
            if let EntityKind::Feature(bundle) | EntityKind::Extension(bundle) =
                &mut store.get_mut(id)?.kind
            {
                bundle.depends = depends;
                bundle.requires = requires;
                bundle.platform = platform;
            }
        }
        Ok(())
    }

    /// Resolve `name`, logging a missing reference from `owner`.
    fn reference(
        store: &EntityStore,
        owner: &str,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<EntityId> {
        let id = store.lookup(name);
        if id.is_none() {
            diagnostics.push(Diagnostic::MissingReference {
                entity: owner.to_string(),
                reference: name.to_string(),
            });
        }
        id
    }

    fn resolve_type(
        store: &EntityStore,
        owner: &str,
        ty: &mut TypeRef,
        diagnostics: &mut Diagnostics,
    ) {
        if !is_c_primitive(&ty.name) {
            ty.entity = Self::reference(store, owner, &ty.name, diagnostics);
        }
    }

    // =========================================================================
    // PHASE 4: MEMBERSHIP
    // =========================================================================

    /// Derive `supported`, `origin` and `protect` from bundle membership.
    ///
    /// - Bundled entities are supported iff a supported bundle requires them
    /// - Entities no bundle mentions are unconditional and supported
    /// - Core enum values follow their enum
    fn record_memberships(store: &mut EntityStore) -> Result<(), RegenError> {
        let mut bundles = Vec::new();
        for entity in store.iter() {
            if let EntityKind::Feature(bundle) | EntityKind::Extension(bundle) = &entity.kind {
                let guard = bundle.platform.and_then(|p| match store.entity(p).map(|e| &e.kind) {
                    Some(EntityKind::Platform(platform)) => Some(platform.protect.clone()),
                    _ => None,
                });
                bundles.push((entity.id, entity.supported, guard, bundle.requires.clone()));
            }
        }

        let mut mentioned = BTreeSet::new();
        let mut guards: BTreeMap<EntityId, Option<String>> = BTreeMap::new();
        for (bundle, supported, guard, requires) in bundles {
            store.get_mut(bundle)?.protect.clone_from(&guard);
            for id in requires {
                mentioned.insert(id);
                if !supported {
                    continue;
                }
                let entity = store.get_mut(id)?;
                entity.supported = true;
                if entity.origin.is_none() {
                    entity.origin = Some(bundle);
                }
                match guards.get(&id) {
                    Some(None) => {}
                    Some(Some(_)) if guard.is_some() => {}
                    _ => {
                        guards.insert(id, guard.clone());
                    }
                }
            }
        }
        for (id, guard) in guards {
            store.get_mut(id)?.protect = guard;
        }

        let unbundled: Vec<EntityId> = store
            .iter()
            .filter(|e| !mentioned.contains(&e.id))
            .filter(|e| {
                !matches!(
                    e.kind,
                    EntityKind::Feature(_)
                        | EntityKind::Extension(_)
                        | EntityKind::Platform(_)
                        | EntityKind::EnumValue(EnumValue {
                            extension: false,
                            ..
                        })
                )
            })
            .map(|e| e.id)
            .collect();
        for id in unbundled {
            store.get_mut(id)?.supported = true;
        }

        let core_values: Vec<(EntityId, bool, Option<String>)> = store
            .iter()
            .filter_map(|e| match &e.kind {
                EntityKind::EnumValue(EnumValue {
                    parent: Some(parent),
                    extension: false,
                    ..
                }) => store
                    .entity(*parent)
                    .map(|p| (e.id, p.supported, p.protect.clone())),
                _ => None,
            })
            .collect();
        for (id, supported, protect) in core_values {
            let value = store.get_mut(id)?;
            value.supported = supported;
            value.protect = protect;
        }
        Ok(())
    }

    // =========================================================================
    // PHASE 5: COMMAND ASSIGNMENT
    // =========================================================================

    /// Assign each command to the handle of its first parameter and derive
    /// creation category, deleter and second owner of every handle.
    fn assign_commands(store: &mut EntityStore) -> Result<(), RegenError> {
        let commands: Vec<EntityId> = store.of_category(Category::Command).map(|e| e.id).collect();

        for id in commands {
            let (owner, class, handle_params, created) = {
                let Some(op) = store.get(id)?.as_operation() else {
                    continue;
                };
                let is_handle = |h: EntityId| {
                    store
                        .entity(h)
                        .is_some_and(|e| e.category() == Category::Handle)
                };
                let owner = op
                    .params
                    .first()
                    .filter(|p| p.ty.pointers == 0)
                    .and_then(|p| p.ty.entity)
                    .filter(|h| is_handle(*h));
                let handle_params: Vec<(usize, EntityId)> = op
                    .params
                    .iter()
                    .enumerate()
                    .filter_map(|(i, p)| p.ty.entity.filter(|h| is_handle(*h)).map(|h| (i, h)))
                    .collect();
                (owner, op.class, handle_params, created_handle(store, op))
            };

            if let Some(op) = store.get_mut(id)?.as_operation_mut() {
                op.owner = owner;
            }
            match owner {
                Some(handle) => {
                    if let Some(h) = store.get_mut(handle)?.as_handle_mut() {
                        h.commands.push(id);
                    }
                }
                None => store.push_loader_command(id),
            }

            if class.is_constructor() {
                if let Some(created) = created {
                    if let Some(h) = store.get_mut(created)?.as_handle_mut() {
                        let category = if class == OperationClass::Create {
                            CreationCategory::Create
                        } else {
                            CreationCategory::Allocate
                        };
                        h.creation = h.creation.max(category);
                    }
                }
            }

            if class.is_destructor() {
                if let Some(&(destroyed_at, destroyed)) = handle_params.last() {
                    let second_owner = if class == OperationClass::Free {
                        handle_params
                            .iter()
                            .find(|(i, _)| *i != 0 && *i != destroyed_at)
                            .map(|&(_, h)| h)
                    } else {
                        None
                    };
                    if let Some(h) = store.get_mut(destroyed)?.as_handle_mut() {
                        if h.deleter.is_none() {
                            h.deleter = Some(id);
                            h.second_owner = second_owner;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // PHASE 6: DEPENDENCY EDGES
    // =========================================================================

    fn build_edges(
        store: &mut EntityStore,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), RegenError> {
        let mut edges: Vec<(EntityId, EntityId)> = Vec::new();

        for entity in store.iter() {
            let from = entity.id;
            let mut targets: Vec<EntityId> = Vec::new();
            match &entity.kind {
                EntityKind::Feature(bundle) | EntityKind::Extension(bundle) => {
                    targets.extend(bundle.requires.iter().copied());
                    targets.extend(bundle.depends.iter().copied());
                    targets.extend(bundle.platform);
                }
                EntityKind::Record(record) => {
                    targets.extend(record.members.iter().filter_map(|m| m.ty.entity));
                    targets.extend(record.extends.iter().copied());
                }
                EntityKind::Enum(enumeration) => targets.extend(enumeration.values.iter().copied()),
                EntityKind::EnumValue(value) if value.extension => targets.extend(value.parent),
                EntityKind::Bitmask(bitmask) => targets.extend(bitmask.bits),
                EntityKind::Handle(handle) => {
                    targets.extend(handle.parent);
                    targets.extend(handle.second_owner);
                }
                EntityKind::Command(op) => {
                    targets.extend(op.owner);
                    // A constructor pulls in the deleter of what it creates.
                    if op.class.is_constructor() {
                        targets.extend(
                            created_handle(store, op)
                                .and_then(|h| store.entity(h))
                                .and_then(|e| e.as_handle())
                                .and_then(|h| h.deleter),
                        );
                    }
                    targets.extend(op.params.iter().filter_map(|p| p.ty.entity));
                    targets.extend(op.return_type.entity);
                    for code in op.success_codes.iter().chain(&op.error_codes) {
                        match store.lookup(code) {
                            Some(value) => targets.push(value),
                            None => diagnostics.push(Diagnostic::MissingReference {
                                entity: entity.name.original.clone(),
                                reference: code.clone(),
                            }),
                        }
                    }
                }
                _ => {}
            }
            edges.extend(targets.into_iter().filter(|&to| to != from).map(|to| (from, to)));
        }

        let count = edges.len();
        for (from, to) in edges {
            store.get_mut(from)?.dependencies.insert(to);
        }
        tracing::debug!(edges = count, "dependency edges built");
        Ok(())
    }
}

/// Handle produced by a constructor: its last writable handle-typed parameter.
fn created_handle(store: &EntityStore, op: &Operation) -> Option<EntityId> {
    op.params
        .iter()
        .rev()
        .filter(|p| p.ty.pointers > 0 && !p.ty.is_const)
        .filter_map(|p| p.ty.entity)
        .find(|h| {
            store
                .entity(*h)
                .is_some_and(|e| e.category() == Category::Handle)
        })
}

/// Unresolved type reference of a raw field.
fn type_ref(field: &RawField) -> TypeRef {
    TypeRef {
        name: field.ty.clone(),
        entity: None,
        pointers: field.pointers,
        is_const: field.is_const,
        fixed_len: field.fixed_len.clone(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{
        RawAlias, RawCommand, RawEnumerant, RawHandle, RawNamed, RawPlatform, RawStruct,
    };

    fn field(name: &str, ty: &str, pointers: u8) -> RawField {
        RawField {
            name: name.to_string(),
            ty: ty.to_string(),
            pointers,
            ..RawField::default()
        }
    }

    fn registry() -> RawRegistry {
        RawRegistry {
            tags: vec!["KHR".to_string()],
            platforms: vec![RawPlatform {
                name: "win32".to_string(),
                protect: "VK_USE_PLATFORM_WIN32_KHR".to_string(),
            }],
            entities: vec![
                RawEntity::Enum(RawEnum {
                    name: "VkResult".to_string(),
                    values: vec![RawEnumerant {
                        name: "VK_SUCCESS".to_string(),
                        value: Some("0".to_string()),
                    }],
                    bitmask: false,
                }),
                RawEntity::Handle(RawHandle {
                    name: "VkDevice".to_string(),
                    parent: None,
                    dispatchable: true,
                }),
                RawEntity::Handle(RawHandle {
                    name: "VkFence".to_string(),
                    parent: Some("VkDevice".to_string()),
                    dispatchable: false,
                }),
                RawEntity::Struct(RawStruct {
                    name: "VkFenceCreateInfo".to_string(),
                    members: vec![field("flags", "uint32_t", 0)],
                    is_union: false,
                    returned_only: false,
                    extends: Vec::new(),
                }),
                RawEntity::External(RawNamed {
                    name: "HANDLE".to_string(),
                }),
                RawEntity::Command(RawCommand {
                    name: "vkCreateFence".to_string(),
                    return_type: "VkResult".to_string(),
                    params: vec![
                        field("device", "VkDevice", 0),
                        field("pCreateInfo", "VkFenceCreateInfo", 1),
                        field("pFence", "VkFence", 1),
                    ],
                    success_codes: vec!["VK_SUCCESS".to_string()],
                    error_codes: Vec::new(),
                }),
                RawEntity::Command(RawCommand {
                    name: "vkDestroyFence".to_string(),
                    return_type: "void".to_string(),
                    params: vec![field("device", "VkDevice", 0), field("fence", "VkFence", 0)],
                    success_codes: Vec::new(),
                    error_codes: Vec::new(),
                }),
                RawEntity::Command(RawCommand {
                    name: "vkGetFenceWin32HandleKHR".to_string(),
                    return_type: "VkResult".to_string(),
                    params: vec![
                        field("device", "VkDevice", 0),
                        field("pHandle", "HANDLE", 1),
                        field("pMissing", "VkMissingInfo", 1),
                    ],
                    success_codes: vec!["VK_SUCCESS".to_string()],
                    error_codes: Vec::new(),
                }),
                RawEntity::Alias(RawAlias {
                    name: "vkCreateFenceKHR".to_string(),
                    target: "vkCreateFence".to_string(),
                }),
            ],
            features: vec![RawFeature {
                name: "VK_VERSION_1_0".to_string(),
                api: vec!["vulkan".to_string()],
                number: "1.0".to_string(),
                depends: Vec::new(),
                requires: vec![
                    "VkDevice".to_string(),
                    "VkFence".to_string(),
                    "vkCreateFenceKHR".to_string(),
                    "vkDestroyFence".to_string(),
                ],
            }],
            extensions: vec![
                RawExtension {
                    name: "VK_KHR_external_fence_win32".to_string(),
                    number: 115,
                    supported: vec!["vulkan".to_string()],
                    depends: vec!["VK_VERSION_1_0".to_string()],
                    platform: Some("win32".to_string()),
                    promoted_to: None,
                    requires: vec!["vkGetFenceWin32HandleKHR".to_string()],
                },
                RawExtension {
                    name: "VK_NV_disabled".to_string(),
                    number: 999,
                    supported: vec!["disabled".to_string()],
                    requires: vec!["VkFenceCreateInfo".to_string()],
                    ..RawExtension::default()
                },
            ],
        }
    }

    fn ingest() -> (EntityStore, Diagnostics) {
        Ingestor::ingest(&registry(), &NamingConvention::default()).expect("ingest")
    }

    #[test]
    fn names_are_curated() {
        let (store, _) = ingest();
        let fence = store.lookup("VkFence").expect("fence");
        assert_eq!(store.lookup("Fence"), Some(fence));
        assert!(store.lookup("createFence").is_some());
        assert_eq!(store.lookup("vkCreateFenceKHR"), store.lookup("vkCreateFence"));
    }

    #[test]
    fn commands_are_assigned_to_first_handle() {
        let (store, _) = ingest();
        let device = store.lookup("VkDevice").expect("device");
        let fence = store.lookup("VkFence").expect("fence");
        let create = store.lookup("vkCreateFence").expect("create");
        let destroy = store.lookup("vkDestroyFence").expect("destroy");

        let device_handle = store.get(device).expect("entity").as_handle().expect("handle");
        assert!(device_handle.commands.contains(&create));

        let fence_handle = store.get(fence).expect("entity").as_handle().expect("handle");
        assert_eq!(fence_handle.parent, Some(device));
        assert_eq!(fence_handle.creation, CreationCategory::Create);
        assert_eq!(fence_handle.deleter, Some(destroy));
        assert!(store.loader_commands().is_empty());
    }

    #[test]
    fn membership_sets_supported_origin_and_protect() {
        let (store, _) = ingest();
        let feature = store.lookup("VK_VERSION_1_0").expect("feature");
        let create = store.get(store.lookup("vkCreateFence").expect("id")).expect("entity");
        assert!(create.supported);
        assert_eq!(create.origin, Some(feature));
        assert_eq!(create.protect, None);

        let win32 = store
            .get(store.lookup("vkGetFenceWin32HandleKHR").expect("id"))
            .expect("entity");
        assert_eq!(win32.protect.as_deref(), Some("VK_USE_PLATFORM_WIN32_KHR"));

        let info = store.get(store.lookup("VkFenceCreateInfo").expect("id")).expect("entity");
        assert!(!info.supported);

        let success = store.get(store.lookup("VK_SUCCESS").expect("id")).expect("entity");
        assert!(success.supported);
        assert_eq!(success.name.current, "eSuccess");
    }

    #[test]
    fn missing_references_are_diagnosed_and_skipped() {
        let (store, diagnostics) = ingest();
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::MissingReference { reference, .. } if reference == "VkMissingInfo"
        )));
        let command = store
            .get(store.lookup("vkGetFenceWin32HandleKHR").expect("id"))
            .expect("entity");
        let op = command.as_operation().expect("operation");
        assert_eq!(op.params[2].ty.entity, None);
        assert_eq!(op.params[1].ty.entity, store.lookup("HANDLE"));
    }

    #[test]
    fn dependency_edges_follow_references() {
        let (store, _) = ingest();
        let create = store.get(store.lookup("vkCreateFence").expect("id")).expect("entity");
        for name in ["VkDevice", "VkFenceCreateInfo", "VkFence", "VkResult", "VK_SUCCESS"] {
            let id = store.lookup(name).expect(name);
            assert!(create.dependencies.contains(&id), "missing edge to {name}");
        }
        let extension = store
            .get(store.lookup("VK_KHR_external_fence_win32").expect("id"))
            .expect("entity");
        assert!(extension.dependencies.contains(&store.lookup("VK_VERSION_1_0").expect("id")));
        assert!(extension.dependencies.contains(&store.lookup("win32").expect("id")));
    }

    #[test]
    fn duplicate_declarations_fail() {
        let mut raw = registry();
        raw.entities.push(RawEntity::Basetype(RawNamed {
            name: "VkFence".to_string(),
        }));
        let result = Ingestor::ingest(&raw, &NamingConvention::default());
        assert!(matches!(result, Err(RegenError::DuplicateEntity(_))));
    }
}
