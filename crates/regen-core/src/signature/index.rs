//! # Resolution Index
//!
//! Registry-wide lookups the resolver needs, built once per batch:
//! - Destroy/Free overload ownership, keyed by (owner, verb, handle type)
//! - Records that other records extend (structure-chain candidates)

use crate::entity::{Category, OperationClass};
use crate::naming::{split_tag, singular, NamingConvention};
use crate::store::EntityStore;
use crate::types::EntityId;
use std::collections::{BTreeMap, BTreeSet};

/// Key of a handle-type overload (`device.destroy(buffer)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OverloadKey {
    pub owner: Option<EntityId>,
    pub verb: OperationClass,
    pub handle: EntityId,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionIndex {
    overloads: BTreeMap<OverloadKey, EntityId>,
    extendable: BTreeSet<EntityId>,
}

impl ResolutionIndex {
    /// Index the emit-eligible part of `store`.
    #[must_use]
    pub fn build(store: &EntityStore, naming: &NamingConvention) -> Self {
        let mut index = Self::default();
        for entity in store.iter().filter(|e| e.is_emit_eligible()) {
            match entity.category() {
                Category::Command => {
                    if let Some(key) = Self::overload_key(store, naming, entity.id) {
                        index.overloads.entry(key).or_insert(entity.id);
                    }
                }
                Category::Record => {
                    if let Some(record) = entity.as_record() {
                        index.extendable.extend(record.extends.iter().copied());
                    }
                }
                _ => {}
            }
        }
        tracing::debug!(
            overloads = index.overloads.len(),
            extendable = index.extendable.len(),
            "resolution index built"
        );
        index
    }

    /// Overload key of a Destroy/Free operation.
    ///
    /// Only operations whose name is the verb plus the (tag-stripped)
    /// destroyed handle name qualify: `vkDestroySwapchainKHR` for
    /// `SwapchainKHR`, `vkFreeMemory` for `DeviceMemory`.
    #[must_use]
    pub fn overload_key(
        store: &EntityStore,
        naming: &NamingConvention,
        id: EntityId,
    ) -> Option<OverloadKey> {
        let entity = store.entity(id)?;
        let op = entity.as_operation()?;
        if !op.class.is_destructor() {
            return None;
        }
        let handle = op
            .params
            .iter()
            .rev()
            .filter_map(|p| p.ty.entity)
            .find(|h| store.entity(*h).is_some_and(|e| e.category() == Category::Handle))?;

        let tags = store.tags();
        let (stem, _) = split_tag(naming.command_stem(&entity.name.original), tags);
        let object = stem.strip_prefix(op.class.verb())?;
        if object.is_empty() {
            return None;
        }
        let handle_name = &store.entity(handle)?.name.current;
        let (handle_base, _) = split_tag(handle_name, tags);
        handle_base
            .ends_with(singular(object, tags).as_str())
            .then_some(OverloadKey {
                owner: op.owner,
                verb: op.class,
                handle,
            })
    }

    /// Operation providing the overload for `key`, if any.
    #[must_use]
    pub fn overload_provider(&self, key: &OverloadKey) -> Option<EntityId> {
        self.overloads.get(key).copied()
    }

    /// Check whether some emit-eligible record extends `record`.
    #[must_use]
    pub fn is_extendable(&self, record: EntityId) -> bool {
        self.extendable.contains(&record)
    }
}
