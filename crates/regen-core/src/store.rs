//! # Entity Store
//!
//! Arena of every registry entity, indexed by both spellings of its name.
//!
//! - Ids are dense and assigned in declaration order
//! - Original spellings are unique; a duplicate is an error
//! - Current spellings index the first entity claiming them (enum values are
//!   not indexed by current spelling, since `eSuccess` exists in many enums)
//! - Aliases resolve transitively, bounded by [`MAX_ALIAS_DEPTH`]

use crate::entity::{Category, Entity, EntityKind};
use crate::primitives::MAX_ALIAS_DEPTH;
use crate::types::{EntityId, EntityName, RegenError};
use std::collections::{BTreeMap, BTreeSet};

/// Arena-backed entity storage.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
    originals: BTreeMap<String, EntityId>,
    currents: BTreeMap<String, EntityId>,
    /// Alias name (either spelling) -> target name.
    aliases: BTreeMap<String, String>,
    tags: BTreeSet<String>,
    loader_commands: Vec<EntityId>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entity. Returns its id.
    pub fn insert(&mut self, name: EntityName, kind: EntityKind) -> Result<EntityId, RegenError> {
        if self.originals.contains_key(&name.original) {
            return Err(RegenError::DuplicateEntity(name.original));
        }
        let id = EntityId(self.entities.len() as u32);
        self.originals.insert(name.original.clone(), id);
        if kind.category() != Category::EnumValue {
            self.currents.entry(name.current.clone()).or_insert(id);
        }
        self.entities.push(Entity::new(id, name, kind));
        Ok(id)
    }

    /// Register `alias` as another name for `target`.
    ///
    /// The alias is also recorded on the target entity when the target
    /// resolves.
    pub fn add_alias(&mut self, alias: EntityName, target: &str) {
        self.aliases.insert(alias.original.clone(), target.to_string());
        if alias.current != alias.original {
            self.aliases
                .entry(alias.current.clone())
                .or_insert_with(|| target.to_string());
        }
        if let Some(id) = self.lookup(target) {
            if let Some(entity) = self.entities.get_mut(id.index()) {
                entity.aliases.push(alias);
            }
        }
    }

    /// Find an entity by current or original spelling, following aliases.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        let mut name = name;
        for _ in 0..=MAX_ALIAS_DEPTH {
            if let Some(id) = self.originals.get(name).or_else(|| self.currents.get(name)) {
                return Some(*id);
            }
            name = self.aliases.get(name)?;
        }
        None
    }

    /// Like [`lookup`](Self::lookup) but an unknown name is an error.
    pub fn require(&self, name: &str) -> Result<EntityId, RegenError> {
        self.lookup(name)
            .ok_or_else(|| RegenError::UnknownName(name.to_string()))
    }

    /// Check whether `name` is an alias rather than a declared entity.
    #[must_use]
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity, RegenError> {
        self.entities
            .get(id.index())
            .ok_or(RegenError::EntityNotFound(id))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity, RegenError> {
        self.entities
            .get_mut(id.index())
            .ok_or(RegenError::EntityNotFound(id))
    }

    /// Get an entity, `None` if the id is out of range.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Registry spelling of an entity, or its id if unknown.
    #[must_use]
    pub fn name_of(&self, id: EntityId) -> String {
        self.entity(id)
            .map_or_else(|| id.to_string(), |e| e.name.original.clone())
    }

    /// All entities in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// All ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().map(|e| e.id)
    }

    /// Entities of one category in declaration order.
    pub fn of_category(&self, category: Category) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(move |e| e.category() == category)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Vendor tags known to the registry.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: impl IntoIterator<Item = String>) {
        self.tags = tags.into_iter().collect();
    }

    /// Commands without a handle-typed first parameter.
    #[must_use]
    pub fn loader_commands(&self) -> &[EntityId] {
        &self.loader_commands
    }

    pub fn push_loader_command(&mut self, id: EntityId) {
        self.loader_commands.push(id);
    }
}

// =============================================================================
// TESTS
// =============================================================================
