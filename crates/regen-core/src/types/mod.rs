//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the regen engine:
//! - Arena identifiers (`EntityId`)
//! - Dual spelling of registry names (`EntityName`)
//! - Type references used by parameters and record members (`TypeRef`)
//! - Error types (`RegenError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Carry no floating-point data

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Index of an entity in the store arena.
///
/// Ids are assigned in registry declaration order and never reused within
/// one session, so sorting by id reproduces registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Position of this entity in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// NAMES
// =============================================================================

/// Registry name in both spellings.
///
/// `original` is the spelling used by the registry (`VkBuffer`,
/// `vkCreateBuffer`); `current` is the curated spelling used by the
/// generated API (`Buffer`, `createBuffer`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityName {
    /// Curated spelling.
    pub current: String,
    /// Registry spelling.
    pub original: String,
}

impl EntityName {
    /// Create a name from both spellings.
    #[must_use]
    pub fn new(current: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            original: original.into(),
        }
    }

    /// Create a name whose spellings are identical.
    #[must_use]
    pub fn verbatim(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            current: name.clone(),
            original: name,
        }
    }

    /// Check whether either spelling equals `name`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.current == name || self.original == name
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// =============================================================================
// TYPE REFERENCES
// =============================================================================

/// A reference to a type from a parameter, member or return slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Type name as spelled in the registry.
    pub name: String,
    /// Resolved entity, `None` for C primitives and unresolved names.
    pub entity: Option<EntityId>,
    /// Pointer indirection depth.
    pub pointers: u8,
    /// Whether the pointee is const.
    pub is_const: bool,
    /// Fixed array extent (`[4]`, `[VK_UUID_SIZE]`).
    pub fixed_len: Option<String>,
}

impl TypeRef {
    /// Create an unresolved by-value reference.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: None,
            pointers: 0,
            is_const: false,
            fixed_len: None,
        }
    }

    /// Check if this is plain `void` (no indirection).
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.name == "void" && self.pointers == 0
    }

    /// Check if this reference goes through a pointer.
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.pointers > 0
    }

    /// Check if this is a by-value reference (no pointer, no fixed array).
    #[must_use]
    pub fn is_by_value(&self) -> bool {
        self.pointers == 0 && self.fixed_len.is_none()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the regen engine.
///
/// - No silent failures
/// - Use `Result<T, RegenError>` for fallible operations
/// - The engine never panics; recoverable conditions are diagnostics, not errors
#[derive(Debug, Error)]
pub enum RegenError {
    /// The id does not point into the store arena.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// No entity or alias carries this name.
    #[error("Unknown entity name: {0}")]
    UnknownName(String),

    /// Two registry records declare the same name.
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),

    /// A root entity the generated API cannot exist without is absent.
    #[error("Required entity missing from registry: {0}")]
    MissingRequiredEntity(String),

    /// A selection pattern could not be compiled.
    #[error("Invalid selection pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
