//! # Entities
//!
//! The closed set of registry entity kinds.
//!
//! Every entity shares the generic graph fields (flags, dependency and
//! subscriber edges, origin, protect guard) and carries a kind-specific
//! payload in [`EntityKind`]. Edges are arena indices, never references.

use crate::types::{EntityId, EntityName, TypeRef};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// CATEGORY
// =============================================================================

/// Fieldless mirror of [`EntityKind`], used for filtering and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Platform,
    Feature,
    Extension,
    Basetype,
    External,
    Bitmask,
    Handle,
    Record,
    Enum,
    EnumValue,
    Command,
}

impl Category {
    /// All categories in reporting order.
    pub const ALL: [Category; 11] = [
        Category::Platform,
        Category::Feature,
        Category::Extension,
        Category::Basetype,
        Category::External,
        Category::Bitmask,
        Category::Handle,
        Category::Record,
        Category::Enum,
        Category::EnumValue,
        Category::Command,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Feature => "feature",
            Self::Extension => "extension",
            Self::Basetype => "basetype",
            Self::External => "external",
            Self::Bitmask => "bitmask",
            Self::Handle => "handle",
            Self::Record => "record",
            Self::Enum => "enum",
            Self::EnumValue => "enum_value",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// A registry entity with its enablement state and graph edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: EntityName,
    pub kind: EntityKind,
    /// Exists for the target API. Set once at ingestion.
    pub supported: bool,
    /// Selected by the user (or by the cascade).
    pub enabled: bool,
    /// Required regardless of subscribers.
    pub forced: bool,
    /// Entities this one needs.
    pub dependencies: BTreeSet<EntityId>,
    /// Entities that currently need this one.
    pub subscribers: BTreeSet<EntityId>,
    /// First feature or extension introducing this entity.
    pub origin: Option<EntityId>,
    /// Platform guard.
    pub protect: Option<String>,
    /// Alternative names resolving to this entity.
    pub aliases: Vec<EntityName>,
}

impl Entity {
    /// Create an unsupported, disabled entity with no edges.
    #[must_use]
    pub fn new(id: EntityId, name: EntityName, kind: EntityKind) -> Self {
        Self {
            id,
            name,
            kind,
            supported: false,
            enabled: false,
            forced: false,
            dependencies: BTreeSet::new(),
            subscribers: BTreeSet::new(),
            origin: None,
            protect: None,
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Forced, or needed by at least one subscriber.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.forced || !self.subscribers.is_empty()
    }

    /// Supported, and either enabled or required.
    #[must_use]
    pub fn is_emit_eligible(&self) -> bool {
        self.supported && (self.enabled || self.is_required())
    }

    #[must_use]
    pub fn as_operation(&self) -> Option<&Operation> {
        match &self.kind {
            EntityKind::Command(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_operation_mut(&mut self) -> Option<&mut Operation> {
        match &mut self.kind {
            EntityKind::Command(op) => Some(op),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_handle(&self) -> Option<&Handle> {
        match &self.kind {
            EntityKind::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_handle_mut(&mut self) -> Option<&mut Handle> {
        match &mut self.kind {
            EntityKind::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match &self.kind {
            EntityKind::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Kind-specific payload of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Platform(Platform),
    Feature(Bundle),
    Extension(Bundle),
    Basetype,
    External,
    Bitmask(Bitmask),
    Handle(Handle),
    Record(Record),
    Enum(Enumeration),
    EnumValue(EnumValue),
    Command(Operation),
}

impl EntityKind {
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Platform(_) => Category::Platform,
            Self::Feature(_) => Category::Feature,
            Self::Extension(_) => Category::Extension,
            Self::Basetype => Category::Basetype,
            Self::External => Category::External,
            Self::Bitmask(_) => Category::Bitmask,
            Self::Handle(_) => Category::Handle,
            Self::Record(_) => Category::Record,
            Self::Enum(_) => Category::Enum,
            Self::EnumValue(_) => Category::EnumValue,
            Self::Command(_) => Category::Command,
        }
    }
}

// =============================================================================
// KIND PAYLOADS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub protect: String,
}

/// A feature or extension: a named set of entities enabled together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Version (`"1.1"`) for features, registry number for extensions.
    pub number: String,
    pub platform: Option<EntityId>,
    pub promoted_to: Option<String>,
    /// Features and extensions this bundle builds on.
    pub depends: Vec<EntityId>,
    /// Entities introduced by this bundle, in registry order.
    pub requires: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmask {
    pub bits: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CreationCategory {
    #[default]
    None,
    Allocate,
    Create,
}

/// An opaque, lifetime-managed resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
    /// Owning handle type; `None` means the loader owns it.
    pub parent: Option<EntityId>,
    pub dispatchable: bool,
    pub creation: CreationCategory,
    /// Additional owner needed to release the handle (e.g. a pool).
    pub second_owner: Option<EntityId>,
    /// Destroy/Free command releasing the handle.
    pub deleter: Option<EntityId>,
    /// Commands whose first parameter is this handle.
    pub commands: Vec<EntityId>,
}

/// A struct or union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub members: Vec<Member>,
    pub is_union: bool,
    pub returned_only: bool,
    /// Records this one may be chained onto.
    pub extends: Vec<EntityId>,
    /// Structure type tag from the `sType` member default.
    pub structure_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub ty: TypeRef,
    pub optional: bool,
    pub len: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    /// Values declared in the enum itself.
    pub values: Vec<EntityId>,
    pub bitmask: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub parent: Option<EntityId>,
    pub value: Option<String>,
    /// Added by an extension rather than declared in the enum.
    pub extension: bool,
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Classification of an operation, derived once from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperationClass {
    Get,
    Allocate,
    Acquire,
    Create,
    Enumerate,
    Write,
    Destroy,
    Free,
    Unknown,
}

impl OperationClass {
    /// Classify an operation from its prefix-free name (`CreateBuffer`).
    #[must_use]
    pub fn classify(stem: &str) -> Self {
        let verb_len = stem
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_uppercase())
            .map_or(stem.len(), |(i, _)| i);
        match &stem[..verb_len] {
            "Get" => Self::Get,
            "Allocate" => Self::Allocate,
            "Acquire" => Self::Acquire,
            "Create" => Self::Create,
            "Enumerate" => Self::Enumerate,
            "Write" => Self::Write,
            "Destroy" => Self::Destroy,
            "Free" => Self::Free,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Get => "Get",
            Self::Allocate => "Allocate",
            Self::Acquire => "Acquire",
            Self::Create => "Create",
            Self::Enumerate => "Enumerate",
            Self::Write => "Write",
            Self::Destroy => "Destroy",
            Self::Free => "Free",
            Self::Unknown => "",
        }
    }

    /// Create or Allocate.
    #[must_use]
    pub const fn is_constructor(self) -> bool {
        matches!(self, Self::Create | Self::Allocate)
    }

    /// Destroy or Free.
    #[must_use]
    pub const fn is_destructor(self) -> bool {
        matches!(self, Self::Destroy | Self::Free)
    }
}

/// An imperative registry command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub params: Vec<Parameter>,
    pub return_type: TypeRef,
    pub success_codes: Vec<String>,
    pub error_codes: Vec<String>,
    pub class: OperationClass,
    /// Owning handle; `None` for loader-scope operations.
    pub owner: Option<EntityId>,
    /// Set once the parameter binder has run.
    pub bound: bool,
}

impl Operation {
    /// Indices of output parameters, in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.flags.contains(ParamFlags::OUTPUT))
            .map(|(i, _)| i)
    }

    /// Check whether `index` is a length parameter of some array.
    #[must_use]
    pub fn is_length(&self, index: usize) -> bool {
        self.params
            .get(index)
            .is_some_and(|p| !p.sizes.is_empty())
    }
}

bitflags! {
    /// Classification of a parameter, recorded once by the binder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
    pub struct ParamFlags: u16 {
        const INPUT = 1 << 0;
        const OUTPUT = 1 << 1;
        const ARRAY = 1 << 2;
        const STRUCT = 1 << 3;
        const HANDLE = 1 << 4;
        const OPTIONAL = 1 << 5;
        /// Sizes at least one array parameter.
        const LENGTH = 1 << 6;
        /// Null-terminated string.
        const STRING = 1 << 7;
    }
}

/// Where the element count of an array parameter lives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LengthBinding {
    /// A sibling parameter.
    Param(usize),
    /// A member of a record passed through a sibling parameter.
    Member { param: usize, member: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Registry spelling.
    pub name: String,
    /// Curated spelling.
    pub display_name: String,
    pub ty: TypeRef,
    pub optional: bool,
    /// Raw `len` attribute.
    pub len: Option<String>,
    pub flags: ParamFlags,
    /// Length binding, for array parameters.
    pub length: Option<LengthBinding>,
    /// Arrays sized by this parameter.
    pub sizes: BTreeSet<usize>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            ty,
            optional: false,
            len: None,
            flags: ParamFlags::empty(),
            length: None,
            sizes: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_output(&self) -> bool {
        self.flags.contains(ParamFlags::OUTPUT)
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.flags.contains(ParamFlags::ARRAY)
    }
}

// =============================================================================
// TESTS
// =============================================================================
