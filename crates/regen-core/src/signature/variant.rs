//! # Signature Variants
//!
//! Structured description of one emitted call form. Variants are produced
//! per (operation, context) resolution and are never shared between calls.

use crate::entity::{LengthBinding, OperationClass};
use crate::types::EntityId;
use serde::{Deserialize, Serialize};

/// One emitted call form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureVariant {
    /// Call name (`createBuffer`, `createBufferUnique`, `destroy`).
    pub name: String,
    pub kind: VariantKind,
    pub ownership: Ownership,
    /// Emitted as a free function rather than a member of the owner.
    pub is_static: bool,
    pub return_type: ReturnType,
    /// Raw parameters in registry order, then the extra arguments.
    pub arguments: Vec<Argument>,
    pub body: BodyStrategy,
    pub status_check: StatusCheck,
}

impl SignatureVariant {
    /// Arguments visible in the public signature.
    pub fn public_arguments(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| !a.ignored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Single call, non-array outputs returned.
    Default,
    /// Array outputs returned as sequences.
    Bulk,
    /// Bulk, with a caller-supplied sequence allocator.
    BulkWithAllocator,
    /// Bulk constructor collapsed to one element.
    SingleItem,
    /// Output threaded through a caller-chosen structure chain.
    StructureChain,
    /// Bulk, with each element a structure chain.
    BulkStructureChain,
    /// Destroy/Free overloaded purely on the destroyed handle type.
    HandleOverload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    /// Returned handles are plain values.
    Borrowed,
    /// Returned handles are wrapped with their deleter.
    Unique,
    /// Returned handles are owning objects.
    Raii,
}

/// A value type as it appears in the generated API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueType {
    /// Curated spelling (`Buffer`, `uint32_t`).
    pub name: String,
    pub entity: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Void,
    /// The raw status value.
    Status,
    Value(ValueType),
    Sequence(Box<ReturnType>),
    Tuple(Vec<ReturnType>),
    /// Handle wrapped with its deleter.
    Unique(Box<ReturnType>),
    /// Owning handle object.
    Owning(Box<ReturnType>),
    /// Caller-chosen structure chain.
    StructureChain,
    /// `(status, value)` pair for operations with several success codes.
    WithStatus(Box<ReturnType>),
}

impl ReturnType {
    /// Check whether this is a `(status, value)` pair.
    #[must_use]
    pub fn is_status_pair(&self) -> bool {
        matches!(self, Self::WithStatus(_))
    }

    /// Check whether a sequence appears anywhere in this type.
    #[must_use]
    pub fn has_sequence(&self) -> bool {
        match self {
            Self::Sequence(_) => true,
            Self::Tuple(items) => items.iter().any(Self::has_sequence),
            Self::Unique(inner) | Self::Owning(inner) | Self::WithStatus(inner) => {
                inner.has_sequence()
            }
            _ => false,
        }
    }

    /// Wrap every handle value with `wrap`.
    #[must_use]
    pub fn wrap_handles(self, wrap: fn(Box<ReturnType>) -> ReturnType, handle: EntityId) -> Self {
        match self {
            Self::Value(value) if value.entity == Some(handle) => wrap(Box::new(Self::Value(value))),
            Self::Sequence(inner) => Self::Sequence(Box::new(inner.wrap_handles(wrap, handle))),
            Self::Tuple(items) => Self::Tuple(
                items
                    .into_iter()
                    .map(|item| item.wrap_handles(wrap, handle))
                    .collect(),
            ),
            Self::WithStatus(inner) => Self::WithStatus(Box::new(inner.wrap_handles(wrap, handle))),
            other => other,
        }
    }
}

/// One argument of a call form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub origin: ArgumentOrigin,
    pub shape: ArgumentShape,
    /// Default for public arguments.
    pub default: Option<DefaultValue>,
    /// How the call site obtains the value.
    pub assignment: Assignment,
    /// Not part of the public signature.
    pub ignored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentOrigin {
    /// Raw parameter at this index.
    Param(usize),
    /// Function-pointer dispatch table.
    Dispatch,
    /// Allocator for returned sequences.
    SequenceAllocator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentShape {
    Value(ValueType),
    /// Required `const T&`.
    Reference(ValueType),
    /// Nullable `const T*`.
    OptionalReference(ValueType),
    /// Contiguous elements; the length travels with the span.
    Span { element: ValueType, mutable: bool },
    /// Null-terminated string.
    Str,
    /// Raw pointer kept as-is.
    Pointer { pointee: ValueType, mutable: bool },
    Dispatcher,
    SequenceAllocator(ValueType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    Null,
    DefaultDispatcher,
    DefaultAllocator,
}

/// Value owned by the enclosing handle object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnedValue {
    /// The handle the operation is a member of.
    SelfHandle,
    /// The owner's parent handle.
    Superclass,
    /// The owner's second owner (e.g. its pool).
    SecondOwner,
    Allocator,
    Dispatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    /// Supplied by the caller.
    Public,
    /// Substituted from the enclosing handle.
    Owned(OwnedValue),
    /// Size of the span at this argument index.
    LengthOf(usize),
    /// Constant one, for single-item calls.
    One,
    /// Output collected into the return value.
    ResultSlot,
    /// Count written by the size query of a two-call fill.
    CountSlot,
}

/// How the body of a call form is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyStrategy {
    /// Call once; outputs (if any) are discarded or asserted.
    Call,
    /// Call once and return the collected outputs.
    CallAndReturn,
    /// Query the count, size the arrays, fill them; repeat on incomplete.
    QueryThenFill {
        count: usize,
        arrays: Vec<usize>,
        retry_on_incomplete: bool,
    },
    /// Size the arrays from a known length, then call once.
    SizedFill {
        count: LengthBinding,
        arrays: Vec<usize>,
    },
    /// Run `inner`, then bind the produced handles to their deleter.
    Owning {
        deleter: Option<Deleter>,
        inner: Box<BodyStrategy>,
    },
}

impl BodyStrategy {
    /// Check whether this body retries on an incomplete status.
    #[must_use]
    pub fn retries(&self) -> bool {
        match self {
            Self::QueryThenFill {
                retry_on_incomplete,
                ..
            } => *retry_on_incomplete,
            Self::Owning { inner, .. } => inner.retries(),
            _ => false,
        }
    }
}

/// The operation that releases a produced handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleter {
    /// Curated call name (`destroyBuffer`, `freeCommandBuffers`).
    pub operation: String,
    pub class: OperationClass,
    /// Where the deleter's owner value comes from.
    pub owner: Option<OwnerSource>,
    /// Second owner type needed for release (e.g. `CommandPool`).
    pub pool: Option<String>,
    /// Whether the deleter takes allocation callbacks.
    pub allocator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerSource {
    /// A public argument of the creating call.
    Param(usize),
    /// A value substituted from the enclosing handle.
    Owned(OwnedValue),
}

/// Status handling of a call form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCheck {
    /// The operation cannot fail.
    None,
    /// Any status outside `accepted` raises a failure carrying `tag`.
    Inline { accepted: Vec<String>, tag: String },
}
