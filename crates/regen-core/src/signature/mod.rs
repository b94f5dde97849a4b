//! # Signature Resolution
//!
//! Synthesis of call-site variants for bound operations.
//!
//! - `context`: the generation contexts (plain, owning wrappers, ...)
//! - `variant`: the structured variant description handed to emitters
//! - `index`: registry-wide lookups built once per batch
//! - `resolver`: per-operation, per-context variant synthesis

pub mod context;
pub mod index;
pub mod resolver;
pub mod variant;

pub use context::{Context, OwnershipNamespace};
pub use index::{OverloadKey, ResolutionIndex};
pub use resolver::{Resolution, ResolveError, Resolver};
pub use variant::{
    Argument, ArgumentOrigin, ArgumentShape, Assignment, BodyStrategy, DefaultValue, Deleter,
    OwnedValue, OwnerSource, Ownership, ReturnType, SignatureVariant, StatusCheck, ValueType,
    VariantKind,
};
