//! # regen-core
//!
//! The deterministic registry engine for regen - THE LOGIC.
//!
//! Turns an ingested API registry plus a selection into a scheduled
//! generation plan whose operations carry synthesized call-site variants.
//!
//! ## Pipeline
//!
//! 1. `ingestor`: raw registry records become an [`EntityStore`]
//! 2. `enablement` / `selection`: the user's choice cascades through the
//!    dependency graph
//! 3. `binder`: emit-eligible operations get their length/array pairings
//! 4. `scheduler`: entities are ordered so dependencies come first
//! 5. `signature`: each operation yields its variants per context
//! 6. `plan`: everything emit-eligible is collected for an emitter
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no file I/O
//! - BTreeMap/BTreeSet only; two runs over the same input give identical plans
//! - Recoverable problems are [`Diagnostic`]s, never panics

// =============================================================================
// MODULES
// =============================================================================

pub mod binder;
pub mod diagnostics;
pub mod enablement;
pub mod entity;
pub mod formats;
pub mod ingestor;
pub mod naming;
pub mod plan;
pub mod primitives;
pub mod raw;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod signature;
pub mod store;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{EntityId, EntityName, RegenError, TypeRef};

pub use diagnostics::{Diagnostic, Diagnostics, StuckEntity};
pub use entity::{
    Category, CreationCategory, Entity, EntityKind, LengthBinding, OperationClass, ParamFlags,
};
pub use naming::NamingConvention;
pub use raw::RawRegistry;
pub use store::EntityStore;

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use binder::{BindReport, Binder};
pub use enablement::{CascadeReport, Enablement};
pub use ingestor::Ingestor;
pub use plan::{GenerationPlan, Planner};
pub use scheduler::{Partition, Schedule, Scheduler};
pub use selection::{CategoryRules, Selection, SelectionReport, SelectionRequest};
pub use session::Session;
pub use signature::{Context, OwnershipNamespace, Resolution, ResolveError, SignatureVariant};

// =============================================================================
// RE-EXPORTS: Formats and System
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::plan_digest;
pub use formats::{PlanHeader, plan_checksum, plan_from_bytes, plan_to_bytes};

pub use system::{CategoryCounts, RegistryMetrics};
