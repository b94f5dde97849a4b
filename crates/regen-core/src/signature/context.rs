//! # Generation Contexts
//!
//! A context selects which call forms the resolver produces and which owned
//! values are substituted at the call site.

use super::variant::OwnedValue;
use crate::naming::NamingConvention;
use crate::primitives::RAII_NAMESPACE_SUFFIX;
use serde::{Deserialize, Serialize};

/// Ownership model of the namespace a context emits into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipNamespace {
    /// Handles are plain values; unique wrappers are opt-in variants.
    #[default]
    Plain,
    /// Handles own their resource; constructors return owning wrappers.
    Raii,
}

/// One generation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub name: String,
    pub ownership_namespace: OwnershipNamespace,
    /// Emit free functions: the owning handle is not substituted.
    pub force_static: bool,
    /// Emit from inside a unique wrapper, which owns its superclass,
    /// allocator and dispatcher.
    pub in_unique_wrapper: bool,
    /// Produce single-item variants of bulk constructors.
    pub return_single_item: bool,
    /// Produce bulk variants taking a sequence allocator.
    pub add_allocator_param: bool,
    /// Produce structure-chain variants for extendable outputs.
    pub build_structure_chain: bool,
    /// Substitute the owner's superclass and second owner.
    pub superclass_injection: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::plain()
    }
}

impl Context {
    /// Member functions on plain handles, with unique variants.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            name: "plain".to_string(),
            ownership_namespace: OwnershipNamespace::Plain,
            force_static: false,
            in_unique_wrapper: false,
            return_single_item: true,
            add_allocator_param: true,
            build_structure_chain: true,
            superclass_injection: false,
        }
    }

    /// Member functions on owning handles.
    #[must_use]
    pub fn raii() -> Self {
        Self {
            name: "raii".to_string(),
            ownership_namespace: OwnershipNamespace::Raii,
            force_static: false,
            in_unique_wrapper: false,
            return_single_item: true,
            add_allocator_param: false,
            build_structure_chain: true,
            superclass_injection: true,
        }
    }

    /// The two contexts used when none are configured.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![Self::plain(), Self::raii()]
    }

    #[must_use]
    pub fn is_raii(&self) -> bool {
        self.ownership_namespace == OwnershipNamespace::Raii
    }

    /// Namespace the variants of this context live in (`vk`, `vk::raii`).
    #[must_use]
    pub fn namespace(&self, naming: &NamingConvention) -> String {
        match self.ownership_namespace {
            OwnershipNamespace::Plain => naming.namespace.clone(),
            OwnershipNamespace::Raii => format!("{}::{}", naming.namespace, RAII_NAMESPACE_SUFFIX),
        }
    }

    /// Owning values this context substitutes at the call site.
    #[must_use]
    pub fn provides(&self, value: OwnedValue) -> bool {
        match value {
            OwnedValue::SelfHandle => !self.force_static,
            OwnedValue::Superclass | OwnedValue::SecondOwner => {
                !self.force_static && (self.superclass_injection || self.in_unique_wrapper)
            }
            OwnedValue::Allocator => self.in_unique_wrapper,
            OwnedValue::Dispatch => self.in_unique_wrapper || self.is_raii(),
        }
    }
}
