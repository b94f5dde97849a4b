//! # Enablement Graph Engine
//!
//! Incremental propagation of entity selection through the dependency graph.
//!
//! Every entity keeps a subscriber set: the entities that currently need it.
//! Enabling an entity subscribes it to each dependency; a dependency that
//! gains its first subscriber is enabled in turn. Disabling unsubscribes the
//! entity; a dependency left without subscribers is disabled in turn unless
//! it is forced.
//!
//! Propagation uses an explicit worklist. Subscription is a set insert, so
//! dependency cycles terminate without any cycle detection here.

use crate::store::EntityStore;
use crate::types::{EntityId, RegenError};

/// Entities whose `enabled` flag changed during one `set_enabled` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub enabled: Vec<EntityId>,
    pub disabled: Vec<EntityId>,
    /// Unsupported entities the cascade reached but did not enable.
    pub skipped_unsupported: Vec<EntityId>,
}

impl CascadeReport {
    /// Check whether the call changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty() && self.disabled.is_empty()
    }
}

/// Subscriber-counting enablement over an [`EntityStore`].
pub struct Enablement;

impl Enablement {
    /// Enable or disable `id`, cascading through its dependencies.
    pub fn set_enabled(
        store: &mut EntityStore,
        id: EntityId,
        enabled: bool,
    ) -> Result<CascadeReport, RegenError> {
        // Fail before mutating anything.
        store.get(id)?;
        let report = if enabled {
            Self::enable(store, id)?
        } else {
            Self::disable(store, id)?
        };
        tracing::debug!(
            entity = %store.name_of(id),
            enabled,
            changed_on = report.enabled.len(),
            changed_off = report.disabled.len(),
            "cascade"
        );
        Ok(report)
    }

    fn enable(store: &mut EntityStore, root: EntityId) -> Result<CascadeReport, RegenError> {
        let mut report = CascadeReport::default();
        let mut worklist = vec![root];

        while let Some(id) = worklist.pop() {
            let entity = store.get_mut(id)?;
            if !entity.supported {
                report.skipped_unsupported.push(id);
                continue;
            }
            if !entity.enabled {
                entity.enabled = true;
                report.enabled.push(id);
            }
            let dependencies: Vec<EntityId> = entity.dependencies.iter().copied().collect();
            for dependency in dependencies {
                let dep = store.get_mut(dependency)?;
                if dep.subscribers.insert(id) && dep.subscribers.len() == 1 {
                    worklist.push(dependency);
                }
            }
        }
        Ok(report)
    }

    fn disable(store: &mut EntityStore, root: EntityId) -> Result<CascadeReport, RegenError> {
        let mut report = CascadeReport::default();
        let mut worklist = vec![root];

        while let Some(id) = worklist.pop() {
            let entity = store.get_mut(id)?;
            if entity.forced {
                continue;
            }
            if entity.enabled {
                entity.enabled = false;
                report.disabled.push(id);
            }
            let dependencies: Vec<EntityId> = entity.dependencies.iter().copied().collect();
            for dependency in dependencies {
                let dep = store.get_mut(dependency)?;
                if dep.subscribers.remove(&id) && dep.subscribers.is_empty() && !dep.forced {
                    worklist.push(dependency);
                }
            }
        }
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================
