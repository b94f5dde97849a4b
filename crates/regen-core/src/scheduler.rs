//! # Emission Scheduler
//!
//! Orders emit-eligible entities so that each appears after everything it
//! depends on, by repeated fixed-point relaxation:
//!
//! 1. In each pass, emit every pending entity whose dependencies are emitted
//! 2. Stop when a pass emits nothing
//! 3. Whatever is still pending is stuck in a cycle and reported together
//!
//! Dependencies outside the partition are ignored. An entity never waits on
//! itself, and edges between two members of the exempt set are dropped
//! before sorting.

use crate::diagnostics::{Diagnostic, StuckEntity};
use crate::entity::{Category, EntityKind};
use crate::naming::NamingConvention;
use crate::store::EntityStore;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Independently sorted groups of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Features and extensions, after the bundles they build on.
    Bundles,
    /// Records, after the records they embed or point to.
    Records,
    /// Handles, after the handles their operations reference.
    Handles,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Bundles, Partition::Records, Partition::Handles];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bundles => "bundles",
            Self::Records => "records",
            Self::Handles => "handles",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of sorting one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Entities in dependency order.
    pub order: Vec<EntityId>,
    /// Entities left in a cycle, with their unmet dependencies.
    pub stuck: Vec<(EntityId, Vec<EntityId>)>,
    /// Relaxation passes run.
    pub passes: usize,
}

impl Schedule {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stuck.is_empty()
    }

    /// Cycle diagnostic for the stuck entities, if any.
    #[must_use]
    pub fn cycle_diagnostic(&self, store: &EntityStore, partition: Partition) -> Option<Diagnostic> {
        if self.stuck.is_empty() {
            return None;
        }
        let entities = self
            .stuck
            .iter()
            .map(|(id, unmet)| StuckEntity {
                name: store.name_of(*id),
                unmet: unmet.iter().map(|d| store.name_of(*d)).collect(),
            })
            .collect();
        Some(Diagnostic::CycleDetected {
            partition: partition.to_string(),
            entities,
        })
    }
}

pub struct Scheduler;

impl Scheduler {
    /// Sort `partition` by the dependencies `edges` reports.
    pub fn sort<F>(partition: &[EntityId], exempt: &BTreeSet<EntityId>, mut edges: F) -> Schedule
    where
        F: FnMut(EntityId) -> BTreeSet<EntityId>,
    {
        let members: BTreeSet<EntityId> = partition.iter().copied().collect();
        let dependencies: BTreeMap<EntityId, BTreeSet<EntityId>> = partition
            .iter()
            .map(|&id| {
                let deps = edges(id)
                    .into_iter()
                    .filter(|d| *d != id && members.contains(d))
                    .filter(|d| !(exempt.contains(&id) && exempt.contains(d)))
                    .collect();
                (id, deps)
            })
            .collect();

        let mut emitted = BTreeSet::new();
        let mut order = Vec::with_capacity(partition.len());
        let mut pending: Vec<EntityId> = partition.to_vec();
        let mut passes = 0;

        while !pending.is_empty() {
            passes += 1;
            let before = order.len();
            pending.retain(|id| {
                let ready = dependencies
                    .get(id)
                    .is_none_or(|deps| deps.iter().all(|d| emitted.contains(d)));
                if ready {
                    emitted.insert(*id);
                    order.push(*id);
                }
                !ready
            });
            if order.len() == before {
                break;
            }
        }

        let stuck = pending
            .into_iter()
            .map(|id| {
                let unmet = dependencies
                    .get(&id)
                    .map(|deps| deps.iter().filter(|d| !emitted.contains(d)).copied().collect())
                    .unwrap_or_default();
                (id, unmet)
            })
            .collect();

        Schedule {
            order,
            stuck,
            passes,
        }
    }

    /// Sort the emit-eligible entities of one partition.
    #[must_use]
    pub fn schedule(
        store: &EntityStore,
        naming: &NamingConvention,
        partition: Partition,
    ) -> Schedule {
        let schedule = match partition {
            Partition::Bundles => {
                let ids = Self::eligible(store, &[Category::Feature, Category::Extension]);
                Self::sort(&ids, &BTreeSet::new(), |id| {
                    store
                        .entity(id)
                        .map(|e| e.dependencies.clone())
                        .unwrap_or_default()
                })
            }
            Partition::Records => {
                let ids = Self::eligible(store, &[Category::Record]);
                let exempt: BTreeSet<EntityId> = naming
                    .base_header
                    .iter()
                    .filter_map(|name| store.lookup(name))
                    .collect();
                Self::sort(&ids, &exempt, |id| Self::record_edges(store, id))
            }
            Partition::Handles => {
                let ids = Self::eligible(store, &[Category::Handle]);
                Self::sort(&ids, &BTreeSet::new(), |id| Self::handle_edges(store, id))
            }
        };
        tracing::debug!(
            %partition,
            scheduled = schedule.order.len(),
            stuck = schedule.stuck.len(),
            passes = schedule.passes,
            "partition scheduled"
        );
        schedule
    }

    fn eligible(store: &EntityStore, categories: &[Category]) -> Vec<EntityId> {
        store
            .iter()
            .filter(|e| categories.contains(&e.category()) && e.is_emit_eligible())
            .map(|e| e.id)
            .collect()
    }

    /// Record member types, through pointers or by value.
    fn record_edges(store: &EntityStore, id: EntityId) -> BTreeSet<EntityId> {
        match store.entity(id).and_then(|e| e.as_record()) {
            Some(record) => record.members.iter().filter_map(|m| m.ty.entity).collect(),
            None => BTreeSet::new(),
        }
    }

    /// Handle-typed parameters of the emit-eligible operations a handle owns.
    fn handle_edges(store: &EntityStore, id: EntityId) -> BTreeSet<EntityId> {
        let Some(handle) = store.entity(id).and_then(|e| e.as_handle()) else {
            return BTreeSet::new();
        };
        handle
            .commands
            .iter()
            .filter_map(|c| store.entity(*c))
            .filter(|c| c.is_emit_eligible())
            .filter_map(|c| c.as_operation())
            .flat_map(|op| op.params.iter().filter_map(|p| p.ty.entity))
            .filter(|t| matches!(store.entity(*t).map(|e| &e.kind), Some(EntityKind::Handle(_))))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<EntityId> {
        raw.iter().map(|&i| EntityId(i)).collect()
    }

    fn edges_from(pairs: &[(u32, u32)]) -> impl FnMut(EntityId) -> BTreeSet<EntityId> + '_ {
        move |id| {
            pairs
                .iter()
                .filter(|(from, _)| *from == id.0)
                .map(|&(_, to)| EntityId(to))
                .collect()
        }
    }

    fn position(order: &[EntityId], id: u32) -> usize {
        order
            .iter()
            .position(|e| *e == EntityId(id))
            .expect("scheduled")
    }

    #[test]
    fn dependencies_come_first() {
        let edges = [(0, 1), (1, 2), (3, 0)];
        let schedule = Scheduler::sort(&ids(&[0, 1, 2, 3]), &BTreeSet::new(), edges_from(&edges));
        assert!(schedule.is_complete());
        for (from, to) in edges {
            assert!(position(&schedule.order, to) < position(&schedule.order, from));
        }
    }

    #[test]
    fn outside_dependencies_are_ignored() {
        let edges = [(0, 7)];
        let schedule = Scheduler::sort(&ids(&[0]), &BTreeSet::new(), edges_from(&edges));
        assert_eq!(schedule.order, ids(&[0]));
    }

    #[test]
    fn cycles_are_reported_together() {
        let edges = [(0, 1), (1, 2), (2, 1), (3, 0)];
        let schedule = Scheduler::sort(&ids(&[0, 1, 2, 3, 4]), &BTreeSet::new(), edges_from(&edges));
        assert_eq!(schedule.order, ids(&[4]));
        let stuck: Vec<u32> = schedule.stuck.iter().map(|(id, _)| id.0).collect();
        assert_eq!(stuck, vec![0, 1, 2, 3]);
        let (_, unmet) = &schedule.stuck[1];
        assert_eq!(unmet, &ids(&[2]));
    }

    #[test]
    fn exempt_pair_is_not_a_cycle() {
        let edges = [(0, 1), (1, 0), (2, 0)];
        let exempt: BTreeSet<EntityId> = ids(&[0, 1]).into_iter().collect();
        let schedule = Scheduler::sort(&ids(&[0, 1, 2]), &exempt, edges_from(&edges));
        assert!(schedule.is_complete());
        assert!(position(&schedule.order, 0) < position(&schedule.order, 2));
    }

    #[test]
    fn self_edges_do_not_block() {
        let edges = [(0, 0)];
        let schedule = Scheduler::sort(&ids(&[0]), &BTreeSet::new(), edges_from(&edges));
        assert!(schedule.is_complete());
    }

    #[test]
    fn relaxation_reuses_emissions_within_a_pass() {
        let edges = [(1, 0), (2, 1), (3, 2)];
        let schedule = Scheduler::sort(&ids(&[0, 1, 2, 3]), &BTreeSet::new(), edges_from(&edges));
        assert_eq!(schedule.passes, 1);
        let reversed = Scheduler::sort(&ids(&[3, 2, 1, 0]), &BTreeSet::new(), edges_from(&edges));
        assert_eq!(reversed.order, ids(&[0, 1, 2, 3]));
        assert_eq!(reversed.passes, 4);
    }
}
