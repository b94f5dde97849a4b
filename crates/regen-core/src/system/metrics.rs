//! # Registry Metrics
//!
//! Per-category counts of the enablement state. Informational only: no
//! pipeline stage reads them.

use crate::entity::{Category, Entity};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub total: usize,
    pub supported: usize,
    pub enabled: usize,
    /// Forced, or needed by at least one subscriber.
    pub required: usize,
    pub emit_eligible: usize,
}

impl CategoryCounts {
    fn record(&mut self, entity: &Entity) {
        self.total += 1;
        self.supported += usize::from(entity.supported);
        self.enabled += usize::from(entity.enabled);
        self.required += usize::from(entity.is_required());
        self.emit_eligible += usize::from(entity.is_emit_eligible());
    }

    fn add(&mut self, other: &Self) {
        self.total += other.total;
        self.supported += other.supported;
        self.enabled += other.enabled;
        self.required += other.required;
        self.emit_eligible += other.emit_eligible;
    }
}

/// Counts per category plus the bound-operation tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMetrics {
    pub categories: BTreeMap<Category, CategoryCounts>,
    /// Operations whose parameter binding has run.
    pub bound_operations: usize,
}

impl RegistryMetrics {
    /// Count every entity of `store`.
    #[must_use]
    pub fn from_store(store: &EntityStore) -> Self {
        let mut metrics = Self::default();
        for entity in store.iter() {
            metrics
                .categories
                .entry(entity.category())
                .or_default()
                .record(entity);
            if entity.as_operation().is_some_and(|op| op.bound) {
                metrics.bound_operations += 1;
            }
        }
        metrics
    }

    /// Counts of one category; zero if the registry has none.
    #[must_use]
    pub fn get(&self, category: Category) -> CategoryCounts {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    /// Sum over all categories.
    #[must_use]
    pub fn totals(&self) -> CategoryCounts {
        let mut totals = CategoryCounts::default();
        for counts in self.categories.values() {
            totals.add(counts);
        }
        totals
    }
}

impl fmt::Display for RegistryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>7} {:>9} {:>7} {:>8} {:>5}",
            "category", "total", "supported", "enabled", "required", "emit"
        )?;
        for category in Category::ALL {
            let c = self.get(category);
            if c.total == 0 {
                continue;
            }
            writeln!(
                f,
                "{:<12} {:>7} {:>9} {:>7} {:>8} {:>5}",
                category.as_str(),
                c.total,
                c.supported,
                c.enabled,
                c.required,
                c.emit_eligible
            )?;
        }
        let t = self.totals();
        write!(
            f,
            "{:<12} {:>7} {:>9} {:>7} {:>8} {:>5}",
            "all", t.total, t.supported, t.enabled, t.required, t.emit_eligible
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
