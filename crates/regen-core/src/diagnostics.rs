//! # Diagnostics
//!
//! Non-fatal conditions found while building a plan.
//!
//! Each condition is logged when it is recorded and kept in the session's
//! [`Diagnostics`] sink, which travels with the generation plan. Only a
//! missing root entity aborts a run; everything here lets the run continue.

use crate::entity::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recoverable problem, tied to the entity it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
    /// A referenced name is absent from the store; only that edge is skipped.
    MissingReference { entity: String, reference: String },
    /// A length/array pairing could not be resolved; the array stays unbound.
    BindingFailure {
        operation: String,
        parameter: String,
        len: String,
    },
    /// No variant could be produced for an operation in one context.
    ResolutionInfeasible {
        operation: String,
        context: String,
        reason: String,
    },
    /// Entities left unscheduled in one partition, reported together.
    CycleDetected {
        partition: String,
        entities: Vec<StuckEntity>,
    },
    /// A selection pattern matched nothing.
    EmptySelection { category: Category, pattern: String },
    /// A variant was produced in a reduced form.
    VariantDegraded {
        operation: String,
        context: String,
        reason: String,
    },
}

/// An entity the scheduler could not place, with its unmet dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StuckEntity {
    pub name: String,
    pub unmet: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingReference { entity, reference } => {
                write!(f, "{entity}: unknown reference '{reference}'")
            }
            Self::BindingFailure {
                operation,
                parameter,
                len,
            } => write!(
                f,
                "{operation}: cannot bind length '{len}' of parameter '{parameter}'"
            ),
            Self::ResolutionInfeasible {
                operation,
                context,
                reason,
            } => write!(f, "{operation} [{context}]: skipped, {reason}"),
            Self::CycleDetected {
                partition,
                entities,
            } => {
                write!(f, "cycle in {partition}:")?;
                for stuck in entities {
                    write!(f, " {} <- [{}];", stuck.name, stuck.unmet.join(", "))?;
                }
                Ok(())
            }
            Self::EmptySelection { category, pattern } => {
                write!(f, "selection '{pattern}' matched no {category}")
            }
            Self::VariantDegraded {
                operation,
                context,
                reason,
            } => write!(f, "{operation} [{context}]: {reason}"),
        }
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(%diagnostic, "diagnostic");
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether any scheduling partition had a cycle.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        self.entries
            .iter()
            .any(|d| matches!(d, Diagnostic::CycleDetected { .. }))
    }

    /// Drop everything recorded so far.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
