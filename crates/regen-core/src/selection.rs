//! # Selection Driver
//!
//! Applies a user selection to a session through `set_enabled` only.
//!
//! Pattern grammar, per category:
//! - `"all"` or `"*"`: every supported entity of the category
//! - `"re:<regex>"`: anchored regular expression
//! - anything else: exact name, current or original spelling

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::enablement::Enablement;
use crate::entity::{Category, Entity};
use crate::store::EntityStore;
use crate::types::{EntityId, EntityName, RegenError};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One compiled selection pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    All,
    Exact(String),
    Regex(Regex),
}

impl Pattern {
    /// Compile a pattern from its textual form.
    pub fn parse(text: &str) -> Result<Self, RegenError> {
        if text == "all" || text == "*" {
            return Ok(Self::All);
        }
        match text.strip_prefix("re:") {
            Some(body) => Regex::new(&format!("^(?:{body})$"))
                .map(Self::Regex)
                .map_err(|e| RegenError::InvalidPattern {
                    pattern: text.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(Self::Exact(text.to_string())),
        }
    }

    /// Check whether either spelling of `name` matches.
    #[must_use]
    pub fn matches(&self, name: &EntityName) -> bool {
        match self {
            Self::All => true,
            Self::Exact(exact) => name.matches(exact),
            Self::Regex(regex) => regex.is_match(&name.current) || regex.is_match(&name.original),
        }
    }

    /// Check `entity`; exact names also match its aliases, like
    /// [`EntityStore::lookup`] resolves them.
    #[must_use]
    pub fn matches_entity(&self, entity: &Entity) -> bool {
        match self {
            Self::Exact(exact) => {
                entity.name.matches(exact) || entity.aliases.iter().any(|a| a.matches(exact))
            }
            _ => self.matches(&entity.name),
        }
    }
}

/// Pattern lists per selectable category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRules {
    pub platforms: Vec<String>,
    pub features: Vec<String>,
    pub extensions: Vec<String>,
    pub handles: Vec<String>,
    pub structs: Vec<String>,
    pub enums: Vec<String>,
    pub commands: Vec<String>,
}

impl CategoryRules {
    /// Rules in application order.
    fn by_category(&self) -> [(Category, &[String]); 7] {
        [
            (Category::Platform, self.platforms.as_slice()),
            (Category::Feature, self.features.as_slice()),
            (Category::Extension, self.extensions.as_slice()),
            (Category::Handle, self.handles.as_slice()),
            (Category::Record, self.structs.as_slice()),
            (Category::Enum, self.enums.as_slice()),
            (Category::Command, self.commands.as_slice()),
        ]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_category().iter().all(|(_, rules)| rules.is_empty())
    }
}

/// A selection: what to enable, then what to disable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionRequest {
    pub include: CategoryRules,
    pub exclude: CategoryRules,
}

/// Counts of a selection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionReport {
    /// Entities matched by any pattern.
    pub matched: usize,
    /// Entities switched on, including the cascade.
    pub enabled: usize,
    /// Entities switched off, including the cascade.
    pub disabled: usize,
}

/// Compiled patterns with their source text, per category.
type CompiledRules = Vec<(Category, Vec<(String, Pattern)>)>;

pub struct Selection;

impl Selection {
    /// Apply `request` to `store`.
    ///
    /// All patterns are compiled before anything is toggled, so an invalid
    /// pattern leaves the store untouched.
    pub fn apply(
        store: &mut EntityStore,
        request: &SelectionRequest,
        diagnostics: &mut Diagnostics,
    ) -> Result<SelectionReport, RegenError> {
        let include = Self::compile(&request.include)?;
        let exclude = Self::compile(&request.exclude)?;
        let mut report = SelectionReport::default();

        for (category, patterns) in &include {
            for (text, pattern) in patterns {
                let matched = Self::matching(store, *category, pattern);
                if matched.is_empty() {
                    diagnostics.push(Diagnostic::EmptySelection {
                        category: *category,
                        pattern: text.clone(),
                    });
                    continue;
                }
                report.matched += matched.len();
                for id in matched {
                    report.enabled += Enablement::set_enabled(store, id, true)?.enabled.len();
                }
            }
        }

        for (category, patterns) in &exclude {
            for (text, pattern) in patterns {
                let matched = Self::matching(store, *category, pattern);
                if matched.is_empty() {
                    tracing::debug!(%category, pattern = %text, "exclude matched nothing");
                }
                report.matched += matched.len();
                for id in matched {
                    report.disabled += Enablement::set_enabled(store, id, false)?.disabled.len();
                }
            }
        }

        tracing::info!(
            matched = report.matched,
            enabled = report.enabled,
            disabled = report.disabled,
            "selection applied"
        );
        Ok(report)
    }

    fn compile(rules: &CategoryRules) -> Result<CompiledRules, RegenError> {
        rules
            .by_category()
            .into_iter()
            .map(|(category, texts)| {
                let patterns = texts
                    .iter()
                    .map(|t| Pattern::parse(t).map(|p| (t.clone(), p)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((category, patterns))
            })
            .collect()
    }

    fn matching(store: &EntityStore, category: Category, pattern: &Pattern) -> Vec<EntityId> {
        store
            .of_category(category)
            .filter(|e| e.supported && pattern.matches_entity(e))
            .map(|e| e.id)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
