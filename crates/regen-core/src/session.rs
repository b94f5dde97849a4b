//! # Session Module
//!
//! One registry, one naming convention, one selection state.
//!
//! A session owns the entity store and the diagnostics sink for a run:
//! - `load` ingests the registry and enables the forced roots
//! - selection goes through `set_enabled` only
//! - `plan` binds every emit-eligible operation and assembles the plan
//!
//! Sessions are single-threaded; nothing here is shared.

use crate::binder::{BindReport, Binder};
use crate::diagnostics::Diagnostics;
use crate::enablement::{CascadeReport, Enablement};
use crate::ingestor::Ingestor;
use crate::naming::NamingConvention;
use crate::plan::{GenerationPlan, Planner};
use crate::raw::RawRegistry;
use crate::selection::{Selection, SelectionReport, SelectionRequest};
use crate::signature::{Context, Resolution, ResolutionIndex, ResolveError, Resolver};
use crate::store::EntityStore;
use crate::system::RegistryMetrics;
use crate::types::{EntityId, RegenError};

#[derive(Debug)]
pub struct Session {
    store: EntityStore,
    naming: NamingConvention,
    diagnostics: Diagnostics,
}

impl Session {
    /// Ingest `raw` and enable the forced roots.
    ///
    /// Fails if the status enum or the type-tag enum is absent.
    pub fn load(raw: &RawRegistry, naming: NamingConvention) -> Result<Self, RegenError> {
        let (mut store, diagnostics) = Ingestor::ingest(raw, &naming)?;
        for root in [&naming.status_enum, &naming.type_tag_enum] {
            let id = store
                .lookup(root)
                .ok_or_else(|| RegenError::MissingRequiredEntity(root.clone()))?;
            store.get_mut(id)?.forced = true;
            Enablement::set_enabled(&mut store, id, true)?;
        }
        tracing::info!(
            api = %naming.api,
            entities = store.len(),
            "session loaded"
        );
        Ok(Self {
            store,
            naming,
            diagnostics,
        })
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[must_use]
    pub fn naming(&self) -> &NamingConvention {
        &self.naming
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Id of the entity or alias called `name`.
    pub fn lookup(&self, name: &str) -> Result<EntityId, RegenError> {
        self.store.require(name)
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> Result<CascadeReport, RegenError> {
        Enablement::set_enabled(&mut self.store, id, enabled)
    }

    /// [`Self::set_enabled`] by either spelling or an alias.
    pub fn set_enabled_by_name(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<CascadeReport, RegenError> {
        let id = self.lookup(name)?;
        self.set_enabled(id, enabled)
    }

    pub fn select(&mut self, request: &SelectionRequest) -> Result<SelectionReport, RegenError> {
        Selection::apply(&mut self.store, request, &mut self.diagnostics)
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    /// Bind every emit-eligible operation not bound yet.
    pub fn bind_required(&mut self) -> Result<BindReport, RegenError> {
        Binder::bind_required(&mut self.store, &mut self.diagnostics)
    }

    /// Resolve the variants of one operation in one context.
    ///
    /// The operation must have been bound; no diagnostic is recorded.
    pub fn resolve(&self, name: &str, context: &Context) -> Result<Resolution, ResolveError> {
        let id = self
            .store
            .lookup(name)
            .ok_or_else(|| ResolveError::NotAnOperation(name.to_string()))?;
        let index = ResolutionIndex::build(&self.store, &self.naming);
        Resolver::new(&self.store, &self.naming, &index).resolve(id, context)
    }

    /// Bind, schedule and resolve everything emit-eligible.
    pub fn plan(&mut self, contexts: &[Context]) -> Result<GenerationPlan, RegenError> {
        self.bind_required()?;
        Ok(Planner::new(&self.store, &self.naming).assemble(contexts, &mut self.diagnostics))
    }

    #[must_use]
    pub fn metrics(&self) -> RegistryMetrics {
        RegistryMetrics::from_store(&self.store)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::entity::Category;
    use crate::selection::CategoryRules;

    const REGISTRY: &str = include_str!("../tests/fixtures/registry.json");

    fn session() -> Session {
        let raw: RawRegistry = serde_json::from_str(REGISTRY).expect("fixture");
        Session::load(&raw, NamingConvention::default()).expect("load")
    }

    #[test]
    fn load_forces_roots() {
        let session = session();
        for root in ["VkResult", "VkStructureType"] {
            let id = session.lookup(root).expect("root");
            let entity = session.store().get(id).expect("entity");
            assert!(entity.forced);
            assert!(entity.is_emit_eligible());
        }
    }

    #[test]
    fn forced_roots_survive_disable_cascade() {
        let mut session = session();
        session
            .set_enabled_by_name("VK_VERSION_1_0", true)
            .expect("enable");
        session
            .set_enabled_by_name("VK_VERSION_1_0", false)
            .expect("disable");
        let id = session.lookup("VkResult").expect("root");
        assert!(session.store().get(id).expect("entity").is_emit_eligible());
        let fence = session.lookup("VkFence").expect("handle");
        assert!(!session.store().get(fence).expect("entity").is_emit_eligible());
    }

    #[test]
    fn missing_root_is_fatal() {
        let raw = RawRegistry::default();
        let err = Session::load(&raw, NamingConvention::default()).expect_err("no roots");
        assert!(matches!(err, RegenError::MissingRequiredEntity(name) if name == "VkResult"));
    }

    #[test]
    fn selection_reports_empty_patterns() {
        let mut session = session();
        let request = SelectionRequest {
            include: CategoryRules {
                features: vec!["VK_VERSION_1_0".to_string()],
                extensions: vec!["VK_KHR_nonexistent".to_string()],
                ..CategoryRules::default()
            },
            ..SelectionRequest::default()
        };
        session.select(&request).expect("select");
        assert!(session.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::EmptySelection { category: Category::Extension, .. }
        )));
    }

    #[test]
    fn exact_selection_accepts_aliases() {
        let mut session = session();
        let request = SelectionRequest {
            include: CategoryRules {
                commands: vec!["vkGetPhysicalDeviceProperties2KHR".to_string()],
                ..CategoryRules::default()
            },
            ..SelectionRequest::default()
        };
        let report = session.select(&request).expect("select");
        assert_eq!(report.matched, 1);
        assert!(!session
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::EmptySelection { .. })));
        let id = session.lookup("vkGetPhysicalDeviceProperties2").expect("command");
        assert!(session.store().get(id).expect("entity").enabled);
    }

    #[test]
    fn resolve_requires_binding() {
        let mut session = session();
        session
            .set_enabled_by_name("VK_VERSION_1_0", true)
            .expect("enable");
        let plain = Context::plain();
        assert!(matches!(
            session.resolve("vkCreateFence", &plain),
            Err(ResolveError::NotBound(_))
        ));
        session.bind_required().expect("bind");
        let resolution = session.resolve("vkCreateFence", &plain).expect("resolve");
        assert!(!resolution.variants.is_empty());
    }

    #[test]
    fn unknown_operation_is_not_an_operation() {
        let session = session();
        assert!(matches!(
            session.resolve("vkDoesNotExist", &Context::plain()),
            Err(ResolveError::NotAnOperation(_))
        ));
    }

    #[test]
    fn plan_binds_before_assembly() {
        let mut session = session();
        session
            .set_enabled_by_name("VK_VERSION_1_0", true)
            .expect("enable");
        let plan = session.plan(&Context::defaults()).expect("plan");
        assert!(plan.variant_count() > 0);
        assert_eq!(plan.api, "vulkan");
    }
}
