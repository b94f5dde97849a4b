//! # Validation Tier Tests (T0-T4)
//!
//! If ANY tier fails, the generated API cannot be trusted.
//!
//! ## Tiers
//! - T0: Registry Integrity
//! - T1: Enablement Cascade
//! - T2: Emission Order
//! - T3: Parameter Binding
//! - T4: Signature Resolution

use regen_core::signature::{BodyStrategy, ReturnType, ValueType, VariantKind};
use regen_core::{
    Category, Context, CreationCategory, Diagnostic, LengthBinding, NamingConvention,
    OperationClass, RawRegistry, RegenError, Session,
};
use serde_json::json;
use std::collections::BTreeSet;

const REGISTRY: &str = include_str!("fixtures/registry.json");

fn fixture() -> RawRegistry {
    serde_json::from_str(REGISTRY).expect("fixture")
}

fn session() -> Session {
    Session::load(&fixture(), NamingConvention::default()).expect("load")
}

fn session_with(enable: &[&str]) -> Session {
    let mut session = session();
    for name in enable {
        session.set_enabled_by_name(name, true).expect("enable");
    }
    session
}

/// Original names of every emit-eligible entity.
fn eligible(session: &Session) -> BTreeSet<String> {
    session
        .store()
        .iter()
        .filter(|e| e.is_emit_eligible())
        .map(|e| e.name.original.clone())
        .collect()
}

/// Minimal registry roots plus `entities`.
fn small(entities: serde_json::Value) -> RawRegistry {
    let mut raw: RawRegistry = serde_json::from_value(json!({
        "entities": [
            {
                "kind": "enum", "name": "VkResult",
                "values": [
                    { "name": "VK_SUCCESS", "value": "0" },
                    { "name": "VK_INCOMPLETE", "value": "5" }
                ]
            },
            { "kind": "enum", "name": "VkStructureType", "values": [] }
        ]
    }))
    .expect("roots");
    let extra: Vec<regen_core::raw::RawEntity> =
        serde_json::from_value(entities).expect("entities");
    raw.entities.extend(extra);
    raw
}

// =============================================================================
// TIER T0: REGISTRY INTEGRITY
// =============================================================================

mod t0_registry_integrity {
    use super::*;

    /// T0.1: Both spellings and aliases resolve to the same entity.
    #[test]
    fn names_and_aliases_resolve() {
        let session = session();
        let original = session.lookup("vkGetPhysicalDeviceProperties2").expect("original");
        let current = session.lookup("getPhysicalDeviceProperties2").expect("current");
        let alias = session.lookup("vkGetPhysicalDeviceProperties2KHR").expect("alias");
        assert_eq!(original, current);
        assert_eq!(original, alias);

        let entity = session.store().get(original).expect("entity");
        assert!(entity.aliases.iter().any(|a| a.original == "vkGetPhysicalDeviceProperties2KHR"));
    }

    /// T0.2: Unknown names are errors, not panics.
    #[test]
    fn unknown_name_rejected() {
        let session = session();
        assert!(matches!(
            session.lookup("vkNothing"),
            Err(RegenError::UnknownName(name)) if name == "vkNothing"
        ));
    }

    /// T0.3: Duplicate declarations abort ingestion.
    #[test]
    fn duplicate_declaration_rejected() {
        let raw = small(json!([
            { "kind": "basetype", "name": "VkFlags" },
            { "kind": "basetype", "name": "VkFlags" }
        ]));
        let err = Session::load(&raw, NamingConvention::default()).expect_err("duplicate");
        assert!(matches!(err, RegenError::DuplicateEntity(name) if name == "VkFlags"));
    }

    /// T0.4: Support follows the target API.
    #[test]
    fn support_follows_target_api() {
        let session = session();
        let supported = |name: &str| {
            let id = session.lookup(name).expect("entity");
            session.store().get(id).expect("entity").supported
        };
        assert!(supported("VK_VERSION_1_1"));
        assert!(!supported("VKSC_VERSION_1_0"));
        assert!(!supported("VK_NV_disabled"));
        // Named by an unsupported feature and a supported extension.
        assert!(supported("vkGetPipelineCacheEntriesEXT"));
    }

    /// T0.5: Platform-only entities carry the platform guard and origin.
    #[test]
    fn protect_and_origin() {
        let session = session();
        let store = session.store();
        let win32 = store
            .get(session.lookup("vkGetFenceWin32HandleKHR").expect("command"))
            .expect("entity");
        assert_eq!(win32.protect.as_deref(), Some("VK_USE_PLATFORM_WIN32_KHR"));
        assert_eq!(
            win32.origin.map(|o| store.name_of(o)).as_deref(),
            Some("VK_KHR_external_fence_win32")
        );

        let fence = store
            .get(session.lookup("vkCreateFence").expect("command"))
            .expect("entity");
        assert_eq!(fence.protect, None);
        assert_eq!(fence.origin.map(|o| store.name_of(o)).as_deref(), Some("VK_VERSION_1_0"));
    }

    /// T0.6: Commands land on the handle of their first parameter.
    #[test]
    fn command_assignment_and_handle_lifetime() {
        let session = session();
        let store = session.store();
        let device = session.lookup("VkDevice").expect("device");
        let create_fence = session.lookup("vkCreateFence").expect("command");
        let create_instance = session.lookup("vkCreateInstance").expect("command");

        let op = store.get(create_fence).expect("entity").as_operation().expect("op");
        assert_eq!(op.owner, Some(device));
        assert_eq!(op.class, OperationClass::Create);
        assert!(store.loader_commands().contains(&create_instance));

        let fence = store
            .get(session.lookup("VkFence").expect("fence"))
            .expect("entity")
            .as_handle()
            .expect("handle");
        assert_eq!(fence.creation, CreationCategory::Create);
        assert_eq!(fence.deleter, session.lookup("vkDestroyFence").ok());

        let buffers = store
            .get(session.lookup("VkCommandBuffer").expect("handle"))
            .expect("entity")
            .as_handle()
            .expect("handle");
        assert_eq!(buffers.creation, CreationCategory::Allocate);
        assert_eq!(buffers.second_owner, session.lookup("VkCommandPool").ok());
    }
}

// =============================================================================
// TIER T1: ENABLEMENT CASCADE
// =============================================================================

mod t1_enablement_cascade {
    use super::*;

    /// T1.1: Enabling a feature enables everything it requires.
    #[test]
    fn feature_enables_requirements() {
        let session = session_with(&["VK_VERSION_1_1"]);
        for name in ["VK_VERSION_1_0", "vkCreateFence", "VkFenceCreateInfo", "VkDevice"] {
            let id = session.lookup(name).expect("entity");
            assert!(
                session.store().get(id).expect("entity").is_emit_eligible(),
                "{name} not eligible"
            );
        }
    }

    /// T1.2: A shared feature survives while another bundle needs it.
    #[test]
    fn shared_dependency_survives_toggle() {
        let mut session = session_with(&["VK_KHR_swapchain"]);
        session.set_enabled_by_name("VK_VERSION_1_1", true).expect("enable F2");
        session.set_enabled_by_name("VK_KHR_swapchain", false).expect("disable X");

        let store = session.store();
        let core = store.get(session.lookup("VK_VERSION_1_0").expect("F1")).expect("entity");
        assert!(core.enabled);
        assert!(core.is_emit_eligible());

        for name in ["VkSwapchainKHR", "vkCreateSwapchainKHR", "vkDestroySwapchainKHR"] {
            let entity = store.get(session.lookup(name).expect("entity")).expect("entity");
            assert!(!entity.is_emit_eligible(), "{name} still eligible");
        }
        let device = store.get(session.lookup("VkDevice").expect("handle")).expect("entity");
        assert!(device.is_emit_eligible());
    }

    /// T1.3: Enabling then disabling a bundle restores the eligible set.
    #[test]
    fn toggle_restores_eligibility() {
        for bundle in [
            "VK_VERSION_1_0",
            "VK_VERSION_1_1",
            "VK_KHR_swapchain",
            "VK_KHR_external_fence_win32",
        ] {
            let mut session = session();
            let before = eligible(&session);
            session.set_enabled_by_name(bundle, true).expect("enable");
            assert!(eligible(&session).len() > before.len(), "{bundle} enabled nothing");
            session.set_enabled_by_name(bundle, false).expect("disable");
            assert_eq!(eligible(&session), before, "{bundle} left entities behind");
        }
    }

    /// T1.4: Handles and their deleters do not hold each other alive.
    #[test]
    fn handles_release_their_deleters() {
        let session = session_with(&["VK_VERSION_1_0"]);
        let store = session.store();
        let fence = session.lookup("VkFence").expect("handle");
        let destroy = session.lookup("vkDestroyFence").expect("deleter");
        let create = session.lookup("vkCreateFence").expect("constructor");

        assert!(!store.get(fence).expect("entity").dependencies.contains(&destroy));
        assert!(store.get(create).expect("entity").dependencies.contains(&destroy));
        assert!(store.get(destroy).expect("entity").dependencies.contains(&fence));
    }

    /// T1.5: The cascade skips unsupported entities.
    #[test]
    fn unsupported_bundles_stay_off() {
        let mut session = session();
        let report = session
            .set_enabled_by_name("VKSC_VERSION_1_0", true)
            .expect("enable");
        let id = session.lookup("VKSC_VERSION_1_0").expect("feature");
        assert_eq!(report.skipped_unsupported, vec![id]);
        assert!(report.enabled.is_empty());
        assert!(!session.store().get(id).expect("entity").is_emit_eligible());
    }

    /// T1.6: Metrics reflect the cascade.
    #[test]
    fn metrics_track_enablement() {
        let before = session().metrics().get(Category::Command);
        let after = session_with(&["VK_VERSION_1_0"]).metrics().get(Category::Command);
        assert_eq!(before.emit_eligible, 0);
        assert_eq!(after.total, before.total);
        assert!(after.emit_eligible > 10);
        assert!(after.enabled <= after.emit_eligible);
    }
}

// =============================================================================
// TIER T2: EMISSION ORDER
// =============================================================================

mod t2_emission_order {
    use super::*;
    use regen_core::{CategoryRules, SelectionRequest};

    fn all_structs() -> SelectionRequest {
        SelectionRequest {
            include: CategoryRules {
                structs: vec!["all".to_string()],
                ..CategoryRules::default()
            },
            ..SelectionRequest::default()
        }
    }

    /// T2.1: Member types are emitted before the records using them.
    #[test]
    fn records_follow_member_types() {
        let raw = small(json!([
            {
                "kind": "struct", "name": "VkRect2D",
                "members": [
                    { "name": "offset", "type": "VkOffset2D" },
                    { "name": "extent", "type": "VkExtent2D" }
                ]
            },
            { "kind": "struct", "name": "VkOffset2D", "members": [ { "name": "x", "type": "int32_t" } ] },
            { "kind": "struct", "name": "VkExtent2D", "members": [ { "name": "width", "type": "uint32_t" } ] }
        ]));
        let mut session = Session::load(&raw, NamingConvention::default()).expect("load");
        session.select(&all_structs()).expect("select");
        let plan = session.plan(&[Context::plain()]).expect("plan");

        let names: Vec<&str> = plan.records.iter().map(|r| r.entry.original.as_str()).collect();
        let at = |n: &str| names.iter().position(|x| *x == n).expect("record");
        assert!(at("VkOffset2D") < at("VkRect2D"));
        assert!(at("VkExtent2D") < at("VkRect2D"));
        assert!(!plan.diagnostics.has_cycles());
    }

    /// T2.2: A reference cycle is reported once, and its members still emitted.
    #[test]
    fn cycles_are_reported_not_fatal() {
        let raw = small(json!([
            { "kind": "struct", "name": "VkNodeA", "members": [ { "name": "pB", "type": "VkNodeB", "pointers": 1 } ] },
            { "kind": "struct", "name": "VkNodeB", "members": [ { "name": "pA", "type": "VkNodeA", "pointers": 1 } ] },
            { "kind": "struct", "name": "VkLeaf", "members": [ { "name": "value", "type": "uint32_t" } ] }
        ]));
        let mut session = Session::load(&raw, NamingConvention::default()).expect("load");
        session.select(&all_structs()).expect("select");
        let plan = session.plan(&[Context::plain()]).expect("plan");

        let cycles: Vec<&Diagnostic> = plan
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::CycleDetected { .. }))
            .collect();
        assert_eq!(cycles.len(), 1);
        if let Diagnostic::CycleDetected { partition, entities } = cycles[0] {
            assert_eq!(partition, "records");
            assert_eq!(entities.len(), 2);
        }
        assert_eq!(plan.records.len(), 3);
        assert_eq!(plan.records[0].entry.original, "VkLeaf");
    }

    /// T2.3: Handles follow the handles their operations take.
    #[test]
    fn handles_follow_parameter_handles() {
        let mut session = session_with(&["VK_VERSION_1_0", "VK_KHR_swapchain"]);
        let plan = session.plan(&Context::defaults()).expect("plan");
        let names: Vec<&str> = plan.handles.iter().map(|h| h.entry.original.as_str()).collect();
        let at = |n: &str| names.iter().position(|x| *x == n).expect("handle");
        // vkCreateGraphicsPipelines on VkDevice takes a VkPipelineCache.
        assert!(at("VkPipelineCache") < at("VkDevice"));
        // vkFreeCommandBuffers takes the pool.
        assert!(at("VkCommandPool") < at("VkDevice"));
        assert!(at("VkImage") < at("VkDevice"));
    }

    /// T2.4: Two runs give the same order.
    #[test]
    fn order_is_reproducible() {
        let first = session_with(&["VK_VERSION_1_1"]).plan(&Context::defaults()).expect("plan");
        let second = session_with(&["VK_VERSION_1_1"]).plan(&Context::defaults()).expect("plan");
        assert_eq!(first, second);
    }
}

// =============================================================================
// TIER T3: PARAMETER BINDING
// =============================================================================

mod t3_parameter_binding {
    use super::*;

    fn bound(session: &Session, name: &str) -> regen_core::entity::Operation {
        let id = session.lookup(name).expect("command");
        session
            .store()
            .get(id)
            .expect("entity")
            .as_operation()
            .expect("operation")
            .clone()
    }

    /// T3.1: Arrays sharing a count bind to the same length parameter.
    #[test]
    fn shared_count_binds_both_arrays() {
        let mut session = session_with(&["VK_VERSION_1_0"]);
        session.bind_required().expect("bind");
        let op = bound(&session, "vkCreateGraphicsPipelines");
        assert!(op.bound);
        assert_eq!(op.params[2].sizes.iter().copied().collect::<Vec<_>>(), vec![3, 5]);
        assert_eq!(op.params[3].length, Some(LengthBinding::Param(2)));
        assert_eq!(op.params[5].length, Some(LengthBinding::Param(2)));
    }

    /// T3.2: Struct member lengths bind through the struct parameter.
    #[test]
    fn member_length_binding() {
        let mut session = session_with(&["VK_VERSION_1_0"]);
        session.bind_required().expect("bind");
        let op = bound(&session, "vkAllocateCommandBuffers");
        assert_eq!(
            op.params[2].length,
            Some(LengthBinding::Member {
                param: 1,
                member: "commandBufferCount".to_string()
            })
        );
    }

    /// T3.3: Only emit-eligible operations are bound.
    #[test]
    fn disabled_operations_stay_unbound() {
        let mut session = session_with(&["VK_VERSION_1_0"]);
        let report = session.bind_required().expect("bind");
        assert!(report.bound > 0);
        assert!(!bound(&session, "vkGetSwapchainImagesKHR").bound);

        let again = session.bind_required().expect("rebind");
        assert_eq!(again.bound, 0);
    }

    /// T3.4: An unresolvable length is a diagnostic.
    #[test]
    fn unknown_length_is_reported() {
        let raw = small(json!([
            {
                "kind": "command", "name": "vkBroken",
                "params": [ { "name": "pData", "type": "uint32_t", "pointers": 1, "is_const": true, "len": "dataCount" } ]
            }
        ]));
        let mut session = Session::load(&raw, NamingConvention::default()).expect("load");
        session.set_enabled_by_name("vkBroken", true).expect("enable");
        let report = session.bind_required().expect("bind");
        assert_eq!(report.failures, 1);
        assert!(session.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::BindingFailure { operation, len, .. } if operation == "vkBroken" && len == "dataCount"
        )));
    }
}

// =============================================================================
// TIER T4: SIGNATURE RESOLUTION
// =============================================================================

mod t4_signature_resolution {
    use super::*;

    fn enumerate_widgets(success: &[&str]) -> Session {
        let raw = small(json!([
            { "kind": "handle", "name": "VkGadget" },
            { "kind": "struct", "name": "VkWidget", "returned_only": true, "members": [ { "name": "id", "type": "uint32_t" } ] },
            {
                "kind": "command", "name": "vkEnumerateWidgets", "return_type": "VkResult",
                "params": [
                    { "name": "gadget", "type": "VkGadget" },
                    { "name": "pWidgetCount", "type": "uint32_t", "pointers": 1 },
                    { "name": "pWidgets", "type": "VkWidget", "pointers": 1, "optional": true, "len": "pWidgetCount" }
                ],
                "success_codes": success
            }
        ]));
        let mut session = Session::load(&raw, NamingConvention::default()).expect("load");
        session.set_enabled_by_name("vkEnumerateWidgets", true).expect("enable");
        session.bind_required().expect("bind");
        session
    }

    fn widget() -> ReturnType {
        ReturnType::Sequence(Box::new(ReturnType::Value(ValueType {
            name: "Widget".to_string(),
            entity: None,
        })))
    }

    fn without_entities(ty: &ReturnType) -> ReturnType {
        match ty {
            ReturnType::Value(v) => ReturnType::Value(ValueType {
                name: v.name.clone(),
                entity: None,
            }),
            ReturnType::Sequence(inner) => ReturnType::Sequence(Box::new(without_entities(inner))),
            ReturnType::WithStatus(inner) => {
                ReturnType::WithStatus(Box::new(without_entities(inner)))
            }
            other => other.clone(),
        }
    }

    /// T4.1: Enumeration with an incomplete status uses the two-call idiom.
    #[test]
    fn enumeration_with_incomplete_retries() {
        let session = enumerate_widgets(&["VK_SUCCESS", "VK_INCOMPLETE"]);
        let res = session
            .resolve("vkEnumerateWidgets", &Context::plain())
            .expect("resolve");
        let bulk = res
            .variants
            .iter()
            .find(|v| v.kind == VariantKind::Bulk)
            .expect("bulk variant");
        assert!(bulk.body.retries());
        assert!(matches!(bulk.body, BodyStrategy::QueryThenFill { count: 1, .. }));
        assert_eq!(
            without_entities(&bulk.return_type),
            ReturnType::WithStatus(Box::new(widget()))
        );
    }

    /// T4.2: Without an incomplete status the same shape calls once.
    #[test]
    fn enumeration_without_incomplete_calls_once() {
        let session = enumerate_widgets(&["VK_SUCCESS"]);
        let res = session
            .resolve("vkEnumerateWidgets", &Context::plain())
            .expect("resolve");
        let bulk = res
            .variants
            .iter()
            .find(|v| v.kind == VariantKind::Bulk)
            .expect("bulk variant");
        assert!(!bulk.body.retries());
        assert!(matches!(bulk.body, BodyStrategy::SizedFill { .. }));
        assert_eq!(without_entities(&bulk.return_type), widget());
        assert!(!res.degraded.is_empty());
    }

    /// T4.3: Status pairs appear exactly when several success codes meet a value.
    #[test]
    fn variant_status_policy() {
        let mut session = session_with(&["VK_VERSION_1_1", "VK_KHR_swapchain"]);
        let plan = session.plan(&Context::defaults()).expect("plan");
        let mut checked = 0;
        for op in plan.operations() {
            let id = session.lookup(&op.entry.original).expect("operation");
            let codes = session
                .store()
                .get(id)
                .expect("entity")
                .as_operation()
                .expect("op")
                .success_codes
                .len();
            for variant in op.contexts.iter().flat_map(|c| c.variants.iter()) {
                let returns_value =
                    !matches!(variant.return_type, ReturnType::Void | ReturnType::Status);
                if codes <= 1 {
                    assert!(!variant.return_type.is_status_pair(), "{}", variant.name);
                } else if returns_value {
                    assert!(variant.return_type.is_status_pair(), "{}", variant.name);
                }
                checked += 1;
            }
        }
        assert!(checked > 20);
    }

    /// T4.4: Raii contexts own the handle; destructors disappear.
    #[test]
    fn raii_context_owns_handles() {
        let mut session = session_with(&["VK_VERSION_1_0"]);
        session.bind_required().expect("bind");
        let raii = Context::raii();
        let destroy = session.resolve("vkDestroyFence", &raii).expect("resolve");
        assert!(destroy.variants.is_empty());

        let create = session.resolve("vkCreateFence", &raii).expect("resolve");
        assert!(!create.variants.is_empty());
        assert!(create
            .variants
            .iter()
            .all(|v| matches!(v.return_type, ReturnType::Owning(_))));
    }

    /// T4.5: Infeasible resolutions become diagnostics.
    #[test]
    fn infeasible_operation_is_a_diagnostic() {
        let raw = small(json!([
            { "kind": "command", "name": "vkNoParams" }
        ]));
        let mut session = Session::load(&raw, NamingConvention::default()).expect("load");
        session.set_enabled_by_name("vkNoParams", true).expect("enable");
        let plan = session.plan(&[Context::plain()]).expect("plan");

        let op = plan.operation("vkNoParams").expect("planned");
        assert!(op.contexts.is_empty());
        assert!(plan.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ResolutionInfeasible { operation, context, .. }
                if operation == "vkNoParams" && context == "plain"
        )));
    }

    /// T4.6: Loader-scope operations are free functions.
    #[test]
    fn loader_operations_are_static() {
        let mut session = session_with(&["VK_VERSION_1_0"]);
        let plan = session.plan(&[Context::plain()]).expect("plan");
        let create = plan
            .loader
            .iter()
            .find(|op| op.entry.original == "vkCreateInstance")
            .expect("loader op");
        let variants = create.variants("plain").expect("resolved");
        assert!(variants.iter().all(|v| v.is_static));
    }
}
