//! Unit tests for `regen.toml` parsing.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use regen::RegenConfig;
use regen_core::{OwnershipNamespace, RegenError};
use std::io::Write;

#[test]
fn test_empty_config_is_default() {
    let config = RegenConfig::parse("").unwrap();
    assert_eq!(config, RegenConfig::default());
    assert_eq!(config.naming.api, "vulkan");
    assert!(config.registry.is_none());
}

#[test]
fn test_default_contexts_are_plain_and_raii() {
    let config = RegenConfig::default();
    let names: Vec<String> = config.contexts().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["plain".to_string(), "raii".to_string()]);

    let raii = config.context("raii").unwrap();
    assert_eq!(raii.ownership_namespace, OwnershipNamespace::Raii);
}

#[test]
fn test_full_config() {
    let text = r#"
registry = "vk.json"

[naming]
api = "vulkansc"

[selection.include]
features = ["all"]
extensions = ["VK_KHR_swapchain", "re:VK_EXT_.*"]

[selection.exclude]
commands = ["vkCmdDebugMarkerBeginEXT"]

[[context]]
name = "free"
force_static = true

[[context]]
name = "owned"
ownership_namespace = "raii"
"#;
    let config = RegenConfig::parse(text).unwrap();

    assert_eq!(config.registry.as_deref(), Some(std::path::Path::new("vk.json")));
    assert_eq!(config.naming.api, "vulkansc");
    // Unset naming fields keep their defaults.
    assert_eq!(config.naming.status_enum, "VkResult");
    assert_eq!(config.selection.include.features, vec!["all"]);
    assert_eq!(config.selection.include.extensions.len(), 2);
    assert_eq!(
        config.selection.exclude.commands,
        vec!["vkCmdDebugMarkerBeginEXT"]
    );

    let contexts = config.contexts();
    assert_eq!(contexts.len(), 2);
    assert!(contexts[0].force_static);
    assert_eq!(contexts[1].ownership_namespace, OwnershipNamespace::Raii);
    assert!(config.context("plain").is_err());
}

#[test]
fn test_unknown_fields_are_rejected() {
    let result = RegenConfig::parse("registy = \"vk.json\"");
    assert!(matches!(result, Err(RegenError::DeserializationError(_))));
}

#[test]
fn test_duplicate_context_names_are_rejected() {
    let text = r#"
[[context]]
name = "plain"

[[context]]
name = "plain"
"#;
    let result = RegenConfig::parse(text);
    assert!(matches!(result, Err(RegenError::DuplicateEntity(_))));
}

#[test]
fn test_empty_context_name_is_rejected() {
    let text = r#"
[[context]]
name = ""
"#;
    assert!(RegenConfig::parse(text).is_err());
}

#[test]
fn test_unknown_context_lookup() {
    let config = RegenConfig::default();
    assert!(matches!(
        config.context("nope"),
        Err(RegenError::UnknownName(_))
    ));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "registry = \"registry.json\"").unwrap();
    let config = RegenConfig::load(file.path()).unwrap();
    assert!(config.registry.is_some());
}

#[test]
fn test_load_rejects_oversized_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let padding = "#".repeat(2 * 1024 * 1024);
    writeln!(file, "{padding}").unwrap();
    assert!(matches!(
        RegenConfig::load(file.path()),
        Err(RegenError::IoError(_))
    ));
}
