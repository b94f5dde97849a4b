//! # Naming Convention
//!
//! Maps registry spellings to the curated spellings of the generated API.
//!
//! - Types: `VkPhysicalDevice` -> `PhysicalDevice`
//! - Commands: `vkCreateBuffer` -> `createBuffer`
//! - Enum values: `VK_STRUCTURE_TYPE_APPLICATION_INFO` -> `eApplicationInfo`
//! - Parameters: `pCreateInfo` -> `createInfo`
//!
//! The convention also names the handful of registry entities the engine
//! treats specially (status enum, type-tag enum, allocator type).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Registry-specific naming rules and well-known entity names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    /// API name features and extensions must list to be supported.
    pub api: String,
    /// Namespace of the generated API.
    pub namespace: String,
    /// Prefix of command names.
    pub command_prefix: String,
    /// Prefix of type names.
    pub type_prefix: String,
    /// Prefix of constants and enum values.
    pub constant_prefix: String,
    /// Status enum returned by fallible commands.
    pub status_enum: String,
    /// Enum tagging extensible records with their structure type.
    pub type_tag_enum: String,
    /// Status value reporting plain success.
    pub success_status: String,
    /// Status value reporting a partially filled enumeration.
    pub incomplete_status: String,
    /// Allocation callbacks record passed to create/destroy commands.
    pub allocator_type: String,
    /// Self-referencing base header records exempt from record scheduling.
    pub base_header: Vec<String>,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            api: "vulkan".to_string(),
            namespace: "vk".to_string(),
            command_prefix: "vk".to_string(),
            type_prefix: "Vk".to_string(),
            constant_prefix: "VK_".to_string(),
            status_enum: "VkResult".to_string(),
            type_tag_enum: "VkStructureType".to_string(),
            success_status: "VK_SUCCESS".to_string(),
            incomplete_status: "VK_INCOMPLETE".to_string(),
            allocator_type: "VkAllocationCallbacks".to_string(),
            base_header: vec![
                "VkBaseInStructure".to_string(),
                "VkBaseOutStructure".to_string(),
            ],
        }
    }
}

impl NamingConvention {
    /// Curated spelling of a type name.
    #[must_use]
    pub fn type_name(&self, original: &str) -> String {
        match strip_word_prefix(original, &self.type_prefix) {
            Some(rest) => rest.to_string(),
            None => original.to_string(),
        }
    }

    /// Curated spelling of a command name.
    #[must_use]
    pub fn command_name(&self, original: &str) -> String {
        match strip_word_prefix(original, &self.command_prefix) {
            Some(rest) => lower_first(rest),
            None => original.to_string(),
        }
    }

    /// Command name with the prefix removed but capitalization kept.
    ///
    /// Used for classification: `vkEnumeratePhysicalDevices` -> `EnumeratePhysicalDevices`.
    #[must_use]
    pub fn command_stem<'a>(&self, original: &'a str) -> &'a str {
        strip_word_prefix(original, &self.command_prefix).unwrap_or(original)
    }

    /// Curated spelling of a parameter name (Hungarian pointer prefix removed).
    #[must_use]
    pub fn param_name(&self, original: &str) -> String {
        let stripped = original.trim_start_matches('p');
        let starts_upper = stripped.chars().next().is_some_and(char::is_uppercase);
        if starts_upper && stripped.len() < original.len() {
            lower_first(stripped)
        } else {
            original.to_string()
        }
    }

    /// Curated spelling of an enum value.
    ///
    /// The enum's own prefix is removed, a vendor tag equal to the enum's
    /// tag is dropped, and `_BIT` is removed from flag bits.
    #[must_use]
    pub fn enum_value_name(
        &self,
        value: &str,
        enum_original: &str,
        tags: &BTreeSet<String>,
    ) -> String {
        let body = value.strip_prefix(&self.constant_prefix).unwrap_or(value);

        let enum_stem = self.type_name(enum_original);
        let (enum_base, enum_tag) = split_tag(&enum_stem, tags);
        let is_flag_bits = enum_base.contains("FlagBits");
        let enum_base = enum_base.replacen("FlagBits", "", 1);
        let enum_prefix = format!("{}_", upper_snake(&enum_base));
        let body = body.strip_prefix(enum_prefix.as_str()).unwrap_or(body);

        let (body, value_tag) = split_upper_tag(body, tags);
        let body = if is_flag_bits {
            body.strip_suffix("_BIT").unwrap_or(body)
        } else {
            body
        };

        let mut result = String::from("e");
        for word in body.split('_').filter(|w| !w.is_empty()) {
            if word.starts_with(|c: char| c.is_ascii_digit()) {
                result.push_str(word);
            } else {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    result.push(first.to_ascii_uppercase());
                    result.extend(chars.map(|c| c.to_ascii_lowercase()));
                }
            }
        }
        if let Some(tag) = value_tag {
            if enum_tag != Some(tag) {
                result.push_str(tag);
            }
        }
        result
    }
}

// =============================================================================
// SPELLING HELPERS
// =============================================================================

/// Strip `prefix` only when it is followed by an uppercase letter.
fn strip_word_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    if rest.chars().next().is_some_and(char::is_uppercase) {
        Some(rest)
    } else {
        None
    }
}

/// Lowercase the first character.
#[must_use]
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `StructureType` -> `STRUCTURE_TYPE`.
#[must_use]
pub fn upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.push(c.to_ascii_uppercase());
    }
    out
}

/// Split a trailing vendor tag off a CamelCase name: `SwapchainKHR` -> (`Swapchain`, `KHR`).
#[must_use]
pub fn split_tag<'a>(name: &'a str, tags: &'a BTreeSet<String>) -> (&'a str, Option<&'a str>) {
    let mut best: Option<&str> = None;
    for tag in tags {
        if let Some(base) = name.strip_suffix(tag.as_str()) {
            let boundary = base.chars().last().is_some_and(|c| !c.is_uppercase());
            if boundary && best.is_none_or(|b| tag.len() > b.len()) {
                best = Some(tag.as_str());
            }
        }
    }
    match best {
        Some(tag) => (&name[..name.len() - tag.len()], Some(tag)),
        None => (name, None),
    }
}

/// Split a trailing `_TAG` off an UPPER_SNAKE name.
fn split_upper_tag<'a>(name: &'a str, tags: &'a BTreeSet<String>) -> (&'a str, Option<&'a str>) {
    for tag in tags {
        if let Some(base) = name.strip_suffix(tag.as_str()) {
            if let Some(base) = base.strip_suffix('_') {
                return (base, Some(tag.as_str()));
            }
        }
    }
    (name, None)
}

/// Singular form of a call name: `createGraphicsPipelines` -> `createGraphicsPipeline`.
///
/// A trailing vendor tag is preserved: `createSharedSwapchainsKHR` -> `createSharedSwapchainKHR`.
#[must_use]
pub fn singular(name: &str, tags: &BTreeSet<String>) -> String {
    let (base, tag) = split_tag(name, tags);
    let base = if let Some(stem) = base.strip_suffix("ies") {
        format!("{stem}y")
    } else if base.ends_with("ss") {
        base.to_string()
    } else {
        base.strip_suffix('s').unwrap_or(base).to_string()
    };
    format!("{}{}", base, tag.unwrap_or(""))
}

// =============================================================================
// TESTS
// =============================================================================
