//! # Configuration
//!
//! `regen.toml`: naming rules, the selection and the generation contexts.
//!
//! ```toml
//! registry = "registry.json"
//!
//! [naming]
//! api = "vulkan"
//! namespace = "vk"
//!
//! [selection.include]
//! features = ["all"]
//! extensions = ["VK_KHR_swapchain", "re:VK_EXT_.*"]
//!
//! [selection.exclude]
//! commands = ["vkCmdDebugMarkerBeginEXT"]
//!
//! [[context]]
//! name = "plain"
//! ```
//!
//! Every table is optional; an empty file is the default configuration.

use regen_core::{Context, NamingConvention, RegenError, SelectionRequest};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegenConfig {
    /// Registry path, relative to the working directory.
    pub registry: Option<PathBuf>,
    pub naming: NamingConvention,
    pub selection: SelectionRequest,
    #[serde(rename = "context")]
    pub contexts: Vec<Context>,
}

impl RegenConfig {
    /// Parse a configuration document.
    pub fn parse(text: &str) -> Result<Self, RegenError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| RegenError::DeserializationError(format!("regen.toml: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, RegenError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            RegenError::IoError(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(RegenError::IoError(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| RegenError::IoError(format!("Read config: {e}")))?;
        let config = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), contexts = config.contexts.len(), "config loaded");
        Ok(config)
    }

    /// Configured contexts, or `plain` and `raii` if none are configured.
    #[must_use]
    pub fn contexts(&self) -> Vec<Context> {
        if self.contexts.is_empty() {
            Context::defaults()
        } else {
            self.contexts.clone()
        }
    }

    /// Context named `name`.
    pub fn context(&self, name: &str) -> Result<Context, RegenError> {
        self.contexts()
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RegenError::UnknownName(format!("context '{name}'")))
    }

    fn validate(&self) -> Result<(), RegenError> {
        let mut seen = std::collections::BTreeSet::new();
        for context in &self.contexts {
            if context.name.is_empty() {
                return Err(RegenError::DeserializationError(
                    "regen.toml: context without a name".to_string(),
                ));
            }
            if !seen.insert(context.name.as_str()) {
                return Err(RegenError::DuplicateEntity(format!(
                    "context '{}'",
                    context.name
                )));
            }
        }
        Ok(())
    }
}
