//! # Raw Registry Records
//!
//! The already-tokenized registry handed over by the (external) document
//! reader. These records are plain data: names are unresolved strings and
//! nothing is validated until [`crate::ingestor::Ingestor`] consumes them.

use serde::{Deserialize, Serialize};

/// A flat, tokenized registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRegistry {
    /// Vendor tags (`KHR`, `EXT`, ...).
    pub tags: Vec<String>,
    pub platforms: Vec<RawPlatform>,
    /// Types, values, commands and aliases in declaration order.
    pub entities: Vec<RawEntity>,
    pub features: Vec<RawFeature>,
    pub extensions: Vec<RawExtension>,
}

/// A platform and the preprocessor guard protecting its declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlatform {
    pub name: String,
    pub protect: String,
}

/// One declared registry item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawEntity {
    Basetype(RawNamed),
    /// Type provided by a platform header.
    External(RawNamed),
    Handle(RawHandle),
    Struct(RawStruct),
    Enum(RawEnum),
    Bitmask(RawBitmask),
    /// Value added to an existing enum by an extension.
    EnumValue(RawEnumValue),
    Command(RawCommand),
    Alias(RawAlias),
}

impl RawEntity {
    /// Registry spelling of the declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Basetype(raw) | Self::External(raw) => &raw.name,
            Self::Handle(raw) => &raw.name,
            Self::Struct(raw) => &raw.name,
            Self::Enum(raw) => &raw.name,
            Self::Bitmask(raw) => &raw.name,
            Self::EnumValue(raw) => &raw.name,
            Self::Command(raw) => &raw.name,
            Self::Alias(raw) => &raw.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNamed {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHandle {
    pub name: String,
    /// Owning handle type; `None` for top-level handles.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_true")]
    pub dispatchable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStruct {
    pub name: String,
    #[serde(default)]
    pub members: Vec<RawField>,
    #[serde(default)]
    pub is_union: bool,
    #[serde(default)]
    pub returned_only: bool,
    /// Records this one may be chained onto.
    #[serde(default)]
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnum {
    pub name: String,
    #[serde(default)]
    pub values: Vec<RawEnumerant>,
    #[serde(default)]
    pub bitmask: bool,
}

/// A value declared inside its enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnumerant {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBitmask {
    pub name: String,
    /// The `FlagBits` enum providing the bit values.
    #[serde(default)]
    pub bits: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnumValue {
    pub name: String,
    pub extends: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommand {
    pub name: String,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(default)]
    pub params: Vec<RawField>,
    #[serde(default)]
    pub success_codes: Vec<String>,
    #[serde(default)]
    pub error_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlias {
    pub name: String,
    pub target: String,
}

/// A command parameter or record member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub pointers: u8,
    pub is_const: bool,
    pub optional: bool,
    /// Raw `len` attribute (`"pCount"`, `"null-terminated"`, `"pInfo->count"`).
    pub len: Option<String>,
    pub fixed_len: Option<String>,
    /// Default values, i.e. the structure type tag of `sType`.
    pub values: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFeature {
    pub name: String,
    /// APIs this feature belongs to.
    pub api: Vec<String>,
    pub number: String,
    /// Features this one builds on.
    pub depends: Vec<String>,
    pub requires: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawExtension {
    pub name: String,
    pub number: u32,
    /// APIs this extension supports; `"disabled"` never matches.
    pub supported: Vec<String>,
    pub depends: Vec<String>,
    pub platform: Option<String>,
    pub promoted_to: Option<String>,
    pub requires: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_return_type() -> String {
    "void".to_string()
}
