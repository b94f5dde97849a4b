//! # Innate Primitives
//!
//! Hardcoded constants for the regen engine.
//!
//! These are compiled into the binary and are immutable at runtime.
//! Everything registry-specific (prefixes, root enums, allocator type)
//! lives in [`crate::naming::NamingConvention`] instead.

/// C and fixed-width primitive type names that never resolve to a registry
/// entity. References to these are not reported as missing.
pub const C_PRIMITIVE_TYPES: &[&str] = &[
    "void", "char", "float", "double", "int", "int8_t", "int16_t", "int32_t", "int64_t",
    "uint8_t", "uint16_t", "uint32_t", "uint64_t", "size_t",
];

/// Maximum number of alias hops followed when resolving a name.
///
/// Alias chains in real registries are one or two hops long; anything
/// deeper is treated as an alias cycle.
pub const MAX_ALIAS_DEPTH: usize = 8;

/// Magic bytes for the binary plan format header.
///
/// - File Header = Magic Bytes ("RGPL") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"RGPL";

/// Current plan serialization format version.
///
/// Increment this when making breaking changes to the plan layout.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum accepted payload for a binary plan (64 MB).
///
/// Validated before decoding so corrupted input cannot force a large
/// allocation.
pub const MAX_PLAN_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Suffix appended to the namespace for owning-wrapper call forms.
pub const RAII_NAMESPACE_SUFFIX: &str = "raii";

/// Suffix appended to a call name for unique-ownership variants.
pub const UNIQUE_SUFFIX: &str = "Unique";

/// Returns `true` if `name` is a C primitive type.
#[must_use]
pub fn is_c_primitive(name: &str) -> bool {
    C_PRIMITIVE_TYPES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"RGPL");
    }

    #[test]
    fn primitives_are_recognized() {
        assert!(is_c_primitive("uint32_t"));
        assert!(is_c_primitive("void"));
        assert!(!is_c_primitive("VkBuffer"));
    }
}
