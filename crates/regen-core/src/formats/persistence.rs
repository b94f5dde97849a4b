//! # Plan Persistence Format
//!
//! Binary serialization for generation plans.
//!
//! Format: Header (5 bytes) + postcard-serialized plan.
//! - 4 bytes: Magic ("RGPL")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::plan::GenerationPlan;
use crate::primitives;
use crate::types::RegenError;

/// Minimum valid stream size (header only).
const MIN_FILE_SIZE: usize = 5;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding every encoded plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PlanHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), RegenError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(RegenError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(RegenError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; MIN_FILE_SIZE] {
        let [a, b, c, d] = self.magic;
        [a, b, c, d, self.version]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RegenError> {
        match bytes {
            [a, b, c, d, version, ..] => Ok(Self {
                magic: [*a, *b, *c, *d],
                version: *version,
            }),
            _ => Err(RegenError::DeserializationError(
                "Header too short".to_string(),
            )),
        }
    }
}

impl Default for PlanHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Encode a plan (header + payload).
pub fn plan_to_bytes(plan: &GenerationPlan) -> Result<Vec<u8>, RegenError> {
    let payload =
        postcard::to_stdvec(plan).map_err(|e| RegenError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(MIN_FILE_SIZE + payload.len());
    result.extend_from_slice(&PlanHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a plan.
///
/// Rejects streams shorter than the header or larger than
/// [`primitives::MAX_PLAN_PAYLOAD_SIZE`] before touching the payload.
pub fn plan_from_bytes(bytes: &[u8]) -> Result<GenerationPlan, RegenError> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(RegenError::DeserializationError(format!(
            "Data too short: minimum {MIN_FILE_SIZE} bytes required"
        )));
    }
    if bytes.len() > primitives::MAX_PLAN_PAYLOAD_SIZE {
        return Err(RegenError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            primitives::MAX_PLAN_PAYLOAD_SIZE
        )));
    }

    let header = PlanHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(MIN_FILE_SIZE..).unwrap_or_default();
    postcard::from_bytes(payload).map_err(|e| {
        RegenError::DeserializationError(format!("Failed to decode plan data: {e}"))
    })
}

// =============================================================================
// CHECKSUMS
// =============================================================================

/// Deterministic 64-bit FNV-1a checksum of an encoded plan.
///
/// Detects accidental corruption only; it is not collision resistant.
#[must_use]
pub fn plan_checksum(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// BLAKE3 hex digest of an encoded plan.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn plan_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
