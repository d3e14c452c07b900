//! Versioned serialization contract for [`GoalGenome`].
//!
//! The wire form is UTF-8 JSON carrying a top-level `schema_version`.
//! Decoding is all-or-nothing: the version is probed first, then the whole
//! payload is parsed strictly, then the invariant set is checked. Any
//! failure rejects the payload without partial recovery.

use std::ops::RangeInclusive;

use crate::error::{ModelError, ModelResult, PayloadPosition};
use crate::genome::GoalGenome;

/// Version written by [`serialize`].
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Oldest version [`deserialize`] accepts.
pub const MIN_SUPPORTED_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_FIELD: &str = "schema_version";

pub fn supported_schema_versions() -> RangeInclusive<u32> {
    MIN_SUPPORTED_SCHEMA_VERSION..=CURRENT_SCHEMA_VERSION
}

/// Encode a genome.
pub fn serialize(genome: &GoalGenome) -> ModelResult<Vec<u8>> {
    serde_json::to_vec(genome).map_err(|e| ModelError::Serialization(e.to_string()))
}

/// Decode a genome, rejecting unknown versions and malformed payloads.
pub fn deserialize(bytes: &[u8]) -> ModelResult<GoalGenome> {
    let probe: serde_json::Value = serde_json::from_slice(bytes).map_err(malformed)?;

    let version = match probe.get(SCHEMA_VERSION_FIELD) {
        None => {
            return Err(ModelError::MalformedPayload {
                position: None,
                message: format!("missing field `{SCHEMA_VERSION_FIELD}`"),
            })
        }
        Some(v) => v.as_u64().ok_or_else(|| ModelError::MalformedPayload {
            position: None,
            message: format!("`{SCHEMA_VERSION_FIELD}` must be a non-negative integer, got {v}"),
        })?,
    };

    let supported = supported_schema_versions();
    let known = u32::try_from(version)
        .map(|v| supported.contains(&v))
        .unwrap_or(false);
    if !known {
        return Err(ModelError::UnknownSchemaVersion {
            found: version,
            min_supported: *supported.start(),
            max_supported: *supported.end(),
        });
    }

    let genome: GoalGenome = serde_json::from_slice(bytes).map_err(malformed)?;
    genome.validate()?;
    Ok(genome)
}

fn malformed(err: serde_json::Error) -> ModelError {
    let position = (err.line() > 0).then(|| PayloadPosition {
        line: err.line(),
        column: err.column(),
    });
    ModelError::MalformedPayload {
        position,
        message: err.to_string(),
    }
}
