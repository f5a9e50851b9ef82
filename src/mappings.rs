//! Type-string markers used to classify tagged entities in the store.
//!
//! The recording framework has written two generations of type strings; the
//! mapping version recorded in the file selects which marker set applies.

use serde::{Deserialize, Serialize};

/// Kinds of tagged entities the type markers distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Regularly sampled data array
    Continuous,
    /// Irregular event timestamps
    Event,
    /// Stimulus-presentation region (multi-occurrence tag)
    Stimulus,
}

/// Version of the framework-to-container mapping a file was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MappingVersion {
    /// Mapping version 1.0
    #[serde(rename = "1.0")]
    V1_0,
    /// Mapping version 1.1 (current)
    #[default]
    #[serde(rename = "1.1")]
    V1_1,
}

impl MappingVersion {
    /// Resolve the mapping version from the numeric version recorded in the file.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        if value < 1.05 {
            Self::V1_0
        } else {
            Self::V1_1
        }
    }
}

/// Type marker tagging repro-run regions, identical across mapping versions.
pub const REPRO_RUN_MARKER: &str = "relacs.repro_run";

/// Type-string marker for a given entity kind under a given mapping version.
///
/// Classification tests whether an entity's type string *contains* the
/// marker, not whether it equals it.
#[must_use]
pub const fn type_marker(version: MappingVersion, kind: DataKind) -> &'static str {
    match (version, kind) {
        (MappingVersion::V1_0, DataKind::Event) => "nix.events.position",
        (MappingVersion::V1_0, DataKind::Continuous) => "nix.data.sampled",
        (MappingVersion::V1_0, DataKind::Stimulus) => "nix.event.stimulus",
        (MappingVersion::V1_1, DataKind::Event) => "relacs.data.event",
        (MappingVersion::V1_1, DataKind::Continuous) => "relacs.data.sampled",
        (MappingVersion::V1_1, DataKind::Stimulus) => "relacs.stimulus",
    }
}
