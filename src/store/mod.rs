//! Store boundary: the opaque hierarchical container the dataset reads from.
//!
//! The container format itself is out of scope; everything the engine needs
//! is expressed through [`RecordingStore`]: descriptor lists for tagged
//! regions and data arrays, a metadata tree walk, a slice-read primitive and
//! per-occurrence feature data. [`MemoryStore`] is the bundled in-memory
//! implementation, loadable from JSON.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mappings::MappingVersion;
use crate::metadata::MetadataTree;
use crate::{Error, Result};

/// Identity of a store: dataset name, containing block and mapping version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    /// Dataset name (file name without path)
    pub dataset: String,
    /// Id of the block holding the tagged regions
    pub block_id: String,
    /// Mapping version the file was written with
    #[serde(default)]
    pub mapping_version: MappingVersion,
    /// Creation timestamp of the recording, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for StoreInfo {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl StoreInfo {
    /// New store identity with the current mapping version and no timestamp.
    #[must_use]
    pub fn new(dataset: impl Into<String>, block_id: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            block_id: block_id.into(),
            mapping_version: MappingVersion::default(),
            created_at: None,
        }
    }
}

/// Side-channel per-occurrence data recorded next to a tagged region.
///
/// Features whose type string marks them as mutable override base metadata
/// per occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Full feature name, prefixed with the owning tag's name
    pub name: String,
    /// Type string of the feature data
    pub type_name: String,
    /// Physical unit of the feature values, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl FeatureDescriptor {
    /// True for features that override base metadata per occurrence.
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.type_name.contains("mutable")
    }
}

/// A single-interval tagged region (one protocol run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDescriptor {
    /// Unique tag id
    pub id: String,
    /// Tag name
    pub name: String,
    /// Type string, matched against the run marker
    pub type_name: String,
    /// Start of the tagged span in trace-native time
    pub position: f64,
    /// Extent of the tagged span
    #[serde(default)]
    pub extent: f64,
    /// Names of the data arrays this tag references
    #[serde(default)]
    pub references: Vec<String>,
    /// Recorded features
    #[serde(default)]
    pub features: Vec<FeatureDescriptor>,
}

/// A multi-occurrence tagged region (one stimulus tag, N presentations).
///
/// `positions` and `extents` are parallel; a missing extent means zero
/// duration for that occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTagDescriptor {
    /// Unique tag id
    pub id: String,
    /// Tag name
    pub name: String,
    /// Type string, matched against the stimulus marker
    pub type_name: String,
    /// Start of each occurrence
    pub positions: Vec<f64>,
    /// Extent of each occurrence
    #[serde(default)]
    pub extents: Vec<f64>,
    /// Names of the data arrays this tag references
    #[serde(default)]
    pub references: Vec<String>,
    /// Recorded features
    #[serde(default)]
    pub features: Vec<FeatureDescriptor>,
}

impl MultiTagDescriptor {
    /// Number of occurrences.
    #[must_use]
    pub fn occurrence_count(&self) -> usize {
        self.positions.len()
    }

    /// Start time and duration of one occurrence.
    ///
    /// # Errors
    /// Returns [`Error::OutOfRange`] for an invalid occurrence index.
    pub fn window(&self, index: usize) -> Result<(f64, f64)> {
        let start = *self.positions.get(index).ok_or(Error::OutOfRange {
            index,
            count: self.positions.len(),
        })?;
        let extent = self.extents.get(index).copied().unwrap_or(0.0);
        Ok((start, extent))
    }
}

/// A stored data array: continuously sampled signal or event timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    /// Unique array id
    pub id: String,
    /// Array name, referenced by tags
    pub name: String,
    /// Type string, matched against the continuous/event markers
    pub type_name: String,
    /// Array shape
    pub shape: Vec<usize>,
    /// Sampling interval in seconds (continuous arrays only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_interval: Option<f64>,
    /// Last recorded timestamp (event arrays only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<f64>,
}

/// Read access to one recording container.
///
/// Implementations are synchronous; all engine suspension points are plain
/// blocking reads through this trait. Descriptor lists preserve the store's
/// scan order.
pub trait RecordingStore: Send + Sync {
    /// Store identity.
    fn info(&self) -> &StoreInfo;

    /// Single-interval tags of the first block, in scan order.
    fn tags(&self) -> &[TagDescriptor];

    /// Multi-occurrence tags of the first block, in scan order.
    fn multi_tags(&self) -> &[MultiTagDescriptor];

    /// Data arrays of the first block, in scan order.
    fn data_arrays(&self) -> &[ArrayDescriptor];

    /// Metadata tree of a tag, or of the block itself when given the block id.
    ///
    /// # Errors
    /// Returns an error when the id is unknown.
    fn metadata(&self, id: &str) -> Result<MetadataTree>;

    /// Read samples (continuous) or timestamps (event) over
    /// `[start, start + extent)` in trace-native time.
    ///
    /// # Errors
    /// Returns an error when the array is unknown or unreadable.
    fn read_slice(&self, array_name: &str, start: f64, extent: f64) -> Result<Vec<f64>>;

    /// Feature payload for one tag; `index` selects the occurrence for
    /// multi-occurrence tags and must be `None` for single tags.
    ///
    /// # Errors
    /// Returns an error when tag or feature are unknown, or the occurrence
    /// index is out of range.
    fn feature_data(&self, tag_id: &str, feature_name: &str, index: Option<usize>)
        -> Result<Vec<f64>>;
}
