//! In-memory recording store.
//!
//! Holds descriptor lists plus raw sample buffers and serves the slice-read
//! primitive with plain index arithmetic. The whole store (de)serializes with
//! serde, so synthetic recordings can be kept as JSON files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    ArrayDescriptor, MultiTagDescriptor, RecordingStore, StoreInfo, TagDescriptor,
};
use crate::metadata::MetadataTree;
use crate::{Error, Result};

/// In-memory implementation of [`RecordingStore`].
///
/// # Example
///
/// ```rust
/// use reprolink::store::{ArrayDescriptor, MemoryStore, StoreInfo};
///
/// let mut store = MemoryStore::new(StoreInfo::new("2024-01-17-ab", "block-0"));
/// store.add_array(
///     ArrayDescriptor {
///         id: "da-0".to_string(),
///         name: "V-1".to_string(),
///         type_name: "relacs.data.sampled".to_string(),
///         shape: vec![4],
///         sampling_interval: Some(0.25),
///         last_timestamp: None,
///     },
///     vec![0.0, 1.0, 2.0, 3.0],
/// );
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    info: StoreInfo,
    #[serde(default)]
    tags: Vec<TagDescriptor>,
    #[serde(default)]
    multi_tags: Vec<MultiTagDescriptor>,
    #[serde(default)]
    arrays: Vec<ArrayDescriptor>,
    /// array name → raw samples or event timestamps
    #[serde(default)]
    buffers: BTreeMap<String, Vec<f64>>,
    /// tag id → feature name → one row per occurrence
    #[serde(default)]
    features: BTreeMap<String, BTreeMap<String, Vec<Vec<f64>>>>,
    /// block or tag id → metadata tree
    #[serde(default)]
    metadata: BTreeMap<String, MetadataTree>,
}

impl MemoryStore {
    /// New empty store with the given identity.
    #[must_use]
    pub fn new(info: StoreInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    /// Load a store from a JSON file.
    ///
    /// A missing or unreadable file is a hard error.
    ///
    /// # Errors
    /// Returns an IO error when the file cannot be opened and a JSON error
    /// when its contents do not describe a store.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("loading recording store from {}", path.display());
        let file = File::open(path)?;
        let store: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(store)
    }

    /// Register a single-interval tag.
    pub fn add_tag(&mut self, tag: TagDescriptor) {
        self.tags.push(tag);
    }

    /// Register a multi-occurrence tag.
    pub fn add_multi_tag(&mut self, tag: MultiTagDescriptor) {
        self.multi_tags.push(tag);
    }

    /// Register a data array together with its raw buffer.
    pub fn add_array(&mut self, descriptor: ArrayDescriptor, buffer: Vec<f64>) {
        self.buffers.insert(descriptor.name.clone(), buffer);
        self.arrays.push(descriptor);
    }

    /// Register feature rows (one row per occurrence) for a tag.
    pub fn add_feature(
        &mut self,
        tag_id: impl Into<String>,
        feature_name: impl Into<String>,
        rows: Vec<Vec<f64>>,
    ) {
        self.features
            .entry(tag_id.into())
            .or_default()
            .insert(feature_name.into(), rows);
    }

    /// Attach a metadata tree to a block or tag id.
    pub fn set_metadata(&mut self, id: impl Into<String>, tree: MetadataTree) {
        self.metadata.insert(id.into(), tree);
    }

    fn array(&self, name: &str) -> Result<&ArrayDescriptor> {
        self.arrays
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::Store(format!("unknown data array '{name}'")))
    }
}

impl RecordingStore for MemoryStore {
    fn info(&self) -> &StoreInfo {
        &self.info
    }

    fn tags(&self) -> &[TagDescriptor] {
        &self.tags
    }

    fn multi_tags(&self) -> &[MultiTagDescriptor] {
        &self.multi_tags
    }

    fn data_arrays(&self) -> &[ArrayDescriptor] {
        &self.arrays
    }

    fn metadata(&self, id: &str) -> Result<MetadataTree> {
        self.metadata
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Store(format!("no metadata recorded for id '{id}'")))
    }

    fn read_slice(&self, array_name: &str, start: f64, extent: f64) -> Result<Vec<f64>> {
        let descriptor = self.array(array_name)?;
        let buffer = self
            .buffers
            .get(array_name)
            .ok_or_else(|| Error::Store(format!("no buffer stored for array '{array_name}'")))?;
        debug!("read_slice '{array_name}' start={start} extent={extent}");

        if let Some(dt) = descriptor.sampling_interval {
            // sampled data: positions map to sample indices, clamped to the buffer
            let first = ((start / dt).round().max(0.0)) as usize;
            let count = ((extent / dt).round().max(0.0)) as usize;
            let first = first.min(buffer.len());
            let last = (first + count).min(buffer.len());
            Ok(buffer[first..last].to_vec())
        } else {
            // event data: timestamps inside the requested window
            let stop = start + extent;
            Ok(buffer
                .iter()
                .copied()
                .filter(|t| *t >= start && *t < stop)
                .collect())
        }
    }

    fn feature_data(
        &self,
        tag_id: &str,
        feature_name: &str,
        index: Option<usize>,
    ) -> Result<Vec<f64>> {
        let rows = self
            .features
            .get(tag_id)
            .and_then(|feats| feats.get(feature_name))
            .ok_or_else(|| Error::FeatureNotFound {
                name: feature_name.to_string(),
                tag: tag_id.to_string(),
            })?;
        let row = index.unwrap_or(0);
        rows.get(row).cloned().ok_or(Error::OutOfRange {
            index: row,
            count: rows.len(),
        })
    }
}
