//! Data segments: time-bounded, named spans with access to the recorded
//! traces.
//!
//! [`ReproRun`] and [`Stimulus`] share a common core (tag identity, time
//! window, references, features, metadata access) and differ in their read
//! policies: stimulus reads clamp the padding against the recorded delay and
//! the next stimulus boundary, run reads apply caller padding directly.

mod repro;
mod stimulus;
mod window;

pub use repro::ReproRun;
pub use stimulus::Stimulus;
pub use window::{TimeReference, TraceData};

use std::fmt;
use std::sync::Arc;

use crate::cache::SegmentCaches;
use crate::mappings::MappingVersion;
use crate::metadata::MetadataTree;
use crate::store::{FeatureDescriptor, MultiTagDescriptor, RecordingStore, TagDescriptor};
use crate::trace::TraceMap;
use crate::Result;

/// Shared handles every segment of a dataset carries.
pub(crate) struct SegmentEnv {
    pub(crate) store: Arc<dyn RecordingStore>,
    pub(crate) traces: Arc<TraceMap>,
    pub(crate) caches: Arc<SegmentCaches>,
    pub(crate) version: MappingVersion,
}

impl fmt::Debug for SegmentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentEnv")
            .field("dataset", &self.store.info().dataset)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// State common to both segment kinds.
#[derive(Debug)]
pub(crate) struct SegmentCore {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) start_time: f64,
    pub(crate) duration: f64,
    pub(crate) index: Option<usize>,
    pub(crate) references: Vec<String>,
    pub(crate) features: Vec<FeatureDescriptor>,
    pub(crate) env: Arc<SegmentEnv>,
}

impl SegmentCore {
    pub(crate) fn from_tag(tag: &TagDescriptor, env: Arc<SegmentEnv>) -> Self {
        Self {
            id: tag.id.clone(),
            name: tag.name.clone(),
            type_name: tag.type_name.clone(),
            start_time: tag.position,
            duration: tag.extent,
            index: None,
            references: tag.references.clone(),
            features: tag.features.clone(),
            env,
        }
    }

    pub(crate) fn from_multi_tag(
        tag: &MultiTagDescriptor,
        index: usize,
        env: Arc<SegmentEnv>,
    ) -> Result<Self> {
        let (start_time, duration) = tag.window(index)?;
        Ok(Self {
            id: tag.id.clone(),
            name: tag.name.clone(),
            type_name: tag.type_name.clone(),
            start_time,
            duration,
            index: Some(index),
            references: tag.references.clone(),
            features: tag.features.clone(),
            env,
        })
    }

    pub(crate) fn stop_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub(crate) fn has_reference(&self, trace_name: &str) -> bool {
        self.references.iter().any(|r| r == trace_name)
    }

    /// Base metadata of the tag, read through the dataset cache.
    pub(crate) fn metadata(&self) -> Result<MetadataTree> {
        self.env
            .caches
            .metadata_or_insert_with(&self.id, || self.env.store.metadata(&self.id))
    }

    /// Feature payload for this segment's occurrence, read through the
    /// dataset cache.
    pub(crate) fn feature_data(&self, feature_name: &str) -> Result<Vec<f64>> {
        self.env
            .caches
            .feature_or_insert_with(&self.id, feature_name, self.index, || {
                self.env
                    .store
                    .feature_data(&self.id, feature_name, self.index)
            })
    }

    /// Full name of the feature whose name contains `<tag name><suffix>`.
    pub(crate) fn find_feature(&self, suffix: &str) -> Option<&str> {
        let needle = format!("{}{suffix}", self.name);
        self.features
            .iter()
            .find(|f| f.name.contains(&needle))
            .map(|f| f.name.as_str())
    }
}

/// Common contract of a time-bounded, named, queryable span.
pub trait Segment {
    /// Tag name of the segment.
    fn name(&self) -> &str;

    /// Tag id of the segment.
    fn id(&self) -> &str;

    /// Type string of the underlying tag.
    fn type_name(&self) -> &str;

    /// Start of the tagged span in seconds of data time.
    fn start_time(&self) -> f64;

    /// Duration of the tagged span in seconds.
    fn duration(&self) -> f64;

    /// Stop of the tagged span in seconds of data time.
    fn stop_time(&self) -> f64 {
        self.start_time() + self.duration()
    }

    /// Metadata recorded for the segment.
    ///
    /// # Errors
    /// Returns an error when the store cannot produce the tree.
    fn metadata(&self) -> Result<MetadataTree>;
}
