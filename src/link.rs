//! Data links: flat descriptors that uniquely locate a data segment.
//!
//! A link carries everything needed to find a repro run or stimulus
//! presentation again — dataset, block and tag ids, kind, exact time span,
//! the valid padding bounds and the serialized metadata. Collections of
//! links round-trip through JSON rows.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::mappings::MappingVersion;
use crate::store::RecordingStore;
use crate::trace::{DataTrace, TraceKind};
use crate::{Error, Result};

/// Kind of segment a link points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// A full protocol run
    ReproRun,
    /// A single stimulus presentation
    StimulusSegment,
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReproRun => write!(f, "ReproRun"),
            Self::StimulusSegment => write!(f, "StimulusSegment"),
        }
    }
}

/// Everything needed to uniquely identify a data segment and read it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLink {
    /// Dataset name, without path information
    pub dataset: String,
    /// Id of the block containing the segment
    pub block_id: String,
    /// Id of the tag (or multi-occurrence tag) marking the segment
    pub tag_id: String,
    /// Whether this links a repro run or a stimulus presentation
    pub kind: SegmentKind,
    /// Segment start in data time
    pub start_time: f64,
    /// Segment stop in data time
    pub stop_time: f64,
    /// Occurrence index, stimulus links only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Maximum readable time before segment start
    #[serde(default)]
    pub max_before: f64,
    /// Maximum readable time after segment stop
    #[serde(default)]
    pub max_after: f64,
    /// Serialized metadata of the segment, if exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// Mapping version of the source file
    #[serde(default)]
    pub mapping_version: MappingVersion,
}

impl DataLink {
    /// New link descriptor.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLink`] when `stop_time <= start_time`; such a
    /// segment cannot be relocated.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dataset: &str,
        block_id: &str,
        tag_id: &str,
        kind: SegmentKind,
        start_time: f64,
        stop_time: f64,
        index: Option<usize>,
        max_before: f64,
        max_after: f64,
        metadata: Option<String>,
        mapping_version: MappingVersion,
    ) -> Result<Self> {
        if stop_time <= start_time {
            return Err(Error::InvalidLink(format!(
                "{kind} '{tag_id}': stop time {stop_time} <= start time {start_time}"
            )));
        }
        Ok(Self {
            dataset: dataset.to_string(),
            block_id: block_id.to_string(),
            tag_id: tag_id.to_string(),
            kind,
            start_time,
            stop_time,
            index,
            max_before,
            max_after,
            metadata,
            mapping_version,
        })
    }

    /// Serialize to one JSON row.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a link from one JSON row.
    ///
    /// # Errors
    /// Returns an error on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Serialize a link collection to a JSON array (tabular form).
///
/// # Errors
/// Returns an error if serialization fails.
pub fn links_to_json(links: &[DataLink]) -> Result<String> {
    Ok(serde_json::to_string_pretty(links)?)
}

/// Reconstruct a link collection from its JSON array form.
///
/// # Errors
/// Returns an error on malformed JSON.
pub fn links_from_json(json: &str) -> Result<Vec<DataLink>> {
    Ok(serde_json::from_str(json)?)
}

/// Re-read the data window a link points to, straight from a store.
///
/// `before` and `after` are clamped to the link's recorded
/// `max_before`/`max_after` with a warning. Returned times are
/// zero-referenced to the segment start, the same convention the segment
/// accessors default to.
///
/// # Errors
/// Returns [`Error::InvalidLink`] when the link does not match the store,
/// [`Error::TraceNotFound`] when the trace is unknown, and a store error
/// when the array cannot be classified or read.
pub fn read_link(
    store: &dyn RecordingStore,
    link: &DataLink,
    trace_name: &str,
    mut before: f64,
    mut after: f64,
) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
    let info = store.info();
    if info.block_id != link.block_id {
        return Err(Error::InvalidLink(format!(
            "block '{}' not found in dataset '{}'",
            link.block_id, info.dataset
        )));
    }
    let tag_known = match link.kind {
        SegmentKind::ReproRun => store.tags().iter().any(|t| t.id == link.tag_id),
        SegmentKind::StimulusSegment => store.multi_tags().iter().any(|t| t.id == link.tag_id),
    };
    if !tag_known {
        return Err(Error::InvalidLink(format!(
            "{} '{}' not found in block '{}'",
            link.kind, link.tag_id, link.block_id
        )));
    }

    let descriptor = store
        .data_arrays()
        .iter()
        .find(|a| a.name == trace_name)
        .ok_or_else(|| Error::TraceNotFound {
            name: trace_name.to_string(),
            segment: link.tag_id.clone(),
        })?;
    let trace = DataTrace::from_descriptor(descriptor, link.mapping_version).ok_or_else(|| {
        Error::Store(format!(
            "array '{trace_name}' is neither continuous nor event data"
        ))
    })?;

    if before > link.max_before {
        warn!(
            "before {before} exceeds the maximum valid before time {}, clamped",
            link.max_before
        );
        before = link.max_before;
    }
    if after > link.max_after {
        warn!(
            "after {after} exceeds the maximum valid after time {}, clamped",
            link.max_after
        );
        after = link.max_after;
    }

    let slice_start = link.start_time - before;
    let extent = (link.stop_time + after) - slice_start;
    info!(
        "reading '{trace_name}' for link {} over [{slice_start}, {}]",
        link.tag_id,
        slice_start + extent
    );
    let data = store.read_slice(trace_name, slice_start, extent)?;

    match trace.kind() {
        TraceKind::Continuous => {
            let dt = trace.sampling_interval().ok_or_else(|| {
                Error::Store(format!("continuous trace '{trace_name}' lost its sampling interval"))
            })?;
            let time = Array1::from_iter((0..data.len()).map(|i| i as f64 * dt - before));
            Ok((Array1::from_vec(data), Some(time)))
        }
        TraceKind::Event => {
            let events = Array1::from_iter(data.into_iter().map(|t| t - link.start_time));
            Ok((events, None))
        }
    }
}
