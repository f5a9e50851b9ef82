//! Recorded data traces.
//!
//! A [`DataTrace`] is an immutable view over one stored array, classified as
//! continuously sampled or event data through the version-keyed type markers.
//! Its maximum readable time is computed once at scan time: sample count
//! times sampling interval for continuous traces, the last recorded
//! timestamp for event traces.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mappings::{type_marker, DataKind, MappingVersion};
use crate::store::ArrayDescriptor;

/// Kind of data a trace holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceKind {
    /// Regularly sampled signal, e.g. a membrane voltage
    Continuous,
    /// Irregular event timestamps, e.g. detected spikes
    Event,
}

/// One recorded trace, shared read-only among all segments that reference it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTrace {
    name: String,
    id: String,
    type_name: String,
    kind: TraceKind,
    shape: Vec<usize>,
    max_time: f64,
    sampling_interval: Option<f64>,
}

impl DataTrace {
    /// Classify an array by its type string under the given mapping version.
    ///
    /// Returns `None` for arrays that are neither continuous nor event data
    /// (those are skipped during the scan).
    #[must_use]
    pub fn classify(descriptor: &ArrayDescriptor, version: MappingVersion) -> Option<TraceKind> {
        let t = descriptor.type_name.as_str();
        if t.contains(type_marker(version, DataKind::Event)) {
            Some(TraceKind::Event)
        } else if t.contains(type_marker(version, DataKind::Continuous)) {
            Some(TraceKind::Continuous)
        } else {
            None
        }
    }

    /// Build a trace from its array descriptor.
    ///
    /// Returns `None` when the type string matches neither marker, or when a
    /// continuous array carries no sampling interval (logged, skipped).
    #[must_use]
    pub fn from_descriptor(descriptor: &ArrayDescriptor, version: MappingVersion) -> Option<Self> {
        let kind = Self::classify(descriptor, version)?;
        let (max_time, sampling_interval) = match kind {
            TraceKind::Continuous => {
                let Some(dt) = descriptor.sampling_interval else {
                    warn!(
                        "continuous array '{}' has no sampling interval, skipping",
                        descriptor.name
                    );
                    return None;
                };
                let samples = descriptor.shape.first().copied().unwrap_or(0);
                (samples as f64 * dt, Some(dt))
            }
            TraceKind::Event => (descriptor.last_timestamp.unwrap_or(0.0), None),
        };
        debug!(
            "trace '{}' classified as {kind:?}, max time {max_time}",
            descriptor.name
        );
        Some(Self {
            name: descriptor.name.clone(),
            id: descriptor.id.clone(),
            type_name: descriptor.type_name.clone(),
            kind,
            shape: descriptor.shape.clone(),
            max_time,
            sampling_interval,
        })
    }

    /// Trace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Array id in the store.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw type string.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Continuous or event.
    #[must_use]
    pub const fn kind(&self) -> TraceKind {
        self.kind
    }

    /// Shape of the stored array.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Maximum time represented in this trace.
    #[must_use]
    pub const fn max_time(&self) -> f64 {
        self.max_time
    }

    /// Sampling interval in seconds.
    ///
    /// Meaningless for event traces; asking logs a warning and yields `None`.
    #[must_use]
    pub fn sampling_interval(&self) -> Option<f64> {
        if self.kind == TraceKind::Event {
            warn!("sampling interval requested for event trace '{}'", self.name);
        }
        self.sampling_interval
    }
}

/// Name-keyed lookup of all classified traces in a dataset.
pub type TraceMap = FxHashMap<String, Arc<DataTrace>>;

/// Classify all arrays of a store and build the shared trace map.
///
/// Unclassifiable arrays are skipped. Returns the map plus the continuous
/// and event traces in scan order.
#[must_use]
pub fn build_trace_map(
    arrays: &[ArrayDescriptor],
    version: MappingVersion,
) -> (TraceMap, Vec<Arc<DataTrace>>, Vec<Arc<DataTrace>>) {
    let mut map = TraceMap::default();
    let mut continuous = Vec::new();
    let mut events = Vec::new();
    for descriptor in arrays {
        let Some(trace) = DataTrace::from_descriptor(descriptor, version) else {
            continue;
        };
        let trace = Arc::new(trace);
        match trace.kind() {
            TraceKind::Continuous => continuous.push(Arc::clone(&trace)),
            TraceKind::Event => events.push(Arc::clone(&trace)),
        }
        map.insert(trace.name().to_string(), trace);
    }
    (map, continuous, events)
}
