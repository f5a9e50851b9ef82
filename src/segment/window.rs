//! Trace window computation and retrieval.
//!
//! Turns a segment's time window plus caller padding into the exact slice to
//! fetch from the store, applies the boundary clamps, and normalizes the
//! returned time axis under the selected time reference.

use ndarray::Array1;
use tracing::{debug, warn};

use super::SegmentCore;
use crate::trace::TraceKind;
use crate::{Error, Result};

/// Reference frame of returned timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeReference {
    /// Times are absolute data time of the recording
    Absolute,
    /// Segment start is time zero; padding extends into negative time
    #[default]
    Zero,
}

/// Payload of a trace read: the data plus, for continuous traces, the time
/// axis. Both are `None` when the segment window is invalid (truncated
/// recording).
pub type TraceData = (Option<Array1<f64>>, Option<Array1<f64>>);

/// Read `[start - before, stop + after]` of a named trace for one segment.
///
/// `before`/`after` are assumed pre-clamped by the caller's policy (stimulus
/// delay and next-stimulus bounds); the continuous-trace end-of-recording
/// clamp happens here. Never mutates segment or trace state.
pub(crate) fn read_window(
    core: &SegmentCore,
    trace_name: &str,
    before: f64,
    mut after: f64,
    reference: TimeReference,
    expected: Option<TraceKind>,
) -> Result<TraceData> {
    if core.stop_time() < core.start_time {
        warn!(
            "invalid slice for '{}': start {} > stop {}, interrupted recording?",
            core.name,
            core.start_time,
            core.stop_time()
        );
        return Ok((None, None));
    }

    let trace = core
        .env
        .traces
        .get(trace_name)
        .filter(|_| core.has_reference(trace_name))
        .ok_or_else(|| Error::TraceNotFound {
            name: trace_name.to_string(),
            segment: core.name.clone(),
        })?;

    if let Some(expected) = expected {
        if trace.kind() != expected {
            return Err(Error::TypeMismatch {
                name: trace_name.to_string(),
                expected,
                found: trace.kind(),
            });
        }
    }

    if trace.kind() == TraceKind::Continuous {
        let requested_stop = core.stop_time() + after;
        if requested_stop > trace.max_time() {
            after = trace.max_time() - core.stop_time();
            warn!(
                "requested stop {requested_stop} beyond end of trace '{trace_name}' \
                 ({}), after reduced to {after}",
                trace.max_time()
            );
        }
    }

    let slice_start = core.start_time - before;
    let extent = core.duration + before + after;
    debug!("reading '{trace_name}' from {slice_start} over {extent}");
    let data = core.env.store.read_slice(trace_name, slice_start, extent)?;

    match trace.kind() {
        TraceKind::Continuous => {
            // trace map construction guarantees a sampling interval here
            let dt = trace.sampling_interval().ok_or_else(|| {
                Error::Store(format!("continuous trace '{trace_name}' lost its sampling interval"))
            })?;
            let offset = match reference {
                TimeReference::Zero => -before,
                TimeReference::Absolute => core.start_time - before,
            };
            let time = Array1::from_iter((0..data.len()).map(|i| i as f64 * dt + offset));
            Ok((Some(Array1::from_vec(data)), Some(time)))
        }
        TraceKind::Event => {
            let shift = match reference {
                TimeReference::Zero => core.start_time,
                TimeReference::Absolute => 0.0,
            };
            let events = Array1::from_iter(data.into_iter().map(|t| t - shift));
            Ok((Some(events), None))
        }
    }
}
