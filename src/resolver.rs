//! Stimulus resolution: assigns every stimulus presentation to its
//! enclosing repro run and fixes each presentation's readable bounds.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::segment::{Segment, SegmentCore, SegmentEnv, Stimulus};
use crate::store::MultiTagDescriptor;
use crate::timeline::Timeline;
use crate::Result;

/// Attach the stimuli of one run, in chronological order.
///
/// Queries the timeline for presentations fully contained in the run's span.
/// Degenerate occurrences (`start >= stop`, typically a recording truncated
/// mid-stimulus) are skipped with a log record. The Within query returns
/// occurrences ascending by start, but subset filtering across mixed tag
/// groups does not guarantee that for the survivors, so the resolved batch
/// is re-sorted before it is appended.
pub(crate) fn resolve_run_stimuli(
    timeline: &Timeline,
    run_id: &str,
    run_start: f64,
    run_stop: f64,
    multi_tags: &FxHashMap<String, &MultiTagDescriptor>,
    env: &Arc<SegmentEnv>,
) -> Result<Vec<Stimulus>> {
    let mut resolved = Vec::new();
    for occurrence in timeline.find_stimuli(run_start, run_stop) {
        if occurrence.start >= occurrence.stop {
            info!(
                "skipping stimulus '{}' occurrence {}: start {} >= stop {}",
                occurrence.tag_name, occurrence.index, occurrence.start, occurrence.stop
            );
            continue;
        }
        let Some(tag) = multi_tags.get(occurrence.tag_name.as_str()) else {
            debug!(
                "stimulus tag '{}' vanished from the store, skipping",
                occurrence.tag_name
            );
            continue;
        };
        let core = SegmentCore::from_multi_tag(tag, occurrence.index, Arc::clone(env))?;
        let next_start = timeline.next_stimulus_start(occurrence.stop);
        resolved.push(Stimulus::new(core, run_id.to_string(), next_start));
    }
    resolved.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));
    Ok(resolved)
}
