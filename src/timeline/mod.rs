//! Timeline reconstruction over the tagged regions of a recording.
//!
//! The timeline holds two sorted interval indexes: one interval per repro
//! run, and one interval per occurrence of every stimulus-kind tag. It
//! answers the containment, overlap and next-boundary queries used while
//! assembling the data model and for ad-hoc exploration ("which repro runs
//! embrace time t?").

mod interval;

pub use interval::{Interval, IntervalIndex, IntervalMode};

use tracing::debug;

use crate::mappings::{type_marker, DataKind, MappingVersion};
use crate::store::{MultiTagDescriptor, TagDescriptor};
use crate::Result;

/// One stimulus presentation located on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusOccurrence {
    /// Name of the stimulus tag
    pub tag_name: String,
    /// Occurrence index within that tag
    pub index: usize,
    /// Start time in seconds
    pub start: f64,
    /// Stop time in seconds
    pub stop: f64,
}

/// Chronology of all repro runs and stimulus presentations in a dataset.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    runs: IntervalIndex,
    stimuli: IntervalIndex,
}

impl Timeline {
    /// Build the timeline from the scanned run tags and all multi-occurrence
    /// tags of the store.
    ///
    /// `run_tags` must already be filtered to repro-run tags; stimulus-kind
    /// tags are selected here by the version-keyed stimulus marker, all
    /// other multi-occurrence tags are ignored. Each occurrence contributes
    /// one interval; a missing extent means zero duration.
    #[must_use]
    pub fn build(
        run_tags: &[TagDescriptor],
        multi_tags: &[MultiTagDescriptor],
        version: MappingVersion,
    ) -> Self {
        let run_intervals: Vec<Interval> = run_tags
            .iter()
            .map(|tag| Interval::new(tag.name.clone(), tag.position, tag.position + tag.extent))
            .collect();

        let stimulus_marker = type_marker(version, DataKind::Stimulus);
        let mut stimulus_intervals = Vec::new();
        for tag in multi_tags {
            if !tag.type_name.contains(stimulus_marker) {
                continue;
            }
            for (i, start) in tag.positions.iter().enumerate() {
                let extent = tag.extents.get(i).copied().unwrap_or(0.0);
                stimulus_intervals.push(Interval::occurrence(
                    tag.name.clone(),
                    *start,
                    start + extent,
                    i,
                ));
            }
        }
        debug!(
            "timeline built: {} runs, {} stimulus occurrences",
            run_intervals.len(),
            stimulus_intervals.len()
        );

        Self {
            runs: IntervalIndex::build(run_intervals),
            stimuli: IntervalIndex::build(stimulus_intervals),
        }
    }

    /// Stimulus occurrences lying entirely within `[start, stop]`, ascending
    /// by start time. Used to attach stimuli to their owning run.
    #[must_use]
    pub fn find_stimuli(&self, start: f64, stop: f64) -> Vec<StimulusOccurrence> {
        self.stimuli
            .containing(start, stop, IntervalMode::Within)
            .into_iter()
            .map(|i| StimulusOccurrence {
                tag_name: i.name.clone(),
                index: i.index.unwrap_or(0),
                start: i.start,
                stop: i.stop,
            })
            .collect()
    }

    /// Names of repro runs matching a containment query against
    /// `[start, stop]`. With `stop` omitted the query degenerates to the
    /// point `start`; the default mode for exploration is `Embracing`.
    #[must_use]
    pub fn find_repro_runs(
        &self,
        start: f64,
        stop: Option<f64>,
        mode: IntervalMode,
    ) -> Vec<String> {
        let stop = stop.unwrap_or(start);
        self.runs
            .containing(start, stop, mode)
            .into_iter()
            .map(|i| i.name.clone())
            .collect()
    }

    /// Start time of the first stimulus beginning strictly after `t`, if any.
    #[must_use]
    pub fn next_stimulus_start(&self, t: f64) -> Option<f64> {
        self.stimuli.first_after(t)
    }

    /// Earliest repro-run start time.
    ///
    /// # Errors
    /// Returns [`crate::Error::EmptyTimeline`] when no runs were recorded.
    pub fn min_time(&self) -> Result<f64> {
        self.runs.bounds().map(|(min, _)| min)
    }

    /// Latest repro-run stop time.
    ///
    /// # Errors
    /// Returns [`crate::Error::EmptyTimeline`] when no runs were recorded.
    pub fn max_time(&self) -> Result<f64> {
        self.runs.bounds().map(|(_, max)| max)
    }

    /// The sorted repro-run index.
    #[must_use]
    pub const fn runs(&self) -> &IntervalIndex {
        &self.runs
    }

    /// The sorted stimulus-occurrence index.
    #[must_use]
    pub const fn stimuli(&self) -> &IntervalIndex {
        &self.stimuli
    }
}
