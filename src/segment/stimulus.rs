//! One presentation of a stimulus within a protocol run.

use std::sync::OnceLock;

use tracing::{debug, warn};

use super::window::{read_window, TimeReference, TraceData};
use super::{Segment, SegmentCore};
use crate::link::{DataLink, SegmentKind};
use crate::metadata::{MetadataTree, Property};
use crate::store::FeatureDescriptor;
use crate::trace::TraceKind;
use crate::Result;

/// One stimulus presentation: a single occurrence of a multi-occurrence
/// stimulus tag, bound to its enclosing repro run at resolution time.
#[derive(Debug)]
pub struct Stimulus {
    core: SegmentCore,
    parent_run_id: String,
    next_stimulus_start: Option<f64>,
    delay: OnceLock<Option<f64>>,
    absolute_start: OnceLock<Option<f64>>,
}

impl Stimulus {
    pub(crate) fn new(
        core: SegmentCore,
        parent_run_id: String,
        next_stimulus_start: Option<f64>,
    ) -> Self {
        Self {
            core,
            parent_run_id,
            next_stimulus_start,
            delay: OnceLock::new(),
            absolute_start: OnceLock::new(),
        }
    }

    /// Occurrence index within the stimulus tag.
    #[must_use]
    pub fn index(&self) -> usize {
        self.core.index.unwrap_or(0)
    }

    /// Tag id of the repro run this presentation belongs to.
    #[must_use]
    pub fn parent_run_id(&self) -> &str {
        &self.parent_run_id
    }

    /// Start time of the following stimulus anywhere in the recording, or
    /// `None` for the last presentation. Bounds the valid `after` padding.
    #[must_use]
    pub const fn next_stimulus_start(&self) -> Option<f64> {
        self.next_stimulus_start
    }

    /// Delay between acquisition start and stimulus output: the maximum time
    /// readable before stimulus onset. Recorded as a companion feature,
    /// resolved once and memoized.
    #[must_use]
    pub fn delay(&self) -> Option<f64> {
        *self.delay.get_or_init(|| self.feature_scalar("_delay"))
    }

    /// Absolute stimulus onset relative to recording start. The framework
    /// does not store data continuously, so this deviates from the data-time
    /// start. Recorded as a companion feature, resolved once and memoized.
    #[must_use]
    pub fn absolute_start_time(&self) -> Option<f64> {
        *self
            .absolute_start
            .get_or_init(|| self.feature_scalar("_abs_time"))
    }

    fn feature_scalar(&self, suffix: &str) -> Option<f64> {
        let feature = self.core.find_feature(suffix)?.to_string();
        match self.core.feature_data(&feature) {
            Ok(values) => {
                let value = values.first().copied();
                debug!("feature '{feature}' resolved to {value:?}");
                value
            }
            Err(e) => {
                warn!("could not read feature '{feature}': {e}");
                None
            }
        }
    }

    /// Recorded features of the stimulus tag.
    #[must_use]
    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.core.features
    }

    /// Feature payload for this occurrence.
    ///
    /// # Errors
    /// Returns [`crate::Error::FeatureNotFound`] for an unknown feature name.
    pub fn feature_data(&self, feature_name: &str) -> Result<Vec<f64>> {
        self.core.feature_data(feature_name)
    }

    /// Data recorded while this stimulus was put out.
    ///
    /// `before` must not exceed the recorded [`delay`](Self::delay) and the
    /// window must not reach into the next presentation; both paddings are
    /// clamped to their valid bounds with a warning. With no following
    /// stimulus there is no defined upper bound and `after` is forced to
    /// zero. The effective window shows in the length of the returned data.
    ///
    /// # Errors
    /// Returns [`crate::Error::TraceNotFound`] when the stimulus does not reference
    /// the trace.
    pub fn trace_data(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
        let (before, after) = self.clamped_window(before, after);
        read_window(&self.core, trace_name, before, after, reference, None)
    }

    /// Like [`trace_data`](Self::trace_data), asserting a continuous trace.
    ///
    /// # Errors
    /// Additionally returns [`crate::Error::TypeMismatch`] for an event trace.
    pub fn continuous_data(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
        let (before, after) = self.clamped_window(before, after);
        read_window(
            &self.core,
            trace_name,
            before,
            after,
            reference,
            Some(TraceKind::Continuous),
        )
    }

    /// Like [`trace_data`](Self::trace_data), asserting an event trace.
    ///
    /// # Errors
    /// Additionally returns [`crate::Error::TypeMismatch`] for a continuous trace.
    pub fn event_data(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
        let (before, after) = self.clamped_window(before, after);
        read_window(
            &self.core,
            trace_name,
            before,
            after,
            reference,
            Some(TraceKind::Event),
        )
    }

    fn clamped_window(&self, mut before: f64, mut after: f64) -> (f64, f64) {
        let delay = self.delay().unwrap_or(0.0);
        if before > 0.0 && before > delay {
            warn!(
                "before {before} exceeds stimulus delay {delay} for '{}', clamped to delay",
                self.core.name
            );
            before = delay;
        }
        match self.next_stimulus_start {
            None => {
                if after > 0.0 {
                    warn!(
                        "no stimulus follows '{}', after {after} forced to zero",
                        self.core.name
                    );
                }
                after = 0.0;
            }
            Some(next_start) => {
                let max_after = next_start - self.stop_time();
                if after > 0.0 && after > max_after {
                    warn!(
                        "after {after} reaches into the next stimulus for '{}', \
                         clamped to {max_after}",
                        self.core.name
                    );
                    after = max_after;
                }
            }
        }
        (before, after)
    }

    /// Per-presentation metadata: the base tag metadata with the values of
    /// mutable features merged over it.
    ///
    /// Mutable feature names carry the overridden property's dotted path as
    /// a suffix of the tag name; the override applies inside the section
    /// named after the tag. Unreadable overrides are skipped with a log
    /// record.
    ///
    /// # Errors
    /// Returns an error when the store cannot produce the base tree.
    pub fn metadata(&self) -> Result<MetadataTree> {
        let mut tree = self.core.metadata()?;
        let prefix = format!("{}_", self.core.name);
        for feature in &self.core.features {
            if !feature.is_mutable() {
                continue;
            }
            let Some(suffix) = feature.name.rsplit(prefix.as_str()).next() else {
                continue;
            };
            let values = match self.core.feature_data(&feature.name) {
                Ok(values) => values,
                Err(e) => {
                    warn!("could not read mutable feature '{}': {e}", feature.name);
                    continue;
                }
            };
            let property = Property::from_values(values, feature.unit.as_deref());
            match tree.sections.get_mut(&self.core.name) {
                Some(section) => {
                    section.set_property(suffix, property);
                }
                None => {
                    warn!(
                        "no metadata section '{}' to apply override '{}'",
                        self.core.name, feature.name
                    );
                }
            }
        }
        Ok(tree)
    }

    /// Link descriptor locating this presentation's data in its store.
    ///
    /// Degenerate presentations (`start >= stop`) cannot be linked; that
    /// yields `Ok(None)` with a warning.
    ///
    /// # Errors
    /// Returns an error when the metadata cannot be serialized.
    pub fn data_link(&self) -> Result<Option<DataLink>> {
        if self.start_time() >= self.stop_time() {
            warn!(
                "no data link for stimulus '{}': start {} >= stop {}",
                self.core.name,
                self.start_time(),
                self.stop_time()
            );
            return Ok(None);
        }
        let info = self.core.env.store.info();
        let metadata = self.metadata()?.to_json()?;
        let max_before = self.delay().unwrap_or(0.0);
        let max_after = self
            .next_stimulus_start
            .map_or(0.0, |next| next - self.stop_time());
        let link = DataLink::new(
            &info.dataset,
            &info.block_id,
            &self.core.id,
            SegmentKind::StimulusSegment,
            self.start_time(),
            self.stop_time(),
            self.core.index,
            max_before,
            max_after,
            Some(metadata),
            info.mapping_version,
        )?;
        Ok(Some(link))
    }
}

impl Segment for Stimulus {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn id(&self) -> &str {
        &self.core.id
    }

    fn type_name(&self) -> &str {
        &self.core.type_name
    }

    fn start_time(&self) -> f64 {
        self.core.start_time
    }

    fn duration(&self) -> f64 {
        self.core.duration
    }

    fn metadata(&self) -> Result<MetadataTree> {
        Stimulus::metadata(self)
    }
}
