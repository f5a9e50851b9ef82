//! One run of an experimental protocol.

use std::collections::BTreeMap;

use tracing::warn;

use super::window::{read_window, TimeReference, TraceData};
use super::{Segment, SegmentCore, Stimulus};
use crate::link::{DataLink, SegmentKind};
use crate::metadata::MetadataTree;
use crate::store::FeatureDescriptor;
use crate::trace::TraceKind;
use crate::{Error, Result};

/// One execution of an experimental stimulation protocol, tagged as a single
/// time interval. Owns the stimuli presented during its span.
#[derive(Debug)]
pub struct ReproRun {
    core: SegmentCore,
    protocol: String,
    signals: BTreeMap<String, String>,
    stimuli: Vec<Stimulus>,
}

impl ReproRun {
    pub(crate) fn new(
        core: SegmentCore,
        protocol: String,
        signals: BTreeMap<String, String>,
    ) -> Self {
        Self {
            core,
            protocol,
            signals,
            stimuli: Vec::new(),
        }
    }

    /// Name of the protocol this run executed, e.g. `"BaselineActivity"`.
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Attach a resolved stimulus. Resolution appends in chronological
    /// order; stimuli are never removed.
    pub(crate) fn add_stimulus(&mut self, stimulus: Stimulus) {
        self.stimuli.push(stimulus);
    }

    /// Stimuli presented during this run, in chronological order.
    #[must_use]
    pub fn stimuli(&self) -> &[Stimulus] {
        &self.stimuli
    }

    /// Number of stimuli presented during this run.
    #[must_use]
    pub fn stimulus_count(&self) -> usize {
        self.stimuli.len()
    }

    /// One stimulus by index.
    ///
    /// # Errors
    /// Returns [`Error::OutOfRange`] for an invalid index.
    pub fn stimulus(&self, index: usize) -> Result<&Stimulus> {
        self.stimuli.get(index).ok_or(Error::OutOfRange {
            index,
            count: self.stimuli.len(),
        })
    }

    /// Durations of all stimuli, in presentation order.
    #[must_use]
    pub fn stimulus_durations(&self) -> Vec<f64> {
        self.stimuli.iter().map(Stimulus::duration).collect()
    }

    /// Recorded features of the run tag.
    #[must_use]
    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.core.features
    }

    /// Feature payload recorded for this run.
    ///
    /// # Errors
    /// Returns [`Error::FeatureNotFound`] for an unknown feature name.
    pub fn feature_data(&self, feature_name: &str) -> Result<Vec<f64>> {
        self.core.feature_data(feature_name)
    }

    /// Data recorded while this protocol ran.
    ///
    /// `before` and `after` extend the window and are applied as given; run
    /// intervals already cover their own padding, so there is no delay or
    /// next-segment cap here. Continuous reads still never pass the end of
    /// the trace.
    ///
    /// # Errors
    /// Returns [`Error::TraceNotFound`] when the run does not reference the
    /// trace.
    pub fn trace_data(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
        read_window(&self.core, trace_name, before, after, reference, None)
    }

    /// Like [`trace_data`](Self::trace_data), asserting a continuous trace.
    ///
    /// # Errors
    /// Additionally returns [`Error::TypeMismatch`] for an event trace.
    pub fn continuous_data(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
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
    /// Additionally returns [`Error::TypeMismatch`] for a continuous trace.
    pub fn event_data(
        &self,
        trace_name: &str,
        before: f64,
        after: f64,
        reference: TimeReference,
    ) -> Result<TraceData> {
        read_window(
            &self.core,
            trace_name,
            before,
            after,
            reference,
            Some(TraceKind::Event),
        )
    }

    /// Concrete trace name serving an abstract signal role, e.g. `"spikes"`.
    ///
    /// Resolved once per run from the protocol registry.
    #[must_use]
    pub fn signal_trace(&self, role: &str) -> Option<&str> {
        self.signals.get(role).map(String::as_str)
    }

    /// Names of the traces this run references.
    #[must_use]
    pub fn references(&self) -> &[String] {
        &self.core.references
    }

    /// Link descriptor locating this run's data in its store.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLink`] for a degenerate run interval.
    pub fn data_link(&self) -> Result<DataLink> {
        let info = self.core.env.store.info();
        let metadata = self.metadata()?.to_json()?;
        DataLink::new(
            &info.dataset,
            &info.block_id,
            &self.core.id,
            SegmentKind::ReproRun,
            self.core.start_time,
            self.core.stop_time(),
            None,
            0.0,
            0.0,
            Some(metadata),
            info.mapping_version,
        )
    }

    /// Link descriptors for every stimulus of this run, skipping degenerate
    /// presentations.
    #[must_use]
    pub fn stimulus_data_links(&self) -> Vec<DataLink> {
        self.stimuli
            .iter()
            .filter_map(|s| match s.data_link() {
                Ok(link) => link,
                Err(e) => {
                    warn!("skipping stimulus link for '{}': {e}", s.name());
                    None
                }
            })
            .collect()
    }
}

impl Segment for ReproRun {
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
        self.core.metadata()
    }
}
