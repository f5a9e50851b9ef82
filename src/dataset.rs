//! Dataset: scan, index and query one recording.
//!
//! Opening a dataset runs the whole assembly pipeline once: classify the
//! data arrays, scan the repro-run tags, build the timeline, then resolve
//! every stimulus presentation into its enclosing run. All later access is
//! lookups and reads against that frozen structure.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::cache::SegmentCaches;
use crate::config::Config;
use crate::link::DataLink;
use crate::mappings::{MappingVersion, REPRO_RUN_MARKER};
use crate::metadata::MetadataTree;
use crate::registry::ProtocolRegistry;
use crate::resolver::resolve_run_stimuli;
use crate::segment::{ReproRun, Segment, SegmentCore, SegmentEnv, Stimulus};
use crate::store::{MemoryStore, MultiTagDescriptor, RecordingStore, TagDescriptor};
use crate::timeline::{IntervalMode, Timeline};
use crate::trace::{build_trace_map, DataTrace};
use crate::{Error, Result};

/// Filter on a metadata property for [`Dataset::find`]: the property at
/// `path` must exist and its rendered values must contain `contains`
/// (case-insensitive).
#[derive(Debug, Clone)]
pub struct PropertyFilter {
    /// Dotted property path, e.g. `"Settings.contrast"`
    pub path: String,
    /// Text the property values must contain
    pub contains: String,
}

impl PropertyFilter {
    /// New filter.
    #[must_use]
    pub fn new(path: impl Into<String>, contains: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contains: contains.into(),
        }
    }
}

/// One opened recording: repro runs, their stimuli, the shared traces and
/// the timeline over all of it.
#[derive(Debug)]
pub struct Dataset {
    env: Arc<SegmentEnv>,
    data_traces: Vec<Arc<DataTrace>>,
    event_traces: Vec<Arc<DataTrace>>,
    repro_order: Vec<String>,
    repro_map: FxHashMap<String, ReproRun>,
    timeline: Timeline,
}

impl Dataset {
    /// Open a dataset over a store, with protocol profiles taken from the
    /// ambient configuration (`config.json`, when present).
    ///
    /// # Errors
    /// Returns an error when the scan fails, e.g. when a run tag carries no
    /// protocol name in its metadata.
    pub fn new(store: Arc<dyn RecordingStore>) -> Result<Self> {
        Self::with_registry(store, ProtocolRegistry::from_config(&Config::load()))
    }

    /// Open a dataset over a JSON-serialized [`MemoryStore`].
    ///
    /// A missing or unreadable file is a hard error.
    ///
    /// # Errors
    /// Returns IO/JSON errors from loading the store, plus any scan error.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = MemoryStore::from_json_file(path)?;
        Self::new(Arc::new(store))
    }

    /// Open a dataset over a store with an explicit protocol registry.
    ///
    /// # Errors
    /// Returns an error when the scan fails.
    pub fn with_registry(
        store: Arc<dyn RecordingStore>,
        registry: ProtocolRegistry,
    ) -> Result<Self> {
        let version = store.info().mapping_version;
        info!("scanning dataset '{}'", store.info().dataset);

        let (traces, data_traces, event_traces) = build_trace_map(store.data_arrays(), version);
        let env = Arc::new(SegmentEnv {
            store: Arc::clone(&store),
            traces: Arc::new(traces),
            caches: Arc::new(SegmentCaches::new()),
            version,
        });

        let (repro_order, mut repro_map, run_tags) = Self::scan_repros(&store, &registry, &env)?;

        info!("building timeline");
        let timeline = Timeline::build(&run_tags, store.multi_tags(), version);

        info!("resolving stimuli");
        let multi_tags: FxHashMap<String, &MultiTagDescriptor> = store
            .multi_tags()
            .iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        for name in &repro_order {
            let Some(run) = repro_map.get(name) else {
                continue;
            };
            let (run_id, run_start, run_stop) =
                (run.id().to_string(), run.start_time(), run.stop_time());
            let stimuli = resolve_run_stimuli(
                &timeline,
                &run_id,
                run_start,
                run_stop,
                &multi_tags,
                &env,
            )?;
            if let Some(run) = repro_map.get_mut(name) {
                for stimulus in stimuli {
                    run.add_stimulus(stimulus);
                }
            }
        }

        Ok(Self {
            env,
            data_traces,
            event_traces,
            repro_order,
            repro_map,
            timeline,
        })
    }

    fn scan_repros(
        store: &Arc<dyn RecordingStore>,
        registry: &ProtocolRegistry,
        env: &Arc<SegmentEnv>,
    ) -> Result<(Vec<String>, FxHashMap<String, ReproRun>, Vec<TagDescriptor>)> {
        let mut order = Vec::new();
        let mut map = FxHashMap::default();
        let mut run_tags = Vec::new();
        for tag in store.tags() {
            if !tag.type_name.contains(REPRO_RUN_MARKER) {
                continue;
            }
            let core = SegmentCore::from_tag(tag, Arc::clone(env));
            let metadata = core.metadata()?;
            let protocol = protocol_name(&metadata, &tag.name)?;
            let signals = registry
                .resolve(&protocol)
                .map(|profile| profile.signals.clone())
                .unwrap_or_default();
            order.push(tag.name.clone());
            map.insert(tag.name.clone(), ReproRun::new(core, protocol, signals));
            run_tags.push(tag.clone());
        }
        Ok((order, map, run_tags))
    }

    /// Dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.env.store.info().dataset
    }

    /// Id of the scanned block.
    #[must_use]
    pub fn block_id(&self) -> &str {
        &self.env.store.info().block_id
    }

    /// Mapping version the file was written with.
    #[must_use]
    pub fn mapping_version(&self) -> MappingVersion {
        self.env.version
    }

    /// Creation timestamp of the recording, if the store knows it.
    #[must_use]
    pub fn recording_date(&self) -> Option<DateTime<Utc>> {
        self.env.store.info().created_at
    }

    /// Block-level metadata of the recording session.
    ///
    /// # Errors
    /// Returns an error when the store cannot produce the tree.
    pub fn metadata(&self) -> Result<MetadataTree> {
        self.env.store.metadata(self.block_id())
    }

    /// Names of all repro runs, in scan order.
    #[must_use]
    pub fn repros(&self) -> Vec<&str> {
        self.repro_order.iter().map(String::as_str).collect()
    }

    /// One repro run by exact tag name.
    ///
    /// # Errors
    /// Returns [`Error::ReproNotFound`] for an unknown name.
    pub fn get(&self, name: &str) -> Result<&ReproRun> {
        self.repro_map
            .get(name)
            .ok_or_else(|| Error::ReproNotFound(name.to_string()))
    }

    /// Repro runs matching a name filter, in scan order.
    ///
    /// Without a filter all runs are returned. `exact` demands a full tag
    /// name match; otherwise the filter matches case-insensitively anywhere
    /// in the name. An empty result is logged, not an error.
    #[must_use]
    pub fn repro_runs(&self, filter: Option<&str>, exact: bool) -> Vec<&ReproRun> {
        let matches: Vec<&ReproRun> = match filter {
            None => self.runs_in_order().collect(),
            Some(name) if exact => self.repro_map.get(name).into_iter().collect(),
            Some(name) => {
                let needle = name.to_lowercase();
                self.runs_in_order()
                    .filter(|run| run.name().to_lowercase().contains(&needle))
                    .collect()
            }
        };
        if matches.is_empty() {
            if let Some(name) = filter {
                warn!("no repro run matching '{name}' (exact={exact})");
            }
        }
        matches
    }

    fn runs_in_order(&self) -> impl Iterator<Item = &ReproRun> {
        self.repro_order
            .iter()
            .filter_map(|name| self.repro_map.get(name))
    }

    /// Repro runs matching a name filter and a set of metadata property
    /// filters.
    #[must_use]
    pub fn find(&self, filter: Option<&str>, properties: &[PropertyFilter]) -> Vec<&ReproRun> {
        self.repro_runs(filter, false)
            .into_iter()
            .filter(|run| {
                properties.iter().all(|p| {
                    run.metadata()
                        .ok()
                        .and_then(|meta| {
                            meta.find_property(&p.path)
                                .map(|prop| prop.contains_text(&p.contains))
                        })
                        .unwrap_or(false)
                })
            })
            .collect()
    }

    /// Stimuli presented during the matching repro runs, filtered by an
    /// arbitrary predicate (e.g. on duration).
    #[must_use]
    pub fn find_stimuli<F>(
        &self,
        filter: Option<&str>,
        predicate: F,
        properties: &[PropertyFilter],
    ) -> Vec<&Stimulus>
    where
        F: Fn(&Stimulus) -> bool,
    {
        self.find(filter, properties)
            .into_iter()
            .flat_map(|run| run.stimuli().iter())
            .filter(|stimulus| predicate(stimulus))
            .collect()
    }

    /// Names of repro runs matching a containment query against
    /// `[start, stop]` (ad-hoc timeline exploration).
    #[must_use]
    pub fn find_repro_runs(
        &self,
        start: f64,
        stop: Option<f64>,
        mode: IntervalMode,
    ) -> Vec<String> {
        self.timeline.find_repro_runs(start, stop, mode)
    }

    /// The dataset's timeline.
    #[must_use]
    pub const fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Continuous trace descriptors, in scan order.
    #[must_use]
    pub fn data_traces(&self) -> &[Arc<DataTrace>] {
        &self.data_traces
    }

    /// Event trace descriptors, in scan order.
    #[must_use]
    pub fn event_traces(&self) -> &[Arc<DataTrace>] {
        &self.event_traces
    }

    /// One trace by name, of either kind.
    #[must_use]
    pub fn trace(&self, name: &str) -> Option<&Arc<DataTrace>> {
        self.env.traces.get(name)
    }

    /// Link descriptors for every segment in the dataset.
    ///
    /// Stimulus links always; run links only with `include_repros`. Segments
    /// that cannot be linked are skipped with a log record, the export never
    /// aborts on one bad segment.
    #[must_use]
    pub fn data_links(&self, include_repros: bool) -> Vec<DataLink> {
        let mut links = Vec::new();
        for run in self.runs_in_order() {
            if include_repros {
                match run.data_link() {
                    Ok(link) => links.push(link),
                    Err(e) => warn!("skipping link for run '{}': {e}", run.name()),
                }
            }
            links.extend(run.stimulus_data_links());
        }
        links
    }
}

/// Protocol-type name recorded in a run tag's metadata.
///
/// Newer files record it under `"RePro"`, older ones under `"repro"`.
fn protocol_name(metadata: &MetadataTree, tag_name: &str) -> Result<String> {
    metadata
        .find_property("RePro")
        .or_else(|| metadata.find_property("repro"))
        .and_then(|p| p.first_string())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Store(format!(
                "neither 'RePro' nor 'repro' recorded in metadata of tag '{tag_name}'"
            ))
        })
}
