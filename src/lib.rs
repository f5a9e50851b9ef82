//! # reprolink: time-indexed access to repeated-protocol recordings
//!
//! reprolink gives structured access to electrophysiology recordings written
//! by a stimulus-presentation framework that interleaves protocol runs
//! ("RePro" = repeated protocol) with nested stimulus presentations, each
//! tagging a span of shared continuous and event traces.
//!
//! The engine reconstructs the recording's timeline from the unordered
//! tagged intervals, resolves which stimuli belong to which run, fixes each
//! stimulus's readable window against its neighbors, and serves windowed
//! trace reads with boundary clamping and a selectable time reference.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reprolink::{Dataset, IntervalMode, Segment, TimeReference};
//!
//! let dataset = Dataset::from_json_file("data/2024-01-17-ab.json")?;
//!
//! for run in dataset.repro_runs(Some("sam"), false) {
//!     println!("{}: {} stimuli", run.name(), run.stimulus_count());
//!     for stimulus in run.stimuli() {
//!         let (_data, _time) =
//!             stimulus.trace_data("V-1", 0.0, 0.0, TimeReference::Zero)?;
//!     }
//! }
//!
//! // which repro runs embrace t = 120s?
//! let names = dataset.find_repro_runs(120.0, None, IntervalMode::Embracing);
//! # Ok::<(), reprolink::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod link;
pub mod mappings;
pub mod metadata;
pub mod registry;
mod resolver;
pub mod segment;
pub mod store;
pub mod timeline;
pub mod trace;

pub use config::Config;
pub use dataset::{Dataset, PropertyFilter};
pub use error::{Error, Result};
pub use link::{links_from_json, links_to_json, read_link, DataLink, SegmentKind};
pub use mappings::{DataKind, MappingVersion};
pub use metadata::{MetadataTree, Property};
pub use registry::{ProtocolProfile, ProtocolRegistry};
pub use segment::{ReproRun, Segment, Stimulus, TimeReference, TraceData};
pub use store::{MemoryStore, RecordingStore, StoreInfo};
pub use timeline::{Interval, IntervalIndex, IntervalMode, Timeline};
pub use trace::{DataTrace, TraceKind};
