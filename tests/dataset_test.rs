//! End-to-end tests over a synthetic recording: scan, timeline assembly,
//! stimulus resolution, windowed reads and the link export.

use std::sync::Arc;

use reprolink::metadata::{MetadataTree, Property};
use reprolink::store::{
    ArrayDescriptor, FeatureDescriptor, MemoryStore, MultiTagDescriptor, StoreInfo,
    TagDescriptor,
};
use reprolink::{
    links_from_json, links_to_json, Dataset, Error, IntervalMode, PropertyFilter,
    ProtocolProfile, ProtocolRegistry, Segment, SegmentKind, TimeReference, TraceKind,
};

/// Synthetic recording, 100s of sampled voltage at 10ms resolution:
///
/// - `BaselineActivity_1` over [0, 10], no stimuli
/// - `SAM_1` over [10, 40] with presentations [12,14], [20,22], [30,30.4]
///   plus one degenerate occurrence at 25
fn sample_store() -> MemoryStore {
    let mut store = MemoryStore::new(StoreInfo::new("2024-01-17-ab", "block-0"));

    store.add_array(
        ArrayDescriptor {
            id: "da-0".to_string(),
            name: "V-1".to_string(),
            type_name: "relacs.data.sampled".to_string(),
            shape: vec![10_000],
            sampling_interval: Some(0.01),
            last_timestamp: None,
        },
        (0..10_000).map(|i| (f64::from(i) * 0.05).sin()).collect(),
    );
    store.add_array(
        ArrayDescriptor {
            id: "da-1".to_string(),
            name: "Spikes-1".to_string(),
            type_name: "relacs.data.event".to_string(),
            shape: vec![5],
            sampling_interval: None,
            last_timestamp: Some(31.0),
        },
        vec![5.0, 12.5, 13.0, 21.0, 31.0],
    );

    let references = vec!["V-1".to_string(), "Spikes-1".to_string()];

    store.add_tag(TagDescriptor {
        id: "tag-0".to_string(),
        name: "BaselineActivity_1".to_string(),
        type_name: "relacs.repro_run".to_string(),
        position: 0.0,
        extent: 10.0,
        references: references.clone(),
        features: Vec::new(),
    });
    store.set_metadata(
        "tag-0",
        MetadataTree::new().with_section(
            "BaselineActivity_1",
            MetadataTree::new()
                .with_property("RePro", Property::scalar("BaselineActivity", None)),
        ),
    );

    store.add_tag(TagDescriptor {
        id: "tag-1".to_string(),
        name: "SAM_1".to_string(),
        type_name: "relacs.repro_run".to_string(),
        position: 10.0,
        extent: 30.0,
        references: references.clone(),
        features: Vec::new(),
    });
    store.set_metadata(
        "tag-1",
        MetadataTree::new().with_section(
            "SAM_1",
            MetadataTree::new()
                .with_property("RePro", Property::scalar("SAM", None))
                .with_section(
                    "Settings",
                    MetadataTree::new()
                        .with_property("deltaf", Property::scalar(20.0, Some("Hz"))),
                ),
        ),
    );

    store.add_multi_tag(MultiTagDescriptor {
        id: "mt-0".to_string(),
        name: "sam-1".to_string(),
        type_name: "relacs.stimulus.sam".to_string(),
        positions: vec![12.0, 20.0, 25.0, 30.0],
        extents: vec![2.0, 2.0, 0.0, 0.4],
        references,
        features: vec![
            FeatureDescriptor {
                name: "sam-1_delay".to_string(),
                type_name: "relacs.feature".to_string(),
                unit: Some("s".to_string()),
            },
            FeatureDescriptor {
                name: "sam-1_abs_time".to_string(),
                type_name: "relacs.feature".to_string(),
                unit: Some("s".to_string()),
            },
            FeatureDescriptor {
                name: "sam-1_Contrast".to_string(),
                type_name: "relacs.feature.mutable".to_string(),
                unit: Some("%".to_string()),
            },
        ],
    });
    store.add_feature(
        "mt-0",
        "sam-1_delay",
        vec![vec![0.05], vec![0.05], vec![0.05], vec![0.05]],
    );
    store.add_feature(
        "mt-0",
        "sam-1_abs_time",
        vec![vec![11.9], vec![19.9], vec![24.9], vec![29.9]],
    );
    store.add_feature(
        "mt-0",
        "sam-1_Contrast",
        vec![vec![10.0], vec![20.0], vec![25.0], vec![30.0]],
    );
    store.set_metadata(
        "mt-0",
        MetadataTree::new().with_section(
            "sam-1",
            MetadataTree::new().with_property("Contrast", Property::scalar(50.0, Some("%"))),
        ),
    );

    store.set_metadata(
        "block-0",
        MetadataTree::new()
            .with_property("recording quality", Property::scalar("good", None)),
    );

    store
}

fn sample_dataset() -> Dataset {
    let mut registry = ProtocolRegistry::new();
    registry.register(ProtocolProfile::new("SAM").with_signal("spikes", "Spikes-1"));
    Dataset::with_registry(Arc::new(sample_store()), registry).unwrap()
}

#[test]
fn scan_builds_runs_and_traces() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    assert_eq!(dataset.repros(), vec!["BaselineActivity_1", "SAM_1"]);
    assert_eq!(dataset.data_traces().len(), 1);
    assert_eq!(dataset.event_traces().len(), 1);
    assert_eq!(dataset.trace("V-1").unwrap().kind(), TraceKind::Continuous);
    assert_eq!(dataset.name(), "2024-01-17-ab");

    let meta = dataset.metadata()?;
    assert!(meta.property("recording quality").is_some());
    Ok(())
}

#[test]
fn stimuli_attach_to_their_run_and_degenerate_is_excluded() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    assert_eq!(dataset.get("BaselineActivity_1")?.stimulus_count(), 0);

    let run = dataset.get("SAM_1")?;
    assert_eq!(run.stimulus_count(), 3);
    let starts: Vec<f64> = run.stimuli().iter().map(Segment::start_time).collect();
    assert_eq!(starts, vec![12.0, 20.0, 30.0]);
    assert_eq!(run.stimulus_durations(), vec![2.0, 2.0, 0.4]);
    // the zero-length occurrence at 25 never shows up
    assert!(run.stimuli().iter().all(|s| s.start_time() != 25.0));
    // lazy feature scalars resolve against the occurrence, not the tag
    assert_eq!(run.stimulus(1)?.absolute_start_time(), Some(19.9));
    Ok(())
}

#[test]
fn out_of_range_and_missing_lookups_are_errors() {
    let dataset = sample_dataset();
    assert!(matches!(
        dataset.get("Chirps_1"),
        Err(Error::ReproNotFound(_))
    ));
    let run = dataset.get("SAM_1").unwrap();
    assert!(matches!(
        run.stimulus(7),
        Err(Error::OutOfRange { index: 7, count: 3 })
    ));
    assert!(matches!(
        run.trace_data("EOD", 0.0, 0.0, TimeReference::Zero),
        Err(Error::TraceNotFound { .. })
    ));
    assert!(matches!(
        run.continuous_data("Spikes-1", 0.0, 0.0, TimeReference::Zero),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn timeline_queries() {
    let dataset = sample_dataset();
    assert_eq!(dataset.timeline().min_time().unwrap(), 0.0);
    assert_eq!(dataset.timeline().max_time().unwrap(), 40.0);

    let names = dataset.find_repro_runs(21.0, None, IntervalMode::Embracing);
    assert_eq!(names, vec!["SAM_1".to_string()]);
    let names = dataset.find_repro_runs(0.0, Some(15.0), IntervalMode::Within);
    assert_eq!(names, vec!["BaselineActivity_1".to_string()]);
}

#[test]
fn before_is_clamped_to_the_stimulus_delay() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let stimulus = dataset.get("SAM_1")?.stimulus(0)?;
    assert_eq!(stimulus.delay(), Some(0.05));

    let (data, time) = stimulus.trace_data("V-1", 0.2, 0.0, TimeReference::Zero)?;
    let time = time.unwrap();
    // effective before is the 0.05s delay, not the requested 0.2s
    assert!((time[0] - (-0.05)).abs() < 1e-9);
    assert_eq!(data.unwrap().len(), time.len());
    Ok(())
}

#[test]
fn after_is_clamped_against_the_next_stimulus() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let run = dataset.get("SAM_1")?;

    // [20, 22]; the next occurrence on the timeline starts at 25
    let stimulus = run.stimulus(1)?;
    assert_eq!(stimulus.next_stimulus_start(), Some(25.0));
    let (data, _) = stimulus.trace_data("V-1", 0.0, 5.0, TimeReference::Zero)?;
    // effective after is 3.0s: (2s + 3s) / 0.01s
    assert_eq!(data.unwrap().len(), 500);
    Ok(())
}

#[test]
fn after_is_forced_to_zero_without_a_successor() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let stimulus = dataset.get("SAM_1")?.stimulus(2)?;
    assert_eq!(stimulus.next_stimulus_start(), None);

    let (data, _) = stimulus.trace_data("V-1", 0.0, 1.0, TimeReference::Zero)?;
    // 0.4s at 10ms resolution, nothing read past the stimulus
    assert_eq!(data.unwrap().len(), 40);
    Ok(())
}

#[test]
fn run_reads_apply_padding_directly() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let run = dataset.get("SAM_1")?;

    let (_, time) = run.trace_data("V-1", 2.0, 0.0, TimeReference::Zero)?;
    assert!((time.unwrap()[0] - (-2.0)).abs() < 1e-9);
    let (_, time) = run.trace_data("V-1", 2.0, 0.0, TimeReference::Absolute)?;
    assert!((time.unwrap()[0] - 8.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn event_reads_shift_timestamps_by_reference() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let stimulus = dataset.get("SAM_1")?.stimulus(0)?;

    let (events, time) = stimulus.event_data("Spikes-1", 0.0, 0.0, TimeReference::Zero)?;
    assert!(time.is_none());
    let events = events.unwrap();
    assert_eq!(events.len(), 2);
    assert!((events[0] - 0.5).abs() < 1e-9);

    let (events, _) = stimulus.event_data("Spikes-1", 0.0, 0.0, TimeReference::Absolute)?;
    assert!((events.unwrap()[0] - 12.5).abs() < 1e-9);
    Ok(())
}

#[test]
fn stimulus_metadata_merges_mutable_overrides() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let stimulus = dataset.get("SAM_1")?.stimulus(1)?;

    let meta = stimulus.metadata()?;
    let contrast = meta.find_property("sam-1.Contrast").unwrap();
    // the per-occurrence value, not the 50% recorded in the base metadata
    assert_eq!(contrast.first_f64(), Some(20.0));
    assert_eq!(contrast.unit.as_deref(), Some("%"));
    Ok(())
}

#[test]
fn signal_roles_resolve_through_the_registry() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    assert_eq!(
        dataset.get("SAM_1")?.signal_trace("spikes"),
        Some("Spikes-1")
    );
    assert_eq!(dataset.get("SAM_1")?.signal_trace("eod"), None);
    // no profile registered for BaselineActivity
    assert_eq!(dataset.get("BaselineActivity_1")?.signal_trace("spikes"), None);
    Ok(())
}

#[test]
fn find_filters_on_metadata_properties() {
    let dataset = sample_dataset();
    let runs = dataset.find(None, &[PropertyFilter::new("RePro", "sam")]);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].name(), "SAM_1");

    let stimuli = dataset.find_stimuli(Some("sam"), |s| s.duration() > 1.0, &[]);
    assert_eq!(stimuli.len(), 2);

    let none = dataset.find(None, &[PropertyFilter::new("RePro", "chirps")]);
    assert!(none.is_empty());
}

#[test]
fn link_export_round_trips_exactly() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let links = dataset.data_links(true);
    // two runs plus three valid stimuli
    assert_eq!(links.len(), 5);

    let json = links_to_json(&links)?;
    let restored = links_from_json(&json)?;
    assert_eq!(restored, links);

    let stimulus_links: Vec<_> = links
        .iter()
        .filter(|l| l.kind == SegmentKind::StimulusSegment)
        .collect();
    assert_eq!(stimulus_links.len(), 3);
    assert_eq!(stimulus_links[0].dataset, "2024-01-17-ab");
    assert_eq!(stimulus_links[0].block_id, "block-0");
    assert_eq!(stimulus_links[0].tag_id, "mt-0");
    assert_eq!(stimulus_links[0].start_time, 12.0);
    assert_eq!(stimulus_links[0].stop_time, 14.0);
    assert_eq!(stimulus_links[0].max_before, 0.05);
    Ok(())
}

#[test]
fn links_read_back_through_a_store() -> anyhow::Result<()> {
    let dataset = sample_dataset();
    let store = sample_store();

    let links = dataset.data_links(false);
    let link = &links[0];
    // over-asking gets clamped to the link's recorded bounds
    let (data, time) = reprolink::read_link(&store, link, "V-1", 1.0, 100.0)?;
    let time = time.unwrap();
    assert!((time[0] - (-0.05)).abs() < 1e-9);
    assert_eq!(data.len(), time.len());

    let mut broken = link.clone();
    broken.block_id = "block-9".to_string();
    assert!(matches!(
        reprolink::read_link(&store, &broken, "V-1", 0.0, 0.0),
        Err(Error::InvalidLink(_))
    ));
    Ok(())
}

#[test]
fn missing_store_file_is_a_hard_error() {
    assert!(matches!(
        Dataset::from_json_file("does/not/exist.json"),
        Err(Error::Io(_))
    ));
}
