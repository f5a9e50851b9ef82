//! Ordered interval index with containment and next-boundary queries.

use crate::{Error, Result};

/// Containment predicate used by interval queries.
///
/// The two modes are deliberately asymmetric: `Embracing` answers "which
/// candidate encloses the query range" (e.g. the repro run active at time
/// t), `Within` answers "which candidates lie entirely inside the query
/// range" (e.g. the stimuli presented during a run). Boundary-exact cases
/// are included in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalMode {
    /// Candidate lies entirely inside the query range
    Within,
    /// Candidate encloses the query range
    Embracing,
}

/// One named, immutable time interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// Tag name the interval came from
    pub name: String,
    /// Start time in seconds
    pub start: f64,
    /// Stop time in seconds
    pub stop: f64,
    /// Occurrence index for multi-occurrence tags, `None` for single tags
    pub index: Option<usize>,
}

impl Interval {
    /// New interval for a single tag (no occurrence index).
    #[must_use]
    pub fn new(name: impl Into<String>, start: f64, stop: f64) -> Self {
        Self {
            name: name.into(),
            start,
            stop,
            index: None,
        }
    }

    /// New interval for one occurrence of a multi-occurrence tag.
    #[must_use]
    pub fn occurrence(name: impl Into<String>, start: f64, stop: f64, index: usize) -> Self {
        Self {
            name: name.into(),
            start,
            stop,
            index: Some(index),
        }
    }

    fn matches(&self, start: f64, stop: f64, mode: IntervalMode) -> bool {
        match mode {
            IntervalMode::Embracing => self.start <= start && self.stop >= stop,
            IntervalMode::Within => self.start >= start && self.stop <= stop,
        }
    }
}

/// Ordered collection of intervals, stable-sorted ascending by start time.
///
/// Immutable after [`build`](IntervalIndex::build); membership changes mean
/// rebuilding the index.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    intervals: Vec<Interval>,
}

impl IntervalIndex {
    /// Build an index from unordered intervals.
    ///
    /// Ties on the start time keep the original scan order (stable sort).
    /// Empty input yields an empty index.
    #[must_use]
    pub fn build(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self { intervals }
    }

    /// Number of indexed intervals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// True when the index holds no intervals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Iterate the intervals in start order.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }

    /// All intervals satisfying the containment predicate against
    /// `[start, stop]`, in start order. For a point query pass
    /// `stop == start`.
    #[must_use]
    pub fn containing(&self, start: f64, stop: f64, mode: IntervalMode) -> Vec<&Interval> {
        self.intervals
            .iter()
            .filter(|i| i.matches(start, stop, mode))
            .collect()
    }

    /// Smallest start time strictly greater than `t`, if any.
    #[must_use]
    pub fn first_after(&self, t: f64) -> Option<f64> {
        let idx = self.intervals.partition_point(|i| i.start <= t);
        self.intervals.get(idx).map(|i| i.start)
    }

    /// Earliest start and latest stop over all intervals.
    ///
    /// # Errors
    /// Returns [`Error::EmptyTimeline`] on an empty index.
    pub fn bounds(&self) -> Result<(f64, f64)> {
        let first = self.intervals.first().ok_or(Error::EmptyTimeline)?;
        let max_stop = self
            .intervals
            .iter()
            .map(|i| i.stop)
            .fold(f64::NEG_INFINITY, f64::max);
        Ok((first.start, max_stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sorts_by_start() {
        let index = IntervalIndex::build(vec![
            Interval::new("c", 17.0, 20.0),
            Interval::new("a", 5.0, 8.0),
            Interval::new("b", 10.0, 15.0),
        ]);
        let starts: Vec<f64> = index.iter().map(|i| i.start).collect();
        assert_eq!(starts, vec![5.0, 10.0, 17.0]);
    }

    #[test]
    fn test_build_is_stable_on_ties() {
        let index = IntervalIndex::build(vec![
            Interval::occurrence("first", 5.0, 6.0, 0),
            Interval::occurrence("second", 5.0, 7.0, 1),
        ]);
        let names: Vec<&str> = index.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_embracing_containment() {
        // run R=[10,20] and a wide stimulus S2=[5,25]
        let index = IntervalIndex::build(vec![
            Interval::new("R", 10.0, 20.0),
            Interval::new("S2", 5.0, 25.0),
        ]);
        let names: Vec<&str> = index
            .containing(12.0, 15.0, IntervalMode::Embracing)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["S2", "R"]);

        // R stops at 20 and cannot embrace [18, 22]
        let names: Vec<&str> = index
            .containing(18.0, 22.0, IntervalMode::Embracing)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["S2"]);
    }

    #[test]
    fn test_within_containment() {
        let index = IntervalIndex::build(vec![
            Interval::new("inside", 12.0, 14.0),
            Interval::new("wide", 5.0, 25.0),
            Interval::new("straddles", 19.0, 21.0),
        ]);
        let names: Vec<&str> = index
            .containing(10.0, 20.0, IntervalMode::Within)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["inside"]);
    }

    #[test]
    fn test_boundary_exact_cases_included() {
        let index = IntervalIndex::build(vec![Interval::new("exact", 10.0, 20.0)]);
        assert_eq!(index.containing(10.0, 20.0, IntervalMode::Within).len(), 1);
        assert_eq!(
            index.containing(10.0, 20.0, IntervalMode::Embracing).len(),
            1
        );
    }

    #[test]
    fn test_first_after() {
        let index = IntervalIndex::build(vec![
            Interval::new("a", 5.0, 6.0),
            Interval::new("b", 10.0, 12.0),
            Interval::new("c", 17.0, 18.0),
        ]);
        assert_eq!(index.first_after(10.0), Some(17.0));
        assert_eq!(index.first_after(17.0), None);
        assert_eq!(index.first_after(4.0), Some(5.0));
    }

    #[test]
    fn test_bounds() {
        let index = IntervalIndex::build(vec![
            Interval::new("a", 5.0, 30.0),
            Interval::new("b", 10.0, 12.0),
        ]);
        assert_eq!(index.bounds().unwrap(), (5.0, 30.0));
        assert!(IntervalIndex::default().bounds().is_err());
    }
}
