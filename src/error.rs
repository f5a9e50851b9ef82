//! Error types for reprolink
//!
//! Structural lookup failures (missing traces, bad indices, kind mismatches)
//! are reported as errors and abort the failing call only. Tolerance cases
//! (degenerate stimuli, invalid windows, clamped read parameters) are handled
//! locally with a log record and never surface here.

use thiserror::Error;

use crate::trace::TraceKind;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// reprolink error types
#[derive(Error, Debug)]
pub enum Error {
    /// A trace name is not referenced by the segment or unknown to the store
    #[error("trace '{name}' is not among the references of '{segment}'")]
    TraceNotFound {
        /// Requested trace name
        name: String,
        /// Name of the segment the lookup ran against
        segment: String,
    },

    /// No repro run with the requested name exists in the dataset
    #[error("no repro run named '{0}' in this dataset")]
    ReproNotFound(String),

    /// A feature name is not recorded for the tag
    #[error("feature '{name}' not found on tag '{tag}'")]
    FeatureNotFound {
        /// Requested feature name
        name: String,
        /// Id of the tag the lookup ran against
        tag: String,
    },

    /// A trace exists but its kind does not match the caller's expectation
    #[error("trace '{name}' holds {found:?} data, expected {expected:?}")]
    TypeMismatch {
        /// Requested trace name
        name: String,
        /// Kind the caller asserted
        expected: TraceKind,
        /// Kind actually recorded
        found: TraceKind,
    },

    /// Stimulus or occurrence index outside the valid range
    #[error("index {index} is out of bounds for {count} entries")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Number of available entries
        count: usize,
    },

    /// Timeline queries that need at least one repro run ran against none
    #[error("timeline holds no repro runs")]
    EmptyTimeline,

    /// A data link is malformed or does not match the store it is read from
    #[error("invalid data link: {0}")]
    InvalidLink(String),

    /// Underlying store failure
    #[error("store error: {0}")]
    Store(String),

    /// Configuration file failure
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_not_found_message() {
        let error = Error::TraceNotFound {
            name: "V-1".to_string(),
            segment: "BaselineActivity_1".to_string(),
        };
        let text = format!("{error}");
        assert!(text.contains("V-1"));
        assert!(text.contains("BaselineActivity_1"));
    }

    #[test]
    fn test_type_mismatch_message() {
        let error = Error::TypeMismatch {
            name: "Spikes-1".to_string(),
            expected: TraceKind::Continuous,
            found: TraceKind::Event,
        };
        let text = format!("{error}");
        assert!(text.contains("Spikes-1"));
        assert!(text.contains("Event"));
        assert!(text.contains("Continuous"));
    }

    #[test]
    fn test_out_of_range_message() {
        let error = Error::OutOfRange { index: 7, count: 3 };
        let text = format!("{error}");
        assert!(text.contains('7'));
        assert!(text.contains('3'));
    }

    #[test]
    fn test_empty_timeline_message() {
        let text = format!("{}", Error::EmptyTimeline);
        assert!(text.contains("no repro runs"));
    }
}
