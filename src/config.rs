//! Optional JSON configuration.
//!
//! A configuration maps protocol names to default trace names per abstract
//! signal role and may pin a log verbosity. Built-in defaults are merged
//! with an optional local `config.json` in the working directory; local
//! entries win.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;

/// Per-protocol signal-role → trace-name mappings plus log verbosity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log verbosity name understood by the subscriber, e.g. `"info"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// protocol name → (signal role → trace name)
    #[serde(default)]
    pub trace_configs: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// Empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a configuration file.
    ///
    /// # Errors
    /// Returns an IO error when the file cannot be opened and a JSON error
    /// on malformed contents.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading configuration from {}", path.display());
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Built-in defaults overlaid with `config.json` from the working
    /// directory, when present. A missing local file is not an error.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();
        match Self::from_file("config.json") {
            Ok(local) => config.merge(local),
            Err(e) => info!("no local configuration used: {e}"),
        }
        config
    }

    /// Overlay another configuration; its entries win per protocol.
    pub fn merge(&mut self, other: Self) {
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        for (protocol, signals) in other.trace_configs {
            self.trace_configs.insert(protocol, signals);
        }
    }

    /// Signal-role mappings for one protocol.
    #[must_use]
    pub fn trace_configuration(&self, protocol: &str) -> Option<&BTreeMap<String, String>> {
        self.trace_configs.get(protocol)
    }

    /// Trace name configured for one signal role of one protocol.
    #[must_use]
    pub fn signal_trace(&self, protocol: &str, signal: &str) -> Option<&str> {
        self.trace_configs
            .get(protocol)
            .and_then(|signals| signals.get(signal))
            .map(String::as_str)
    }

    /// Configured log verbosity, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }
}
