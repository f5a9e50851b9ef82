//! Explicit protocol registry.
//!
//! Maps protocol-type names to profiles describing which concrete trace
//! serves each abstract signal role ("spikes", "membrane voltage", ...).
//! Populated by explicit registration calls or from a [`Config`]; the
//! timeline and resolver are agnostic to which profile a run gets.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::Config;

/// Capability description for one protocol type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolProfile {
    /// Protocol-type name this profile applies to
    pub protocol: String,
    /// signal role → concrete trace name
    pub signals: BTreeMap<String, String>,
}

impl ProtocolProfile {
    /// New profile with no signal mappings.
    #[must_use]
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            signals: BTreeMap::new(),
        }
    }

    /// Map a signal role to a trace name (builder style).
    #[must_use]
    pub fn with_signal(mut self, role: impl Into<String>, trace: impl Into<String>) -> Self {
        self.signals.insert(role.into(), trace.into());
        self
    }
}

/// Registry of protocol profiles, keyed by protocol-type name.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    profiles: HashMap<String, ProtocolProfile>,
}

impl ProtocolRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry built from a configuration's `trace_configs` entries.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for (protocol, signals) in &config.trace_configs {
            let mut profile = ProtocolProfile::new(protocol.clone());
            profile.signals = signals.clone();
            registry.register(profile);
        }
        registry
    }

    /// Register a profile. The first registration for a protocol wins;
    /// later duplicates are ignored with a log record.
    pub fn register(&mut self, profile: ProtocolProfile) {
        let key = profile.protocol.clone();
        if self.profiles.contains_key(&key) {
            debug!("profile for protocol '{key}' already registered, keeping the first");
            return;
        }
        self.profiles.insert(key, profile);
    }

    /// Profile for a protocol-type name, if registered.
    #[must_use]
    pub fn resolve(&self, protocol: &str) -> Option<&ProtocolProfile> {
        self.profiles.get(protocol)
    }

    /// Number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no profile is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_registration_wins() {
        let mut registry = ProtocolRegistry::new();
        registry.register(ProtocolProfile::new("SAM").with_signal("spikes", "Spikes-1"));
        registry.register(ProtocolProfile::new("SAM").with_signal("spikes", "Spikes-2"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.resolve("SAM").unwrap().signals["spikes"],
            "Spikes-1"
        );
    }

    #[test]
    fn test_from_config() {
        let json = r#"{ "trace_configs": { "SAM": { "spikes": "Spikes-1" } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let registry = ProtocolRegistry::from_config(&config);
        assert!(registry.resolve("SAM").is_some());
        assert!(registry.resolve("Chirps").is_none());
    }
}
