//! Dataset-owned read-through caches.
//!
//! Metadata trees and feature payloads are immutable once read, so the
//! caches follow a compute-if-absent contract with first-writer-wins insert
//! semantics: concurrent duplicate computation is tolerated and the first
//! stored value stays authoritative. Scoped to one dataset, cleared when the
//! dataset closes.

use dashmap::DashMap;
use tracing::debug;

use crate::metadata::MetadataTree;
use crate::Result;

type FeatureKey = (String, String, Option<usize>);

/// Shared caches handed to every segment of a dataset.
#[derive(Debug, Default)]
pub struct SegmentCaches {
    metadata: DashMap<String, MetadataTree>,
    features: DashMap<FeatureKey, Vec<f64>>,
}

impl SegmentCaches {
    /// New empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata tree for a tag id, computing and storing it on first access.
    ///
    /// Returns a clone; the cached copy is never handed out mutably.
    ///
    /// # Errors
    /// Propagates the compute closure's error; nothing is cached in that case.
    pub fn metadata_or_insert_with<F>(&self, tag_id: &str, compute: F) -> Result<MetadataTree>
    where
        F: FnOnce() -> Result<MetadataTree>,
    {
        if let Some(cached) = self.metadata.get(tag_id) {
            debug!("metadata cache hit for tag {tag_id}");
            return Ok(cached.value().clone());
        }
        let tree = compute()?;
        let entry = self.metadata.entry(tag_id.to_string()).or_insert(tree);
        Ok(entry.value().clone())
    }

    /// Feature payload for `(tag, feature, occurrence)`, computing and
    /// storing it on first access.
    ///
    /// # Errors
    /// Propagates the compute closure's error; nothing is cached in that case.
    pub fn feature_or_insert_with<F>(
        &self,
        tag_id: &str,
        feature: &str,
        index: Option<usize>,
        compute: F,
    ) -> Result<Vec<f64>>
    where
        F: FnOnce() -> Result<Vec<f64>>,
    {
        let key = (tag_id.to_string(), feature.to_string(), index);
        if let Some(cached) = self.features.get(&key) {
            debug!("feature cache hit for {tag_id}/{feature}");
            return Ok(cached.value().clone());
        }
        let data = compute()?;
        let entry = self.features.entry(key).or_insert(data);
        Ok(entry.value().clone())
    }

    /// Number of cached metadata trees.
    #[must_use]
    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }

    /// Number of cached feature payloads.
    #[must_use]
    pub fn feature_len(&self) -> usize {
        self.features.len()
    }

    /// Drop all cached entries.
    pub fn clear(&self) {
        self.metadata.clear();
        self.features.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Property;
    use crate::Error;

    #[test]
    fn test_metadata_computed_once() {
        let caches = SegmentCaches::new();
        let mut calls = 0;
        for _ in 0..3 {
            let tree = caches
                .metadata_or_insert_with("tag-1", || {
                    calls += 1;
                    Ok(MetadataTree::new()
                        .with_property("RePro", Property::scalar("SAM", None)))
                })
                .unwrap();
            assert!(tree.property("RePro").is_some());
        }
        assert_eq!(calls, 1);
        assert_eq!(caches.metadata_len(), 1);
    }

    #[test]
    fn test_failed_compute_not_cached() {
        let caches = SegmentCaches::new();
        let result = caches.feature_or_insert_with("tag-1", "delay", Some(0), || {
            Err(Error::Store("read failed".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(caches.feature_len(), 0);

        let data = caches
            .feature_or_insert_with("tag-1", "delay", Some(0), || Ok(vec![0.1]))
            .unwrap();
        assert_eq!(data, vec![0.1]);
    }

    #[test]
    fn test_occurrences_cached_separately() {
        let caches = SegmentCaches::new();
        let a = caches
            .feature_or_insert_with("tag-1", "delay", Some(0), || Ok(vec![0.1]))
            .unwrap();
        let b = caches
            .feature_or_insert_with("tag-1", "delay", Some(1), || Ok(vec![0.2]))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(caches.feature_len(), 2);
    }

    #[test]
    fn test_clear() {
        let caches = SegmentCaches::new();
        caches
            .metadata_or_insert_with("tag-1", || Ok(MetadataTree::new()))
            .unwrap();
        caches.clear();
        assert_eq!(caches.metadata_len(), 0);
    }
}
