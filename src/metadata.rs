//! Metadata trees attached to tagged regions.
//!
//! A tree is a set of named sections, each holding name → (values, unit)
//! properties and nested subsections. Trees are read from the store once and
//! cached; stimulus segments merge per-occurrence overrides on top of a clone
//! of the base tree, the cached copy stays untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::Result;

/// A single metadata property: one or more values plus an optional unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Recorded values
    pub values: Vec<Value>,
    /// Physical unit, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Property {
    /// Single-value property with an optional unit.
    #[must_use]
    pub fn scalar(value: impl Into<Value>, unit: Option<&str>) -> Self {
        Self {
            values: vec![value.into()],
            unit: unit.map(str::to_string),
        }
    }

    /// Multi-value property built from f64 samples.
    #[must_use]
    pub fn from_values(values: Vec<f64>, unit: Option<&str>) -> Self {
        Self {
            values: values.into_iter().map(Value::from).collect(),
            unit: unit.map(str::to_string),
        }
    }

    /// First value as a string, if it is one.
    #[must_use]
    pub fn first_string(&self) -> Option<&str> {
        self.values.first().and_then(Value::as_str)
    }

    /// First value as f64, if numeric.
    #[must_use]
    pub fn first_f64(&self) -> Option<f64> {
        self.values.first().and_then(Value::as_f64)
    }

    /// Case-insensitive containment test against the rendered values.
    ///
    /// Used by the dataset's property filters.
    #[must_use]
    pub fn contains_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.values.iter().any(|v| match v {
            Value::String(s) => s.to_lowercase().contains(&needle),
            other => other.to_string().to_lowercase().contains(&needle),
        })
    }
}

/// Tree of metadata sections and properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataTree {
    /// Properties recorded at this level
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Property>,
    /// Nested sections
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sections: BTreeMap<String, MetadataTree>,
}

impl MetadataTree {
    /// Empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the tree has neither properties nor sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.sections.is_empty()
    }

    /// Add a property at this level (builder style).
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Add a nested section (builder style).
    #[must_use]
    pub fn with_section(mut self, name: impl Into<String>, section: MetadataTree) -> Self {
        self.sections.insert(name.into(), section);
        self
    }

    /// Direct child section by name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&MetadataTree> {
        self.sections.get(name)
    }

    /// Property at this level by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Look up a property by dotted path, e.g. `"RePro"` or
    /// `"Settings.duration"`.
    ///
    /// Path components name sections; a component that is not a direct child
    /// is searched for depth-first in the subtree. A single-component path
    /// falls back to a depth-first property search over the whole tree.
    #[must_use]
    pub fn find_property(&self, path: &str) -> Option<&Property> {
        let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
        let (last, heads) = parts.split_last()?;
        let mut node = self;
        for head in heads {
            node = node.section(head).or_else(|| node.find_section(head))?;
        }
        if heads.is_empty() {
            node.property(last).or_else(|| self.deep_property(last))
        } else {
            node.property(last)
        }
    }

    fn find_section(&self, name: &str) -> Option<&MetadataTree> {
        if let Some(found) = self.sections.get(name) {
            return Some(found);
        }
        self.sections.values().find_map(|sub| sub.find_section(name))
    }

    fn deep_property(&self, name: &str) -> Option<&Property> {
        if let Some(found) = self.properties.get(name) {
            return Some(found);
        }
        self.sections.values().find_map(|sub| sub.deep_property(name))
    }

    fn find_section_mut(&mut self, name: &str) -> Option<&mut MetadataTree> {
        if self.sections.contains_key(name) {
            return self.sections.get_mut(name);
        }
        for sub in self.sections.values_mut() {
            if let Some(found) = sub.find_section_mut(name) {
                return Some(found);
            }
        }
        None
    }

    /// Set a property addressed by dotted path, descending into sections.
    ///
    /// A path component that is not a direct child section is searched for
    /// depth-first. Returns false (and logs) when an intermediate section
    /// cannot be found; the tree is left unchanged in that case.
    pub fn set_property(&mut self, path: &str, property: Property) -> bool {
        let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
        let Some((last, heads)) = parts.split_last() else {
            warn!("set_property: empty property path");
            return false;
        };
        let mut node = self;
        for head in heads {
            let next = if node.sections.contains_key(*head) {
                node.sections.get_mut(*head)
            } else {
                node.find_section_mut(head)
            };
            match next {
                Some(found) => node = found,
                None => {
                    warn!("set_property: no section '{head}' for path '{path}', skipping");
                    return false;
                }
            }
        }
        node.properties.insert((*last).to_string(), property);
        true
    }

    /// Render the tree as a JSON string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a tree from its JSON rendering.
    ///
    /// # Errors
    /// Returns an error on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
