//! Annotation strings attached to reflected fields
//!
//! Registration code carries each field's annotation as a raw string such as
//! `"display:Health, readonly, min:0"`. This module splits it into key/value
//! properties.

use indexmap::{IndexMap, IndexSet};

const WHITESPACE: &[char] = &[' ', '\t', '\r', '\n'];

/// A single `key:value` property; flags carry an empty value
pub type Property = (String, String);

/// Split a raw annotation into ordered `(key, value)` pairs
///
/// Segments are separated by `,` and split on the first `:`. Keys and values
/// are trimmed of ASCII whitespace. A segment with an empty key is skipped;
/// a segment without `:` yields an empty value.
pub fn extract_properties(raw: &str) -> Vec<Property> {
    let mut properties = Vec::new();

    for segment in raw.split(',') {
        let (key, value) = match segment.split_once(':') {
            Some((key, value)) => (key, value),
            None => (segment, ""),
        };

        let key = key.trim_matches(WHITESPACE);
        if key.is_empty() {
            if !segment.trim_matches(WHITESPACE).is_empty() {
                log::trace!("skipping annotation segment without a key: {:?}", segment);
            }
            continue;
        }

        properties.push((key.to_string(), value.trim_matches(WHITESPACE).to_string()));
    }

    properties
}

/// Key/value view over an annotation
///
/// Preserves first-seen key order; a repeated key keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    properties: IndexMap<String, String>,
}

impl PropertyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw annotation string
    pub fn parse(raw: &str) -> Self {
        extract_properties(raw).into_iter().collect()
    }

    /// Get a property value, empty when absent
    pub fn get_property(&self, key: &str) -> &str {
        self.properties.get(key).map(String::as_str).unwrap_or("")
    }

    /// Check whether a key is present
    pub fn get_flag(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Insert a property, overwriting an existing value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Iterate properties in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if there are no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Canonical `key:value,` rendering, the form emitted into registration code
    pub fn properties_str(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.properties {
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push(',');
        }
        out
    }
}

impl FromIterator<Property> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Boolean flag view over an annotation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    flags: IndexSet<String>,
}

impl PropertySet {
    /// Parse a raw annotation string, keeping only the keys
    pub fn parse(raw: &str) -> Self {
        Self {
            flags: extract_properties(raw).into_iter().map(|(k, _)| k).collect(),
        }
    }

    /// Check if a flag is set
    pub fn contains(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Number of flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Check if no flags are set
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<Property> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_properties() {
        assert_eq!(
            extract_properties("a:1, b, c:"),
            pairs(&[("a", "1"), ("b", ""), ("c", "")])
        );
    }

    #[test]
    fn test_empty_keys_dropped() {
        assert_eq!(extract_properties(" : , x:y"), pairs(&[("x", "y")]));
        assert!(extract_properties("").is_empty());
        assert!(extract_properties(",,,").is_empty());
    }

    #[test]
    fn test_split_on_first_colon() {
        assert_eq!(
            extract_properties("url: http://x\t,\r\nflag"),
            pairs(&[("url", "http://x"), ("flag", "")])
        );
    }

    #[test]
    fn test_property_map_last_value_wins() {
        let map = PropertyMap::parse("a:1, b, a:2");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get_property("a"), "2");
        assert_eq!(map.get_property("missing"), "");
        assert!(map.get_flag("b"));
        assert!(!map.get_flag("c"));
        assert_eq!(map.properties_str(), "a:2,b:,");
    }

    #[test]
    fn test_property_set() {
        let set = PropertySet::parse("readonly, hidden:true, readonly");
        assert_eq!(set.len(), 2);
        assert!(set.contains("readonly"));
        assert!(set.contains("hidden"));
        assert!(!set.contains("true"));
    }
}
