//! Tag values and ordered tag collections.
//!
//! Tag values are a closed sum type over the five scalar kinds the wire
//! format can carry. Anything else is unrepresentable at the API boundary,
//! so there is no runtime "unsupported type" path.

use serde::{Deserialize, Serialize};

/// A tag value: one of the five scalar kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for TagValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for TagValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

/// An insertion-ordered key/value tag collection with last-wins merge.
///
/// Re-inserting an existing key replaces its value in place, keeping the
/// original position, so serialized tag order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagMap {
    entries: Vec<(String, TagValue)>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TagValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Merge `other` into `self`; keys present in both take `other`'s value.
    pub fn merge(&mut self, other: TagMap) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<TagValue>> FromIterator<(K, V)> for TagMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = TagMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_wins_keeps_position() {
        let mut tags = TagMap::new();
        tags.insert("first", 1i64);
        tags.insert("second", "a");
        tags.insert("first", 2i64);

        assert_eq!(tags.len(), 2);
        let keys: Vec<&str> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["first", "second"]);
        assert_eq!(tags.get("first"), Some(&TagValue::Int(2)));
    }

    #[test]
    fn test_tag_value_serde_naming() {
        let json = serde_json::to_string(&TagValue::Int(7)).unwrap();
        assert_eq!(json, r#"{"int":7}"#);
        let back: TagValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TagValue::Int(7));
    }

    #[test]
    fn test_merge_overrides() {
        let mut tags: TagMap = [("k", TagValue::Int(1)), ("other", TagValue::Bool(true))]
            .into_iter()
            .collect();
        let update: TagMap = [("k", TagValue::Int(5))].into_iter().collect();
        tags.merge(update);
        assert_eq!(tags.get("k"), Some(&TagValue::Int(5)));
        assert_eq!(tags.len(), 2);
    }
}
