use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label set identifying a time series.
///
/// Keys are kept sorted, so two label sets built in a different key order
/// compare, hash and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical serialization used as the join key for merging,
    /// grouping and series exclusion.
    ///
    /// Keys are sorted and values are escaped like PromQL string literals,
    /// so distinct label sets never share a key.
    pub fn canonical_key(&self) -> String {
        let mut key = String::with_capacity(2 + self.0.len() * 16);
        key.push('{');
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                key.push(',');
            }
            key.push_str(name);
            key.push_str("=\"");
            push_escaped(&mut key, value);
            key.push('"');
        }
        key.push('}');
        key
    }
}

/// Appends `value` escaped for a double-quoted PromQL string literal.
pub fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
