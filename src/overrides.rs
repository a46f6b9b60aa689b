//! Ingredients the user has chosen to build from scratch.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Lower-cased, trimmed form used for every stored ingredient name.
pub fn normalize_ingredient(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Insertion-ordered set of normalized ingredient names.
///
/// Ordering is kept so the serialized form (and therefore the page URL) is
/// stable while the user adds and removes chips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet {
    names: Vec<String>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name`. Returns `false` if it was already present or blank.
    pub fn add(&mut self, name: &str) -> bool {
        let name = normalize_ingredient(name);
        if name.is_empty() || self.names.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Remove `name`. Returns `false` if it was not present.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = normalize_ingredient(name);
        match self.names.iter().position(|n| *n == name) {
            Some(idx) => {
                self.names.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Add if absent, remove if present. Returns whether `name` is now in the set.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.remove(name) {
            false
        } else {
            self.add(name)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_ingredient(name);
        self.names.contains(&name)
    }

    pub fn keys(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Comma-joined names in insertion order, as used in the query string.
    pub fn serialize(&self) -> String {
        self.names.join(",")
    }

    /// Parse the comma-separated form. Blank entries and duplicates are skipped.
    pub fn parse(list: &str) -> Self {
        let mut set = Self::new();
        for name in list.split(',') {
            set.add(name);
        }
        set
    }
}

impl<'a> FromIterator<&'a str> for OverrideSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.add(name);
        }
        set
    }
}

/// On the wire the set is an object keyed by name with empty objects as values.
impl Serialize for OverrideSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for name in &self.names {
            map.serialize_entry(name, &serde_json::Map::new())?;
        }
        map.end()
    }
}
