//! Finder tag model and storage.
//!
//! Tags live in the `com.apple.metadata:_kMDItemUserTags` extended attribute
//! of each file. [`TagStore`] reads and writes that attribute; [`TagSet`] and
//! [`TagCatalog`] are the in-memory views the session works with.

pub mod attributes;
mod catalog;
pub mod fallback;
pub mod payload;
mod store;

pub use catalog::{CatalogEntry, DEFAULT_TAG_NAMES, TagCatalog};
pub use store::{TagStore, TagStoreError};

use std::collections::BTreeSet;

/// Extended attribute holding the Finder tag list.
pub const TAGS_ATTRIBUTE: &str = "com.apple.metadata:_kMDItemUserTags";

/// Unique, case-sensitive tag names applied to one file.
///
/// Ordering is irrelevant to Finder; names are kept sorted so serialized
/// payloads are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Insert a name, returning `true` if it was not present yet.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    /// Remove a name, returning `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name)
    }

    /// Flip membership of `name`. Returns `true` when the tag is now applied.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.0.remove(name) {
            false
        } else {
            self.0.insert(name.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Names present in `self` or `other`.
    pub fn union(&self, other: &TagSet) -> TagSet {
        self.0.union(&other.0).cloned().collect()
    }

    /// Names present in `self` but not in `other`.
    pub fn difference(&self, other: &TagSet) -> TagSet {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for TagSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for TagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", names.join(", "))
    }
}
