use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::TagSet;

/// Catalog installed on first run when no configuration exists.
pub const DEFAULT_TAG_NAMES: [&str; 7] = ["Arc", "KP", "TMP", "PRG", "HW-SGR", "RPLY", "Other1"];

/// One toggleable tag offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }
}

/// Ordered list of tags the user can toggle.
///
/// A file may carry tags outside the catalog; those are hidden from the
/// session but never removed from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for TagCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_TAG_NAMES
                .iter()
                .map(|name| CatalogEntry::new(*name, true))
                .collect(),
        )
    }
}

impl TagCatalog {
    /// Build a catalog, dropping blank names and later duplicates.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name.trim().to_string();
                if name.is_empty() || !seen.insert(name.clone()) {
                    return None;
                }
                Some(CatalogEntry { name, ..entry })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Enabled names in catalog order.
    pub fn enabled_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.name.as_str())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.enabled && entry.name == name)
    }

    /// Keep only the names that are enabled in this catalog.
    pub fn filter(&self, tags: &TagSet) -> TagSet {
        tags.iter().filter(|name| self.is_enabled(name)).collect()
    }

    /// Enable or disable an entry. Returns `false` when the name is unknown.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Move the entries at `offsets` so they land before position `destination`
    /// of the original list, keeping their relative order.
    pub fn move_entries(&mut self, offsets: &[usize], destination: usize) {
        let mut picked: Vec<usize> = offsets
            .iter()
            .copied()
            .filter(|idx| *idx < self.entries.len())
            .collect();
        picked.sort_unstable();
        picked.dedup();
        if picked.is_empty() {
            return;
        }
        let destination = destination.min(self.entries.len());
        let shift = picked.iter().filter(|idx| **idx < destination).count();
        let mut moved = Vec::with_capacity(picked.len());
        for idx in picked.iter().rev() {
            moved.push(self.entries.remove(*idx));
        }
        moved.reverse();
        let insert_at = destination - shift;
        self.entries.splice(insert_at..insert_at, moved);
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }
}
