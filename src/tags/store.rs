use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use super::{
    TAGS_ATTRIBUTE, TagSet,
    attributes::AttributeStore,
    fallback::TagWriteFallback,
    payload::{self, PayloadError},
};

/// Errors reported by [`TagStore`].
#[derive(Debug, Error)]
pub enum TagStoreError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read tags from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write tags to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
    #[error("Failed to parse tag data on {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: PayloadError,
    },
    #[error("Invalid tag data for {path}: {source}")]
    InvalidData {
        path: PathBuf,
        source: PayloadError,
    },
}

/// Reads and writes Finder tags on files.
///
/// Writes go straight to the attribute first and fall back to the
/// configured [`TagWriteFallback`] when that is refused.
#[derive(Clone)]
pub struct TagStore {
    attributes: Arc<dyn AttributeStore>,
    fallback: Option<Arc<dyn TagWriteFallback>>,
}

impl TagStore {
    pub fn new(
        attributes: Arc<dyn AttributeStore>,
        fallback: Option<Arc<dyn TagWriteFallback>>,
    ) -> Self {
        Self {
            attributes,
            fallback,
        }
    }

    /// Read every tag stored on `path`, color codes removed.
    pub fn read_tags(&self, path: &Path) -> Result<TagSet, TagStoreError> {
        ensure_exists(path)?;
        let raw = self
            .attributes
            .get(path, TAGS_ATTRIBUTE)
            .map_err(|source| TagStoreError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let Some(raw) = raw else {
            tracing::debug!("No tag attribute on {}", path.display());
            return Ok(TagSet::new());
        };
        let tags = payload::decode(&raw).map_err(|source| TagStoreError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Read {} tag(s) from {}: {tags}", tags.len(), path.display());
        Ok(tags)
    }

    /// Stored entries exactly as Finder wrote them, color codes included.
    pub fn read_raw_tags(&self, path: &Path) -> Result<Vec<String>, TagStoreError> {
        ensure_exists(path)?;
        let raw = self
            .attributes
            .get(path, TAGS_ATTRIBUTE)
            .map_err(|source| TagStoreError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        match raw {
            Some(raw) => {
                payload::decode_entries(&raw).map_err(|source| TagStoreError::ParseError {
                    path: path.to_path_buf(),
                    source,
                })
            }
            None => Ok(Vec::new()),
        }
    }

    /// Replace the tags on `path`. An empty set removes the attribute.
    pub fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), TagStoreError> {
        ensure_exists(path)?;
        if tags.is_empty() {
            return self
                .attributes
                .remove(path, TAGS_ATTRIBUTE)
                .map(|()| tracing::debug!("Removed tags from {}", path.display()))
                .map_err(|err| TagStoreError::WriteFailed {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
        }

        let bytes = payload::encode(tags).map_err(|source| TagStoreError::InvalidData {
            path: path.to_path_buf(),
            source,
        })?;
        let direct_error = match self.attributes.set(path, TAGS_ATTRIBUTE, &bytes) {
            Ok(()) => {
                tracing::debug!("Wrote tags {tags} to {}", path.display());
                return Ok(());
            }
            Err(err) => err,
        };

        let Some(fallback) = &self.fallback else {
            return Err(TagStoreError::WriteFailed {
                path: path.to_path_buf(),
                reason: direct_error.to_string(),
            });
        };
        tracing::info!(
            "Direct tag write to {} failed ({direct_error}); trying fallback writer",
            path.display()
        );
        fallback.write_tags(path, tags).map_err(|fallback_error| {
            tracing::warn!(
                "Fallback tag write to {} failed: {fallback_error}",
                path.display()
            );
            TagStoreError::WriteFailed {
                path: path.to_path_buf(),
                reason: format!("{direct_error}; fallback: {fallback_error}"),
            }
        })
    }
}

fn ensure_exists(path: &Path) -> Result<(), TagStoreError> {
    if path.exists() {
        Ok(())
    } else {
        Err(TagStoreError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::attributes::MemoryAttributes;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    #[derive(Default)]
    struct RecordingFallback {
        fail: bool,
        writes: Mutex<Vec<(PathBuf, TagSet)>>,
    }

    impl TagWriteFallback for RecordingFallback {
        fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), String> {
            self.writes
                .lock()
                .unwrap()
                .push((path.to_path_buf(), tags.clone()));
            if self.fail {
                Err("script refused".into())
            } else {
                Ok(())
            }
        }
    }

    fn store_with(
        attributes: &Arc<MemoryAttributes>,
        fallback: Option<Arc<RecordingFallback>>,
    ) -> TagStore {
        TagStore::new(
            attributes.clone(),
            fallback.map(|f| f as Arc<dyn TagWriteFallback>),
        )
    }

    #[test]
    fn round_trips_sets_including_empty() {
        let file = NamedTempFile::new().unwrap();
        let attributes = Arc::new(MemoryAttributes::new());
        let store = store_with(&attributes, None);

        for tags in [
            TagSet::from_iter(["Arc", "KP", "Other1"]),
            TagSet::from_iter(["HW-SGR"]),
            TagSet::new(),
        ] {
            store.write_tags(file.path(), &tags).unwrap();
            assert_eq!(store.read_tags(file.path()).unwrap(), tags);
        }
    }

    #[test]
    fn empty_write_removes_attribute() {
        let file = NamedTempFile::new().unwrap();
        let attributes = Arc::new(MemoryAttributes::new());
        let store = store_with(&attributes, None);
        store
            .write_tags(file.path(), &TagSet::from_iter(["Arc"]))
            .unwrap();

        store.write_tags(file.path(), &TagSet::new()).unwrap();

        assert!(attributes.raw(file.path(), TAGS_ATTRIBUTE).is_none());
        assert!(store.read_tags(file.path()).unwrap().is_empty());
    }

    #[test]
    fn raw_read_keeps_color_suffix() {
        let file = NamedTempFile::new().unwrap();
        let attributes = Arc::new(MemoryAttributes::new());
        let mut payload = Vec::new();
        plist::Value::Array(vec![plist::Value::String("Red\n6".into())])
            .to_writer_binary(&mut payload)
            .unwrap();
        attributes.insert_raw(file.path(), TAGS_ATTRIBUTE, payload);
        let store = store_with(&attributes, None);

        assert_eq!(store.read_raw_tags(file.path()).unwrap(), vec!["Red\n6"]);
        assert_eq!(
            store.read_tags(file.path()).unwrap(),
            TagSet::from_iter(["Red"])
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let attributes = Arc::new(MemoryAttributes::new());
        let store = store_with(&attributes, None);
        let path = Path::new("/definitely/not/here.mkv");
        assert!(matches!(
            store.read_tags(path),
            Err(TagStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.write_tags(path, &TagSet::from_iter(["Arc"])),
            Err(TagStoreError::NotFound(_))
        ));
    }

    #[test]
    fn unparseable_payload_is_parse_error() {
        let file = NamedTempFile::new().unwrap();
        let attributes = Arc::new(MemoryAttributes::new());
        attributes.insert_raw(file.path(), TAGS_ATTRIBUTE, b"garbage!".to_vec());
        let store = store_with(&attributes, None);
        assert!(matches!(
            store.read_tags(file.path()),
            Err(TagStoreError::ParseError { .. })
        ));
    }

    #[test]
    fn denied_write_uses_fallback() {
        let file = NamedTempFile::new().unwrap();
        let attributes = Arc::new(MemoryAttributes::new());
        attributes.deny_writes(true);
        let fallback = Arc::new(RecordingFallback::default());
        let store = store_with(&attributes, Some(fallback.clone()));
        let tags = TagSet::from_iter(["RPLY"]);

        store.write_tags(file.path(), &tags).unwrap();

        let writes = fallback.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], (file.path().to_path_buf(), tags));
    }

    #[test]
    fn write_fails_only_when_both_paths_fail() {
        let file = NamedTempFile::new().unwrap();
        let attributes = Arc::new(MemoryAttributes::new());
        attributes.deny_writes(true);
        let fallback = Arc::new(RecordingFallback {
            fail: true,
            ..RecordingFallback::default()
        });
        let store = store_with(&attributes, Some(fallback));

        let err = store
            .write_tags(file.path(), &TagSet::from_iter(["RPLY"]))
            .unwrap_err();
        match err {
            TagStoreError::WriteFailed { reason, .. } => {
                assert!(reason.contains("script refused"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
