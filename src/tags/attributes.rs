//! Raw extended-attribute access.

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// Byte-level access to named attributes on a file.
pub trait AttributeStore: Send + Sync {
    /// Fetch an attribute; `Ok(None)` when it is not set.
    fn get(&self, path: &Path, name: &str) -> io::Result<Option<Vec<u8>>>;
    fn set(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()>;
    /// Remove an attribute. Removing a missing attribute succeeds.
    fn remove(&self, path: &Path, name: &str) -> io::Result<()>;
}

/// Real extended attributes through the OS `*xattr` calls.
///
/// Symlinks are followed so tags land on the file Finder shows.
#[derive(Debug, Default, Clone, Copy)]
pub struct XattrStore;

#[cfg(target_os = "macos")]
const MISSING_ATTRIBUTE_ERRNO: Option<i32> = Some(libc::ENOATTR);
#[cfg(all(unix, not(target_os = "macos")))]
const MISSING_ATTRIBUTE_ERRNO: Option<i32> = Some(libc::ENODATA);
#[cfg(not(unix))]
const MISSING_ATTRIBUTE_ERRNO: Option<i32> = None;

impl AttributeStore for XattrStore {
    fn get(&self, path: &Path, name: &str) -> io::Result<Option<Vec<u8>>> {
        xattr::get_deref(path, name)
    }

    fn set(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        xattr::set_deref(path, name, value)
    }

    fn remove(&self, path: &Path, name: &str) -> io::Result<()> {
        match xattr::remove_deref(path, name) {
            Err(err) if is_missing_attribute(&err) => Ok(()),
            other => other,
        }
    }
}

fn is_missing_attribute(err: &io::Error) -> bool {
    MISSING_ATTRIBUTE_ERRNO.is_some() && err.raw_os_error() == MISSING_ATTRIBUTE_ERRNO
}

/// In-process attribute map for dry runs and tests.
///
/// Counts reads so callers can observe how often tags were fetched, and can
/// be told to refuse reads or writes the way a sandboxed process is refused.
#[derive(Debug, Default)]
pub struct MemoryAttributes {
    values: Mutex<HashMap<(PathBuf, String), Vec<u8>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    deny_writes: AtomicBool,
    deny_reads: AtomicBool,
}

impl MemoryAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes without going through the tag codec.
    pub fn insert_raw(&self, path: &Path, name: &str, value: Vec<u8>) {
        self.lock().insert((path.to_path_buf(), name.to_string()), value);
    }

    pub fn raw(&self, path: &Path, name: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(&(path.to_path_buf(), name.to_string()))
            .cloned()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent `set` fail with `PermissionDenied`.
    pub fn deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    /// Make every subsequent `get` fail with an I/O error.
    pub fn deny_reads(&self, deny: bool) {
        self.deny_reads.store(deny, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(PathBuf, String), Vec<u8>>> {
        self.values.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl AttributeStore for MemoryAttributes {
    fn get(&self, path: &Path, name: &str) -> io::Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.deny_reads.load(Ordering::SeqCst) {
            return Err(io::Error::other("attribute reads denied"));
        }
        Ok(self.raw(path, name))
    }

    fn set(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "attribute writes denied",
            ));
        }
        self.insert_raw(path, name, value.to_vec());
        Ok(())
    }

    fn remove(&self, path: &Path, name: &str) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.lock().remove(&(path.to_path_buf(), name.to_string()));
        Ok(())
    }
}
