use std::path::{Path, PathBuf};

/// The file currently shown by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub display_name: String,
    pub size_bytes: u64,
    /// True when recovered from the probe cache after a failed detection.
    pub cached: bool,
}

impl FileInfo {
    /// Describe `path`. Size is zero when metadata cannot be read.
    pub fn from_path(path: impl Into<PathBuf>, cached: bool) -> Self {
        let path = path.into();
        let size_bytes = std::fs::metadata(&path)
            .map(|meta| meta.len())
            .unwrap_or(0);
        Self {
            display_name: display_name(&path),
            path,
            size_bytes,
            cached,
        }
    }

    pub fn size_label(&self) -> String {
        format_size(self.size_bytes)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human readable size using 1024-based units.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let value = bytes as f64;
    if value >= GB {
        format!("{:.2} GB", value / GB)
    } else if value >= MB {
        format!("{:.0} MB", value / MB)
    } else if value >= KB {
        format!("{:.0} KB", value / KB)
    } else {
        format!("{bytes} B")
    }
}
