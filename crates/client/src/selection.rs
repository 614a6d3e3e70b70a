//! The locally chosen file awaiting submission.

use std::path::{Path, PathBuf};

/// A chosen local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSelection {
    path: PathBuf,
    display_name: String,
}

impl LocalSelection {
    /// Build a selection from a picked path.
    ///
    /// Returns `None` for paths that cannot name a file: empty paths, or
    /// paths without a final component such as `/` or `..`. Relative paths
    /// are made absolute against the current directory.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return None;
        }
        let display_name = path.file_name()?.to_string_lossy().into_owned();
        let path = std::path::absolute(path).ok()?;
        Some(Self { path, display_name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component; also the name the file is stored under remotely.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Holds at most one [`LocalSelection`].
///
/// Only the choose/select/clear actions change it; network operations
/// never do.
#[derive(Debug, Default)]
pub struct SelectionState {
    current: Option<LocalSelection>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any existing selection.
    pub fn select(&mut self, selection: LocalSelection) {
        self.current = Some(selection);
    }

    /// Apply the result of a file picker.
    ///
    /// A cancelled pick (`None`) or an unusable path clears the selection,
    /// otherwise the new path replaces the old one.
    pub fn choose(&mut self, picked: Option<PathBuf>) -> Option<&LocalSelection> {
        self.current = picked.and_then(LocalSelection::from_path);
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&LocalSelection> {
        self.current.as_ref()
    }
}
