//! Cache of the most recent remote listing.
//!
//! The cache is either empty or exactly the last successful listing. It is
//! replaced as a whole and has no per-entry mutation API.

use protocol::RemoteFileEntry;

/// Sort entries by name, ignoring case. Equal keys keep server order.
pub fn sort_entries(mut entries: Vec<RemoteFileEntry>) -> Vec<RemoteFileEntry> {
    entries.sort_by_cached_key(|entry| entry.name.to_lowercase());
    entries
}

/// The last fetched listing, in display order.
#[derive(Debug, Default, Clone)]
pub struct RemoteFileCache {
    entries: Vec<RemoteFileEntry>,
}

impl RemoteFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current contents and install `entries`, which must already
    /// be in [`sort_entries`] order.
    pub fn replace_with(&mut self, entries: Vec<RemoteFileEntry>) {
        self.entries = entries;
    }

    /// Read-only copy for rendering.
    pub fn snapshot(&self) -> Vec<RemoteFileEntry> {
        self.entries.clone()
    }

    /// Whether an entry with exactly this name is cached.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
