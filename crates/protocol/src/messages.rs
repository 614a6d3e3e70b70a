//! Request and response bodies for the file exchange endpoints.
//!
//! All bodies are JSON. The unpack endpoint tells a submit apart from a list
//! request by the shape of the body, so each request is its own struct
//! rather than a tagged enum.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Command value understood by the unpack endpoint as "list stored files".
pub const LIST_COMMAND: &str = "list";

// ============================================================================
// Requests
// ============================================================================

/// Upload a file to the unpack endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Base64 encoded file content.
    pub input: String,
    /// Name the file is stored under remotely.
    pub filename: String,
}

/// Ask the unpack endpoint for the current listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Always [`LIST_COMMAND`].
    pub cmd: String,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            cmd: LIST_COMMAND.to_string(),
        }
    }
}

/// Fetch one file from the main endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Remote file name, as reported by a listing.
    pub download: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Successful response to a [`ListRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    /// Human readable status line from the server.
    pub message: String,
    /// Stored files, in server order.
    pub files: Vec<FileInfo>,
    /// Number of files according to the server.
    pub count: u64,
}

impl ListResponse {
    /// Parse a list response body. Every field is required.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Flatten the wire rows into [`RemoteFileEntry`] values, keeping server order.
    pub fn into_entries(self) -> Vec<RemoteFileEntry> {
        self.files.into_iter().map(RemoteFileEntry::from).collect()
    }
}

/// One file row as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Remote file name, unique within the store.
    pub name: String,
    /// Storage metadata.
    pub metadata: FileMetadata,
}

/// Storage metadata for a [`FileInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Server formatted timestamp, kept as text.
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}

/// A listed remote file.
///
/// `last_modified` is opaque: it is displayed and compared as text, never
/// parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    pub name: String,
    pub size: u64,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}

impl From<FileInfo> for RemoteFileEntry {
    fn from(info: FileInfo) -> Self {
        Self {
            name: info.name,
            size: info.metadata.size,
            last_modified: info.metadata.last_modified,
        }
    }
}
