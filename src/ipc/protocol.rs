//! IPC protocol definitions for front end communication
//!
//! Newline-delimited JSON exchanged over a Unix domain socket between an
//! administrative UI and the browser process.

use serde::{Deserialize, Serialize};

use crate::browser::{Selection, SelectionContent};
use crate::cache::CacheStats;
use crate::sync::SyncReport;

/// Protocol version for future compatibility
pub const PROTOCOL_VERSION: u32 = 1;

/// Commands sent from the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// List config files
    ListFiles,
    /// Select a file and return its content
    Select {
        /// File name within the config folder
        name: String,
    },
    /// Get sync availability, selection and cache counters
    GetStatus,
    /// Refresh the config folder from the bucket
    RunSync,
    /// Rescan the config folder for new files
    Rescan,
}

/// Responses sent back to the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    /// File list
    #[serde(rename_all = "camelCase")]
    Files {
        files: Vec<String>,
    },
    /// Selected file
    Selection(SelectionInfo),
    /// Browser state
    #[serde(rename_all = "camelCase")]
    Status {
        /// Protocol version
        version: u32,
        /// Whether the sync action should be offered
        sync_enabled: bool,
        /// Currently selected file
        selection: Option<String>,
        /// Text to show when nothing is selected
        placeholder: String,
        cache: CacheInfo,
    },
    /// Sync finished
    #[serde(rename_all = "camelCase")]
    SyncComplete {
        pages: usize,
        downloaded: Vec<String>,
        skipped: Vec<String>,
        failed: Vec<FailureInfo>,
        /// Reloaded selection
        selection: Option<SelectionInfo>,
    },
    /// Error response
    #[serde(rename_all = "camelCase")]
    Error {
        /// Error message
        error: String,
    },
}

/// A selected file as seen by the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionInfo {
    pub name: String,
    pub extension: String,
    /// File content, absent when it could not be read
    pub content: Option<String>,
    /// Why the content is absent
    pub error: Option<String>,
}

impl From<&Selection> for SelectionInfo {
    fn from(selection: &Selection) -> Self {
        let (content, error) = match &selection.content {
            SelectionContent::Text(text) => (Some(text.to_string()), None),
            SelectionContent::Unavailable { reason } => (None, Some(reason.clone())),
        };
        Self {
            name: selection.name.clone(),
            extension: selection.extension.clone(),
            content,
            error,
        }
    }
}

/// Cache counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub lookups: u64,
    pub reads: u64,
    pub failures: u64,
    pub generation: u64,
}

impl From<CacheStats> for CacheInfo {
    fn from(stats: CacheStats) -> Self {
        Self {
            lookups: stats.lookups,
            reads: stats.reads,
            failures: stats.failures,
            generation: stats.generation,
        }
    }
}

/// An object that failed to sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureInfo {
    pub key: String,
    pub error: String,
}

impl Response {
    /// Build a sync response from a report and the reloaded selection
    pub fn sync_complete(report: &SyncReport, selection: Option<&Selection>) -> Self {
        Response::SyncComplete {
            pages: report.pages,
            downloaded: report.downloaded.clone(),
            skipped: report.skipped.clone(),
            failed: report
                .failures
                .iter()
                .map(|f| FailureInfo {
                    key: f.key.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
            selection: selection.map(SelectionInfo::from),
        }
    }
}

/// Parse a JSON command from bytes
pub fn parse_command(data: &[u8]) -> Result<Command, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Serialize a response to JSON bytes
pub fn serialize_response(response: &Response) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_vec(response)?;
    json.push(b'\n'); // Add newline delimiter
    Ok(json)
}
