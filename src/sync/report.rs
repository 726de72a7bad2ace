//! Sync outcomes and errors

use crate::remote::RemoteError;

/// Why a single object could not be written into the config folder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Download timed out")]
    Timeout,

    #[error("Refusing unsafe file name {0:?}")]
    UnsafeName(String),
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Io(err.to_string())
    }
}

/// A failed object transfer; the pass continues past it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    /// Remote key
    pub key: String,
    /// Local name it would have been written to
    pub file_name: String,
    pub error: DownloadError,
}

/// Summary of a sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Listing pages received
    pub pages: usize,
    /// Local file names written, in download order
    pub downloaded: Vec<String>,
    /// Keys that map to no file name (folder markers)
    pub skipped: Vec<String>,
    /// Objects that could not be written
    pub failures: Vec<ObjectFailure>,
    /// Bytes written
    pub bytes: u64,
}

impl SyncReport {
    /// Objects a download was attempted for
    pub fn attempted(&self) -> usize {
        self.downloaded.len() + self.failures.len()
    }

    /// Whether every attempted object was written
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors that abort a whole sync pass
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Sync is disabled")]
    Disabled,

    #[error("Sync is misconfigured: {0}")]
    Misconfigured(String),

    #[error("Remote store unavailable: {0}")]
    Unavailable(#[source] RemoteError),

    #[error("Listing interrupted: {source}")]
    Interrupted {
        /// What was done before the listing failed
        report: SyncReport,
        #[source]
        source: RemoteError,
    },
}
