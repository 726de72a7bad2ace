//! Config folder listing

use std::fs;
use std::io;
use std::path::Path;

use tracing::trace;

/// Prefix of in-flight download temporaries written into the config folder
pub const PARTIAL_PREFIX: &str = ".sync-";

/// Suffix of in-flight download temporaries written into the config folder
pub const PARTIAL_SUFFIX: &str = ".part";

/// Returns the file names present in a config folder
///
/// Implementations must return entries in a stable order across repeated calls.
pub trait FileLister: Send + Sync {
    fn list(&self, folder: &Path) -> io::Result<Vec<String>>;
}

/// Lists regular files of a local directory, sorted by name
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryLister;

impl FileLister for DirectoryLister {
    fn list(&self, folder: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            // Follows symlinks so linked config files are listed too
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                trace!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };
            if is_partial_download(&name) {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }
}

/// Whether a file name belongs to an unfinished download
pub fn is_partial_download(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
}
