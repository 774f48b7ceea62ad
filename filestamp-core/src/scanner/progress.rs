use std::path::PathBuf;

/// Progress update during a tree scan
#[derive(Debug, Clone)]
pub enum TreeMessage {
    /// Started scanning the root
    Started(PathBuf),
    /// Progress update
    Progress(TreeProgress),
    /// Scan completed
    Completed,
    /// Scan was cancelled
    Cancelled,
}

/// Tree scan statistics
#[derive(Debug, Clone, Default)]
pub struct TreeProgress {
    /// Number of non-directory entries fingerprinted
    pub files_scanned: u64,
    /// Number of directories fingerprinted
    pub dirs_scanned: u64,
    /// Bytes of file content checksummed
    pub bytes_hashed: u64,
    /// Entries the walker could not read
    pub errors: u64,
    /// Most recent entry
    pub current_path: Option<PathBuf>,
}

impl TreeProgress {
    pub fn total_entries(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}
