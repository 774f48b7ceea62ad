use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::stat::{RawStat, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG, StatProvider, SystemStat};

/// Modification time with sub-second resolution where the platform has it
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FileTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl FileTimestamp {
    pub const fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// `None` when the platform's `SystemTime` cannot hold this instant
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let nanos = Duration::from_nanos(u64::from(self.nanoseconds));
        let whole = Duration::from_secs(self.seconds.unsigned_abs());
        let base = if self.seconds >= 0 {
            UNIX_EPOCH.checked_add(whole)?
        } else {
            UNIX_EPOCH.checked_sub(whole)?
        };
        base.checked_add(nanos)
    }
}

impl From<SystemTime> for FileTimestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                // Pre-epoch: floor the seconds so nanoseconds stay positive
                let d = e.duration();
                let secs = d.as_secs() as i64;
                match d.subsec_nanos() {
                    0 => Self::new(-secs, 0),
                    n => Self::new(-secs - 1, 1_000_000_000 - n),
                }
            }
        }
    }
}

/// Stat-derived signature of a filesystem entry.
///
/// The all-zero value is reserved for "path does not exist". A successful
/// stat that happens to produce all zeroes is nudged to one nanosecond so it
/// can never be mistaken for a missing path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInfo {
    pub device: u64,
    pub inode: u64,
    pub mode: u32,
    pub size: u64,
    pub mod_time: FileTimestamp,
}

impl FileInfo {
    /// Sentinel for a missing or inaccessible path
    pub const MISSING: FileInfo = FileInfo {
        device: 0,
        inode: 0,
        mode: 0,
        size: 0,
        mod_time: FileTimestamp::new(0, 0),
    };

    /// Capture the signature of `path` using the operating system's stat.
    ///
    /// With `follow_symlinks` the link target is reported (`stat`), otherwise
    /// the link itself (`lstat`). Any stat failure yields [`FileInfo::MISSING`].
    pub fn for_path(path: &Path, follow_symlinks: bool) -> FileInfo {
        Self::for_path_with(&SystemStat, path, follow_symlinks)
    }

    pub fn for_path_with<S: StatProvider + ?Sized>(
        stat: &S,
        path: &Path,
        follow_symlinks: bool,
    ) -> FileInfo {
        let result = if follow_symlinks {
            stat.stat(path)
        } else {
            stat.lstat(path)
        };

        match result {
            Ok(raw) => Self::from_raw(raw),
            Err(e) => {
                debug!("stat failed for {}: {}", path.display(), e);
                Self::MISSING
            }
        }
    }

    /// Build a signature from a successful stat
    pub fn from_raw(raw: RawStat) -> FileInfo {
        let mut info = FileInfo {
            device: raw.device,
            inode: raw.inode,
            mode: raw.mode,
            size: raw.size,
            mod_time: FileTimestamp::new(raw.mtime_seconds, raw.mtime_nanoseconds),
        };

        if info.is_missing() {
            debug!("stat returned all zeroes, bumping mtime to 1ns");
            info.mod_time.nanoseconds = 1;
        }

        info
    }

    pub fn is_missing(&self) -> bool {
        *self == Self::MISSING
    }

    pub fn file_type_bits(&self) -> u32 {
        self.mode & S_IFMT
    }

    /// True when the directory type bit is set. Block devices and sockets
    /// share that bit and are classified as directories too.
    pub fn is_directory(&self) -> bool {
        self.mode & S_IFDIR != 0
    }

    pub fn is_regular_file(&self) -> bool {
        self.file_type_bits() == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type_bits() == S_IFLNK
    }

    /// Permission bits without the type
    pub fn permissions(&self) -> u32 {
        self.mode & !S_IFMT
    }

    pub fn state(&self) -> FileState {
        if self.is_missing() {
            FileState::Missing
        } else {
            FileState::Present(*self)
        }
    }

    /// How `newer` differs from this earlier capture of the same path
    pub fn compare(&self, newer: &FileInfo) -> FileChange {
        match (self.is_missing(), newer.is_missing()) {
            (true, true) => FileChange::Unchanged,
            (true, false) => FileChange::Created,
            (false, true) => FileChange::Removed,
            (false, false) if self.file_type_bits() != newer.file_type_bits() => {
                FileChange::TypeChanged
            }
            (false, false) if self != newer => FileChange::Modified,
            (false, false) => FileChange::Unchanged,
        }
    }
}

/// Tagged view of a [`FileInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    Missing,
    Present(FileInfo),
}

impl From<FileState> for FileInfo {
    fn from(state: FileState) -> Self {
        match state {
            FileState::Missing => FileInfo::MISSING,
            FileState::Present(info) => info,
        }
    }
}

/// Result of comparing two captures of one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChange {
    Unchanged,
    /// Missing before, present now
    Created,
    /// Present before, missing now
    Removed,
    /// Kind of entry changed (e.g. file replaced by directory)
    TypeChanged,
    Modified,
}

impl FileChange {
    pub fn is_changed(&self) -> bool {
        !matches!(self, FileChange::Unchanged)
    }
}

impl std::fmt::Display for FileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FileChange::Unchanged => "unchanged",
            FileChange::Created => "created",
            FileChange::Removed => "removed",
            FileChange::TypeChanged => "type changed",
            FileChange::Modified => "modified",
        };
        f.write_str(label)
    }
}
