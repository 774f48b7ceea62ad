//! Thin seam over the platform `stat`/`lstat` calls.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// File type mask of `st_mode`
pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFREG: u32 = 0o100_000;
pub const S_IFLNK: u32 = 0o120_000;

/// Attributes reported by a successful stat call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawStat {
    pub device: u64,
    pub inode: u64,
    pub mode: u32,
    pub size: u64,
    pub mtime_seconds: i64,
    /// Zero on platforms that only report whole seconds
    pub mtime_nanoseconds: u32,
}

/// Source of filesystem attributes for a path.
///
/// `stat` resolves symbolic links, `lstat` reports the link itself.
pub trait StatProvider: Send + Sync {
    fn stat(&self, path: &Path) -> io::Result<RawStat>;

    fn lstat(&self, path: &Path) -> io::Result<RawStat>;
}

/// Stat provider backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStat;

impl StatProvider for SystemStat {
    fn stat(&self, path: &Path) -> io::Result<RawStat> {
        std::fs::metadata(path).map(|m| raw_stat(&m))
    }

    fn lstat(&self, path: &Path) -> io::Result<RawStat> {
        std::fs::symlink_metadata(path).map(|m| raw_stat(&m))
    }
}

#[cfg(unix)]
pub(crate) fn raw_stat(metadata: &Metadata) -> RawStat {
    use std::os::unix::fs::MetadataExt;

    RawStat {
        device: metadata.dev(),
        inode: metadata.ino(),
        mode: metadata.mode(),
        size: metadata.size(),
        mtime_seconds: metadata.mtime(),
        mtime_nanoseconds: metadata.mtime_nsec() as u32,
    }
}

/// Non-unix platforms have no device/inode pair and only whole-second mtimes
#[cfg(not(unix))]
pub(crate) fn raw_stat(metadata: &Metadata) -> RawStat {
    use std::time::UNIX_EPOCH;

    let file_type = metadata.file_type();
    let kind = if file_type.is_dir() {
        S_IFDIR
    } else if file_type.is_symlink() {
        S_IFLNK
    } else {
        S_IFREG
    };
    let permissions = if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    };

    let mtime_seconds = metadata
        .modified()
        .ok()
        .map(|t| match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        })
        .unwrap_or(0);

    RawStat {
        device: 0,
        inode: 0,
        mode: kind | permissions,
        size: metadata.len(),
        mtime_seconds,
        mtime_nanoseconds: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_stat_regular_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let raw = SystemStat.stat(&path).unwrap();
        assert_eq!(raw.size, 5);
        assert_eq!(raw.mode & S_IFMT, S_IFREG);
    }

    #[test]
    fn test_stat_directory() {
        let temp = TempDir::new().unwrap();
        let raw = SystemStat.stat(temp.path()).unwrap();
        assert_eq!(raw.mode & S_IFMT, S_IFDIR);
    }

    #[test]
    fn test_stat_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing");
        assert!(SystemStat.stat(&path).is_err());
        assert!(SystemStat.lstat(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_lstat_reports_link() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let link = temp.path().join("link");
        fs::write(&target, "x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(SystemStat.lstat(&link).unwrap().mode & S_IFMT, S_IFLNK);
        assert_eq!(SystemStat.stat(&link).unwrap().mode & S_IFMT, S_IFREG);
    }
}
