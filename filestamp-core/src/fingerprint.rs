use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::checksum::{ChecksumConfig, FileChecksum};
use crate::info::{FileChange, FileInfo};

/// Stat signature plus, optionally, the content checksum of one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub info: FileInfo,
    pub checksum: Option<FileChecksum>,
}

impl Fingerprint {
    pub const MISSING: Fingerprint = Fingerprint {
        info: FileInfo::MISSING,
        checksum: None,
    };

    /// Capture a fingerprint; the checksum is only computed when `checksum`
    /// is given, and only for missing paths, directories and regular files.
    /// Links captured with `follow_symlinks == false`, fifos and devices get
    /// no checksum: reading them could block or never reach end of file.
    pub fn capture(
        path: &Path,
        follow_symlinks: bool,
        checksum: Option<&ChecksumConfig>,
    ) -> Result<Fingerprint> {
        let info = FileInfo::for_path(path, follow_symlinks);
        let checksum = match checksum {
            Some(config) if Self::has_content_checksum(&info) => {
                Some(FileChecksum::for_info(path, &info, config)?)
            }
            _ => None,
        };
        Ok(Fingerprint { info, checksum })
    }

    pub fn is_missing(&self) -> bool {
        self.info.is_missing()
    }

    fn has_content_checksum(info: &FileInfo) -> bool {
        info.is_missing() || info.is_directory() || info.is_regular_file()
    }

    /// How `newer` differs from this earlier capture.
    ///
    /// When both sides carry a checksum the content decides between
    /// `Unchanged` and `Modified`, so a touched or copied file with the same
    /// bytes counts as unchanged.
    pub fn compare(&self, newer: &Fingerprint) -> FileChange {
        let change = self.info.compare(&newer.info);
        match (change, self.checksum, newer.checksum) {
            (FileChange::Unchanged | FileChange::Modified, Some(old), Some(new)) => {
                if old == new {
                    FileChange::Unchanged
                } else {
                    FileChange::Modified
                }
            }
            _ => change,
        }
    }
}

impl From<FileInfo> for Fingerprint {
    fn from(info: FileInfo) -> Self {
        Self {
            info,
            checksum: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_capture_without_checksum() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let fp = Fingerprint::capture(&path, true, None).unwrap();
        assert_eq!(fp.info.size, 5);
        assert!(fp.checksum.is_none());
    }

    #[test]
    fn test_capture_missing() {
        let temp = TempDir::new().unwrap();
        let fp =
            Fingerprint::capture(&temp.path().join("nope"), true, Some(&ChecksumConfig::default()))
                .unwrap();
        assert!(fp.is_missing());
        assert_eq!(fp.checksum, Some(FileChecksum::MISSING));
    }

    #[test]
    fn test_touch_with_same_content_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        let config = ChecksumConfig::default();

        set_mtime(&path, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let before = Fingerprint::capture(&path, true, Some(&config)).unwrap();
        set_mtime(&path, SystemTime::UNIX_EPOCH + Duration::from_secs(2_000));
        let after = Fingerprint::capture(&path, true, Some(&config)).unwrap();

        assert_eq!(before.info.compare(&after.info), FileChange::Modified);
        assert_eq!(before.compare(&after), FileChange::Unchanged);
    }

    #[test]
    fn test_content_change_with_same_metadata_is_modified() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        let config = ChecksumConfig::default();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(5_000);

        fs::write(&path, "hello").unwrap();
        set_mtime(&path, mtime);
        let before = Fingerprint::capture(&path, true, Some(&config)).unwrap();

        fs::write(&path, "jello").unwrap();
        set_mtime(&path, mtime);
        let after = Fingerprint::capture(&path, true, Some(&config)).unwrap();

        assert_eq!(before.info, after.info);
        assert_eq!(before.compare(&after), FileChange::Modified);
    }

    #[test]
    fn test_removed_wins_over_checksum() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        let config = ChecksumConfig::default();

        let before = Fingerprint::capture(&path, true, Some(&config)).unwrap();
        fs::remove_file(&path).unwrap();
        let after = Fingerprint::capture(&path, true, Some(&config)).unwrap();

        assert_eq!(before.compare(&after), FileChange::Removed);
        assert_eq!(after.compare(&before), FileChange::Created);
    }

    #[cfg(unix)]
    #[test]
    fn test_unfollowed_link_has_no_checksum() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target.txt");
        let link = temp.path().join("link");
        fs::write(&target, "hello").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let config = ChecksumConfig::default();

        let fp = Fingerprint::capture(&link, false, Some(&config)).unwrap();
        assert!(fp.info.is_symlink());
        assert!(fp.checksum.is_none());

        let followed = Fingerprint::capture(&link, true, Some(&config)).unwrap();
        assert!(followed.info.is_regular_file());
        assert_eq!(followed.checksum, Some(FileChecksum::for_bytes(b"hello", config.algorithm)));
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_is_not_read() {
        let temp = TempDir::new().unwrap();
        let fifo = temp.path().join("pipe");
        let created = std::process::Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !created {
            return;
        }

        // Opening a fifo with no writer would block here
        let fp = Fingerprint::capture(&fifo, true, Some(&ChecksumConfig::default())).unwrap();
        assert!(!fp.is_missing());
        assert!(!fp.info.is_regular_file());
        assert!(fp.checksum.is_none());
    }
}
