use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::checksum::FileChecksum;
use crate::fingerprint::Fingerprint;
use crate::info::FileChange;

/// Fingerprints of every entry below a root directory, keyed by path
/// relative to the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    root: PathBuf,
    entries: BTreeMap<PathBuf, Fingerprint>,
}

/// One differing entry between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub path: PathBuf,
    pub change: FileChange,
}

impl TreeSnapshot {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            entries: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn insert(&mut self, relative: PathBuf, fingerprint: Fingerprint) {
        self.entries.insert(relative, fingerprint);
    }

    pub fn get(&self, relative: &Path) -> Option<&Fingerprint> {
        self.entries.get(relative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted path order
    pub fn iter(&self) -> btree_map::Iter<'_, PathBuf, Fingerprint> {
        self.entries.iter()
    }

    /// Total size in bytes of all regular files
    pub fn total_size(&self) -> u64 {
        self.entries
            .values()
            .filter(|fp| fp.info.is_regular_file())
            .map(|fp| fp.info.size)
            .sum()
    }

    /// Digest of the whole tree.
    ///
    /// Covers relative path, mode, size, modification time and checksum of
    /// every entry. Device and inode are left out so a faithful copy of the
    /// tree keeps its signature.
    pub fn signature(&self) -> FileChecksum {
        let mut hasher = Sha256::new();
        hash_u64(&mut hasher, self.entries.len() as u64);

        for (path, fp) in &self.entries {
            hash_path(&mut hasher, path);
            hash_u64(&mut hasher, u64::from(fp.info.mode));
            hash_u64(&mut hasher, fp.info.size);
            hash_u64(&mut hasher, fp.info.mod_time.seconds as u64);
            hash_u64(&mut hasher, u64::from(fp.info.mod_time.nanoseconds));
            match &fp.checksum {
                Some(checksum) => {
                    hasher.update([1u8]);
                    hasher.update(checksum.as_bytes());
                }
                None => hasher.update([0u8]),
            }
        }

        let digest: [u8; 32] = hasher.finalize().into();
        FileChecksum::from_bytes(digest)
    }

    /// Entries that differ in `newer`, in sorted path order
    pub fn diff(&self, newer: &TreeSnapshot) -> Vec<TreeChange> {
        let mut changes = Vec::new();
        let mut old_iter = self.entries.iter().peekable();
        let mut new_iter = newer.entries.iter().peekable();

        loop {
            let (path, change) = match (old_iter.peek(), new_iter.peek()) {
                (None, None) => break,
                (Some((old_path, old_fp)), Some((new_path, new_fp))) => {
                    match old_path.cmp(new_path) {
                        std::cmp::Ordering::Less => {
                            let path = (*old_path).clone();
                            old_iter.next();
                            (path, FileChange::Removed)
                        }
                        std::cmp::Ordering::Greater => {
                            let path = (*new_path).clone();
                            new_iter.next();
                            (path, FileChange::Created)
                        }
                        std::cmp::Ordering::Equal => {
                            let path = (*old_path).clone();
                            let change = old_fp.compare(new_fp);
                            old_iter.next();
                            new_iter.next();
                            (path, change)
                        }
                    }
                }
                (Some((old_path, _)), None) => {
                    let path = (*old_path).clone();
                    old_iter.next();
                    (path, FileChange::Removed)
                }
                (None, Some((new_path, _))) => {
                    let path = (*new_path).clone();
                    new_iter.next();
                    (path, FileChange::Created)
                }
            };

            if change.is_changed() {
                changes.push(TreeChange { path, change });
            }
        }

        changes
    }
}

fn hash_u64(hasher: &mut Sha256, value: u64) {
    hasher.update(value.to_be_bytes());
}

/// Length-prefixed so adjacent paths cannot run together
fn hash_path(hasher: &mut Sha256, path: &Path) {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = {
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        parts.join("/").into_bytes()
    };

    hash_u64(hasher, bytes.len() as u64);
    hasher.update(&bytes);
}
