use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use jwalk::WalkDir;
use log::{debug, warn};

use super::progress::{TreeMessage, TreeProgress};
use crate::checksum::ChecksumConfig;
use crate::fingerprint::Fingerprint;
use crate::info::FileInfo;
use crate::snapshot::TreeSnapshot;
use crate::{FileStampError, Result};

/// Tree scan configuration
#[derive(Debug, Clone, Default)]
pub struct TreeConfig {
    /// Follow symbolic links (entries are stat'd rather than lstat'd)
    pub follow_symlinks: bool,
    /// Maximum depth to scan (None = unlimited)
    pub max_depth: Option<usize>,
    /// Number of parallel threads (0 = auto)
    pub num_threads: usize,
    /// Checksum file contents with this configuration
    pub checksums: Option<ChecksumConfig>,
}

/// Cancellation token for stopping scans
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared progress state for heartbeat updates
struct SharedProgress {
    files_scanned: AtomicU64,
    dirs_scanned: AtomicU64,
    bytes_hashed: AtomicU64,
    errors: AtomicU64,
    current_path: Mutex<Option<PathBuf>>,
    done: AtomicBool,
}

impl SharedProgress {
    fn new() -> Self {
        Self {
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            bytes_hashed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            current_path: Mutex::new(None),
            done: AtomicBool::new(false),
        }
    }

    fn to_tree_progress(&self) -> TreeProgress {
        TreeProgress {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            current_path: self.current_path.lock().ok().and_then(|g| g.clone()),
        }
    }
}

/// Stops the heartbeat thread when the scan returns, on any path
struct Heartbeat {
    progress: Arc<SharedProgress>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Heartbeat {
    fn start(
        progress: Arc<SharedProgress>,
        tx: Sender<TreeMessage>,
        cancel: CancellationToken,
    ) -> Self {
        let shared = Arc::clone(&progress);
        let handle = std::thread::spawn(move || {
            while !shared.done.load(Ordering::Relaxed) && !cancel.is_cancelled() {
                std::thread::sleep(std::time::Duration::from_millis(100));
                let _ = tx.send(TreeMessage::Progress(shared.to_tree_progress()));
            }
        });

        Self {
            progress,
            handle: Some(handle),
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.progress.done.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Builds a [`TreeSnapshot`] of everything below a root directory
pub struct TreeScanner {
    config: TreeConfig,
    cancel_token: CancellationToken,
}

impl TreeScanner {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Scan a directory on a background thread.
    /// Returns a receiver for progress updates and the handle yielding the snapshot.
    pub fn scan(
        self,
        root: PathBuf,
    ) -> (
        Receiver<TreeMessage>,
        std::thread::JoinHandle<Result<TreeSnapshot>>,
    ) {
        let (tx, rx) = crossbeam_channel::unbounded();

        let handle = std::thread::spawn(move || self.run(root, Some(tx)));

        (rx, handle)
    }

    /// Scan a directory on the calling thread, without progress messages
    pub fn scan_sync(self, root: PathBuf) -> Result<TreeSnapshot> {
        self.run(root, None)
    }

    fn run(self, root: PathBuf, tx: Option<Sender<TreeMessage>>) -> Result<TreeSnapshot> {
        let notify = |msg: TreeMessage| {
            if let Some(tx) = &tx {
                let _ = tx.send(msg);
            }
        };

        let root_info = FileInfo::for_path(&root, true);
        if root_info.is_missing() {
            return Err(FileStampError::PathNotFound(root));
        }
        if !root_info.is_directory() {
            return Err(FileStampError::NotADirectory(root));
        }

        debug!("scanning tree at {}", root.display());
        let mut snapshot = TreeSnapshot::new(root.clone());

        notify(TreeMessage::Started(root.clone()));

        let shared_progress = Arc::new(SharedProgress::new());
        let heartbeat = tx.as_ref().map(|tx| {
            Heartbeat::start(
                Arc::clone(&shared_progress),
                tx.clone(),
                self.cancel_token.clone(),
            )
        });

        let walker = WalkDir::new(&root)
            .skip_hidden(false)
            .follow_links(self.config.follow_symlinks)
            .sort(true);

        let walker = if let Some(depth) = self.config.max_depth {
            walker.max_depth(depth)
        } else {
            walker
        };

        let walker = if self.config.num_threads > 0 {
            walker.parallelism(jwalk::Parallelism::RayonNewPool(self.config.num_threads))
        } else {
            walker
        };

        for entry_result in walker {
            if self.cancel_token.is_cancelled() {
                drop(heartbeat);
                notify(TreeMessage::Cancelled);
                return Err(FileStampError::Cancelled);
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    debug!("walk error under {}: {}", root.display(), e);
                    shared_progress.errors.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            // Skip root
            if entry.depth == 0 {
                continue;
            }

            let path = entry.path();
            let Some(relative) = relative_to(&path, &root) else {
                shared_progress.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            };

            let fingerprint = match Fingerprint::capture(
                &path,
                self.config.follow_symlinks,
                self.config.checksums.as_ref(),
            ) {
                Ok(fp) => fp,
                Err(e) => {
                    // Keep the entry, just without a checksum
                    warn!("checksum skipped: {}", e);
                    shared_progress.errors.fetch_add(1, Ordering::Relaxed);
                    Fingerprint::from(FileInfo::for_path(&path, self.config.follow_symlinks))
                }
            };

            // Vanished between readdir and stat
            if fingerprint.is_missing() {
                shared_progress.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            if fingerprint.info.is_directory() {
                shared_progress.dirs_scanned.fetch_add(1, Ordering::Relaxed);
            } else {
                shared_progress
                    .files_scanned
                    .fetch_add(1, Ordering::Relaxed);
                if fingerprint.checksum.is_some() {
                    shared_progress
                        .bytes_hashed
                        .fetch_add(fingerprint.info.size, Ordering::Relaxed);
                }
            }

            if let Ok(mut guard) = shared_progress.current_path.lock() {
                *guard = Some(path.clone());
            }

            snapshot.insert(relative, fingerprint);
        }

        drop(heartbeat);

        let progress = shared_progress.to_tree_progress();
        debug!(
            "scanned {}: {} entries, {} errors",
            root.display(),
            progress.total_entries(),
            progress.errors
        );
        notify(TreeMessage::Progress(progress));
        notify(TreeMessage::Completed);

        Ok(snapshot)
    }
}

fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}
