//! File identity for incremental builds.
//!
//! [`FileInfo`] is a cheap stat-based signature of a path, [`FileChecksum`]
//! a digest of its content. Both reserve an all-zero value for "missing" so
//! they can be stored and compared as plain fixed-size values.

pub mod checksum;
pub mod error;
pub mod fingerprint;
pub mod info;
pub mod scanner;
pub mod snapshot;
pub mod stat;

pub use checksum::{
    CHECKSUM_LEN, ChecksumConfig, DEFAULT_BUFFER_SIZE, DigestAlgorithm, FileChecksum,
};
pub use error::{FileStampError, Result};
pub use fingerprint::Fingerprint;
pub use info::{FileChange, FileInfo, FileState, FileTimestamp};
pub use scanner::{CancellationToken, TreeConfig, TreeMessage, TreeProgress, TreeScanner};
pub use snapshot::{TreeChange, TreeSnapshot};
pub use stat::{RawStat, StatProvider, SystemStat};
