use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::info::FileInfo;
use crate::{FileStampError, Result};

/// Size of every checksum, whatever the digest
pub const CHECKSUM_LEN: usize = 32;

/// Read buffer used while hashing (16 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 4096;

/// Content digest used for regular files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }

    fn hasher(&self) -> Box<dyn ContentHasher> {
        match self {
            DigestAlgorithm::Sha256 => Box::new(Sha256::new()),
            DigestAlgorithm::Blake3 => Box::new(blake3::Hasher::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = FileStampError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            _ => Err(FileStampError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Streaming digest fed chunk by chunk
trait ContentHasher {
    fn update(&mut self, data: &[u8]);

    /// Digest bytes, at most [`CHECKSUM_LEN`] of them
    fn finish(self: Box<Self>) -> Vec<u8>;
}

impl ContentHasher for Sha256 {
    fn update(&mut self, data: &[u8]) {
        Digest::update(self, data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        Digest::finalize(*self).to_vec()
    }
}

impl ContentHasher for blake3::Hasher {
    fn update(&mut self, data: &[u8]) {
        blake3::Hasher::update(self, data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.finalize().as_bytes().to_vec()
    }
}

/// Checksum computation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumConfig {
    pub algorithm: DigestAlgorithm,
    /// Bytes read per chunk
    pub buffer_size: usize,
}

impl Default for ChecksumConfig {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ChecksumConfig {
    pub fn with_algorithm(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }
}

/// 32-byte content fingerprint.
///
/// Two values are reserved: all zeroes for a missing path and `[1, 0, ...]`
/// for a directory. Anything else is the file's digest, left-aligned and
/// zero-padded.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileChecksum {
    bytes: [u8; CHECKSUM_LEN],
}

impl FileChecksum {
    pub const MISSING: FileChecksum = FileChecksum {
        bytes: [0; CHECKSUM_LEN],
    };

    pub const DIRECTORY: FileChecksum = {
        let mut bytes = [0; CHECKSUM_LEN];
        bytes[0] = 1;
        FileChecksum { bytes }
    };

    pub const fn from_bytes(bytes: [u8; CHECKSUM_LEN]) -> Self {
        Self { bytes }
    }

    /// Checksum `path` with the default configuration
    pub fn for_path(path: &Path) -> Result<FileChecksum> {
        Self::for_path_with(path, &ChecksumConfig::default())
    }

    /// Checksum `path`, following symbolic links.
    ///
    /// Missing paths and directories get their marker values. Anything else
    /// is opened and digested; failing to open or read it after the stat
    /// succeeded is reported as [`FileStampError::Io`].
    pub fn for_path_with(path: &Path, config: &ChecksumConfig) -> Result<FileChecksum> {
        Self::for_info(path, &FileInfo::for_path(path, true), config)
    }

    /// Checksum `path` given a signature already captured for it
    pub fn for_info(path: &Path, info: &FileInfo, config: &ChecksumConfig) -> Result<FileChecksum> {
        if info.is_missing() {
            return Ok(Self::MISSING);
        }
        if info.is_directory() {
            return Ok(Self::DIRECTORY);
        }

        let file = File::open(path).map_err(|e| {
            warn!("open failed after stat for {}: {}", path.display(), e);
            FileStampError::io(path, e)
        })?;

        Self::from_reader(file, config).map_err(|e| match e {
            FileStampError::Io { source, .. } => {
                warn!("read failed for {}: {}", path.display(), source);
                FileStampError::io(path, source)
            }
            other => other,
        })
    }

    /// Digest everything `reader` yields
    pub fn from_reader<R: Read>(mut reader: R, config: &ChecksumConfig) -> Result<FileChecksum> {
        let mut hasher = config.algorithm.hasher();
        let mut buffer = vec![0u8; config.buffer_size.max(1)];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FileStampError::io("<reader>", e)),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self::from_digest(&hasher.finish()))
    }

    /// Checksum of an in-memory byte string
    pub fn for_bytes(data: &[u8], algorithm: DigestAlgorithm) -> FileChecksum {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        Self::from_digest(&hasher.finish())
    }

    /// Left-align `digest` into a zeroed buffer
    fn from_digest(digest: &[u8]) -> FileChecksum {
        let mut bytes = [0u8; CHECKSUM_LEN];
        let len = digest.len().min(CHECKSUM_LEN);
        bytes[..len].copy_from_slice(&digest[..len]);
        FileChecksum { bytes }
    }

    pub fn is_missing(&self) -> bool {
        *self == Self::MISSING
    }

    pub fn is_directory_marker(&self) -> bool {
        *self == Self::DIRECTORY
    }

    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LEN] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for FileChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FileChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileChecksum({})", self.to_hex())
    }
}

impl FromStr for FileChecksum {
    type Err = FileStampError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != CHECKSUM_LEN * 2 || !s.is_ascii() {
            return Err(FileStampError::InvalidChecksum(s.to_string()));
        }

        let mut bytes = [0u8; CHECKSUM_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| FileStampError::InvalidChecksum(s.to_string()))?;
        }
        Ok(Self { bytes })
    }
}

impl AsRef<[u8]> for FileChecksum {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// 128-bit stand-in to exercise zero padding
    struct ShortHasher(u8);

    impl ContentHasher for ShortHasher {
        fn update(&mut self, data: &[u8]) {
            for b in data {
                self.0 = self.0.wrapping_add(*b);
            }
        }

        fn finish(self: Box<Self>) -> Vec<u8> {
            vec![self.0 | 0x80; 16]
        }
    }

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_markers() {
        assert!(FileChecksum::MISSING.is_missing());
        assert!(FileChecksum::DIRECTORY.is_directory_marker());
        assert_eq!(FileChecksum::DIRECTORY.as_bytes()[0], 1);
        assert!(FileChecksum::DIRECTORY.as_bytes()[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_short_digest_is_zero_padded() {
        let mut hasher: Box<dyn ContentHasher> = Box::new(ShortHasher(0));
        hasher.update(b"abc");
        let checksum = FileChecksum::from_digest(&hasher.finish());
        assert!(checksum.as_bytes()[..16].iter().all(|b| *b != 0));
        assert!(checksum.as_bytes()[16..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_hello_sha256() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let checksum = FileChecksum::for_path(&path).unwrap();
        assert_eq!(checksum.to_hex(), HELLO_SHA256);
        assert_eq!(FileChecksum::for_path(&path).unwrap(), checksum);
    }

    #[test]
    fn test_blake3_matches_reference() {
        let checksum = FileChecksum::for_bytes(b"hello", DigestAlgorithm::Blake3);
        assert_eq!(checksum.as_bytes(), blake3::hash(b"hello").as_bytes());
    }

    #[test]
    fn test_chunking_does_not_change_digest() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let small = ChecksumConfig {
            algorithm: DigestAlgorithm::Sha256,
            buffer_size: 7,
        };
        let whole = FileChecksum::for_bytes(&data, DigestAlgorithm::Sha256);
        assert_eq!(FileChecksum::from_reader(&data[..], &small).unwrap(), whole);
        assert_eq!(
            FileChecksum::from_reader(&data[..], &ChecksumConfig::default()).unwrap(),
            whole
        );
    }

    #[test]
    fn test_zero_buffer_size_is_clamped() {
        let config = ChecksumConfig {
            algorithm: DigestAlgorithm::Sha256,
            buffer_size: 0,
        };
        let checksum = FileChecksum::from_reader(&b"hello"[..], &config).unwrap();
        assert_eq!(checksum.to_hex(), HELLO_SHA256);
    }

    #[test]
    fn test_single_byte_flip_changes_checksum() {
        let base = b"the quick brown fox".to_vec();
        let original = FileChecksum::for_bytes(&base, DigestAlgorithm::Sha256);
        for i in [0, 7, base.len() - 1] {
            let mut flipped = base.clone();
            flipped[i] ^= 0x01;
            assert_ne!(
                FileChecksum::for_bytes(&flipped, DigestAlgorithm::Sha256),
                original
            );
        }
    }

    #[test]
    fn test_missing_and_directory() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            FileChecksum::for_path(&temp.path().join("missing.txt")).unwrap(),
            FileChecksum::MISSING
        );
        assert_eq!(
            FileChecksum::for_path(temp.path()).unwrap(),
            FileChecksum::DIRECTORY
        );
    }

    #[test]
    fn test_open_after_stat_failure_is_io_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.txt");
        fs::write(&path, "soon gone").unwrap();
        let info = FileInfo::for_path(&path, true);
        fs::remove_file(&path).unwrap();

        let result = FileChecksum::for_info(&path, &info, &ChecksumConfig::default());
        match result {
            Err(FileStampError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_hex_parse() {
        let checksum: FileChecksum = HELLO_SHA256.parse().unwrap();
        assert_eq!(checksum.to_string(), HELLO_SHA256);
        assert!("abc".parse::<FileChecksum>().is_err());
        assert!("zz".repeat(32).parse::<FileChecksum>().is_err());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("BLAKE3".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Blake3);
        assert!("md5".parse::<DigestAlgorithm>().is_err());
        assert_eq!(DigestAlgorithm::Blake3.to_string(), "blake3");
    }
}
