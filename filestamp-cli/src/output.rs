use std::path::Path;

use filestamp_core::{FileChecksum, FileInfo, Fingerprint, TreeSnapshot};

fn kind_label(info: &FileInfo) -> &'static str {
    if info.is_missing() {
        "missing"
    } else if info.is_directory() {
        "dir"
    } else if info.is_symlink() {
        "link"
    } else if info.is_regular_file() {
        "file"
    } else {
        "other"
    }
}

pub fn format_info(path: &Path, info: &FileInfo) -> String {
    if info.is_missing() {
        return format!("{}: missing", path.display());
    }

    format!(
        "{}: {} dev={} ino={} mode={:07o} size={} mtime={}.{:09}",
        path.display(),
        kind_label(info),
        info.device,
        info.inode,
        info.mode,
        info.size,
        info.mod_time.seconds,
        info.mod_time.nanoseconds
    )
}

pub fn format_checksum(path: &Path, checksum: &FileChecksum) -> String {
    let note = if checksum.is_missing() {
        "  (missing)"
    } else if checksum.is_directory_marker() {
        "  (directory)"
    } else {
        ""
    };
    format!("{}  {}{}", checksum, path.display(), note)
}

pub fn format_entry(path: &Path, fingerprint: &Fingerprint) -> String {
    let info = &fingerprint.info;
    match &fingerprint.checksum {
        Some(checksum) => format!(
            "{:<7} {:>12}  {}  {}",
            kind_label(info),
            info.size,
            checksum,
            path.display()
        ),
        None => format!("{:<7} {:>12}  {}", kind_label(info), info.size, path.display()),
    }
}

pub fn format_tree_summary(snapshot: &TreeSnapshot) -> String {
    format!(
        "{}  {} ({} entries, {} bytes)",
        snapshot.signature(),
        snapshot.root().display(),
        snapshot.len(),
        snapshot.total_size()
    )
}
