//! Upload preparation and progress accounting.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::AddFile;
use crate::fs::paths::basename;

/// Platform metadata files that are never uploaded.
pub const IGNORED_FILES: [&str; 3] = [".DS_Store", "thumbs.db", "desktop.ini"];

/// Drops ignored files and makes every path relative.
///
/// Dropped files arrive with absolute paths while picked files are already
/// relative; one leading `/` is stripped so both look the same.
pub fn prepare_upload(files: Vec<AddFile>) -> Vec<AddFile> {
    files
        .into_iter()
        .filter(|f| !IGNORED_FILES.contains(&basename(&f.path)))
        .map(|f| match f.path.strip_prefix('/') {
            Some(rel) => AddFile::new(rel, f.content),
            None => f,
        })
        .collect()
}

/// Number of distinct directories implied by the files' relative paths,
/// counting every ancestor once (`a/b/c.txt` implies `a` and `a/b`).
pub fn count_dirs(files: &[AddFile]) -> usize {
    let mut dirs = BTreeSet::new();
    for file in files {
        let segments: Vec<&str> = file.path.split('/').filter(|s| !s.is_empty()).collect();
        for depth in 1..segments.len() {
            dirs.insert(segments[..depth].join("/"));
        }
    }
    dirs.len()
}

/// Total bytes across all files.
pub fn total_size(files: &[AddFile]) -> u64 {
    files.iter().map(AddFile::size).sum()
}

/// Running progress of one upload.
///
/// The backend reports cumulative bytes sent; this turns them into a
/// percentage of the upload's total size.
#[derive(Debug)]
pub struct UploadProgress {
    total: u64,
    sent: AtomicU64,
}

impl UploadProgress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            sent: AtomicU64::new(0),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Records `sent` cumulative bytes and returns the percentage.
    pub fn record(&self, sent: u64) -> f64 {
        self.sent.store(sent, Ordering::SeqCst);
        self.percent()
    }

    /// Marks the upload as fully sent.
    pub fn complete(&self) -> f64 {
        self.sent.store(self.total, Ordering::SeqCst);
        100.0
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sent = self.sent.load(Ordering::SeqCst);
        (sent as f64 / self.total as f64 * 100.0).min(100.0)
    }
}
