//! Sorting for directory listings.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::fs::entry::FileEntry;

/// The key by which entries are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Alphabetical by name (case-insensitive first, then exact).
    #[default]
    Name,
    /// By size in bytes; unknown sizes count as zero.
    Size,
}

/// Sort key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub by: SortBy,
    pub asc: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            by: SortBy::Name,
            asc: true,
        }
    }
}

impl SortSpec {
    pub fn new(by: SortBy, asc: bool) -> Self {
        Self { by, asc }
    }
}

/// Sorts entries according to `spec`. Returns a **new** `Vec`.
///
/// Unless `mix_directories` is set, directories always come before files and
/// the key only orders entries of the same type. The sort is stable, so
/// entries that compare equal keep their relative order.
pub fn sort_files(entries: &[FileEntry], spec: SortSpec, mix_directories: bool) -> Vec<FileEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| compare(a, b, spec, mix_directories));
    sorted
}

fn compare(a: &FileEntry, b: &FileEntry, spec: SortSpec, mix_directories: bool) -> Ordering {
    if mix_directories || a.entry_type() == b.entry_type() {
        let ord = match spec.by {
            SortBy::Name => compare_names(a.name(), b.name()),
            SortBy::Size => a.size().unwrap_or(0).cmp(&b.size().unwrap_or(0)),
        };
        return if spec.asc { ord } else { ord.reverse() };
    }

    if a.is_dir() {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
