//! File entry representation.

use serde::Serialize;

use crate::backend::{NodeStat, NodeType};
use crate::nfc_string;

/// Label given to the synthesized "up" entry of a directory listing.
pub const PARENT_LABEL: &str = "...";

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

impl From<NodeType> for EntryType {
    fn from(t: NodeType) -> Self {
        match t {
            NodeType::File => EntryType::File,
            NodeType::Directory => EntryType::Directory,
        }
    }
}

/// A single file or directory entry in a listing.
///
/// `FileEntry` is immutable: adjust it through the consuming `with_*`
/// methods. The `path` is the entry's identity within a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
    size: Option<u64>,
    hash: Option<String>,
    pinned: bool,
    is_parent: bool,
}

impl FileEntry {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        entry_type: EntryType,
        size: Option<u64>,
        hash: Option<String>,
    ) -> Self {
        Self {
            name: nfc_string(&name.into()),
            path: path.into(),
            entry_type,
            size,
            hash,
            pinned: false,
            is_parent: false,
        }
    }

    /// Builds an entry from backend metadata.
    ///
    /// The size is the cumulative size when the backend reports one, falling
    /// back to the plain size. Without a `path` the entry is addressed as
    /// `/ipfs/<hash>` and named after its hash.
    pub fn from_stat(stat: &NodeStat, path: Option<&str>) -> Self {
        let name = match path {
            Some(p) => last_segment(p).to_string(),
            None => stat.name.clone().unwrap_or_else(|| stat.hash.clone()),
        };
        let path = path
            .map(str::to_string)
            .unwrap_or_else(|| format!("/ipfs/{}", stat.hash));

        Self::new(
            name,
            path,
            stat.node_type.into(),
            stat.cumulative_size.or(stat.size),
            Some(stat.hash.clone()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Size in bytes. For directories this is the cumulative size, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// `true` for the synthesized "up" entry.
    pub fn is_parent(&self) -> bool {
        self.is_parent
    }

    pub fn with_size(self, size: Option<u64>) -> Self {
        Self { size, ..self }
    }

    pub fn with_pinned(self, pinned: bool) -> Self {
        Self { pinned, ..self }
    }

    /// Turns this entry into the "up" link pointing at `path`.
    pub fn into_parent_link(self, path: impl Into<String>) -> Self {
        Self {
            name: PARENT_LABEL.to_string(),
            path: path.into(),
            is_parent: true,
            ..self
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
