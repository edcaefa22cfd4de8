//! Storage backend abstraction.
//!
//! The file browser talks to a content-addressed store through the
//! [`Backend`] trait. Paths starting with `/ipfs/` address immutable content;
//! every other absolute path addresses the mutable namespace, already
//! relativised to its root (see [`crate::fs::paths::real_mfs_path`]).
//!
//! [`memory::MemoryBackend`] is a complete in-process implementation used by
//! the test suite and by hosts that want to run without a daemon.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryBackend;

/// An error returned by a backend call.
///
/// Backends may attach a machine-readable `code`; when they don't, the
/// tracker falls back to `ERR_<KIND>` for the failing operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Node type as reported by the backend.
///
/// Listing calls report directories as `dir`, stat calls as `directory`;
/// both deserialize to [`NodeType::Directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    #[serde(alias = "dir")]
    Directory,
}

/// Metadata for a single node, returned by both `stat` and `ls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStat {
    pub hash: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub cumulative_size: Option<u64>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

/// A file handed to [`Backend::add`]. `path` is relative to the upload root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddFile {
    pub path: String,
    pub content: Vec<u8>,
}

impl AddFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// One result of a bulk add: every file and every directory created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResult {
    pub path: String,
    pub hash: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddOptions {
    pub pin: bool,
    pub wrap_with_directory: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    Recursive,
    Direct,
}

/// Receives cumulative byte counts while a bulk add is running.
pub trait Progress: Send + Sync {
    fn report(&self, sent: u64);
}

/// A [`Progress`] that discards every report.
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _sent: u64) {}
}

/// The calls the file browser needs from a content-addressed store.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Whether the backend is reachable. Fetches are skipped while offline.
    fn is_connected(&self) -> bool {
        true
    }

    /// Stats a mutable-namespace path or an `/ipfs/...` path.
    async fn stat(&self, path: &str) -> Result<NodeStat, BackendError>;

    /// Lists the direct children of a directory by content identifier.
    async fn ls(&self, cid: &str) -> Result<Vec<NodeStat>, BackendError>;

    /// Reads the bytes of a file by content identifier.
    async fn cat(&self, cid: &str) -> Result<Vec<u8>, BackendError>;

    /// Adds files to the store, reporting cumulative bytes to `progress`.
    async fn add(
        &self,
        files: &[AddFile],
        options: AddOptions,
        progress: &dyn Progress,
    ) -> Result<Vec<AddResult>, BackendError>;

    /// Lists pinned content identifiers of the given type.
    async fn pin_ls(&self, pin_type: PinType) -> Result<Vec<String>, BackendError>;

    /// Resolves an `/ipns/...` path to an `/ipfs/...` path.
    async fn name_resolve(&self, path: &str) -> Result<String, BackendError>;

    async fn files_cp(&self, src: &str, dst: &str) -> Result<(), BackendError>;

    async fn files_mv(&self, src: &str, dst: &str) -> Result<(), BackendError>;

    async fn files_rm(&self, path: &str, recursive: bool) -> Result<(), BackendError>;

    async fn files_mkdir(&self, path: &str, parents: bool) -> Result<(), BackendError>;
}
