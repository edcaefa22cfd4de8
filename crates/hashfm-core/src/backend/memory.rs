//! In-memory content-addressed backend.
//!
//! Holds a block store keyed by content identifier, a mutable namespace tree,
//! pin sets and a name table. Identifiers are SHA-256 digests over a simple
//! node encoding, so identical content always gets the same identifier.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{
    AddFile, AddOptions, AddResult, Backend, BackendError, NodeStat, NodeType, PinType, Progress,
};

const CID_PREFIX: &str = "bafy";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
}

impl Node {
    fn empty_dir() -> Self {
        Node::Dir(BTreeMap::new())
    }

    fn cid(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Node::File(bytes) => {
                hasher.update(b"file\0");
                hasher.update(bytes);
            }
            Node::Dir(children) => {
                hasher.update(b"dir\0");
                for (name, child) in children {
                    hasher.update(name.as_bytes());
                    hasher.update(b"\0");
                    hasher.update(child.cid().as_bytes());
                    hasher.update(b"\n");
                }
            }
        }
        format!("{CID_PREFIX}{:x}", hasher.finalize())
    }

    fn node_type(&self) -> NodeType {
        match self {
            Node::File(_) => NodeType::File,
            Node::Dir(_) => NodeType::Directory,
        }
    }

    fn cumulative_size(&self) -> u64 {
        match self {
            Node::File(bytes) => bytes.len() as u64,
            Node::Dir(children) => children.values().map(Node::cumulative_size).sum(),
        }
    }

    fn walk(&self, segments: &[&str]) -> Option<&Node> {
        segments.iter().try_fold(self, |node, seg| match node {
            Node::Dir(children) => children.get(*seg),
            Node::File(_) => None,
        })
    }

    fn walk_mut(&mut self, segments: &[&str]) -> Option<&mut Node> {
        let mut node = self;
        for seg in segments {
            node = match node {
                Node::Dir(children) => children.get_mut(*seg)?,
                Node::File(_) => return None,
            };
        }
        Some(node)
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn not_found(path: &str) -> BackendError {
    BackendError::new(format!("file does not exist: {path}"))
}

#[derive(Debug)]
struct Inner {
    root: Node,
    blocks: HashMap<String, Node>,
    recursive_pins: Vec<String>,
    direct_pins: Vec<String>,
    names: HashMap<String, String>,
}

impl Inner {
    /// Puts `node` and all of its descendants into the block store.
    fn store(&mut self, node: &Node) -> String {
        if let Node::Dir(children) = node {
            for child in children.values() {
                self.store(child);
            }
        }
        let cid = node.cid();
        self.blocks.entry(cid.clone()).or_insert_with(|| node.clone());
        cid
    }

    fn lookup(&self, path: &str) -> Result<&Node, BackendError> {
        if let Some(rest) = path.strip_prefix("/ipfs/") {
            let segs = segments(rest);
            let (cid, rest) = segs.split_first().ok_or_else(|| not_found(path))?;
            let node = self.blocks.get(*cid).ok_or_else(|| not_found(path))?;
            return node.walk(rest).ok_or_else(|| not_found(path));
        }
        self.root
            .walk(&segments(path))
            .ok_or_else(|| not_found(path))
    }

    fn block(&self, cid: &str) -> Result<&Node, BackendError> {
        let cid = cid.strip_prefix("/ipfs/").unwrap_or(cid);
        self.blocks.get(cid).ok_or_else(|| not_found(cid))
    }

    /// Returns the children map of the parent of `path` and the final segment.
    fn parent_of<'a>(
        &mut self,
        path: &'a str,
    ) -> Result<(&mut BTreeMap<String, Node>, &'a str), BackendError> {
        let segs = segments(path);
        let (name, parent) = segs
            .split_last()
            .ok_or_else(|| BackendError::new("cannot operate on the root directory"))?;
        match self.root.walk_mut(parent) {
            Some(Node::Dir(children)) => Ok((children, *name)),
            Some(Node::File(_)) => Err(BackendError::new(format!("not a directory: {path}"))),
            None => Err(not_found(path)),
        }
    }

    fn insert(&mut self, path: &str, node: Node) -> Result<(), BackendError> {
        let (children, name) = self.parent_of(path)?;
        if children.contains_key(name) {
            return Err(BackendError::new(format!(
                "directory already has entry by that name: {path}"
            )));
        }
        children.insert(name.to_string(), node);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<Node, BackendError> {
        let (children, name) = self.parent_of(path)?;
        children.remove(name).ok_or_else(|| not_found(path))
    }

    fn mkdir_all(&mut self, path: &str) -> Result<(), BackendError> {
        let mut node = &mut self.root;
        for seg in segments(path) {
            node = match node {
                Node::Dir(children) => children
                    .entry(seg.to_string())
                    .or_insert_with(Node::empty_dir),
                Node::File(_) => {
                    return Err(BackendError::new(format!("not a directory: {path}")));
                }
            };
        }
        match node {
            Node::Dir(_) => Ok(()),
            Node::File(_) => Err(BackendError::new(format!("file already exists: {path}"))),
        }
    }
}

/// A [`Backend`] that keeps everything in process memory.
///
/// Besides the trait calls it exposes synchronous helpers for seeding
/// content (`write_file`, `put_file`, `pin`, `publish`) and for inspecting
/// the mutable namespace afterwards (`exists`, `read`).
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    connected: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                root: Node::empty_dir(),
                blocks: HashMap::new(),
                recursive_pins: Vec::new(),
                direct_pins: Vec::new(),
                names: HashMap::new(),
            }),
            connected: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Writes a file into the mutable namespace, creating parent directories.
    /// Returns the file's content identifier.
    pub fn write_file(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> Result<String, BackendError> {
        let mut inner = self.lock();
        let segs = segments(path);
        if let Some((_, parent)) = segs.split_last() {
            inner.mkdir_all(&parent.join("/"))?;
        }
        let node = Node::File(content.into());
        let cid = inner.store(&node);
        let (children, name) = inner.parent_of(path)?;
        children.insert(name.to_string(), node);
        Ok(cid)
    }

    /// Creates a directory (and its parents) in the mutable namespace.
    pub fn mkdir(&self, path: &str) -> Result<(), BackendError> {
        self.lock().mkdir_all(path)
    }

    /// Stores an immutable file outside the mutable namespace.
    pub fn put_file(&self, content: impl Into<Vec<u8>>) -> String {
        self.lock().store(&Node::File(content.into()))
    }

    pub fn pin(&self, cid: &str, pin_type: PinType) {
        let mut inner = self.lock();
        let pins = match pin_type {
            PinType::Recursive => &mut inner.recursive_pins,
            PinType::Direct => &mut inner.direct_pins,
        };
        if !pins.iter().any(|p| p == cid) {
            pins.push(cid.to_string());
        }
    }

    /// Points the name `/ipns/<name>` at `target` (an `/ipfs/...` path).
    pub fn publish(&self, name: &str, target: &str) {
        self.lock()
            .names
            .insert(name.to_string(), target.to_string());
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().lookup(path).is_ok()
    }

    /// Reads a file from the mutable namespace or an `/ipfs/...` path.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().lookup(path) {
            Ok(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn add_sync(
        &self,
        files: &[AddFile],
        options: AddOptions,
    ) -> Result<Vec<AddResult>, BackendError> {
        let mut tree = Node::empty_dir();
        let mut results = Vec::with_capacity(files.len());
        let mut dirs: Vec<String> = Vec::new();

        for file in files {
            let segs = segments(&file.path);
            let (name, parents) = segs
                .split_last()
                .ok_or_else(|| BackendError::new("cannot add a file with an empty path"))?;
            let mut node = &mut tree;
            for (depth, seg) in parents.iter().enumerate() {
                let prefix = parents[..=depth].join("/");
                if !dirs.contains(&prefix) {
                    dirs.push(prefix);
                }
                node = match node {
                    Node::Dir(children) => children
                        .entry(seg.to_string())
                        .or_insert_with(Node::empty_dir),
                    Node::File(_) => {
                        return Err(BackendError::new(format!(
                            "not a directory: {}",
                            file.path
                        )));
                    }
                };
            }
            match node {
                Node::Dir(children) => {
                    children.insert(name.to_string(), Node::File(file.content.clone()));
                }
                Node::File(_) => {
                    return Err(BackendError::new(format!("not a directory: {}", file.path)));
                }
            }
            let leaf = Node::File(file.content.clone());
            results.push(AddResult {
                path: segs.join("/"),
                hash: leaf.cid(),
                size: file.size(),
            });
        }

        // Deepest directories first, the way the daemon streams them back.
        dirs.sort_by_key(|d| std::cmp::Reverse(d.matches('/').count()));
        for dir in &dirs {
            let node = tree
                .walk(&segments(dir))
                .ok_or_else(|| not_found(dir))?;
            results.push(AddResult {
                path: dir.clone(),
                hash: node.cid(),
                size: node.cumulative_size(),
            });
        }

        let mut inner = self.lock();
        let root_cid = inner.store(&tree);
        if options.wrap_with_directory {
            results.push(AddResult {
                path: String::new(),
                hash: root_cid,
                size: tree.cumulative_size(),
            });
        }
        if options.pin {
            let top: Vec<String> = results
                .iter()
                .filter(|r| !r.path.contains('/'))
                .map(|r| r.hash.clone())
                .collect();
            for cid in top {
                if !inner.recursive_pins.contains(&cid) {
                    inner.recursive_pins.push(cid);
                }
            }
        }
        Ok(results)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn stat(&self, path: &str) -> Result<NodeStat, BackendError> {
        let mut inner = self.lock();
        let node = inner.lookup(path)?.clone();
        let hash = inner.store(&node);
        let size = match &node {
            Node::File(bytes) => bytes.len() as u64,
            Node::Dir(_) => 0,
        };
        Ok(NodeStat {
            hash,
            name: None,
            size: Some(size),
            cumulative_size: Some(node.cumulative_size()),
            node_type: node.node_type(),
        })
    }

    async fn ls(&self, cid: &str) -> Result<Vec<NodeStat>, BackendError> {
        let inner = self.lock();
        match inner.block(cid)? {
            Node::Dir(children) => Ok(children
                .iter()
                .map(|(name, child)| NodeStat {
                    hash: child.cid(),
                    name: Some(name.clone()),
                    size: match child {
                        Node::File(bytes) => Some(bytes.len() as u64),
                        Node::Dir(_) => None,
                    },
                    cumulative_size: None,
                    node_type: child.node_type(),
                })
                .collect()),
            Node::File(_) => Err(BackendError::new(format!("not a directory: {cid}"))),
        }
    }

    async fn cat(&self, cid: &str) -> Result<Vec<u8>, BackendError> {
        let inner = self.lock();
        match inner.block(cid)? {
            Node::File(bytes) => Ok(bytes.clone()),
            Node::Dir(_) => Err(BackendError::new("this dag node is a directory")),
        }
    }

    async fn add(
        &self,
        files: &[AddFile],
        options: AddOptions,
        progress: &dyn Progress,
    ) -> Result<Vec<AddResult>, BackendError> {
        let results = self.add_sync(files, options)?;
        let mut sent = 0;
        for file in files {
            sent += file.size();
            progress.report(sent);
        }
        Ok(results)
    }

    async fn pin_ls(&self, pin_type: PinType) -> Result<Vec<String>, BackendError> {
        let inner = self.lock();
        Ok(match pin_type {
            PinType::Recursive => inner.recursive_pins.clone(),
            PinType::Direct => inner.direct_pins.clone(),
        })
    }

    async fn name_resolve(&self, path: &str) -> Result<String, BackendError> {
        let rest = path
            .strip_prefix("/ipns/")
            .ok_or_else(|| BackendError::new(format!("not an ipns path: {path}")))?;
        let (name, tail) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        let inner = self.lock();
        let target = inner
            .names
            .get(name)
            .ok_or_else(|| BackendError::new(format!("could not resolve name: {name}")))?;
        Ok(format!("{target}{tail}"))
    }

    async fn files_cp(&self, src: &str, dst: &str) -> Result<(), BackendError> {
        let mut inner = self.lock();
        let node = inner.lookup(src)?.clone();
        inner.store(&node);
        inner.insert(dst, node)
    }

    async fn files_mv(&self, src: &str, dst: &str) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if segments(dst).starts_with(&segments(src)) {
            return Err(BackendError::new(format!("cannot move {src} into itself")));
        }
        if inner.lookup(dst).is_ok() {
            return Err(BackendError::new(format!(
                "directory already has entry by that name: {dst}"
            )));
        }
        let node = inner.remove(src)?;
        inner.insert(dst, node)
    }

    async fn files_rm(&self, path: &str, recursive: bool) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if let Node::Dir(_) = inner.lookup(path)? {
            if !recursive {
                return Err(BackendError::new(format!("{path} is a directory, use -r")));
            }
        }
        inner.remove(path).map(|_| ())
    }

    async fn files_mkdir(&self, path: &str, parents: bool) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if parents {
            return inner.mkdir_all(path);
        }
        inner.insert(path, Node::empty_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoProgress;
    use std::sync::atomic::AtomicU64;

    #[tokio::test]
    async fn identical_content_shares_identifier() {
        let backend = MemoryBackend::new();
        let a = backend.put_file(b"same".to_vec());
        let b = backend.put_file(b"same".to_vec());
        let c = backend.put_file(b"other".to_vec());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("bafy"));
    }

    #[tokio::test]
    async fn stat_mfs_directory_reports_cumulative_size() {
        let backend = MemoryBackend::new();
        backend.write_file("/docs/a.txt", b"1234".to_vec()).unwrap();
        backend.write_file("/docs/sub/b.txt", b"56".to_vec()).unwrap();

        let stat = backend.stat("/docs").await.unwrap();
        assert_eq!(stat.node_type, NodeType::Directory);
        assert_eq!(stat.cumulative_size, Some(6));
    }

    #[tokio::test]
    async fn ls_by_identifier_after_stat() {
        let backend = MemoryBackend::new();
        backend.write_file("/docs/a.txt", b"1234".to_vec()).unwrap();
        backend.mkdir("/docs/sub").unwrap();

        let stat = backend.stat("/docs").await.unwrap();
        let children = backend.ls(&stat.hash).await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name.as_deref(), Some("a.txt"));
        assert_eq!(children[0].size, Some(4));
        assert_eq!(children[1].node_type, NodeType::Directory);
    }

    #[tokio::test]
    async fn stat_ipfs_path_walks_into_block() {
        let backend = MemoryBackend::new();
        backend.write_file("/docs/a.txt", b"x".to_vec()).unwrap();
        let dir = backend.stat("/docs").await.unwrap();

        let file = backend
            .stat(&format!("/ipfs/{}/a.txt", dir.hash))
            .await
            .unwrap();
        assert_eq!(file.node_type, NodeType::File);
        assert_eq!(file.size, Some(1));
    }

    #[tokio::test]
    async fn cat_reads_file_bytes() {
        let backend = MemoryBackend::new();
        let cid = backend.put_file(b"hello".to_vec());
        assert_eq!(backend.cat(&cid).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn cp_refuses_existing_destination() {
        let backend = MemoryBackend::new();
        backend.write_file("/a.txt", b"a".to_vec()).unwrap();
        backend.write_file("/b.txt", b"b".to_vec()).unwrap();
        assert!(backend.files_cp("/a.txt", "/b.txt").await.is_err());
        assert_eq!(backend.read("/b.txt").unwrap(), b"b");
    }

    #[tokio::test]
    async fn cp_from_ipfs_into_mfs() {
        let backend = MemoryBackend::new();
        let cid = backend.put_file(b"data".to_vec());
        backend
            .files_cp(&format!("/ipfs/{cid}"), "/copied.txt")
            .await
            .unwrap();
        assert_eq!(backend.read("/copied.txt").unwrap(), b"data");
    }

    #[tokio::test]
    async fn mv_moves_subtree() {
        let backend = MemoryBackend::new();
        backend.write_file("/old/a.txt", b"a".to_vec()).unwrap();
        backend.files_mv("/old", "/new").await.unwrap();
        assert!(!backend.exists("/old"));
        assert!(backend.exists("/new/a.txt"));
    }

    #[tokio::test]
    async fn mv_into_itself_fails() {
        let backend = MemoryBackend::new();
        backend.mkdir("/a").unwrap();
        assert!(backend.files_mv("/a", "/a/b").await.is_err());
        assert!(backend.exists("/a"));
    }

    #[tokio::test]
    async fn rm_directory_requires_recursive() {
        let backend = MemoryBackend::new();
        backend.write_file("/d/a.txt", b"a".to_vec()).unwrap();
        assert!(backend.files_rm("/d", false).await.is_err());
        backend.files_rm("/d", true).await.unwrap();
        assert!(!backend.exists("/d"));
    }

    #[tokio::test]
    async fn mkdir_without_parents_needs_parent() {
        let backend = MemoryBackend::new();
        assert!(backend.files_mkdir("/x/y", false).await.is_err());
        backend.files_mkdir("/x/y", true).await.unwrap();
        assert!(backend.exists("/x/y"));
        // parents mode tolerates an existing directory
        backend.files_mkdir("/x/y", true).await.unwrap();
    }

    #[tokio::test]
    async fn add_returns_files_and_directories() {
        let backend = MemoryBackend::new();
        let files = vec![
            AddFile::new("top.txt", b"12".to_vec()),
            AddFile::new("dir/inner.txt", b"345".to_vec()),
            AddFile::new("dir/sub/deep.txt", b"6".to_vec()),
        ];
        let results = backend
            .add(&files, AddOptions::default(), &NoProgress)
            .await
            .unwrap();

        let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["top.txt", "dir/inner.txt", "dir/sub/deep.txt", "dir/sub", "dir"]
        );
        let dir = results.iter().find(|r| r.path == "dir").unwrap();
        assert_eq!(dir.size, 4);
        assert!(backend.exists(&format!("/ipfs/{}/sub/deep.txt", dir.hash)));
    }

    #[tokio::test]
    async fn add_reports_cumulative_progress() {
        struct Recorder(AtomicU64);
        impl Progress for Recorder {
            fn report(&self, sent: u64) {
                self.0.store(sent, Ordering::SeqCst);
            }
        }

        let backend = MemoryBackend::new();
        let recorder = Recorder(AtomicU64::new(0));
        let files = vec![
            AddFile::new("a", vec![0; 30]),
            AddFile::new("b", vec![0; 70]),
        ];
        backend
            .add(&files, AddOptions::default(), &recorder)
            .await
            .unwrap();
        assert_eq!(recorder.0.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn pins_are_listed_by_type() {
        let backend = MemoryBackend::new();
        let a = backend.put_file(b"a".to_vec());
        let b = backend.put_file(b"b".to_vec());
        backend.pin(&a, PinType::Recursive);
        backend.pin(&a, PinType::Recursive);
        backend.pin(&b, PinType::Direct);

        assert_eq!(backend.pin_ls(PinType::Recursive).await.unwrap(), vec![a]);
        assert_eq!(backend.pin_ls(PinType::Direct).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn name_resolve_appends_tail() {
        let backend = MemoryBackend::new();
        backend.publish("site", "/ipfs/bafyroot");
        let resolved = backend.name_resolve("/ipns/site/about").await.unwrap();
        assert_eq!(resolved, "/ipfs/bafyroot/about");
        assert!(backend.name_resolve("/ipns/unknown").await.is_err());
    }

    #[test]
    fn connectivity_toggle() {
        let backend = MemoryBackend::new();
        assert!(backend.is_connected());
        backend.set_connected(false);
        assert!(!backend.is_connected());
    }
}
