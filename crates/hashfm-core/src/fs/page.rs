//! The directory or file currently being viewed.

use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::backend::Backend;
use crate::error::CoreResult;
use crate::fs::entry::FileEntry;
use crate::nav::sort::{sort_files, SortSpec};

/// Deferred access to a file's bytes.
///
/// Nothing is read until [`FileReader::read`] is awaited.
#[derive(Clone)]
pub struct FileReader {
    backend: Arc<dyn Backend>,
    hash: String,
}

impl FileReader {
    pub fn new(backend: Arc<dyn Backend>, hash: impl Into<String>) -> Self {
        Self {
            backend,
            hash: hash.into(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub async fn read(&self) -> CoreResult<Vec<u8>> {
        Ok(self.backend.cat(&self.hash).await?)
    }
}

impl std::fmt::Debug for FileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

/// What a page shows: a directory listing or a single file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PageBody {
    Directory {
        content: Vec<FileEntry>,
        /// Link to the parent directory, if it is browsable.
        upper: Option<FileEntry>,
    },
    File {
        entry: FileEntry,
        #[serde(skip)]
        reader: FileReader,
    },
}

/// Result of a successful fetch. Replaced wholesale by the next one.
#[derive(Debug, Clone, Serialize)]
pub struct PageContent {
    path: String,
    fetched: SystemTime,
    hash: Option<String>,
    #[serde(flatten)]
    body: PageBody,
}

impl PageContent {
    pub fn directory(
        path: impl Into<String>,
        hash: Option<String>,
        content: Vec<FileEntry>,
        upper: Option<FileEntry>,
    ) -> Self {
        Self {
            path: path.into(),
            fetched: SystemTime::now(),
            hash,
            body: PageBody::Directory { content, upper },
        }
    }

    /// An empty listing with no parent link, used for namespace roots.
    pub fn empty_directory(path: impl Into<String>) -> Self {
        Self::directory(path, None, Vec::new(), None)
    }

    pub fn file(path: impl Into<String>, entry: FileEntry, reader: FileReader) -> Self {
        Self {
            path: path.into(),
            fetched: SystemTime::now(),
            hash: entry.hash().map(str::to_string),
            body: PageBody::File { entry, reader },
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fetched(&self) -> SystemTime {
        self.fetched
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn body(&self) -> &PageBody {
        &self.body
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.body, PageBody::Directory { .. })
    }

    /// Directory entries in display order; empty for a file page.
    pub fn content(&self) -> &[FileEntry] {
        match &self.body {
            PageBody::Directory { content, .. } => content,
            PageBody::File { .. } => &[],
        }
    }

    pub fn upper(&self) -> Option<&FileEntry> {
        match &self.body {
            PageBody::Directory { upper, .. } => upper.as_ref(),
            PageBody::File { .. } => None,
        }
    }

    /// The byte accessor of a file page.
    pub fn reader(&self) -> Option<&FileReader> {
        match &self.body {
            PageBody::File { reader, .. } => Some(reader),
            PageBody::Directory { .. } => None,
        }
    }

    /// Returns the page with its directory entries re-sorted.
    pub fn with_sorting(self, spec: SortSpec, mix_directories: bool) -> Self {
        let body = match self.body {
            PageBody::Directory { content, upper } => PageBody::Directory {
                content: sort_files(&content, spec, mix_directories),
                upper,
            },
            file => file,
        };
        Self { body, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::fs::entry::EntryType;
    use crate::nav::sort::SortBy;

    fn entry(name: &str, size: u64) -> FileEntry {
        FileEntry::new(name, format!("/home/{name}"), EntryType::File, Some(size), None)
    }

    #[test]
    fn empty_directory_has_no_content() {
        let page = PageContent::empty_directory("/ipns");
        assert!(page.is_dir());
        assert!(page.content().is_empty());
        assert!(page.upper().is_none());
        assert!(page.hash().is_none());
    }

    #[test]
    fn with_sorting_reorders_content() {
        let page = PageContent::directory(
            "/home",
            Some("bafy".to_string()),
            vec![entry("a", 1), entry("b", 3), entry("c", 2)],
            None,
        );
        let sorted = page.with_sorting(SortSpec::new(SortBy::Size, false), false);
        let names: Vec<&str> = sorted.content().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(sorted.path(), "/home");
    }

    #[tokio::test]
    async fn file_page_reads_lazily() {
        let backend = Arc::new(MemoryBackend::new());
        let cid = backend.put_file(b"payload".to_vec());
        let entry = FileEntry::new("f", "/home/f", EntryType::File, Some(7), Some(cid.clone()));
        let page = PageContent::file("/home/f", entry, FileReader::new(backend, cid.clone()));

        assert!(!page.is_dir());
        assert!(page.content().is_empty());
        assert_eq!(page.hash(), Some(cid.as_str()));
        let reader = page.reader().unwrap();
        assert_eq!(reader.read().await.unwrap(), b"payload");
    }

    #[test]
    fn serializes_with_type_tag() {
        let page = PageContent::directory("/home", None, vec![entry("a", 1)], None);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["type"], "directory");
        assert_eq!(json["path"], "/home");
        assert_eq!(json["content"][0]["name"], "a");
    }
}
