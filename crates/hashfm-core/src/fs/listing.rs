//! Listing resolution: turning a logical path into a [`PageContent`].
//!
//! Three regimes:
//!
//! - namespace roots (`/`, `/ipns`) resolve to an empty listing without
//!   touching the backend;
//! - the pinned-content pseudo-root (`/ipfs`) lists every recursive and
//!   direct pin;
//! - anything else is mapped to a backend path, stat'ed, and either listed
//!   (directory) or wrapped in a deferred reader (file).

use std::sync::Arc;

use futures::future::try_join_all;

use crate::backend::{Backend, NodeStat, NodeType, PinType};
use crate::config::FilesConfig;
use crate::error::CoreResult;
use crate::fs::entry::FileEntry;
use crate::fs::page::{FileReader, PageContent};
use crate::fs::paths::{
    is_namespace_root, is_within, join_path, parent_path, real_mfs_path, IPFS_ROOT, IPNS_ROOT,
    ROOT,
};
use crate::nav::sort::{sort_files, SortSpec};

/// Resolves logical paths against a backend.
#[derive(Clone)]
pub struct ListingResolver {
    backend: Arc<dyn Backend>,
    mfs_root: String,
    eager_stat_threshold: usize,
    mix_directories: bool,
}

impl ListingResolver {
    pub fn new(backend: Arc<dyn Backend>, config: &FilesConfig) -> Self {
        Self {
            backend,
            mfs_root: config.mfs_root.clone(),
            eager_stat_threshold: config.listing.eager_stat_threshold,
            mix_directories: config.sort.mix_directories,
        }
    }

    /// Maps a logical path to something the backend can stat.
    ///
    /// Mutable-namespace paths are relativised to the namespace root and
    /// `/ipns/...` paths go through name resolution; content paths pass
    /// through unchanged.
    pub async fn path_to_stat(&self, path: &str) -> CoreResult<String> {
        if is_within(path, &self.mfs_root) {
            return Ok(real_mfs_path(path, &self.mfs_root));
        }
        if is_within(path, IPNS_ROOT) {
            return Ok(self.backend.name_resolve(path).await?);
        }
        Ok(path.to_string())
    }

    /// Produces the page for `path`, sorting directory content by `sorting`.
    pub async fn resolve(&self, path: &str, sorting: SortSpec) -> CoreResult<PageContent> {
        if is_namespace_root(path) {
            return Ok(PageContent::empty_directory(path));
        }

        if path == IPFS_ROOT {
            let pins = self.pinned_entries().await?;
            return Ok(PageContent::directory(IPFS_ROOT, None, pins, None));
        }

        let to_stat = self.path_to_stat(path).await?;
        let stats = self.backend.stat(&to_stat).await?;

        if stats.node_type == NodeType::File {
            let entry = FileEntry::from_stat(&stats, Some(path)).with_size(stats.size);
            let reader = FileReader::new(Arc::clone(&self.backend), stats.hash.clone());
            return Ok(PageContent::file(path, entry, reader));
        }

        let children = self.backend.ls(&stats.hash).await?;
        let eager = children.len() < self.eager_stat_threshold;
        let files = try_join_all(
            children
                .iter()
                .map(|child| self.child_entry(path, child, eager)),
        )
        .await?;

        let upper = self.parent_link(path).await?;

        Ok(PageContent::directory(
            path,
            Some(stats.hash),
            sort_files(&files, sorting, self.mix_directories),
            upper,
        ))
    }

    async fn child_entry(&self, dir: &str, child: &NodeStat, eager: bool) -> CoreResult<FileEntry> {
        let name = child.name.as_deref().unwrap_or(&child.hash);
        let abs = join_path(dir, name);
        if eager && child.node_type == NodeType::Directory {
            let stat = self.backend.stat(&format!("/ipfs/{}", child.hash)).await?;
            return Ok(FileEntry::from_stat(&stat, Some(&abs)));
        }
        Ok(FileEntry::from_stat(child, Some(&abs)))
    }

    /// The "up" entry, unless the parent is a namespace root or `/ipfs`.
    async fn parent_link(&self, path: &str) -> CoreResult<Option<FileEntry>> {
        let upper_path = parent_path(path);
        if upper_path == IPNS_ROOT || upper_path == IPFS_ROOT || upper_path == ROOT {
            return Ok(None);
        }
        let to_stat = self.path_to_stat(&upper_path).await?;
        let stat = self.backend.stat(&to_stat).await?;
        Ok(Some(FileEntry::from_stat(&stat, None).into_parent_link(upper_path)))
    }

    /// Every recursive and direct pin, stat'ed and flagged as pinned.
    pub async fn pinned_entries(&self) -> CoreResult<Vec<FileEntry>> {
        let mut pins = self.backend.pin_ls(PinType::Recursive).await?;
        pins.extend(self.backend.pin_ls(PinType::Direct).await?);

        let stats = try_join_all(
            pins.iter()
                .map(|cid| async move { self.backend.stat(&format!("/ipfs/{cid}")).await }),
        )
        .await?;

        Ok(stats
            .iter()
            .map(|stat| FileEntry::from_stat(stat, None).with_pinned(true))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::CoreError;
    use crate::fs::page::PageBody;
    use crate::nav::sort::SortBy;

    fn resolver(backend: Arc<MemoryBackend>) -> ListingResolver {
        let mut config = FilesConfig::default();
        config.sort.mix_directories = false;
        ListingResolver::new(backend, &config)
    }

    fn names(page: &PageContent) -> Vec<&str> {
        page.content().iter().map(|e| e.name()).collect()
    }

    #[tokio::test]
    async fn namespace_roots_are_empty() {
        let backend = Arc::new(MemoryBackend::new());
        let resolver = resolver(backend);
        for root in ["/", "/ipns"] {
            let page = resolver.resolve(root, SortSpec::default()).await.unwrap();
            assert!(page.is_dir());
            assert!(page.content().is_empty());
            assert_eq!(page.path(), root);
        }
    }

    #[tokio::test]
    async fn mfs_directory_listing() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/a.txt", vec![0; 10]).unwrap();
        backend.write_file("/b/inner.bin", vec![0; 5]).unwrap();
        let resolver = resolver(Arc::clone(&backend));

        let page = resolver.resolve("/home", SortSpec::default()).await.unwrap();
        assert_eq!(page.path(), "/home");
        assert!(page.hash().is_some());
        // directories first under the default grouping
        assert_eq!(names(&page), vec!["b", "a.txt"]);
        let b = &page.content()[0];
        assert_eq!(b.path(), "/home/b");
        assert_eq!(b.size(), Some(5));
        assert!(page.upper().is_none(), "parent of /home is the root");
    }

    #[tokio::test]
    async fn mixed_listing_sorts_by_name_only() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/a.txt", vec![0; 10]).unwrap();
        backend.write_file("/b/inner.bin", vec![0; 5]).unwrap();
        let mut config = FilesConfig::default();
        config.sort.mix_directories = true;
        let resolver = ListingResolver::new(backend, &config);

        let page = resolver.resolve("/home", SortSpec::default()).await.unwrap();
        assert_eq!(names(&page), vec!["a.txt", "b"]);
    }

    #[tokio::test]
    async fn large_directories_skip_child_stats() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/big/sub/x", vec![0; 7]).unwrap();
        backend.write_file("/big/y", vec![0; 1]).unwrap();
        let mut config = FilesConfig::default();
        config.listing.eager_stat_threshold = 2;
        let resolver = ListingResolver::new(backend, &config);

        let page = resolver.resolve("/home/big", SortSpec::default()).await.unwrap();
        let sub = page.content().iter().find(|e| e.name() == "sub").unwrap();
        assert_eq!(sub.size(), None);
    }

    #[tokio::test]
    async fn nested_directory_has_parent_link() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/docs/notes/a.txt", vec![0; 3]).unwrap();
        let resolver = resolver(backend);

        let page = resolver
            .resolve("/home/docs/notes", SortSpec::default())
            .await
            .unwrap();
        let upper = page.upper().unwrap();
        assert_eq!(upper.name(), "...");
        assert_eq!(upper.path(), "/home/docs");
        assert!(upper.is_parent());
        assert!(upper.is_dir());
    }

    #[tokio::test]
    async fn file_path_yields_file_page() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/docs/a.txt", b"hello".to_vec()).unwrap();
        let resolver = resolver(backend);

        let page = resolver
            .resolve("/home/docs/a.txt", SortSpec::default())
            .await
            .unwrap();
        match page.body() {
            PageBody::File { entry, reader } => {
                assert_eq!(entry.name(), "a.txt");
                assert_eq!(entry.size(), Some(5));
                assert_eq!(reader.read().await.unwrap(), b"hello");
            }
            PageBody::Directory { .. } => panic!("expected a file page"),
        }
    }

    #[tokio::test]
    async fn ipfs_content_path() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/site/index.html", b"<p>".to_vec()).unwrap();
        backend.write_file("/site/css/main.css", b"p{}".to_vec()).unwrap();
        let cid = backend.stat("/site").await.unwrap().hash;
        let resolver = resolver(backend);

        let path = format!("/ipfs/{cid}/css");
        let page = resolver.resolve(&path, SortSpec::default()).await.unwrap();
        assert_eq!(names(&page), vec!["main.css"]);
        assert_eq!(page.content()[0].path(), format!("{path}/main.css"));
        assert_eq!(page.upper().unwrap().path(), format!("/ipfs/{cid}"));
    }

    #[tokio::test]
    async fn ipns_path_is_resolved() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/site/index.html", b"<p>".to_vec()).unwrap();
        let cid = backend.stat("/site").await.unwrap().hash;
        backend.publish("example", &format!("/ipfs/{cid}"));
        let resolver = resolver(backend);

        let page = resolver
            .resolve("/ipns/example", SortSpec::default())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["index.html"]);
        assert!(page.upper().is_none());
    }

    #[tokio::test]
    async fn pinned_root_lists_pins_in_order() {
        let backend = Arc::new(MemoryBackend::new());
        let a = backend.put_file(b"a".to_vec());
        let b = backend.put_file(b"bb".to_vec());
        let c = backend.put_file(b"ccc".to_vec());
        backend.pin(&b, PinType::Recursive);
        backend.pin(&a, PinType::Recursive);
        backend.pin(&c, PinType::Direct);
        let resolver = resolver(backend);

        let page = resolver.resolve("/ipfs", SortSpec::default()).await.unwrap();
        let hashes: Vec<&str> = page.content().iter().filter_map(|e| e.hash()).collect();
        assert_eq!(hashes, vec![b.as_str(), a.as_str(), c.as_str()]);
        assert!(page.content().iter().all(FileEntry::is_pinned));
        assert!(page.upper().is_none());
    }

    #[tokio::test]
    async fn missing_path_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        let resolver = resolver(backend);
        let result = resolver.resolve("/home/nope", SortSpec::default()).await;
        assert!(matches!(result, Err(CoreError::Backend(_))));
    }

    #[tokio::test]
    async fn listing_honours_sort_spec() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_file("/three", vec![0; 3]).unwrap();
        backend.write_file("/one", vec![0; 1]).unwrap();
        backend.write_file("/two", vec![0; 2]).unwrap();
        let resolver = resolver(backend);

        let page = resolver
            .resolve("/home", SortSpec::new(SortBy::Size, false))
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["three", "two", "one"]);
    }

    #[tokio::test]
    async fn path_to_stat_regimes() {
        let backend = Arc::new(MemoryBackend::new());
        backend.publish("n", "/ipfs/bafyx");
        let resolver = resolver(backend);

        assert_eq!(resolver.path_to_stat("/home").await.unwrap(), "/");
        assert_eq!(resolver.path_to_stat("/home/d").await.unwrap(), "/d");
        assert_eq!(resolver.path_to_stat("/ipns/n/a").await.unwrap(), "/ipfs/bafyx/a");
        assert_eq!(resolver.path_to_stat("/ipfs/bafyy").await.unwrap(), "/ipfs/bafyy");
    }
}
