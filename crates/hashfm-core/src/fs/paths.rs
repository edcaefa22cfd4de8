//! Logical path helpers.
//!
//! Logical paths are what the browser shows: `/home/...` for the mutable
//! namespace (the prefix is configurable), `/ipfs/<cid>/...` for immutable
//! content and `/ipns/<name>/...` for resolvable names.

/// The filesystem root.
pub const ROOT: &str = "/";
/// Pinned-content pseudo-root.
pub const IPFS_ROOT: &str = "/ipfs";
/// Name-resolution namespace root.
pub const IPNS_ROOT: &str = "/ipns";
/// Default logical prefix of the mutable namespace.
pub const DEFAULT_MFS_ROOT: &str = "/home";

/// `true` for paths that have no listing of their own (`/` and `/ipns`).
pub fn is_namespace_root(path: &str) -> bool {
    path == ROOT || path == IPNS_ROOT
}

/// `true` if `path` is `root` itself or lies below it.
pub fn is_within(path: &str, root: &str) -> bool {
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Maps a logical mutable-namespace path to the backend's path
/// (`/home/docs` becomes `/docs`, `/home` becomes `/`). Other paths are
/// returned unchanged.
pub fn real_mfs_path(path: &str, mfs_root: &str) -> String {
    if !is_within(path, mfs_root) {
        return path.to_string();
    }
    let rest = &path[mfs_root.len()..];
    if rest.is_empty() {
        ROOT.to_string()
    } else {
        rest.to_string()
    }
}

/// Parent of `path` (`/a/b` becomes `/a`, `/a` becomes `/`).
pub fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => ROOT.to_string(),
        Some(i) => trimmed[..i].to_string(),
    }
}

/// Joins `name` onto `base` with exactly one separator.
pub fn join_path(base: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if name.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Last path segment (`/a/b.txt` gives `b.txt`).
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
