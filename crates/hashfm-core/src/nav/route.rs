//! Route handling: turning the URL hash into a logical path and back.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

/// The parsed route as exposed by the host router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteInfo {
    /// The full route URL (e.g. `/files/home/docs`).
    pub url: String,
    /// The `path` parameter matched by the router (e.g. `/home/docs`).
    pub path: Option<String>,
}

impl RouteInfo {
    pub fn new(url: impl Into<String>, path: Option<String>) -> Self {
        Self {
            url: url.into(),
            path,
        }
    }

    /// Builds the route a router would produce for `hash` under `base_url`.
    pub fn from_hash(hash: &str, base_url: &str) -> Self {
        let path = hash
            .strip_prefix(base_url)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        Self::new(hash, path)
    }
}

/// The host's router, as seen by the file browser.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// The route currently displayed.
    fn route(&self) -> RouteInfo;

    /// Points the URL hash at `hash` (e.g. `/files/home/docs`).
    async fn update_hash(&self, hash: &str);
}

/// Derives the logical path from a route.
///
/// Returns `None` when the route is not under `base_url` or carries no path.
/// One trailing slash is trimmed (except for `/` itself) and the result is
/// percent-decoded.
pub fn path_from_route(route: &RouteInfo, base_url: &str) -> Option<String> {
    if !route.url.starts_with(base_url) {
        return None;
    }
    let raw = route.path.as_deref().filter(|p| !p.is_empty())?;
    let trimmed = if raw.len() > 1 {
        raw.strip_suffix('/').unwrap_or(raw)
    } else {
        raw
    };
    match urlencoding::decode(trimmed) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            tracing::warn!("undecodable route path {trimmed:?}: {e}");
            None
        }
    }
}

/// Percent-encodes each segment of `path`, keeping the separators.
pub fn encode_link(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// The hash that displays `path` under `base_url`.
pub fn hash_for(base_url: &str, path: &str) -> String {
    format!("{base_url}{path}")
}

/// A router kept entirely in memory.
///
/// Records every hash it is pointed at, which makes it suitable for headless
/// hosts and tests.
pub struct MemoryRouter {
    base_url: String,
    inner: Mutex<RouterState>,
}

#[derive(Debug, Default)]
struct RouterState {
    route: RouteInfo,
    visited: Vec<String>,
}

impl MemoryRouter {
    /// Creates a router currently showing `hash`.
    pub fn new(base_url: impl Into<String>, hash: &str) -> Self {
        let base_url = base_url.into();
        let route = RouteInfo::from_hash(hash, &base_url);
        Self {
            base_url,
            inner: Mutex::new(RouterState {
                route,
                visited: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every hash passed to [`Navigator::update_hash`], oldest first.
    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    /// Replaces the current route without recording a visit.
    pub fn set_hash(&self, hash: &str) {
        self.lock().route = RouteInfo::from_hash(hash, &self.base_url);
    }
}

#[async_trait]
impl Navigator for MemoryRouter {
    fn route(&self) -> RouteInfo {
        self.lock().route.clone()
    }

    async fn update_hash(&self, hash: &str) {
        let mut state = self.lock();
        state.route = RouteInfo::from_hash(hash, &self.base_url);
        state.visited.push(hash.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_from_matching_route() {
        let route = RouteInfo::new("/files/home/docs", Some("/home/docs".to_string()));
        assert_eq!(path_from_route(&route, "/files").as_deref(), Some("/home/docs"));
    }

    #[test]
    fn path_from_foreign_route_is_none() {
        let route = RouteInfo::new("/settings", Some("/home".to_string()));
        assert_eq!(path_from_route(&route, "/files"), None);
    }

    #[test]
    fn path_without_param_is_none() {
        let route = RouteInfo::new("/files", None);
        assert_eq!(path_from_route(&route, "/files"), None);
        let route = RouteInfo::new("/files", Some(String::new()));
        assert_eq!(path_from_route(&route, "/files"), None);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let route = RouteInfo::new("/files/home/", Some("/home/".to_string()));
        assert_eq!(path_from_route(&route, "/files").as_deref(), Some("/home"));
    }

    #[test]
    fn root_path_survives_trimming() {
        let route = RouteInfo::new("/files/", Some("/".to_string()));
        assert_eq!(path_from_route(&route, "/files").as_deref(), Some("/"));
    }

    #[test]
    fn path_is_percent_decoded() {
        let route = RouteInfo::new(
            "/files/home/my%20docs",
            Some("/home/my%20docs".to_string()),
        );
        assert_eq!(
            path_from_route(&route, "/files").as_deref(),
            Some("/home/my docs")
        );
    }

    #[test]
    fn encode_link_keeps_separators() {
        assert_eq!(encode_link("/home/my docs/a#b"), "/home/my%20docs/a%23b");
        assert_eq!(encode_link("/home"), "/home");
    }

    #[test]
    fn encode_then_decode_restores_path() {
        let path = "/home/ünïcode dir/x?y";
        let route = RouteInfo::new("/files", Some(encode_link(path)));
        assert_eq!(path_from_route(&route, "/files").as_deref(), Some(path));
    }

    #[test]
    fn route_from_hash() {
        let route = RouteInfo::from_hash("/files/home", "/files");
        assert_eq!(route.path.as_deref(), Some("/home"));
        let route = RouteInfo::from_hash("/files", "/files");
        assert_eq!(route.path, None);
    }

    #[tokio::test]
    async fn memory_router_records_visits() {
        let router = MemoryRouter::new("/files", "/files/home");
        assert_eq!(router.route().path.as_deref(), Some("/home"));

        router.update_hash("/files/home/docs").await;
        assert_eq!(router.route().path.as_deref(), Some("/home/docs"));
        assert_eq!(router.visited(), vec!["/files/home/docs".to_string()]);

        router.set_hash("/files/ipfs");
        assert_eq!(router.route().path.as_deref(), Some("/ipfs"));
        assert_eq!(router.visited().len(), 1);
    }
}
