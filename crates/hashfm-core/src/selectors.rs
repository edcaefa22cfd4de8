//! Read-only views derived from [`ModuleState`] and the current route.

use std::time::{Duration, SystemTime};

use crate::event::OperationKind;
use crate::fs::page::PageContent;
use crate::fs::paths::is_within;
use crate::nav::route::{path_from_route, RouteInfo};
use crate::nav::sort::SortSpec;
use crate::state::{FailedRecord, ModuleState, PendingOperation};

/// The page currently displayed, if any.
pub fn files(state: &ModuleState) -> Option<&PageContent> {
    state.page_content()
}

pub fn pins(state: &ModuleState) -> &[String] {
    state.pins()
}

pub fn sorting(state: &ModuleState) -> SortSpec {
    state.sorting()
}

fn pending_fetch(state: &ModuleState) -> Option<&PendingOperation> {
    state
        .pending()
        .iter()
        .find(|op| op.kind == OperationKind::Fetch)
}

/// `true` while any FETCH is pending.
pub fn is_fetching(state: &ModuleState) -> bool {
    pending_fetch(state).is_some()
}

/// `true` once a pending FETCH has been running for longer than `delay`.
pub fn show_loading_animation(state: &ModuleState, now: SystemTime, delay: Duration) -> bool {
    pending_fetch(state).is_some_and(|op| {
        now.duration_since(op.start)
            .map(|elapsed| elapsed > delay)
            .unwrap_or(false)
    })
}

/// Mean progress over pending WRITEs that have reported a non-zero value.
///
/// `None` when no such write exists.
pub fn write_progress(state: &ModuleState) -> Option<f64> {
    let progress: Vec<f64> = state
        .pending()
        .iter()
        .filter(|op| op.kind == OperationKind::Write)
        .filter_map(|op| op.data.progress())
        .filter(|p| *p != 0.0)
        .collect();
    if progress.is_empty() {
        return None;
    }
    Some(progress.iter().sum::<f64>() / progress.len() as f64)
}

pub fn has_error(state: &ModuleState) -> bool {
    !state.failed().is_empty()
}

pub fn errors(state: &ModuleState) -> &[FailedRecord] {
    state.failed()
}

/// The logical path the route points at. See [`path_from_route`].
pub fn path_from_hash(route: &RouteInfo, base_url: &str) -> Option<String> {
    path_from_route(route, base_url)
}

/// `true` if `path` lies in the mutable namespace rooted at `mfs_root`.
pub fn is_mfs(path: Option<&str>, mfs_root: &str) -> bool {
    path.is_some_and(|p| is_within(p, mfs_root))
}
