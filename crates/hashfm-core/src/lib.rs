//! hashfm core library: state management for a file browser over a
//! content-addressed store.
//!
//! `hashfm-core` tracks backend operations, folds their lifecycle events into
//! a [`ModuleState`] and exposes derived views of it. Rendering is left to
//! the host; everything here is UI-agnostic.
//!
//! # Modules
//!
//! - [`backend`] — The [`Backend`] trait and an in-memory implementation.
//! - [`tracker`] — The [`Files`] context and the operation tracker.
//! - [`commands`] — Fetch, write, delete, move, copy, mkdir, add-by-path, links, navigation.
//! - [`state`] — [`ModuleState`] and its reducer.
//! - [`selectors`] — Read-only views over the state.
//! - [`fs`] — Entries, pages, path helpers, listing resolution and upload accounting.
//! - [`nav`] — Sorting and route handling.
//! - [`links`] — Download and share link builders.
//! - [`config`] — TOML-based settings.
//! - [`event`] — Lifecycle events and operation kinds.
//! - [`error`] — Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod links;
pub mod nav;
pub mod selectors;
pub mod state;
pub mod tracker;

pub use backend::{Backend, BackendError, MemoryBackend};
pub use config::FilesConfig;
pub use error::{CoreError, CoreResult, OperationError};
pub use event::{Event, OperationData, OperationId, OperationKind, Phase};
pub use fs::entry::FileEntry;
pub use fs::page::PageContent;
pub use links::{GatewayLinks, LinkBuilder};
pub use nav::route::{MemoryRouter, Navigator, RouteInfo};
pub use nav::sort::{sort_files, SortBy, SortSpec};
pub use state::ModuleState;
pub use tracker::Files;

/// Normalises a string to NFC (composed) form.
///
/// Names uploaded from macOS arrive in NFD (decomposed), so the same name
/// could otherwise show up twice in a listing.
pub fn nfc_string(s: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    s.nfc().collect()
}
