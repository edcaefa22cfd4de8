//! The command context and the operation tracker.
//!
//! [`Files`] owns the collaborators (backend, navigator, link builder), the
//! configuration and the [`ModuleState`]. Every public command runs through
//! `Files::track`, which wraps it in a STARTED / FINISHED-or-FAILED
//! lifecycle, converts errors into [`OperationError`]s, runs the per-kind
//! follow-up navigation and re-fetches the listing after anything but a
//! FETCH.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use futures::future::BoxFuture;
use tokio::sync::mpsc::UnboundedSender;

use crate::backend::Backend;
use crate::config::FilesConfig;
use crate::error::{CoreError, CoreResult, OperationError};
use crate::event::{Event, OperationData, OperationId, OperationKind};
use crate::fs::listing::ListingResolver;
use crate::fs::paths::parent_path;
use crate::links::{GatewayLinks, LinkBuilder};
use crate::nav::route::{hash_for, path_from_route, Navigator};
use crate::selectors;
use crate::state::ModuleState;

/// Per-command tracking options.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TrackOptions {
    /// Skip the command entirely unless the current path is in the mutable
    /// namespace.
    pub mfs_only: bool,
}

impl TrackOptions {
    pub(crate) fn mfs_only() -> Self {
        Self { mfs_only: true }
    }
}

/// Navigation run after a command succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FollowUp {
    None,
    /// Follow a moved directory if it is the one being viewed.
    Moved { src: String, dst: String },
    /// Show the parent of a deleted path.
    Deleted { path: String },
}

/// Request fencing for FETCH.
///
/// Every fetch takes the next generation; only the newest generation may
/// replace the page. A path that is already being fetched is not fetched
/// again. The request in flight takes over the new generation instead, so
/// its result still lands when the route has come back to it.
#[derive(Debug, Default)]
pub(crate) struct FetchFence {
    latest: u64,
    in_flight: HashMap<String, u64>,
}

impl FetchFence {
    /// Registers a fetch of `path`. `false` if one is already in flight.
    pub(crate) fn begin(&mut self, path: &str) -> bool {
        self.latest += 1;
        match self.in_flight.entry(path.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(self.latest);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(self.latest);
                true
            }
        }
    }

    /// Settles the fetch of `path` and reports whether it is still the newest.
    pub(crate) fn settle(&mut self, path: &str) -> bool {
        self.in_flight.remove(path) == Some(self.latest)
    }
}

/// Ownership of one in-flight fetch. Dropping it unsettled releases the path.
pub(crate) struct FetchTicket<'a> {
    fence: &'a Mutex<FetchFence>,
    path: String,
    settled: bool,
}

impl FetchTicket<'_> {
    /// Settles the fetch. `true` if its result may replace the page.
    pub(crate) fn settle(mut self) -> bool {
        self.settled = true;
        lock(self.fence).settle(&self.path)
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Releasing abandoned fetch of {}", self.path);
            lock(self.fence).in_flight.remove(&self.path);
        }
    }
}

/// Emits a FAILED event for an operation whose future is dropped before it
/// settles, so nothing stays pending.
struct Lifecycle<'a> {
    files: &'a Files,
    kind: OperationKind,
    id: OperationId,
    settled: bool,
}

impl Drop for Lifecycle<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let error = OperationError::from_core(self.kind, &CoreError::Cancelled);
        tracing::warn!("{} cancelled: id={}", self.kind.label(), self.id);
        self.files.dispatch(Event::Failed {
            kind: self.kind,
            id: self.id,
            error,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The file browser: state plus the commands that drive it.
pub struct Files {
    backend: Arc<dyn Backend>,
    navigator: Arc<dyn Navigator>,
    links: Arc<dyn LinkBuilder>,
    config: FilesConfig,
    resolver: ListingResolver,
    state: Mutex<ModuleState>,
    fence: Mutex<FetchFence>,
    events: Option<UnboundedSender<Event>>,
}

impl Files {
    /// Creates a browser with a fresh state and [`GatewayLinks`] for links.
    pub fn new(
        backend: Arc<dyn Backend>,
        navigator: Arc<dyn Navigator>,
        config: FilesConfig,
    ) -> Self {
        let resolver = ListingResolver::new(Arc::clone(&backend), &config);
        let links: Arc<dyn LinkBuilder> = Arc::new(GatewayLinks::new(config.gateway_url.clone()));
        Self {
            backend,
            navigator,
            links,
            state: Mutex::new(ModuleState::from_config(&config)),
            fence: Mutex::new(FetchFence::default()),
            resolver,
            config,
            events: None,
        }
    }

    pub fn with_links(self, links: Arc<dyn LinkBuilder>) -> Self {
        Self { links, ..self }
    }

    /// Forwards every dispatched event to `tx` after it has been applied.
    pub fn with_event_sink(self, tx: UnboundedSender<Event>) -> Self {
        Self {
            events: Some(tx),
            ..self
        }
    }

    pub fn config(&self) -> &FilesConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub(crate) fn links(&self) -> &dyn LinkBuilder {
        self.links.as_ref()
    }

    pub(crate) fn resolver(&self) -> &ListingResolver {
        &self.resolver
    }

    fn lock_state(&self) -> MutexGuard<'_, ModuleState> {
        lock(&self.state)
    }

    /// Claims the fetch of `path`, or `None` if it is already in flight.
    pub(crate) fn fetch_ticket(&self, path: &str) -> Option<FetchTicket<'_>> {
        lock(&self.fence).begin(path).then(|| FetchTicket {
            fence: &self.fence,
            path: path.to_string(),
            settled: false,
        })
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ModuleState {
        self.lock_state().clone()
    }

    /// Reads the state in place, without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&ModuleState) -> R) -> R {
        f(&self.lock_state())
    }

    /// Folds `event` into the state and forwards it to the event sink.
    pub fn dispatch(&self, event: Event) {
        {
            let mut state = self.lock_state();
            let previous = std::mem::take(&mut *state);
            *state = previous.apply(event.clone(), SystemTime::now());
        }
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// The logical path the route currently points at.
    pub fn current_path(&self) -> Option<String> {
        path_from_route(&self.navigator.route(), &self.config.base_url)
    }

    /// `true` if the current path lies in the mutable namespace.
    pub fn is_mfs(&self) -> bool {
        selectors::is_mfs(self.current_path().as_deref(), &self.config.mfs_root)
    }

    /// Runs `op` as a tracked operation of `kind`.
    ///
    /// Returns the operation's data, or `None` if it failed or was skipped.
    pub(crate) async fn track<F, Fut>(
        &self,
        kind: OperationKind,
        options: TrackOptions,
        follow_up: FollowUp,
        op: F,
    ) -> Option<OperationData>
    where
        F: FnOnce(OperationId) -> Fut,
        Fut: Future<Output = CoreResult<OperationData>>,
    {
        if options.mfs_only && !self.is_mfs() {
            tracing::debug!(
                "Skipping {}: current path is outside the mutable namespace",
                kind.label()
            );
            return None;
        }

        let id = OperationId::new();
        tracing::debug!("{} started: id={id}", kind.label());
        self.dispatch(Event::Started { kind, id });
        let mut lifecycle = Lifecycle {
            files: self,
            kind,
            id,
            settled: false,
        };

        let outcome = op(id).await;
        lifecycle.settled = true;
        let result = match outcome {
            Ok(data) => {
                tracing::debug!("{} finished: id={id}", kind.label());
                self.dispatch(Event::Finished {
                    kind,
                    id,
                    data: data.clone(),
                });
                self.follow(follow_up).await;
                Some(data)
            }
            Err(e) => {
                let error = OperationError::from_core(kind, &e);
                tracing::error!("{} failed: id={id}, {error}", kind.label());
                self.dispatch(Event::Failed { kind, id, error });
                None
            }
        };

        if kind.triggers_refetch() {
            self.refresh().await;
        }
        result
    }

    async fn follow(&self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::None => {}
            FollowUp::Moved { src, dst } => {
                let viewing = self.with_state(|state| {
                    state.page_content().is_some_and(|page| page.path() == src)
                });
                if viewing {
                    self.navigator
                        .update_hash(&hash_for(&self.config.base_url, &dst))
                        .await;
                }
            }
            FollowUp::Deleted { path } => {
                let parent = parent_path(&path);
                self.navigator
                    .update_hash(&hash_for(&self.config.base_url, &parent))
                    .await;
            }
        }
    }

    /// Re-fetches the current listing.
    fn refresh(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.fetch().await;
        })
    }
}
