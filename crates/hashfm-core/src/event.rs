//! Lifecycle events emitted by tracked operations.
//!
//! Every tracked command emits a [`Event::Started`], optionally some
//! [`Event::Updated`] progress reports, and then exactly one of
//! [`Event::Finished`] or [`Event::Failed`], all carrying the same
//! [`OperationId`]. The reducer in [`crate::state`] folds these into the
//! module state. The kind and phase travel as enums, never as parsed strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OperationError;
use crate::fs::page::PageContent;
use crate::nav::sort::SortSpec;

/// Prefix shared by every event type this module emits.
pub const NAMESPACE: &str = "FILES";

/// The kinds of file operation the tracker knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Fetch,
    Move,
    Copy,
    Delete,
    MakeDir,
    Write,
    DownloadLink,
    ShareLink,
    AddByPath,
}

impl OperationKind {
    /// Upper-case label used in event type names (e.g. `"MAKEDIR"`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Fetch => "FETCH",
            Self::Move => "MOVE",
            Self::Copy => "COPY",
            Self::Delete => "DELETE",
            Self::MakeDir => "MAKEDIR",
            Self::Write => "WRITE",
            Self::DownloadLink => "DOWNLOADLINK",
            Self::ShareLink => "SHARELINK",
            Self::AddByPath => "ADDBYPATH",
        }
    }

    /// Error code used when a failure carries no code of its own.
    pub fn default_error_code(self) -> String {
        format!("ERR_{}", self.label())
    }

    /// Whether finishing or failing this kind re-fetches the current listing.
    pub fn triggers_refetch(self) -> bool {
        !matches!(self, Self::Fetch)
    }
}

/// Lifecycle phase of a tracked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Started,
    Updated,
    Finished,
    Failed,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Updated => "UPDATED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }
}

/// Correlation id linking all events of one operation invocation.
///
/// Ids are random, never derived from the operation's arguments, so two
/// identical concurrent operations are tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Payload attached to a pending entry or a finished record.
#[derive(Debug, Clone, Default, Serialize)]
pub enum OperationData {
    #[default]
    Empty,
    /// Upload progress as a percentage in `0.0..=100.0`.
    Progress(f64),
    /// A freshly resolved listing or file view.
    Page(PageContent),
    /// A fetch whose result arrived after a newer fetch was requested.
    Superseded { path: String },
    /// A generated download or share URL.
    Link(String),
}

impl OperationData {
    /// Progress percentage, if this payload is a progress report.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Progress(p) => Some(*p),
            _ => None,
        }
    }

    pub fn page(&self) -> Option<&PageContent> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Link(url) => Some(url),
            _ => None,
        }
    }
}

/// An event folded by the reducer.
#[derive(Debug, Clone, Serialize)]
pub enum Event {
    Started {
        kind: OperationKind,
        id: OperationId,
    },
    Updated {
        kind: OperationKind,
        id: OperationId,
        data: OperationData,
    },
    Finished {
        kind: OperationKind,
        id: OperationId,
        data: OperationData,
    },
    Failed {
        kind: OperationKind,
        id: OperationId,
        error: OperationError,
    },
    /// Clears the failed log.
    DismissErrors,
    /// Stores a new sort order and re-sorts the current listing.
    UpdateSort(SortSpec),
}

impl Event {
    /// The `(kind, phase)` pair for lifecycle events; `None` for UI-only events.
    pub fn lifecycle(&self) -> Option<(OperationKind, Phase)> {
        match self {
            Self::Started { kind, .. } => Some((*kind, Phase::Started)),
            Self::Updated { kind, .. } => Some((*kind, Phase::Updated)),
            Self::Finished { kind, .. } => Some((*kind, Phase::Finished)),
            Self::Failed { kind, .. } => Some((*kind, Phase::Failed)),
            Self::DismissErrors | Self::UpdateSort(_) => None,
        }
    }

    pub fn id(&self) -> Option<OperationId> {
        match self {
            Self::Started { id, .. }
            | Self::Updated { id, .. }
            | Self::Finished { id, .. }
            | Self::Failed { id, .. } => Some(*id),
            Self::DismissErrors | Self::UpdateSort(_) => None,
        }
    }

    /// Namespaced type name, e.g. `FILES_WRITE_UPDATED` or `FILES_UPDATE_SORT`.
    pub fn type_name(&self) -> String {
        match self {
            Self::DismissErrors => format!("{NAMESPACE}_DISMISS_ERRORS"),
            Self::UpdateSort(_) => format!("{NAMESPACE}_UPDATE_SORT"),
            _ => match self.lifecycle() {
                Some((kind, phase)) => {
                    format!("{NAMESPACE}_{}_{}", kind.label(), phase.label())
                }
                None => NAMESPACE.to_string(),
            },
        }
    }
}
