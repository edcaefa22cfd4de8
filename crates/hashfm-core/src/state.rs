//! Module state and the reducer that folds events into it.
//!
//! [`ModuleState::apply`] is a pure function of the previous state, the
//! event and the current time. It consumes the old state and returns the new
//! one, so no earlier value is ever observed half-updated.

use std::time::SystemTime;

use serde::Serialize;

use crate::config::FilesConfig;
use crate::error::OperationError;
use crate::event::{Event, OperationData, OperationId, OperationKind};
use crate::fs::page::PageContent;
use crate::fs::paths::IPFS_ROOT;
use crate::nav::sort::SortSpec;

/// An operation that has started and not yet finished or failed.
#[derive(Debug, Clone, Serialize)]
pub struct PendingOperation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub start: SystemTime,
    pub data: OperationData,
}

/// Log entry for a finished operation.
///
/// `start` is `None` when the FINISHED event matched no pending entry.
#[derive(Debug, Clone, Serialize)]
pub struct FinishedRecord {
    pub id: OperationId,
    pub kind: OperationKind,
    pub start: Option<SystemTime>,
    pub end: SystemTime,
    pub data: OperationData,
}

/// Log entry for a failed operation. `data` is the last pending payload.
#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord {
    pub id: OperationId,
    pub kind: OperationKind,
    pub start: Option<SystemTime>,
    pub end: SystemTime,
    pub data: OperationData,
    pub error: OperationError,
}

/// Everything the file browser knows, rebuilt from scratch on each start.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleState {
    page_content: Option<PageContent>,
    pins: Vec<String>,
    sorting: SortSpec,
    pending: Vec<PendingOperation>,
    finished: Vec<FinishedRecord>,
    failed: Vec<FailedRecord>,
    #[serde(skip)]
    mix_directories: bool,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self::from_config(&FilesConfig::default())
    }
}

impl ModuleState {
    pub fn new(sorting: SortSpec, mix_directories: bool) -> Self {
        Self {
            page_content: None,
            pins: Vec::new(),
            sorting,
            pending: Vec::new(),
            finished: Vec::new(),
            failed: Vec::new(),
            mix_directories,
        }
    }

    pub fn from_config(config: &FilesConfig) -> Self {
        Self::new(config.initial_sort(), config.sort.mix_directories)
    }

    pub fn page_content(&self) -> Option<&PageContent> {
        self.page_content.as_ref()
    }

    /// Content identifiers of the last pinned-root listing, in listing order.
    pub fn pins(&self) -> &[String] {
        &self.pins
    }

    pub fn sorting(&self) -> SortSpec {
        self.sorting
    }

    /// Pending operations. Order is not meaningful.
    pub fn pending(&self) -> &[PendingOperation] {
        &self.pending
    }

    pub fn finished(&self) -> &[FinishedRecord] {
        &self.finished
    }

    pub fn failed(&self) -> &[FailedRecord] {
        &self.failed
    }

    pub fn find_pending(&self, id: OperationId) -> Option<&PendingOperation> {
        self.pending.iter().find(|p| p.id == id)
    }

    /// Folds `event` into the state.
    pub fn apply(self, event: Event, now: SystemTime) -> Self {
        match event {
            Event::DismissErrors => Self {
                failed: Vec::new(),
                ..self
            },
            Event::UpdateSort(sorting) => {
                let mix = self.mix_directories;
                Self {
                    page_content: self
                        .page_content
                        .map(|page| page.with_sorting(sorting, mix)),
                    sorting,
                    ..self
                }
            }
            Event::Started { kind, id } => self.started(kind, id, now),
            Event::Updated { id, data, .. } => self.updated(id, data),
            Event::Failed { kind, id, error } => self.failed_with(kind, id, error, now),
            Event::Finished { kind, id, data } => self.finished_with(kind, id, data, now),
        }
    }

    fn take_pending(&mut self, id: OperationId) -> Option<PendingOperation> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.swap_remove(index))
    }

    fn started(mut self, kind: OperationKind, id: OperationId, now: SystemTime) -> Self {
        if self.find_pending(id).is_none() {
            self.pending.push(PendingOperation {
                id,
                kind,
                start: now,
                data: OperationData::Empty,
            });
        }
        self
    }

    fn updated(mut self, id: OperationId, data: OperationData) -> Self {
        if let Some(op) = self.take_pending(id) {
            self.pending.push(PendingOperation { data, ..op });
        }
        self
    }

    fn failed_with(
        mut self,
        kind: OperationKind,
        id: OperationId,
        error: OperationError,
        now: SystemTime,
    ) -> Self {
        let pending = self.take_pending(id);
        if kind == OperationKind::Fetch {
            self.page_content = None;
        }
        let (start, data) = match pending {
            Some(op) => (Some(op.start), op.data),
            None => (None, OperationData::Empty),
        };
        self.failed.push(FailedRecord {
            id,
            kind,
            start,
            end: now,
            data,
            error,
        });
        self
    }

    fn finished_with(
        mut self,
        kind: OperationKind,
        id: OperationId,
        data: OperationData,
        now: SystemTime,
    ) -> Self {
        let start = self.take_pending(id).map(|op| op.start);
        if kind == OperationKind::Fetch {
            if let OperationData::Page(page) = &data {
                if page.path() == IPFS_ROOT {
                    self.pins = page
                        .content()
                        .iter()
                        .filter_map(|e| e.hash().map(str::to_string))
                        .collect();
                }
                self.page_content = Some(page.clone());
            }
        }
        self.finished.push(FinishedRecord {
            id,
            kind,
            start,
            end: now,
            data,
        });
        self
    }
}
