//! The public commands of the file browser.
//!
//! Every backend-facing command runs through the operation tracker and
//! returns the operation's data, or `None` when it failed or was skipped.
//! Failures are never returned as errors; they land in the failed log.

use futures::future::try_join_all;

use crate::backend::{AddFile, AddOptions, Progress};
use crate::error::{CoreError, CoreResult};
use crate::event::{Event, OperationData, OperationId, OperationKind};
use crate::fs::entry::FileEntry;
use crate::fs::paths::{basename, join_path, real_mfs_path, IPFS_ROOT};
use crate::fs::upload::{count_dirs, prepare_upload, total_size, UploadProgress};
use crate::nav::route::{encode_link, hash_for};
use crate::nav::sort::{SortBy, SortSpec};
use crate::tracker::{Files, FollowUp, TrackOptions};

/// Turns backend progress callbacks into UPDATED events for one WRITE.
struct WriteReporter<'a> {
    files: &'a Files,
    id: OperationId,
    progress: &'a UploadProgress,
}

impl WriteReporter<'_> {
    fn emit(&self, percent: f64) {
        self.files.dispatch(Event::Updated {
            kind: OperationKind::Write,
            id: self.id,
            data: OperationData::Progress(percent),
        });
    }
}

impl Progress for WriteReporter<'_> {
    fn report(&self, sent: u64) {
        self.emit(self.progress.record(sent));
    }
}

impl Files {
    fn real(&self, path: &str) -> String {
        real_mfs_path(path, &self.config().mfs_root)
    }

    /// Loads the listing for the current route.
    ///
    /// Skipped while the backend is offline, when the route carries no path,
    /// or while the same path is already being fetched; the fetch in flight
    /// then counts as the newest request. A result that is overtaken by a
    /// newer fetch finishes as [`OperationData::Superseded`] and leaves the
    /// page alone.
    pub async fn fetch(&self) -> Option<OperationData> {
        if !self.backend().is_connected() {
            tracing::debug!("Skipping fetch: backend is not connected");
            return None;
        }
        let path = self.current_path()?;
        let Some(ticket) = self.fetch_ticket(&path) else {
            tracing::debug!("Skipping fetch: {path} is already being fetched");
            return None;
        };
        let sorting = self.with_state(|state| state.sorting());
        let path = path.as_str();

        self.track(
            OperationKind::Fetch,
            TrackOptions::default(),
            FollowUp::None,
            move |_| async move {
                let resolved = self.resolver().resolve(path, sorting).await;
                let latest = ticket.settle();
                let page = resolved?;
                if latest {
                    Ok(OperationData::Page(page))
                } else {
                    tracing::debug!("Discarding superseded fetch of {path}");
                    Ok(OperationData::Superseded {
                        path: path.to_string(),
                    })
                }
            },
        )
        .await
    }

    /// Uploads `files` into the directory `root`.
    ///
    /// Platform metadata files are dropped and paths made relative first.
    pub async fn write(&self, root: &str, files: Vec<AddFile>) -> Option<OperationData> {
        let files = prepare_upload(files);
        self.track(
            OperationKind::Write,
            TrackOptions::default(),
            FollowUp::None,
            move |id| async move { self.upload(id, root, &files).await },
        )
        .await
    }

    async fn upload(
        &self,
        id: OperationId,
        root: &str,
        files: &[AddFile],
    ) -> CoreResult<OperationData> {
        let progress = UploadProgress::new(total_size(files));
        let reporter = WriteReporter {
            files: self,
            id,
            progress: &progress,
        };
        reporter.emit(progress.percent());

        let options = AddOptions {
            pin: false,
            wrap_with_directory: false,
        };
        let results = self.backend().add(files, options, &reporter).await?;

        let expected = files.len() + count_dirs(files);
        if results.len() != expected {
            return Err(CoreError::ApiResponse {
                expected,
                actual: results.len(),
            });
        }

        for result in &results {
            if result.path.is_empty() || result.path.contains('/') {
                continue;
            }
            let src = format!("{IPFS_ROOT}/{}", result.hash);
            let dst = self.real(&join_path(root, &result.path));
            if let Err(e) = self.backend().files_cp(&src, &dst).await {
                tracing::warn!("Copy of {src} to {dst} failed: {e}");
                return Err(CoreError::FolderExists { path: dst });
            }
        }

        reporter.emit(progress.complete());
        Ok(OperationData::Empty)
    }

    /// Removes every path in `paths`, recursively, then shows the parent of
    /// the first one.
    pub async fn delete(&self, paths: &[String]) -> Option<OperationData> {
        let follow_up = match paths.first() {
            Some(first) => FollowUp::Deleted {
                path: first.clone(),
            },
            None => FollowUp::None,
        };
        self.track(
            OperationKind::Delete,
            TrackOptions::mfs_only(),
            follow_up,
            move |_| async move {
                try_join_all(paths.iter().map(|path| async move {
                    self.backend().files_rm(&self.real(path), true).await
                }))
                .await?;
                Ok(OperationData::Empty)
            },
        )
        .await
    }

    /// Moves (or renames) `src` to `dst`. The view follows a moved directory.
    pub async fn move_entry(&self, src: &str, dst: &str) -> Option<OperationData> {
        let follow_up = FollowUp::Moved {
            src: src.to_string(),
            dst: dst.to_string(),
        };
        self.track(
            OperationKind::Move,
            TrackOptions::mfs_only(),
            follow_up,
            move |_| async move {
                self.backend()
                    .files_mv(&self.real(src), &self.real(dst))
                    .await?;
                Ok(OperationData::Empty)
            },
        )
        .await
    }

    pub async fn copy(&self, src: &str, dst: &str) -> Option<OperationData> {
        self.track(
            OperationKind::Copy,
            TrackOptions::mfs_only(),
            FollowUp::None,
            move |_| async move {
                self.backend()
                    .files_cp(&self.real(src), &self.real(dst))
                    .await?;
                Ok(OperationData::Empty)
            },
        )
        .await
    }

    /// Copies `src` into the directory `root`, keeping its last segment as
    /// the name. A relative `src` is taken to be a content identifier.
    pub async fn add_by_path(&self, root: &str, src: &str) -> Option<OperationData> {
        self.track(
            OperationKind::AddByPath,
            TrackOptions::mfs_only(),
            FollowUp::None,
            move |_| async move {
                let src = self.real(src);
                let name = basename(&src);
                let dst = self.real(&join_path(root, name));
                let src_path = if src.starts_with('/') {
                    src.clone()
                } else {
                    format!("{IPFS_ROOT}/{name}")
                };
                self.backend().files_cp(&src_path, &dst).await?;
                Ok(OperationData::Empty)
            },
        )
        .await
    }

    /// Creates `path` and any missing parents.
    pub async fn make_dir(&self, path: &str) -> Option<OperationData> {
        self.track(
            OperationKind::MakeDir,
            TrackOptions::mfs_only(),
            FollowUp::None,
            move |_| async move {
                self.backend().files_mkdir(&self.real(path), true).await?;
                Ok(OperationData::Empty)
            },
        )
        .await
    }

    pub async fn download_link(&self, files: &[FileEntry]) -> Option<String> {
        let config = self.config();
        let data = self
            .track(
                OperationKind::DownloadLink,
                TrackOptions::default(),
                FollowUp::None,
                move |_| async move {
                    let url = self
                        .links()
                        .download_link(files, &config.gateway_url, &config.api_url)
                        .await?;
                    Ok(OperationData::Link(url))
                },
            )
            .await;
        into_link(data)
    }

    pub async fn share_link(&self, files: &[FileEntry]) -> Option<String> {
        let data = self
            .track(
                OperationKind::ShareLink,
                TrackOptions::default(),
                FollowUp::None,
                move |_| async move {
                    let url = self.links().share_link(files).await?;
                    Ok(OperationData::Link(url))
                },
            )
            .await;
        into_link(data)
    }

    /// Shows `path`. Re-fetches if it is already the page on display.
    pub async fn navigate_to(&self, path: &str) {
        let showing = self.with_state(|state| {
            state.page_content().is_some_and(|page| page.path() == path)
        });
        if showing {
            self.fetch().await;
        } else {
            let hash = hash_for(&self.config().base_url, &encode_link(path));
            self.navigator().update_hash(&hash).await;
        }
    }

    pub fn update_sorting(&self, by: SortBy, asc: bool) {
        self.dispatch(Event::UpdateSort(SortSpec::new(by, asc)));
    }

    pub fn dismiss_errors(&self) {
        self.dispatch(Event::DismissErrors);
    }
}

fn into_link(data: Option<OperationData>) -> Option<String> {
    match data {
        Some(OperationData::Link(url)) => Some(url),
        _ => None,
    }
}
