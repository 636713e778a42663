//! Post-send polling (§4.9 "Post-send polling"): once a `ScheduledSearch`
//! moves to `WaitingDownload`, this polls the owning downloader for status
//! until it terminates, firing `DownloadComplete`/`DownloadFail` and
//! returning a failed entry to `Scheduled` with a flat 1h cooldown (§8 `S5`,
//! Open Question (ii)).

use std::sync::Arc;

use f1w_core::clock::Clock;
use f1w_core::model::{DownloadHistory, DownloadHistoryStatus, NotificationEventClass, ScheduledSearchStatus};
use f1w_downloader::{AcquisitionId, DownloadStatus};
use f1w_notify::NotificationDispatcher;
use f1w_store::{DownloadHistoryRepo, EventRepo, NotificationTargetRepo, ScheduledSearchRepo, Store};

use crate::cadence::next_run_after_download_failure;
use crate::registry::DownloaderRegistry;

pub struct PollTask {
    pub store: Arc<Store>,
    pub downloaders: Arc<dyn DownloaderRegistry>,
    pub notifier: Arc<NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
}

impl PollTask {
    /// One sweep over every in-flight `DownloadHistory` row. Errors polling
    /// one entry never stop the sweep over the rest.
    pub async fn poll_once(&self) {
        let in_flight = match DownloadHistoryRepo::new(&self.store).list_in_flight() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "failed to list in-flight downloads");
                return;
            }
        };

        for history in in_flight {
            if let Err(e) = self.poll_one(&history).await {
                tracing::warn!(download_history_id = history.id, error = %e, "poll failed for entry");
            }
        }
    }

    async fn poll_one(&self, history: &DownloadHistory) -> Result<(), f1w_core::error::WatcherError> {
        let Some(acquisition_id) = history.acquisition_id.as_ref() else {
            return Ok(());
        };
        let Some(adapter) = self.downloaders.get(history.downloader_id) else {
            tracing::warn!(downloader_id = history.downloader_id, "downloader not registered for poll");
            return Ok(());
        };

        let status = match adapter.status(&AcquisitionId(acquisition_id.clone())).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(download_history_id = history.id, error = %e, "status poll failed");
                return Ok(());
            }
        };

        match status {
            DownloadStatus::Queued | DownloadStatus::Unknown => Ok(()),
            DownloadStatus::Downloading => {
                DownloadHistoryRepo::new(&self.store)
                    .update_status(history.id, DownloadHistoryStatus::Downloading)
                    .await
            }
            DownloadStatus::Completed => {
                DownloadHistoryRepo::new(&self.store)
                    .update_status(history.id, DownloadHistoryStatus::Completed)
                    .await?;
                self.finish_entry(history, NotificationEventClass::DownloadComplete, None).await
            }
            DownloadStatus::Failed => {
                DownloadHistoryRepo::new(&self.store)
                    .update_status(history.id, DownloadHistoryStatus::Failed)
                    .await?;
                let next_run = next_run_after_download_failure(self.clock.now());
                self.finish_entry(history, NotificationEventClass::DownloadFail, Some(next_run)).await
            }
        }
    }

    /// Transitions the owning `ScheduledSearch` out of `WaitingDownload`.
    /// `reschedule_at` is `Some` on failure (back to `Scheduled`) or `None`
    /// on success (terminal `Completed`). Guarded on the entry still being
    /// `WaitingDownload` so a late duplicate poll can't clobber a state the
    /// entry has already moved past (§5 "Idempotency").
    async fn finish_entry(
        &self,
        history: &DownloadHistory,
        class: NotificationEventClass,
        reschedule_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), f1w_core::error::WatcherError> {
        let event = EventRepo::new(&self.store).get(history.event_id)?;
        let scheduled_searches = ScheduledSearchRepo::new(&self.store);
        let entries = scheduled_searches.list_for_round(event.round_id)?;
        let Some(entry) = entries.into_iter().find(|e| e.event_type == event.event_type) else {
            return Ok(());
        };
        if entry.status != ScheduledSearchStatus::WaitingDownload {
            return Ok(());
        }

        match reschedule_at {
            Some(next_run) => {
                scheduled_searches.mark_searched(entry.id, Some(next_run)).await?;
                scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Scheduled).await?;
            }
            None => {
                scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Completed).await?;
            }
        }

        self.notify(class, &entry, &history.nzb_url).await;
        Ok(())
    }

    async fn notify(&self, class: NotificationEventClass, entry: &f1w_core::model::ScheduledSearch, nzb_url: &str) {
        let targets = match NotificationTargetRepo::new(&self.store).list_all() {
            Ok(targets) => targets,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load notification targets");
                return;
            }
        };
        let payload = serde_json::json!({
            "scheduled_search_id": entry.id,
            "round_id": entry.round_id,
            "event_type": entry.event_type.tag(),
            "nzb_url": nzb_url,
        });
        self.notifier.dispatch(class, &targets, &payload).await;
    }
}
