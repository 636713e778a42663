//! The scheduler's two background loops (§4.9 "Ticker" + "Post-send
//! polling", §5 "Concurrency"): a tick loop that selects due entries and
//! runs up to `global_concurrency` of them at once, and a polling loop that
//! sweeps in-flight downloads on a fixed interval. Both stop within a tick
//! of the shared `CancellationToken` firing (§5 "graceful shutdown").

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use f1w_core::model::ScheduledSearchStatus;
use f1w_store::{RoundRepo, ScheduledSearchRepo, SeasonRepo, SettingsRepo, Store};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::run::EntryRunner;

pub struct SchedulerTicker {
    pub store: Arc<Store>,
    pub runner: Arc<EntryRunner>,
    pub poll_task: Arc<crate::poll::PollTask>,
}

impl SchedulerTicker {
    /// Runs both loops until `cancel` fires. Returns once both have exited.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let tick_loop = {
            let this = Arc::clone(&self);
            let cancel = cancel.clone();
            tokio::spawn(async move { this.run_tick_loop(cancel).await })
        };
        let poll_loop = {
            let this = Arc::clone(&self);
            let cancel = cancel.clone();
            tokio::spawn(async move { this.run_poll_loop(cancel).await })
        };
        let _ = tokio::join!(tick_loop, poll_loop);
    }

    async fn run_tick_loop(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }

            let settings = match SettingsRepo::new(&self.store).get() {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read settings, retrying in 5s");
                    tokio::select! {
                        _ = tokio::time::sleep(StdDuration::from_secs(5)) => continue,
                        _ = cancel.cancelled() => return,
                    }
                }
            };

            if let Err(e) = self.sync_hidden_season_pauses().await {
                tracing::warn!(error = %e, "hidden-season pause sync failed");
            }

            self.run_due_entries(settings.global_concurrency, &cancel).await;

            tokio::select! {
                _ = tokio::time::sleep(StdDuration::from_secs(settings.scheduler_tick_seconds.max(1))) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }

    async fn run_poll_loop(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            self.poll_task.poll_once().await;

            let settings = SettingsRepo::new(&self.store).get().ok();
            let interval_secs = settings
                .map(|s| (s.decay_interval_h * 3600).min(300).max(30) as u64)
                .unwrap_or(300);

            tokio::select! {
                _ = tokio::time::sleep(StdDuration::from_secs(interval_secs)) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }

    async fn run_due_entries(&self, global_concurrency: usize, cancel: &CancellationToken) {
        let now = self.runner.clock.now();
        let due = match ScheduledSearchRepo::new(&self.store).list_due(now) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "failed to list due entries");
                return;
            }
        };
        if due.is_empty() {
            return;
        }

        let semaphore = Arc::new(Semaphore::new(global_concurrency.max(1)));
        let mut handles = Vec::with_capacity(due.len());

        for entry in due {
            if cancel.is_cancelled() {
                break;
            }
            let permit = Arc::clone(&semaphore);
            let runner = Arc::clone(&self.runner);
            let entry_cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.ok();
                if entry_cancel.is_cancelled() {
                    return;
                }
                let outcome = runner.run_once(&entry, None).await;
                tracing::info!(entry_id = entry.id, outcome = ?outcome, "entry run complete");
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Invariant #9: a hidden season's children must report `Paused` and
    /// never be selected by the tick. No DB trigger enforces this, so each
    /// tick walks hidden seasons and pauses any `Scheduled` descendants
    /// before `list_due` runs.
    async fn sync_hidden_season_pauses(&self) -> Result<(), f1w_core::error::WatcherError> {
        let seasons = SeasonRepo::new(&self.store).list(true)?;
        let hidden_ids: HashSet<i64> = seasons.iter().filter(|s| s.is_hidden).map(|s| s.id).collect();
        if hidden_ids.is_empty() {
            return Ok(());
        }

        let rounds = RoundRepo::new(&self.store);
        let scheduled_searches = ScheduledSearchRepo::new(&self.store);
        for season_id in hidden_ids {
            for round in rounds.list_for_season(season_id)? {
                for entry in scheduled_searches.list_for_round(round.id)? {
                    if entry.status == ScheduledSearchStatus::Scheduled {
                        scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Paused).await?;
                    }
                }
            }
        }
        Ok(())
    }
}
