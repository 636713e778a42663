//! Operator surface (C11, §4.10): the seam the application boundary
//! (a future CLI or RPC front, not built here) drives — watch
//! lifecycle, manual/round-level search, settings, and indexer/
//! downloader/notification-target CRUD, exposed as a trait a transport
//! layer can wrap.

use std::sync::Arc;

use async_trait::async_trait;
use f1w_core::error::WatcherError;
use f1w_core::fingerprint::allowlist_fingerprint;
use f1w_core::model::{
    Downloader, EventType, Indexer, NotificationTarget, QualityOverrides, Round, ScheduledSearch,
    ScheduledSearchStatus, Season, Settings,
};
use f1w_store::{
    CacheLookup, CachedSearchRepo, DownloaderRepo, IndexerRepo, NotificationTargetRepo, RoundRepo,
    ScheduledSearchRepo, SeasonRepo, SettingsRepo, Store,
};

use crate::run::{effective_threshold, EntryRunner, RunOutcome};

#[async_trait]
pub trait OperatorService: Send + Sync {
    async fn add_watch(
        &self,
        round_id: i64,
        event_type: EventType,
        quality_overrides: Option<QualityOverrides>,
    ) -> Result<ScheduledSearch, WatcherError>;
    async fn pause_watch(&self, id: i64) -> Result<(), WatcherError>;
    async fn resume_watch(&self, id: i64) -> Result<(), WatcherError>;
    async fn delete_watch(&self, id: i64) -> Result<(), WatcherError>;
    async fn run_now(&self, id: i64, downloader_override: Option<i64>) -> Result<RunOutcome, WatcherError>;

    async fn manual_round_search(
        &self,
        round_id: i64,
        event_types: &[EventType],
        force: bool,
    ) -> Result<ManualSearchResult, WatcherError>;
    async fn auto_grab_round(
        &self,
        round_id: i64,
        event_types: Option<&[EventType]>,
    ) -> Result<Vec<RunOutcome>, WatcherError>;

    fn list_seasons(&self, include_hidden: bool) -> Result<Vec<Season>, WatcherError>;
    async fn hide_season(&self, season_id: i64) -> Result<(), WatcherError>;
    async fn unhide_season(&self, season_id: i64) -> Result<(), WatcherError>;

    fn settings_get(&self) -> Result<Settings, WatcherError>;
    async fn settings_set(&self, settings: Settings) -> Result<(), WatcherError>;

    async fn create_indexer(&self, indexer: &Indexer) -> Result<Indexer, WatcherError>;
    async fn update_indexer(&self, indexer: &Indexer) -> Result<(), WatcherError>;
    async fn delete_indexer(&self, id: i64) -> Result<(), WatcherError>;

    async fn create_downloader(&self, downloader: &Downloader) -> Result<Downloader, WatcherError>;
    async fn update_downloader(&self, downloader: &Downloader) -> Result<(), WatcherError>;
    async fn delete_downloader(&self, id: i64) -> Result<(), WatcherError>;

    async fn create_notification_target(&self, target: &NotificationTarget) -> Result<NotificationTarget, WatcherError>;
    async fn update_notification_target(&self, target: &NotificationTarget) -> Result<(), WatcherError>;
    async fn delete_notification_target(&self, id: i64) -> Result<(), WatcherError>;
}

#[derive(Debug, Clone)]
pub struct ManualSearchResult {
    pub round: Round,
    pub from_cache: bool,
    pub results_json: String,
}

pub struct DefaultOperatorService {
    pub store: Arc<Store>,
    pub runner: Arc<EntryRunner>,
}

impl DefaultOperatorService {
    pub fn new(store: Arc<Store>, runner: Arc<EntryRunner>) -> Self {
        Self { store, runner }
    }
}

#[async_trait]
impl OperatorService for DefaultOperatorService {
    async fn add_watch(
        &self,
        round_id: i64,
        event_type: EventType,
        quality_overrides: Option<QualityOverrides>,
    ) -> Result<ScheduledSearch, WatcherError> {
        ScheduledSearchRepo::new(&self.store)
            .create(round_id, event_type, quality_overrides.as_ref())
            .await
    }

    async fn pause_watch(&self, id: i64) -> Result<(), WatcherError> {
        ScheduledSearchRepo::new(&self.store).pause(id).await
    }

    async fn resume_watch(&self, id: i64) -> Result<(), WatcherError> {
        let entry = ScheduledSearchRepo::new(&self.store).get(id)?;
        if entry.status != ScheduledSearchStatus::Paused {
            return Err(WatcherError::state_conflict("entry is not paused"));
        }
        ScheduledSearchRepo::new(&self.store).resume(id).await
    }

    async fn delete_watch(&self, id: i64) -> Result<(), WatcherError> {
        ScheduledSearchRepo::new(&self.store).delete(id).await
    }

    async fn run_now(&self, id: i64, downloader_override: Option<i64>) -> Result<RunOutcome, WatcherError> {
        let entry = ScheduledSearchRepo::new(&self.store).get(id)?;
        if entry.status == ScheduledSearchStatus::Paused {
            return Err(WatcherError::state_conflict("cannot run a paused entry"));
        }
        Ok(self.runner.run_once(&entry, downloader_override).await)
    }

    /// §8 `S4`: `force=true` bypasses the cache and always re-searches,
    /// writing a fresh cache entry afterwards.
    async fn manual_round_search(
        &self,
        round_id: i64,
        event_types: &[EventType],
        force: bool,
    ) -> Result<ManualSearchResult, WatcherError> {
        let round = RoundRepo::new(&self.store).get(round_id)?;
        let fingerprint = allowlist_fingerprint(event_types);
        let now = self.runner.clock.now();
        let cache = CachedSearchRepo::new(&self.store);

        if !force {
            if let CacheLookup::Hit(hit) = cache.get(round_id, &fingerprint, now)? {
                return Ok(ManualSearchResult {
                    round,
                    from_cache: true,
                    results_json: hit.results_json,
                });
            }
        }

        let settings = SettingsRepo::new(&self.store).get()?;
        let entries = ScheduledSearchRepo::new(&self.store)
            .list_for_round(round_id)?
            .into_iter()
            .filter(|e| event_types.is_empty() || event_types.contains(&e.event_type))
            .collect::<Vec<_>>();

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in &entries {
            let outcome = self.runner.run_once(entry, None).await;
            outcomes.push(serde_json::json!({
                "event_type": entry.event_type.tag(),
                "outcome": format!("{outcome:?}"),
            }));
        }

        let results_json = serde_json::to_string(&outcomes)
            .map_err(|e| WatcherError::validation(format!("failed to serialize manual search results: {e}")))?;
        cache
            .put(round_id, &fingerprint, &results_json, settings.decay_interval_h, now)
            .await?;

        Ok(ManualSearchResult {
            round,
            from_cache: false,
            results_json,
        })
    }

    /// At most one send per event: picks the first watch per distinct
    /// `event_type` under the round and runs it once.
    async fn auto_grab_round(
        &self,
        round_id: i64,
        event_types: Option<&[EventType]>,
    ) -> Result<Vec<RunOutcome>, WatcherError> {
        let entries = ScheduledSearchRepo::new(&self.store)
            .list_for_round(round_id)?
            .into_iter()
            .filter(|e| e.status != ScheduledSearchStatus::Paused)
            .filter(|e| event_types.map(|types| types.contains(&e.event_type)).unwrap_or(true))
            .collect::<Vec<_>>();

        let settings = SettingsRepo::new(&self.store).get()?;
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in &entries {
            let threshold = effective_threshold(entry.quality_overrides.as_ref(), &settings);
            tracing::debug!(entry_id = entry.id, threshold, "auto-grab round entry");
            outcomes.push(self.runner.run_once(entry, None).await);
        }
        Ok(outcomes)
    }

    fn list_seasons(&self, include_hidden: bool) -> Result<Vec<Season>, WatcherError> {
        SeasonRepo::new(&self.store).list(include_hidden)
    }

    async fn hide_season(&self, season_id: i64) -> Result<(), WatcherError> {
        let seasons = SeasonRepo::new(&self.store);
        seasons.set_hidden(season_id, true).await?;
        let rounds = RoundRepo::new(&self.store);
        let scheduled_searches = ScheduledSearchRepo::new(&self.store);
        for round in rounds.list_for_season(season_id)? {
            for entry in scheduled_searches.list_for_round(round.id)? {
                if entry.status == ScheduledSearchStatus::Scheduled {
                    scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Paused).await?;
                }
            }
        }
        Ok(())
    }

    /// Resumes entries the hide put to sleep. Entries paused by the operator
    /// directly before the hide are indistinguishable from hide-paused ones
    /// in this schema, so unhide resumes every `Paused` entry under the
    /// season; an operator who wants an entry to stay paused should re-pause
    /// it after unhiding.
    async fn unhide_season(&self, season_id: i64) -> Result<(), WatcherError> {
        let seasons = SeasonRepo::new(&self.store);
        seasons.set_hidden(season_id, false).await?;
        let rounds = RoundRepo::new(&self.store);
        let scheduled_searches = ScheduledSearchRepo::new(&self.store);
        for round in rounds.list_for_season(season_id)? {
            for entry in scheduled_searches.list_for_round(round.id)? {
                if entry.status == ScheduledSearchStatus::Paused {
                    scheduled_searches.resume(entry.id).await?;
                }
            }
        }
        Ok(())
    }

    fn settings_get(&self) -> Result<Settings, WatcherError> {
        SettingsRepo::new(&self.store).get()
    }

    async fn settings_set(&self, settings: Settings) -> Result<(), WatcherError> {
        SettingsRepo::new(&self.store).update(&settings).await
    }

    async fn create_indexer(&self, indexer: &Indexer) -> Result<Indexer, WatcherError> {
        IndexerRepo::new(&self.store).create(indexer).await
    }

    async fn update_indexer(&self, indexer: &Indexer) -> Result<(), WatcherError> {
        IndexerRepo::new(&self.store).update(indexer).await
    }

    async fn delete_indexer(&self, id: i64) -> Result<(), WatcherError> {
        IndexerRepo::new(&self.store).delete(id).await
    }

    async fn create_downloader(&self, downloader: &Downloader) -> Result<Downloader, WatcherError> {
        DownloaderRepo::new(&self.store).create(downloader).await
    }

    async fn update_downloader(&self, downloader: &Downloader) -> Result<(), WatcherError> {
        DownloaderRepo::new(&self.store).update(downloader).await
    }

    async fn delete_downloader(&self, id: i64) -> Result<(), WatcherError> {
        DownloaderRepo::new(&self.store).delete(id).await
    }

    async fn create_notification_target(&self, target: &NotificationTarget) -> Result<NotificationTarget, WatcherError> {
        NotificationTargetRepo::new(&self.store).create(target).await
    }

    async fn update_notification_target(&self, target: &NotificationTarget) -> Result<(), WatcherError> {
        NotificationTargetRepo::new(&self.store).update(target).await
    }

    async fn delete_notification_target(&self, id: i64) -> Result<(), WatcherError> {
        NotificationTargetRepo::new(&self.store).delete(id).await
    }
}
