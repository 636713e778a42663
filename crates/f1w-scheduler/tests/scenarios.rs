//! End-to-end scenarios against a real (tempfile) SQLite store with stub
//! indexer/downloader seams, covering the §8 testable properties this
//! crate owns: `S1` (auto-grab hit), `S2` (below threshold), `S4` (manual
//! search cache bypass with `force`), `S5` (downloader failure recovery).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use f1w_core::clock::SystemClock;
use f1w_core::error::{DownloaderError, IndexerError};
use f1w_core::model::{Downloader, DownloaderKind, EventType, Indexer, IndexerKind};
use f1w_core::query::QuerySpec;
use f1w_downloader::{AcquisitionId, DownloadStatus, DownloaderAdapter};
use f1w_indexer::{IndexerClient, NewznabItem, SearchOutcome};
use f1w_notify::NotificationDispatcher;
use f1w_scheduler::{
    DefaultOperatorService, EntryRunner, InMemoryDownloaderRegistry, OperatorService, PollTask, RunOutcome,
};
use f1w_store::{
    DownloadHistoryRepo, DownloaderRepo, EventRepo, IndexerRepo, RoundRepo, ScheduledSearchRepo, SeasonRepo,
    SettingsRepo, Store,
};
use tokio::sync::Mutex as AsyncMutex;

struct StubIndexer {
    items: Vec<NewznabItem>,
}

#[async_trait]
impl IndexerClient for StubIndexer {
    async fn search(&self, _indexer: &Indexer, queries: &[QuerySpec]) -> Result<SearchOutcome, IndexerError> {
        Ok(SearchOutcome {
            items: self.items.clone(),
            queries_run: queries.len(),
        })
    }

    async fn test_connection(&self, _indexer: &Indexer) -> Result<(), IndexerError> {
        Ok(())
    }
}

struct StubDownloader {
    send_calls: AtomicUsize,
    should_fail_send: bool,
    status_to_report: AsyncMutex<DownloadStatus>,
}

impl StubDownloader {
    fn new(should_fail_send: bool, status_to_report: DownloadStatus) -> Self {
        Self {
            send_calls: AtomicUsize::new(0),
            should_fail_send,
            status_to_report: AsyncMutex::new(status_to_report),
        }
    }

    async fn set_status(&self, status: DownloadStatus) {
        *self.status_to_report.lock().await = status;
    }
}

#[async_trait]
impl DownloaderAdapter for StubDownloader {
    async fn send(&self, _url: &str, _title: &str, _category: &str, _priority: i32) -> Result<AcquisitionId, DownloaderError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail_send {
            Err(DownloaderError::Rejected("stub rejection".to_string()))
        } else {
            Ok(AcquisitionId("stub-acquisition-1".to_string()))
        }
    }

    async fn status(&self, _id: &AcquisitionId) -> Result<DownloadStatus, DownloaderError> {
        Ok(*self.status_to_report.lock().await)
    }

    async fn test(&self) -> Result<(), DownloaderError> {
        Ok(())
    }
}

fn temp_store() -> (Store, tempfile::TempPath) {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    let store = Store::connect(path.to_str().unwrap()).unwrap();
    (store, path)
}

/// Seeds a season/round/event whose Race session started 1 hour ago
/// (inside the aggressive cadence window), one enabled indexer, and one
/// enabled downloader. Returns the scheduled search id.
async fn seed_watch(store: &Store) -> i64 {
    let season = SeasonRepo::new(store).upsert(2025).await.unwrap();
    let round = RoundRepo::new(store)
        .upsert(season.id, 3, "Australian Grand Prix", "Albert Park", "Australia", Some("Australia/Melbourne"))
        .await
        .unwrap();
    EventRepo::new(store)
        .upsert(round.id, EventType::Race, Some(Utc::now() - Duration::hours(1)), None)
        .await
        .unwrap();

    IndexerRepo::new(store)
        .create(&Indexer {
            id: 0,
            name: "stub-indexer".to_string(),
            kind: IndexerKind::Newznab,
            base_url: "http://example.invalid".to_string(),
            api_key: "key".to_string(),
            category_ids: vec!["5000".to_string()],
            priority: 0,
            enabled: true,
            last_error: None,
        })
        .await
        .unwrap();

    let downloader = DownloaderRepo::new(store)
        .create(&Downloader {
            id: 0,
            name: "stub-downloader".to_string(),
            kind: DownloaderKind::Sab,
            base_url: "http://example.invalid".to_string(),
            api_key: "key".to_string(),
            category: "tv".to_string(),
            priority: 0,
            enabled: true,
            last_error: None,
        })
        .await
        .unwrap();

    SettingsRepo::new(store).get_or_init().await.unwrap();
    let mut settings = SettingsRepo::new(store).get().unwrap();
    settings.default_downloader_id = Some(downloader.id);
    SettingsRepo::new(store).update(&settings).await.unwrap();

    ScheduledSearchRepo::new(store)
        .create(round.id, EventType::Race, None)
        .await
        .unwrap()
        .id
}

fn high_scoring_item() -> NewznabItem {
    NewznabItem {
        title: "Formula.1.2025.Round03.AlbertPark.Race.1080p.x264-GRP".to_string(),
        link: "http://example.invalid/nzb/1".to_string(),
        pub_date: Some(Utc::now()),
        size_bytes: Some(2_000_000_000),
        category: Some("5000".to_string()),
        group: Some("GRP".to_string()),
    }
}

fn low_scoring_item() -> NewznabItem {
    NewznabItem {
        title: "Formula.1.2022.Round11.SomewhereElse.FP1.Preview.480p".to_string(),
        link: "http://example.invalid/nzb/2".to_string(),
        pub_date: Some(Utc::now()),
        size_bytes: Some(100_000_000),
        category: None,
        group: None,
    }
}

fn runner(
    store: Arc<Store>,
    indexer_client: Arc<dyn IndexerClient>,
    downloaders: Arc<InMemoryDownloaderRegistry>,
) -> Arc<EntryRunner> {
    Arc::new(EntryRunner {
        store,
        indexer_client,
        downloaders,
        notifier: Arc::new(NotificationDispatcher::new()),
        clock: Arc::new(SystemClock),
        tick_interval: Duration::minutes(10),
        jitter_seconds: 0,
    })
}

#[tokio::test]
async fn s1_auto_grab_sends_on_high_scoring_hit() {
    let (store, _path) = temp_store();
    let store = Arc::new(store);
    let entry_id = seed_watch(&store).await;
    let entry = ScheduledSearchRepo::new(&store).get(entry_id).unwrap();

    let downloader_id = DownloaderRepo::new(&store).list_enabled().unwrap()[0].id;
    let mut registry = InMemoryDownloaderRegistry::new();
    let downloader = Arc::new(StubDownloader::new(false, DownloadStatus::Queued));
    registry.insert(downloader_id, downloader.clone());

    let indexer_client: Arc<dyn IndexerClient> = Arc::new(StubIndexer {
        items: vec![high_scoring_item()],
    });
    let runner = runner(Arc::clone(&store), indexer_client, Arc::new(registry));

    let outcome = runner.run_once(&entry, None).await;
    assert!(matches!(outcome, RunOutcome::Sent { .. }), "expected Sent, got {outcome:?}");
    assert_eq!(downloader.send_calls.load(Ordering::SeqCst), 1);

    let updated = ScheduledSearchRepo::new(&store).get(entry_id).unwrap();
    assert_eq!(updated.status, f1w_core::model::ScheduledSearchStatus::WaitingDownload);
    assert!(updated.chosen_nzb.is_some());

    let history = DownloadHistoryRepo::new(&store).list_in_flight().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].acquisition_id.as_deref(), Some("stub-acquisition-1"));
}

#[tokio::test]
async fn s2_below_threshold_reschedules_without_sending() {
    let (store, _path) = temp_store();
    let store = Arc::new(store);
    let entry_id = seed_watch(&store).await;
    let entry = ScheduledSearchRepo::new(&store).get(entry_id).unwrap();

    let downloader_id = DownloaderRepo::new(&store).list_enabled().unwrap()[0].id;
    let mut registry = InMemoryDownloaderRegistry::new();
    let downloader = Arc::new(StubDownloader::new(false, DownloadStatus::Queued));
    registry.insert(downloader_id, downloader.clone());

    let indexer_client: Arc<dyn IndexerClient> = Arc::new(StubIndexer {
        items: vec![low_scoring_item()],
    });
    let runner = runner(Arc::clone(&store), indexer_client, Arc::new(registry));

    let outcome = runner.run_once(&entry, None).await;
    assert!(matches!(outcome, RunOutcome::NoAcceptableHit { .. }), "expected NoAcceptableHit, got {outcome:?}");
    assert_eq!(downloader.send_calls.load(Ordering::SeqCst), 0);

    let updated = ScheduledSearchRepo::new(&store).get(entry_id).unwrap();
    assert_eq!(updated.status, f1w_core::model::ScheduledSearchStatus::Scheduled);
    assert!(updated.next_run_at.is_some());
    assert_eq!(updated.attempts, 1);
}

#[tokio::test]
async fn s4_manual_search_force_bypasses_cache() {
    let (store, _path) = temp_store();
    let store = Arc::new(store);
    let entry_id = seed_watch(&store).await;
    let round_id = ScheduledSearchRepo::new(&store).get(entry_id).unwrap().round_id;

    let downloader_id = DownloaderRepo::new(&store).list_enabled().unwrap()[0].id;
    let mut registry = InMemoryDownloaderRegistry::new();
    let downloader = Arc::new(StubDownloader::new(true, DownloadStatus::Queued));
    registry.insert(downloader_id, downloader.clone());

    let indexer_client: Arc<dyn IndexerClient> = Arc::new(StubIndexer {
        items: vec![low_scoring_item()],
    });
    let runner = runner(Arc::clone(&store), indexer_client, Arc::new(registry));
    let operator = DefaultOperatorService::new(Arc::clone(&store), runner);

    let first = operator.manual_round_search(round_id, &[EventType::Race], false).await.unwrap();
    assert!(!first.from_cache);

    let second = operator.manual_round_search(round_id, &[EventType::Race], false).await.unwrap();
    assert!(second.from_cache, "second non-forced call should hit the cache");

    let third = operator.manual_round_search(round_id, &[EventType::Race], true).await.unwrap();
    assert!(!third.from_cache, "force=true must bypass the cache");
}

#[tokio::test]
async fn s5_downloader_failure_returns_entry_to_scheduled_with_flat_cooldown() {
    let (store, _path) = temp_store();
    let store = Arc::new(store);
    let entry_id = seed_watch(&store).await;
    let entry = ScheduledSearchRepo::new(&store).get(entry_id).unwrap();

    let downloader_id = DownloaderRepo::new(&store).list_enabled().unwrap()[0].id;
    let mut registry = InMemoryDownloaderRegistry::new();
    let downloader = Arc::new(StubDownloader::new(false, DownloadStatus::Queued));
    registry.insert(downloader_id, downloader.clone());
    let registry = Arc::new(registry);

    let indexer_client: Arc<dyn IndexerClient> = Arc::new(StubIndexer {
        items: vec![high_scoring_item()],
    });
    let runner = runner(Arc::clone(&store), indexer_client, Arc::clone(&registry));

    let outcome = runner.run_once(&entry, None).await;
    assert!(matches!(outcome, RunOutcome::Sent { .. }));

    downloader.set_status(DownloadStatus::Failed).await;

    let poll = PollTask {
        store: Arc::clone(&store),
        downloaders: registry,
        notifier: Arc::new(NotificationDispatcher::new()),
        clock: Arc::new(SystemClock),
    };
    poll.poll_once().await;

    let updated = ScheduledSearchRepo::new(&store).get(entry_id).unwrap();
    assert_eq!(updated.status, f1w_core::model::ScheduledSearchStatus::Scheduled);
    let next_run = updated.next_run_at.expect("failure must set a cooldown");
    let delta = next_run - Utc::now();
    assert!(delta > Duration::minutes(55) && delta < Duration::minutes(65), "expected ~1h cooldown, got {delta}");

    let history = DownloadHistoryRepo::new(&store).list_for_event(
        EventRepo::new(&store).list_for_round(entry.round_id).unwrap()[0].id,
    ).unwrap();
    assert_eq!(history[0].status, f1w_core::model::DownloadHistoryStatus::Failed);
}
