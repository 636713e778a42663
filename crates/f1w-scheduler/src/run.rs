//! "Running" a single due entry (§4.9 "One search, many queries" +
//! "Auto-grab decision"): builds the query fan-out, dispatches to every
//! enabled indexer, merges and scores the results, and either sends to a
//! downloader or reschedules. Owns every store write for the entry's
//! lifecycle so the ticker only needs to invoke `run_once` and log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use f1w_core::classify::{classify_title, CanonicalKey, ClassifiedTitle};
use f1w_core::clock::Clock;
use f1w_core::error::{ErrorCategory, WatcherError};
use f1w_core::model::{
    EventType, NotificationEventClass, QualityOverrides, ScheduledSearch, ScheduledSearchStatus, Settings,
};
use f1w_core::query::{build_queries, VenueAliasResolver};
use f1w_core::score::{score_candidate, tie_break, ScoreContext, ScoredCandidate};
use f1w_downloader::DownloaderAdapter;
use f1w_indexer::IndexerClient;
use f1w_notify::NotificationDispatcher;
use f1w_store::{
    DownloadHistoryRepo, EventRepo, IndexerRepo, NotificationTargetRepo, RoundRepo, ScheduledSearchRepo,
    SeasonRepo, SettingsRepo, Store,
};

use crate::cadence::{classify_window, next_run_after_search, next_run_after_transient_failure, CadenceWindow};
use crate::registry::DownloaderRegistry;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Sent { downloader_id: i64, score: i32 },
    NoAcceptableHit { best_score: Option<i32> },
    AwaitingProviderStartTime,
    AwaitingGatedFirstSearch,
    Expired,
    TransientFailure(String),
    HardFailure(String),
}

pub struct EntryRunner {
    pub store: Arc<Store>,
    pub indexer_client: Arc<dyn IndexerClient>,
    pub downloaders: Arc<dyn DownloaderRegistry>,
    pub notifier: Arc<NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
    pub tick_interval: chrono::Duration,
    pub jitter_seconds: i64,
}

impl EntryRunner {
    /// `downloader_override` lets an operator-triggered run (C11 `run_now`)
    /// pick a downloader ahead of the entry's own default.
    pub async fn run_once(&self, entry: &ScheduledSearch, downloader_override: Option<i64>) -> RunOutcome {
        match self.run_once_inner(entry, downloader_override).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(entry_id = entry.id, error = %e, "entry run failed with a store error");
                RunOutcome::TransientFailure(e.to_string())
            }
        }
    }

    async fn run_once_inner(
        &self,
        entry: &ScheduledSearch,
        downloader_override: Option<i64>,
    ) -> Result<RunOutcome, WatcherError> {
        let scheduled_searches = ScheduledSearchRepo::new(&self.store);
        let rounds = RoundRepo::new(&self.store);
        let seasons = SeasonRepo::new(&self.store);
        let events = EventRepo::new(&self.store);
        let settings_repo = SettingsRepo::new(&self.store);

        scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Running).await?;

        let round = rounds.get(entry.round_id)?;
        let season = seasons.get(round.season_id)?;
        if season.is_hidden {
            scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Paused).await?;
            return Ok(RunOutcome::HardFailure("round's season is hidden".to_string()));
        }

        let event = events
            .list_for_round(round.id)?
            .into_iter()
            .find(|e| e.event_type == entry.event_type)
            .ok_or_else(|| WatcherError::not_found("Event", format!("{}/{}", round.id, entry.event_type.tag())))?;

        let settings = settings_repo.get()?;
        let now = self.clock.now();

        match classify_window(now, event.start_time_utc, &settings) {
            CadenceWindow::Unscheduled => {
                let next_run = next_run_after_search(now, None, &settings, self.tick_interval, 0);
                scheduled_searches.mark_searched(entry.id, Some(next_run)).await?;
                scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Scheduled).await?;
                return Ok(RunOutcome::AwaitingProviderStartTime);
            }
            CadenceWindow::Expired => {
                scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Completed).await?;
                return Ok(RunOutcome::Expired);
            }
            CadenceWindow::Gated => {
                // Before start + 30 min: no query yet, just wait for the gate.
                let start = event.start_time_utc.expect("Gated implies a known start time");
                let next_run = start + chrono::Duration::minutes(30);
                scheduled_searches.mark_searched(entry.id, Some(next_run)).await?;
                scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Scheduled).await?;
                return Ok(RunOutcome::AwaitingGatedFirstSearch);
            }
            CadenceWindow::Aggressive | CadenceWindow::Decay => {}
        }

        let venues = VenueAliasResolver::empty().resolve(&round.circuit, &[&round.circuit, &round.country]);
        let queries = build_queries(season.year, round.round_number, session_query_token(entry.event_type), &venues);

        let indexers = IndexerRepo::new(&self.store).list_enabled()?;
        if indexers.is_empty() {
            return Ok(self.reschedule_for_no_hit(entry, None, now, &settings).await?);
        }

        let ctx = build_score_context(entry, &settings, season.year, round.round_number);

        let mut candidates: HashMap<CanonicalKey, (ScoredCandidate, ClassifiedTitle, i64, String)> = HashMap::new();
        let mut transient_failures = 0usize;

        for indexer in &indexers {
            match self.indexer_client.search(indexer, &queries).await {
                Ok(outcome) => fold_candidates(&outcome.items, indexer.id, &ctx, &mut candidates),
                Err(e) => {
                    tracing::warn!(indexer = indexer.name, error = %e, "indexer search failed");
                    if e.category() == ErrorCategory::Transient {
                        transient_failures += 1;
                    }
                }
            }
        }

        if candidates.is_empty() && transient_failures == indexers.len() {
            let next_run = next_run_after_transient_failure(now, entry.attempts, &settings);
            scheduled_searches.mark_searched(entry.id, Some(next_run)).await?;
            scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Scheduled).await?;
            return Ok(RunOutcome::TransientFailure("all enabled indexers failed transiently".to_string()));
        }

        let values: Vec<(ScoredCandidate, ClassifiedTitle, i64, String)> = candidates.into_values().collect();

        let threshold = entry
            .quality_overrides
            .as_ref()
            .and_then(|q| q.auto_download_threshold)
            .unwrap_or(settings.auto_download_threshold);

        let Some(winner) = pick_winner(&values, &ctx) else {
            return Ok(self.reschedule_for_no_hit(entry, None, now, &settings).await?);
        };
        let (best_scored, _best_classified, indexer_id, nzb_url) = winner;

        if best_scored.score < threshold || best_scored.hard_mismatch {
            return Ok(self
                .reschedule_for_no_hit(entry, Some(best_scored.score), now, &settings)
                .await?);
        }

        let downloader_id = downloader_override
            .or(entry.downloader_id)
            .or(settings.default_downloader_id)
            .ok_or_else(|| WatcherError::configuration("no downloader configured for this entry"))?;

        let adapter = self
            .downloaders
            .get(downloader_id)
            .ok_or_else(|| WatcherError::configuration(format!("downloader {downloader_id} not registered")))?;

        let title = nzb_title(entry, &round);
        let send_result = adapter.send(nzb_url, &title, "tv", 0).await;

        match send_result {
            Ok(acquisition) => {
                DownloadHistoryRepo::new(&self.store)
                    .record_sent(
                        event.id,
                        indexer_id,
                        downloader_id,
                        &title,
                        nzb_url,
                        best_scored.score,
                        acquisition.as_str(),
                    )
                    .await?;
                let dispatch_token = uuid::Uuid::new_v4().to_string();
                scheduled_searches
                    .record_dispatch(entry.id, downloader_id, nzb_url, &dispatch_token)
                    .await?;
                self.notify(NotificationEventClass::DownloadStart, entry, nzb_url).await;
                Ok(RunOutcome::Sent {
                    downloader_id,
                    score: best_scored.score,
                })
            }
            Err(e) => {
                if e.category() == ErrorCategory::Transient {
                    let next_run = next_run_after_transient_failure(now, entry.attempts, &settings);
                    scheduled_searches.mark_searched(entry.id, Some(next_run)).await?;
                    scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Scheduled).await?;
                    Ok(RunOutcome::TransientFailure(e.to_string()))
                } else {
                    scheduled_searches.record_failure(entry.id, &e.to_string()).await?;
                    self.notify(NotificationEventClass::DownloadFail, entry, nzb_url).await;
                    Ok(RunOutcome::HardFailure(e.to_string()))
                }
            }
        }
    }

    async fn reschedule_for_no_hit(
        &self,
        entry: &ScheduledSearch,
        best_score: Option<i32>,
        now: DateTime<Utc>,
        settings: &Settings,
    ) -> Result<RunOutcome, WatcherError> {
        let scheduled_searches = ScheduledSearchRepo::new(&self.store);
        let round = RoundRepo::new(&self.store).get(entry.round_id)?;
        let start = EventRepo::new(&self.store)
            .list_for_round(round.id)?
            .into_iter()
            .find(|e| e.event_type == entry.event_type)
            .and_then(|e| e.start_time_utc);
        let next_run = next_run_after_search(now, start, settings, self.tick_interval, self.jitter());
        scheduled_searches.mark_searched(entry.id, Some(next_run)).await?;
        scheduled_searches.set_status(entry.id, ScheduledSearchStatus::Scheduled).await?;
        Ok(RunOutcome::NoAcceptableHit { best_score })
    }

    fn jitter(&self) -> i64 {
        if self.jitter_seconds <= 0 {
            return 0;
        }
        rand::Rng::gen_range(&mut rand::thread_rng(), -self.jitter_seconds..=self.jitter_seconds)
    }

    async fn notify(&self, class: NotificationEventClass, entry: &ScheduledSearch, nzb_url: &str) {
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

fn build_score_context(entry: &ScheduledSearch, settings: &Settings, year: i32, round_number: i32) -> ScoreContext<'_> {
    let overrides = entry.quality_overrides.as_ref();
    ScoreContext {
        expected_year: year,
        expected_round: round_number,
        requested_session: entry.event_type,
        preferred_groups: &settings.preferred_groups,
        preferred_codecs: &settings.preferred_codecs,
        min_resolution: overrides.and_then(|q| q.min_resolution).unwrap_or(settings.min_resolution),
        max_resolution: overrides.and_then(|q| q.max_resolution).unwrap_or(settings.max_resolution),
        allow_hdr: overrides.and_then(|q| q.allow_hdr).unwrap_or(settings.allow_hdr),
    }
}

fn fold_candidates(
    items: &[f1w_indexer::NewznabItem],
    indexer_id: i64,
    ctx: &ScoreContext,
    candidates: &mut HashMap<CanonicalKey, (ScoredCandidate, ClassifiedTitle, i64, String)>,
) {
    for item in items {
        let classified = classify_title(&item.title);
        let scored = score_candidate(&item.title, &classified, ctx, item.pub_date, item.size_bytes);
        let key = classified.canonical_key();
        candidates
            .entry(key)
            .and_modify(|(existing, existing_classified, existing_indexer_id, existing_url)| {
                if scored.score > existing.score {
                    *existing = scored.clone();
                    *existing_classified = classified.clone();
                    *existing_indexer_id = indexer_id;
                    *existing_url = item.link.clone();
                }
            })
            .or_insert_with(|| (scored, classified, indexer_id, item.link.clone()));
    }
}

/// Picks the auto-grab winner: highest score, ties broken by
/// resolution/codec/pubdate/size via `tie_break`.
fn pick_winner<'a>(
    values: &'a [(ScoredCandidate, ClassifiedTitle, i64, String)],
    ctx: &ScoreContext,
) -> Option<(&'a ScoredCandidate, &'a ClassifiedTitle, i64, &'a str)> {
    let max_score = values.iter().map(|(s, ..)| s.score).max()?;
    let tied: Vec<(ScoredCandidate, &ClassifiedTitle)> = values
        .iter()
        .filter(|(s, ..)| s.score == max_score)
        .map(|(s, c, ..)| (s.clone(), c))
        .collect();

    let median_size = median(values.iter().filter_map(|(s, ..)| s.size_bytes).collect());
    let winner = tie_break(&tied, ctx, median_size)?;
    let (_, classified) = winner;

    values
        .iter()
        .find(|(s, c, ..)| s.score == max_score && c == classified)
        .map(|(s, c, indexer_id, url)| (s, c, *indexer_id, url.as_str()))
}

fn median(mut sizes: Vec<u64>) -> Option<u64> {
    if sizes.is_empty() {
        return None;
    }
    sizes.sort_unstable();
    Some(sizes[sizes.len() / 2])
}

fn nzb_title(entry: &ScheduledSearch, round: &f1w_core::model::Round) -> String {
    format!("{} {} {}", round.name, round.round_number, entry.event_type.tag())
}

fn session_query_token(event_type: EventType) -> &'static str {
    match event_type {
        EventType::FP1 => "FP1",
        EventType::FP2 => "FP2",
        EventType::FP3 => "FP3",
        EventType::Qualifying => "Qualifying",
        EventType::Sprint => "Sprint",
        EventType::SprintQualifying => "Sprint Qualifying",
        EventType::Race => "Race",
        EventType::Other => "Race",
    }
}

/// Applies an entry's quality overrides on top of `Settings`, the same
/// merge order `build_score_context` uses, for round-level auto-grab (C11)
/// which doesn't have a single `ScheduledSearch` to read overrides from.
pub fn effective_threshold(overrides: Option<&QualityOverrides>, settings: &Settings) -> i32 {
    overrides.and_then(|q| q.auto_download_threshold).unwrap_or(settings.auto_download_threshold)
}
