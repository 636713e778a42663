//! `RefreshSeason(year)` (§4.2): fetches from the provider (with retry) and
//! merges into the store. Round payload wins on any season/round
//! disagreement because the round-level upsert always runs last and simply
//! overwrites; nulls are tolerated by never calling the per-session upsert
//! for a session the round doesn't carry.

use f1w_core::error::WatcherError;
use f1w_core::model::EventType;
use f1w_core::retry::{retry_with_policy, RetryPolicy};
use f1w_store::{EventRepo, RoundRepo, SeasonRepo};

use crate::client::{ProviderError, ProviderRound, SchedulingProvider};

pub struct SeasonImporter<'a> {
    store: &'a f1w_store::Store,
    provider: &'a dyn SchedulingProvider,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshSummary {
    pub rounds_upserted: usize,
    pub events_upserted: usize,
}

impl<'a> SeasonImporter<'a> {
    pub fn new(store: &'a f1w_store::Store, provider: &'a dyn SchedulingProvider) -> Self {
        Self { store, provider }
    }

    /// Fetches and merges a season. Transient provider errors are retried
    /// (3 attempts, factor 2, initial 1s per §4.2); a permanent failure
    /// surfaces as `WatcherError::Provider` and leaves existing rows
    /// untouched.
    pub async fn refresh_season(&self, year: i32) -> Result<RefreshSummary, WatcherError> {
        let policy = RetryPolicy::provider_refresh();
        let season_payload = retry_with_policy(
            &policy,
            |e: &ProviderError| e.retryable(),
            || self.provider.fetch_season(year),
        )
        .await
        .map_err(|e| WatcherError::Provider {
            message: e.to_string(),
            retryable: e.retryable(),
        })?;

        let season_repo = SeasonRepo::new(self.store);
        let round_repo = RoundRepo::new(self.store);
        let event_repo = EventRepo::new(self.store);

        let season = season_repo.upsert(year).await?;

        let mut summary = RefreshSummary::default();
        for provider_round in &season_payload.rounds {
            let round = round_repo
                .upsert(
                    season.id,
                    provider_round.round_number,
                    &provider_round.name,
                    &provider_round.circuit,
                    &provider_round.country,
                    None,
                )
                .await?;
            summary.rounds_upserted += 1;

            for (event_type, session) in session_map(provider_round) {
                event_repo
                    .upsert(round.id, event_type, session.start_time_utc, None)
                    .await?;
                summary.events_upserted += 1;
            }
        }

        season_repo.mark_refreshed(season.id).await?;
        Ok(summary)
    }
}

/// Maps the provider's session keys onto `EventType`, skipping any session
/// the round payload didn't carry (§4.2: "Nulls tolerated").
fn session_map(round: &ProviderRound) -> Vec<(EventType, &crate::client::ProviderSession)> {
    let mut out = Vec::new();
    let lookup = [
        ("race", EventType::Race),
        ("qualy", EventType::Qualifying),
        ("fp1", EventType::FP1),
        ("fp2", EventType::FP2),
        ("fp3", EventType::FP3),
        ("sprint_qualy", EventType::SprintQualifying),
        ("sprint_race", EventType::Sprint),
    ];
    for (key, event_type) in lookup {
        if let Some(session) = round.sessions.get(key) {
            out.push((event_type, session));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ProviderSeason, StaticProvider};
    use std::collections::HashMap;

    fn temp_store() -> (f1w_store::Store, tempfile::TempPath) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.into_temp_path();
        let store = f1w_store::Store::connect(path.to_str().unwrap()).unwrap();
        (store, path)
    }

    fn sample_round(round_number: i32, include_fp2: bool) -> ProviderRound {
        let mut sessions = HashMap::new();
        sessions.insert(
            "race",
            crate::client::ProviderSession {
                start_time_utc: Some(chrono::Utc::now()),
            },
        );
        if include_fp2 {
            sessions.insert(
                "fp2",
                crate::client::ProviderSession {
                    start_time_utc: Some(chrono::Utc::now()),
                },
            );
        }
        ProviderRound {
            round_number,
            name: "Bahrain Grand Prix".to_string(),
            raw_name: "Bahrain Grand Prix".to_string(),
            circuit: "Sakhir".to_string(),
            country: "Bahrain".to_string(),
            sessions,
        }
    }

    #[tokio::test]
    async fn refresh_season_upserts_rounds_and_events() {
        let (store, _path) = temp_store();
        let provider = StaticProvider::new().with_season(ProviderSeason {
            year: 2025,
            rounds: vec![sample_round(1, false)],
        });
        let importer = SeasonImporter::new(&store, &provider);
        let summary = importer.refresh_season(2025).await.unwrap();
        assert_eq!(summary.rounds_upserted, 1);
        assert_eq!(summary.events_upserted, 1);

        let season = SeasonRepo::new(&store).list(true).unwrap();
        assert_eq!(season.len(), 1);
        let rounds = RoundRepo::new(&store).list_for_season(season[0].id).unwrap();
        assert_eq!(rounds.len(), 1);
        let events = EventRepo::new(&store).list_for_round(rounds[0].id).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn missing_fp2_creates_no_fp2_row_scenario_s3() {
        let (store, _path) = temp_store();
        let provider = StaticProvider::new().with_season(ProviderSeason {
            year: 2024,
            rounds: vec![sample_round(6, false)],
        });
        let importer = SeasonImporter::new(&store, &provider);
        importer.refresh_season(2024).await.unwrap();

        let season = SeasonRepo::new(&store).list(true).unwrap();
        let rounds = RoundRepo::new(&store).list_for_season(season[0].id).unwrap();
        let events = EventRepo::new(&store).list_for_round(rounds[0].id).unwrap();
        assert!(!events.iter().any(|e| e.event_type == EventType::FP2));
    }

    #[tokio::test]
    async fn re_running_refresh_with_no_change_keeps_round_keys_stable() {
        let (store, _path) = temp_store();
        let provider = StaticProvider::new().with_season(ProviderSeason {
            year: 2025,
            rounds: vec![sample_round(1, true)],
        });
        let importer = SeasonImporter::new(&store, &provider);
        importer.refresh_season(2025).await.unwrap();
        importer.refresh_season(2025).await.unwrap();

        let season = SeasonRepo::new(&store).list(true).unwrap();
        assert_eq!(season.len(), 1);
        let rounds = RoundRepo::new(&store).list_for_season(season[0].id).unwrap();
        assert_eq!(rounds.len(), 1, "round key must stay stable across re-imports");
    }

    #[tokio::test]
    async fn permanent_provider_error_leaves_existing_rows_untouched() {
        let (store, _path) = temp_store();
        let provider = StaticProvider::new().with_season(ProviderSeason {
            year: 2025,
            rounds: vec![sample_round(1, false)],
        });
        let importer = SeasonImporter::new(&store, &provider);
        importer.refresh_season(2025).await.unwrap();

        // Unseeded year behaves like a permanent NotFound from the provider.
        let err = importer.refresh_season(2026).await.unwrap_err();
        assert!(!err.retryable());

        let season = SeasonRepo::new(&store).list(true).unwrap();
        assert_eq!(season.len(), 1, "existing 2025 season row must be untouched");
    }
}
