//! `SchedulingProvider`: the trait boundary around the opaque
//! `fetchSeason(year) -> Season` collaborator (§1, §4.2). The real HTTP
//! implementation is a thin adapter over §6's wire shape; a `StaticProvider`
//! test double backs the merge-engine and scheduler test suites without any
//! network dependency.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::payload::{ProviderRacePayload, ProviderSeasonPayload};

/// A single session's resolved time, already combined from the provider's
/// `date`/`time` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSession {
    pub start_time_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ProviderRound {
    pub round_number: i32,
    pub name: String,
    /// The untouched `raceName`, kept as an alias even after sponsor
    /// stripping derives `name` (§4.2).
    pub raw_name: String,
    pub circuit: String,
    pub country: String,
    pub sessions: HashMap<&'static str, ProviderSession>,
}

#[derive(Debug, Clone)]
pub struct ProviderSeason {
    pub year: i32,
    pub rounds: Vec<ProviderRound>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("schedule provider request failed: {0}")]
    Transport(String),
    #[error("schedule provider returned an unparseable payload: {0}")]
    Parse(String),
    #[error("schedule provider returned no data for year {0}")]
    NotFound(i32),
}

impl ProviderError {
    /// §4.2: "transient → retry with exponential backoff; permanent →
    /// surface ProviderError and leave existing rows untouched."
    pub fn retryable(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

#[async_trait]
pub trait SchedulingProvider: Send + Sync {
    async fn fetch_season(&self, year: i32) -> Result<ProviderSeason, ProviderError>;
}

/// Thin HTTP adapter over §6's wire shape. Out of scope per spec.md §1 as an
/// *implementation*, but the trait boundary and this adapter are what
/// `f1w-scheduler`/`f1w-app` actually call.
pub struct HttpSchedulingProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSchedulingProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client builds with static config");
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SchedulingProvider for HttpSchedulingProvider {
    async fn fetch_season(&self, year: i32) -> Result<ProviderSeason, ProviderError> {
        let url = format!("{}/api/{}", self.base_url.trim_end_matches('/'), year);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if response.status().is_server_error() || response.status().as_u16() == 429 {
            return Err(ProviderError::Transport(format!(
                "provider returned {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Parse(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let payload: ProviderSeasonPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if payload.races.is_empty() {
            return Err(ProviderError::NotFound(year));
        }

        Ok(to_domain(year, payload))
    }
}

fn to_domain(year: i32, payload: ProviderSeasonPayload) -> ProviderSeason {
    ProviderSeason {
        year,
        rounds: payload.races.into_iter().map(race_to_round).collect(),
    }
}

fn race_to_round(race: ProviderRacePayload) -> ProviderRound {
    let raw_name = race.race_name.clone();
    let name = crate::payload::strip_sponsor_tokens(&race.race_name);
    let name = if name.is_empty() { raw_name.clone() } else { name };

    let mut sessions = HashMap::new();
    let schedule = &race.schedule;
    let mut insert = |key: &'static str, slot: &Option<crate::payload::ProviderSessionTime>| {
        if let Some(slot) = slot {
            sessions.insert(
                key,
                ProviderSession {
                    start_time_utc: slot.to_utc(),
                },
            );
        }
    };
    insert("race", &schedule.race);
    insert("qualy", &schedule.qualy);
    insert("fp1", &schedule.fp1);
    insert("fp2", &schedule.fp2);
    insert("fp3", &schedule.fp3);
    insert("sprint_qualy", &schedule.sprint_qualy);
    insert("sprint_race", &schedule.sprint_race);

    ProviderRound {
        round_number: race.round,
        name,
        raw_name,
        circuit: race.circuit.city,
        country: race.circuit.country,
        sessions,
    }
}

/// Test double: returns a fixed, operator-seeded season per year with no
/// network involved. Used by `f1w-core`/`f1w-scheduler` test suites.
pub struct StaticProvider {
    seasons: HashMap<i32, ProviderSeason>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self {
            seasons: HashMap::new(),
        }
    }

    pub fn with_season(mut self, season: ProviderSeason) -> Self {
        self.seasons.insert(season.year, season);
        self
    }
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchedulingProvider for StaticProvider {
    async fn fetch_season(&self, year: i32) -> Result<ProviderSeason, ProviderError> {
        self.seasons
            .get(&year)
            .cloned()
            .ok_or(ProviderError::NotFound(year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_seeded_season() {
        let provider = StaticProvider::new().with_season(ProviderSeason {
            year: 2025,
            rounds: vec![],
        });
        let season = provider.fetch_season(2025).await.unwrap();
        assert_eq!(season.year, 2025);
    }

    #[tokio::test]
    async fn static_provider_reports_not_found_for_unseeded_year() {
        let provider = StaticProvider::new();
        let err = provider.fetch_season(1999).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(1999)));
    }

    #[test]
    fn race_to_round_strips_sponsor_and_keeps_alias() {
        let race = ProviderRacePayload {
            round: 5,
            race_id: None,
            race_name: "Crypto.com Miami Grand Prix".to_string(),
            schedule: Default::default(),
            circuit: crate::payload::ProviderCircuit {
                city: "Miami".to_string(),
                country: "USA".to_string(),
                circuit_length: None,
            },
            winner: None,
            team_winner: None,
            fast_lap: None,
        };
        let round = race_to_round(race);
        assert_eq!(round.name, "Miami Grand Prix");
        assert_eq!(round.raw_name, "Crypto.com Miami Grand Prix");
    }
}
