//! The entity graph from spec §3: Season → Round → Event, plus the
//! scheduling/history/cache/settings rows that ride alongside it. These are
//! plain in-memory types; `f1w-store` maps them onto Diesel models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: Id,
    pub year: i32,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: Id,
    pub season_id: Id,
    pub round_number: i32,
    pub name: String,
    pub circuit: String,
    pub country: String,
    pub circuit_tz: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    FP1,
    FP2,
    FP3,
    Qualifying,
    Sprint,
    SprintQualifying,
    Race,
    #[default]
    Other,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::FP1,
        EventType::FP2,
        EventType::FP3,
        EventType::Qualifying,
        EventType::Sprint,
        EventType::SprintQualifying,
        EventType::Race,
        EventType::Other,
    ];

    /// Canonical lowercase tag used by the round-search-cache allowlist
    /// fingerprint (§4.5, Open Question (i)).
    pub fn tag(&self) -> &'static str {
        match self {
            EventType::FP1 => "fp1",
            EventType::FP2 => "fp2",
            EventType::FP3 => "fp3",
            EventType::Qualifying => "qualifying",
            EventType::Sprint => "sprint",
            EventType::SprintQualifying => "sprintqualifying",
            EventType::Race => "race",
            EventType::Other => "other",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.tag() == tag.to_lowercase())
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Id,
    pub round_id: Id,
    pub event_type: EventType,
    pub start_time_utc: Option<DateTime<Utc>>,
    pub end_time_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerKind {
    Newznab,
    Hydra,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indexer {
    pub id: Id,
    pub name: String,
    pub kind: IndexerKind,
    pub base_url: String,
    pub api_key: String,
    pub category_ids: Vec<String>,
    pub priority: i32,
    pub enabled: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloaderKind {
    Sab,
    Nzbg,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Downloader {
    pub id: Id,
    pub name: String,
    pub kind: DownloaderKind,
    pub base_url: String,
    pub api_key: String,
    pub category: String,
    pub priority: i32,
    pub enabled: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledSearchStatus {
    Scheduled,
    Running,
    WaitingDownload,
    Completed,
    Failed,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSearch {
    pub id: Id,
    pub round_id: Id,
    pub event_type: EventType,
    pub status: ScheduledSearchStatus,
    pub downloader_id: Option<Id>,
    pub quality_overrides: Option<QualityOverrides>,
    pub added_at: DateTime<Utc>,
    pub last_searched_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub attempts: i32,
    pub chosen_nzb: Option<String>,
    /// In-flight dispatch token guarding against late-duplicate overwrites
    /// (§5 "Idempotency" — "last dispatch id" guard).
    pub dispatch_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityOverrides {
    pub min_resolution: Option<u32>,
    pub max_resolution: Option<u32>,
    pub allow_hdr: Option<bool>,
    pub auto_download_threshold: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadHistoryStatus {
    Sent,
    Downloading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadHistory {
    pub id: Id,
    pub event_id: Id,
    pub indexer_id: Id,
    pub downloader_id: Id,
    pub nzb_title: String,
    pub nzb_url: String,
    pub score: i32,
    pub status: DownloadHistoryStatus,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The downloader-assigned job id (e.g. SAB's `nzo_id`), used to poll
    /// `DownloaderAdapter::status` after the initial send.
    pub acquisition_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Apprise,
    Webhook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationEventClass {
    DownloadStart,
    DownloadComplete,
    DownloadFail,
    Test,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub id: Id,
    pub kind: NotificationKind,
    pub url: String,
    pub name: String,
    pub event_mask: Vec<NotificationEventClass>,
    pub webhook_secret: Option<String>,
}

impl NotificationTarget {
    /// `Test` ignores the mask (§4.7: "A Test event ignores the mask").
    pub fn accepts(&self, class: NotificationEventClass) -> bool {
        class == NotificationEventClass::Test || self.event_mask.contains(&class)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRoundSearch {
    pub round_id: Id,
    pub allowlist_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub ttl_hours: i64,
    pub results_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub min_resolution: u32,
    pub max_resolution: u32,
    pub allow_hdr: bool,
    pub preferred_codecs: Vec<String>,
    pub preferred_groups: Vec<String>,
    pub auto_download_threshold: i32,
    pub default_downloader_id: Option<Id>,
    pub event_allowlist: Vec<EventType>,
    pub log_level: String,
    pub scheduler_tick_seconds: u64,
    pub maxage_pre_days: i64,
    pub maxage_post_days: i64,
    pub aggressive_window_h: i64,
    pub decay_interval_h: i64,
    pub stop_after_days: i64,
    pub jitter_seconds: i64,
    pub per_indexer_concurrency: usize,
    pub global_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_resolution: 480,
            max_resolution: 2160,
            allow_hdr: true,
            preferred_codecs: vec!["x265".to_string(), "x264".to_string()],
            preferred_groups: Vec::new(),
            auto_download_threshold: 70,
            default_downloader_id: None,
            event_allowlist: EventType::ALL.to_vec(),
            log_level: "info".to_string(),
            scheduler_tick_seconds: 600,
            maxage_pre_days: 14,
            maxage_post_days: 7,
            aggressive_window_h: 24,
            decay_interval_h: 6,
            stop_after_days: 14,
            jitter_seconds: 120,
            per_indexer_concurrency: 1,
            global_concurrency: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_tag_round_trips() {
        for event_type in EventType::ALL {
            let tag = event_type.tag();
            assert_eq!(EventType::from_tag(tag), Some(event_type));
        }
    }

    #[test]
    fn from_tag_is_case_insensitive() {
        assert_eq!(EventType::from_tag("RACE"), Some(EventType::Race));
        assert_eq!(EventType::from_tag("Fp1"), Some(EventType::FP1));
    }

    #[test]
    fn notification_target_always_accepts_test() {
        let target = NotificationTarget {
            id: 1,
            kind: NotificationKind::Webhook,
            url: "https://example.test/hook".to_string(),
            name: "ops".to_string(),
            event_mask: vec![NotificationEventClass::DownloadFail],
            webhook_secret: None,
        };
        assert!(target.accepts(NotificationEventClass::Test));
        assert!(target.accepts(NotificationEventClass::DownloadFail));
        assert!(!target.accepts(NotificationEventClass::DownloadStart));
    }

    #[test]
    fn settings_default_allowlists_every_session_type() {
        let settings = Settings::default();
        assert_eq!(settings.event_allowlist.len(), EventType::ALL.len());
    }
}
