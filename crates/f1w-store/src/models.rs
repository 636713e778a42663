//! Diesel-mapped row structs. Kept deliberately dumb (primitives only);
//! `crate::convert` and the `From`/`Into` impls on each repo translate to
//! and from `f1w_core::model`.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = seasons)]
pub struct SeasonRow {
    pub id: i64,
    pub year: i32,
    pub last_refreshed: Option<NaiveDateTime>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = seasons)]
pub struct NewSeasonRow {
    pub year: i32,
    pub last_refreshed: Option<NaiveDateTime>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = rounds)]
pub struct RoundRow {
    pub id: i64,
    pub season_id: i64,
    pub round_number: i32,
    pub name: String,
    pub circuit: String,
    pub country: String,
    pub circuit_tz: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = rounds)]
pub struct NewRoundRow {
    pub season_id: i64,
    pub round_number: i32,
    pub name: String,
    pub circuit: String,
    pub country: String,
    pub circuit_tz: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = events)]
pub struct EventRow {
    pub id: i64,
    pub round_id: i64,
    pub event_type: String,
    pub start_time_utc: Option<NaiveDateTime>,
    pub end_time_utc: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = events)]
pub struct NewEventRow {
    pub round_id: i64,
    pub event_type: String,
    pub start_time_utc: Option<NaiveDateTime>,
    pub end_time_utc: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = indexers)]
pub struct IndexerRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub api_key: String,
    pub category_ids: String,
    pub priority: i32,
    pub enabled: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = indexers)]
pub struct NewIndexerRow {
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub api_key: String,
    pub category_ids: String,
    pub priority: i32,
    pub enabled: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = downloaders)]
pub struct DownloaderRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub api_key: String,
    pub category: String,
    pub priority: i32,
    pub enabled: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = downloaders)]
pub struct NewDownloaderRow {
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub api_key: String,
    pub category: String,
    pub priority: i32,
    pub enabled: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = scheduled_searches)]
pub struct ScheduledSearchRow {
    pub id: i64,
    pub round_id: i64,
    pub event_type: String,
    pub status: String,
    pub downloader_id: Option<i64>,
    pub quality_overrides_json: Option<String>,
    pub added_at: NaiveDateTime,
    pub last_searched_at: Option<NaiveDateTime>,
    pub next_run_at: Option<NaiveDateTime>,
    pub last_error: Option<String>,
    pub attempts: i32,
    pub chosen_nzb: Option<String>,
    pub dispatch_token: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = scheduled_searches)]
pub struct NewScheduledSearchRow {
    pub round_id: i64,
    pub event_type: String,
    pub status: String,
    pub downloader_id: Option<i64>,
    pub quality_overrides_json: Option<String>,
    pub added_at: NaiveDateTime,
    pub last_searched_at: Option<NaiveDateTime>,
    pub next_run_at: Option<NaiveDateTime>,
    pub last_error: Option<String>,
    pub attempts: i32,
    pub chosen_nzb: Option<String>,
    pub dispatch_token: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = download_history)]
pub struct DownloadHistoryRow {
    pub id: i64,
    pub event_id: i64,
    pub indexer_id: i64,
    pub downloader_id: i64,
    pub nzb_title: String,
    pub nzb_url: String,
    pub score: i32,
    pub status: String,
    pub last_polled_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub acquisition_id: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = download_history)]
pub struct NewDownloadHistoryRow {
    pub event_id: i64,
    pub indexer_id: i64,
    pub downloader_id: i64,
    pub nzb_title: String,
    pub nzb_url: String,
    pub score: i32,
    pub status: String,
    pub last_polled_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub acquisition_id: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = notification_targets)]
pub struct NotificationTargetRow {
    pub id: i64,
    pub kind: String,
    pub url: String,
    pub name: String,
    pub event_mask: String,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = notification_targets)]
pub struct NewNotificationTargetRow {
    pub kind: String,
    pub url: String,
    pub name: String,
    pub event_mask: String,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = cached_round_searches, primary_key(round_id, allowlist_fingerprint))]
pub struct CachedRoundSearchRow {
    pub round_id: i64,
    pub allowlist_fingerprint: String,
    pub created_at: NaiveDateTime,
    pub ttl_hours: i64,
    pub results_json: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = settings)]
pub struct SettingsRow {
    pub id: i32,
    pub min_resolution: i32,
    pub max_resolution: i32,
    pub allow_hdr: bool,
    pub preferred_codecs: String,
    pub preferred_groups: String,
    pub auto_download_threshold: i32,
    pub default_downloader_id: Option<i64>,
    pub event_allowlist: String,
    pub log_level: String,
    pub scheduler_tick_seconds: i64,
    pub maxage_pre_days: i64,
    pub maxage_post_days: i64,
    pub aggressive_window_h: i64,
    pub decay_interval_h: i64,
    pub stop_after_days: i64,
    pub jitter_seconds: i64,
    pub per_indexer_concurrency: i64,
    pub global_concurrency: i64,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = settings)]
pub struct NewSettingsRow {
    pub id: i32,
    pub min_resolution: i32,
    pub max_resolution: i32,
    pub allow_hdr: bool,
    pub preferred_codecs: String,
    pub preferred_groups: String,
    pub auto_download_threshold: i32,
    pub default_downloader_id: Option<i64>,
    pub event_allowlist: String,
    pub log_level: String,
    pub scheduler_tick_seconds: i64,
    pub maxage_pre_days: i64,
    pub maxage_post_days: i64,
    pub aggressive_window_h: i64,
    pub decay_interval_h: i64,
    pub stop_after_days: i64,
    pub jitter_seconds: i64,
    pub per_indexer_concurrency: i64,
    pub global_concurrency: i64,
}
