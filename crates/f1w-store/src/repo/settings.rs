use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::Settings;

use crate::convert::{join_csv, join_event_allowlist, split_csv, split_event_allowlist};
use crate::models::{NewSettingsRow, SettingsRow};
use crate::pool::Store;
use crate::schema::settings;

const SETTINGS_ROW_ID: i32 = 1;

pub struct SettingsRepo<'a> {
    store: &'a Store,
}

impl<'a> SettingsRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Reads the single settings row, seeding it with defaults on first
    /// boot (§4.8: "Settings are persisted as a single row read on boot").
    pub async fn get_or_init(&self) -> Result<Settings, WatcherError> {
        let mut conn = self.store.writer().await;
        let existing: Option<SettingsRow> = settings::table
            .filter(settings::id.eq(SETTINGS_ROW_ID))
            .first(&mut *conn)
            .optional()?;

        if let Some(row) = existing {
            return Ok(row_to_domain(row));
        }

        let defaults = Settings::default();
        let new_row = to_new_row(&defaults);
        diesel::insert_into(settings::table)
            .values(&new_row)
            .execute(&mut *conn)?;
        Ok(defaults)
    }

    pub fn get(&self) -> Result<Settings, WatcherError> {
        let mut conn = self.store.read()?;
        let row: SettingsRow = settings::table
            .filter(settings::id.eq(SETTINGS_ROW_ID))
            .first(&mut conn)
            .map_err(|_| WatcherError::state_conflict("settings row missing; call get_or_init first"))?;
        Ok(row_to_domain(row))
    }

    pub async fn update(&self, new_settings: &Settings) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(settings::table.filter(settings::id.eq(SETTINGS_ROW_ID)))
            .set(&to_new_row(new_settings))
            .execute(&mut *conn)?;
        Ok(())
    }
}

fn to_new_row(settings: &Settings) -> NewSettingsRow {
    NewSettingsRow {
        id: SETTINGS_ROW_ID,
        min_resolution: settings.min_resolution as i32,
        max_resolution: settings.max_resolution as i32,
        allow_hdr: settings.allow_hdr,
        preferred_codecs: join_csv(&settings.preferred_codecs),
        preferred_groups: join_csv(&settings.preferred_groups),
        auto_download_threshold: settings.auto_download_threshold,
        default_downloader_id: settings.default_downloader_id,
        event_allowlist: join_event_allowlist(&settings.event_allowlist),
        log_level: settings.log_level.clone(),
        scheduler_tick_seconds: settings.scheduler_tick_seconds as i64,
        maxage_pre_days: settings.maxage_pre_days,
        maxage_post_days: settings.maxage_post_days,
        aggressive_window_h: settings.aggressive_window_h,
        decay_interval_h: settings.decay_interval_h,
        stop_after_days: settings.stop_after_days,
        jitter_seconds: settings.jitter_seconds,
        per_indexer_concurrency: settings.per_indexer_concurrency as i64,
        global_concurrency: settings.global_concurrency as i64,
    }
}

fn row_to_domain(row: SettingsRow) -> Settings {
    Settings {
        min_resolution: row.min_resolution as u32,
        max_resolution: row.max_resolution as u32,
        allow_hdr: row.allow_hdr,
        preferred_codecs: split_csv(&row.preferred_codecs),
        preferred_groups: split_csv(&row.preferred_groups),
        auto_download_threshold: row.auto_download_threshold,
        default_downloader_id: row.default_downloader_id,
        event_allowlist: split_event_allowlist(&row.event_allowlist),
        log_level: row.log_level,
        scheduler_tick_seconds: row.scheduler_tick_seconds as u64,
        maxage_pre_days: row.maxage_pre_days,
        maxage_post_days: row.maxage_post_days,
        aggressive_window_h: row.aggressive_window_h,
        decay_interval_h: row.decay_interval_h,
        stop_after_days: row.stop_after_days,
        jitter_seconds: row.jitter_seconds,
        per_indexer_concurrency: row.per_indexer_concurrency as usize,
        global_concurrency: row.global_concurrency as usize,
    }
}
