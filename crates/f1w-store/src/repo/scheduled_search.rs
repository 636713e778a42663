use chrono::{DateTime, Utc};
use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::{EventType, QualityOverrides, ScheduledSearch, ScheduledSearchStatus};

use crate::convert::{
    event_type_from_str, event_type_to_str, from_naive, scheduled_status_from_str,
    scheduled_status_to_str, to_naive,
};
use crate::models::{NewScheduledSearchRow, ScheduledSearchRow};
use crate::pool::Store;
use crate::schema::scheduled_searches;

pub struct ScheduledSearchRepo<'a> {
    store: &'a Store,
}

impl<'a> ScheduledSearchRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        round_id: i64,
        event_type: EventType,
        quality_overrides: Option<&QualityOverrides>,
    ) -> Result<ScheduledSearch, WatcherError> {
        let mut conn = self.store.writer().await;
        let now = to_naive(Utc::now());
        let new_row = NewScheduledSearchRow {
            round_id,
            event_type: event_type_to_str(event_type).to_string(),
            status: scheduled_status_to_str(ScheduledSearchStatus::Scheduled).to_string(),
            downloader_id: None,
            quality_overrides_json: quality_overrides
                .map(|q| serde_json::to_string(q))
                .transpose()
                .map_err(|e| WatcherError::validation(format!("bad quality overrides: {e}")))?,
            added_at: now,
            last_searched_at: None,
            next_run_at: None,
            last_error: None,
            attempts: 0,
            chosen_nzb: None,
            dispatch_token: None,
        };
        diesel::insert_into(scheduled_searches::table)
            .values(&new_row)
            .execute(&mut *conn)?;
        let row: ScheduledSearchRow = scheduled_searches::table
            .filter(scheduled_searches::round_id.eq(round_id))
            .filter(scheduled_searches::event_type.eq(event_type_to_str(event_type)))
            .first(&mut *conn)?;
        row_to_domain(row)
    }

    pub fn get(&self, id: i64) -> Result<ScheduledSearch, WatcherError> {
        let mut conn = self.store.read()?;
        let row: ScheduledSearchRow = scheduled_searches::table
            .filter(scheduled_searches::id.eq(id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("ScheduledSearch", id.to_string()))?;
        row_to_domain(row)
    }

    /// Entries whose `next_run_at` has passed (or is unset, meaning "due
    /// immediately") and whose status is `Scheduled` — what the scheduler
    /// tick selects (§4.9 "selects due entries").
    pub fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledSearch>, WatcherError> {
        let mut conn = self.store.read()?;
        let naive_now = to_naive(now);
        let rows: Vec<ScheduledSearchRow> = scheduled_searches::table
            .filter(scheduled_searches::status.eq(scheduled_status_to_str(
                ScheduledSearchStatus::Scheduled,
            )))
            .filter(
                scheduled_searches::next_run_at
                    .is_null()
                    .or(scheduled_searches::next_run_at.le(naive_now)),
            )
            .load(&mut conn)?;
        rows.into_iter().map(row_to_domain).collect()
    }

    pub fn list_for_round(&self, round_id: i64) -> Result<Vec<ScheduledSearch>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<ScheduledSearchRow> = scheduled_searches::table
            .filter(scheduled_searches::round_id.eq(round_id))
            .load(&mut conn)?;
        rows.into_iter().map(row_to_domain).collect()
    }

    /// `next_run_at` is non-null iff `status = Scheduled`, so any transition
    /// away from `Scheduled` clears it here.
    pub async fn set_status(&self, id: i64, status: ScheduledSearchStatus) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        if status == ScheduledSearchStatus::Scheduled {
            diesel::update(scheduled_searches::table.filter(scheduled_searches::id.eq(id)))
                .set(scheduled_searches::status.eq(scheduled_status_to_str(status)))
                .execute(&mut *conn)?;
        } else {
            diesel::update(scheduled_searches::table.filter(scheduled_searches::id.eq(id)))
                .set((
                    scheduled_searches::status.eq(scheduled_status_to_str(status)),
                    scheduled_searches::next_run_at.eq(None::<chrono::NaiveDateTime>),
                ))
                .execute(&mut *conn)?;
        }
        Ok(())
    }

    pub async fn mark_searched(
        &self,
        id: i64,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(scheduled_searches::table.filter(scheduled_searches::id.eq(id)))
            .set((
                scheduled_searches::last_searched_at.eq(Some(to_naive(Utc::now()))),
                scheduled_searches::next_run_at.eq(next_run_at.map(to_naive)),
                scheduled_searches::attempts.eq(scheduled_searches::attempts + 1),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn record_dispatch(
        &self,
        id: i64,
        downloader_id: i64,
        chosen_nzb: &str,
        dispatch_token: &str,
    ) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(scheduled_searches::table.filter(scheduled_searches::id.eq(id)))
            .set((
                scheduled_searches::status
                    .eq(scheduled_status_to_str(ScheduledSearchStatus::WaitingDownload)),
                scheduled_searches::downloader_id.eq(Some(downloader_id)),
                scheduled_searches::chosen_nzb.eq(Some(chosen_nzb.to_string())),
                scheduled_searches::dispatch_token.eq(Some(dispatch_token.to_string())),
                scheduled_searches::next_run_at.eq(None::<chrono::NaiveDateTime>),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn record_failure(&self, id: i64, message: &str) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(scheduled_searches::table.filter(scheduled_searches::id.eq(id)))
            .set((
                scheduled_searches::status.eq(scheduled_status_to_str(ScheduledSearchStatus::Failed)),
                scheduled_searches::last_error.eq(Some(message.to_string())),
                scheduled_searches::next_run_at.eq(None::<chrono::NaiveDateTime>),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn pause(&self, id: i64) -> Result<(), WatcherError> {
        self.set_status(id, ScheduledSearchStatus::Paused).await
    }

    pub async fn resume(&self, id: i64) -> Result<(), WatcherError> {
        self.set_status(id, ScheduledSearchStatus::Scheduled).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::delete(scheduled_searches::table.filter(scheduled_searches::id.eq(id)))
            .execute(&mut *conn)?;
        Ok(())
    }
}

fn row_to_domain(row: ScheduledSearchRow) -> Result<ScheduledSearch, WatcherError> {
    let quality_overrides = row
        .quality_overrides_json
        .as_deref()
        .map(serde_json::from_str::<QualityOverrides>)
        .transpose()
        .map_err(|e| WatcherError::Database {
            message: format!("corrupt quality_overrides_json: {e}"),
        })?;

    Ok(ScheduledSearch {
        id: row.id,
        round_id: row.round_id,
        event_type: event_type_from_str(&row.event_type),
        status: scheduled_status_from_str(&row.status),
        downloader_id: row.downloader_id,
        quality_overrides,
        added_at: from_naive(row.added_at),
        last_searched_at: row.last_searched_at.map(from_naive),
        next_run_at: row.next_run_at.map(from_naive),
        last_error: row.last_error,
        attempts: row.attempts,
        chosen_nzb: row.chosen_nzb,
        dispatch_token: row.dispatch_token,
    })
}
