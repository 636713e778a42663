use chrono::Utc;
use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::{DownloadHistory, DownloadHistoryStatus};

use crate::convert::{
    download_history_status_from_str, download_history_status_to_str, from_naive, to_naive,
};
use crate::models::{DownloadHistoryRow, NewDownloadHistoryRow};
use crate::pool::Store;
use crate::schema::download_history;

pub struct DownloadHistoryRepo<'a> {
    store: &'a Store,
}

impl<'a> DownloadHistoryRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_sent(
        &self,
        event_id: i64,
        indexer_id: i64,
        downloader_id: i64,
        nzb_title: &str,
        nzb_url: &str,
        score: i32,
        acquisition_id: &str,
    ) -> Result<DownloadHistory, WatcherError> {
        let mut conn = self.store.writer().await;
        let now = to_naive(Utc::now());
        let new_row = NewDownloadHistoryRow {
            event_id,
            indexer_id,
            downloader_id,
            nzb_title: nzb_title.to_string(),
            nzb_url: nzb_url.to_string(),
            score,
            status: download_history_status_to_str(DownloadHistoryStatus::Sent).to_string(),
            last_polled_at: None,
            created_at: now,
            updated_at: now,
            acquisition_id: Some(acquisition_id.to_string()),
        };
        diesel::insert_into(download_history::table)
            .values(&new_row)
            .execute(&mut *conn)?;
        let row: DownloadHistoryRow = download_history::table
            .order(download_history::id.desc())
            .first(&mut *conn)?;
        Ok(row_to_domain(row))
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: DownloadHistoryStatus,
    ) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(download_history::table.filter(download_history::id.eq(id)))
            .set((
                download_history::status.eq(download_history_status_to_str(status)),
                download_history::last_polled_at.eq(Some(to_naive(Utc::now()))),
                download_history::updated_at.eq(to_naive(Utc::now())),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<DownloadHistory, WatcherError> {
        let mut conn = self.store.read()?;
        let row: DownloadHistoryRow = download_history::table
            .filter(download_history::id.eq(id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("DownloadHistory", id.to_string()))?;
        Ok(row_to_domain(row))
    }

    /// Entries still in flight (`Sent`/`Downloading`) for post-send polling.
    pub fn list_in_flight(&self) -> Result<Vec<DownloadHistory>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<DownloadHistoryRow> = download_history::table
            .filter(
                download_history::status
                    .eq(download_history_status_to_str(DownloadHistoryStatus::Sent))
                    .or(download_history::status
                        .eq(download_history_status_to_str(DownloadHistoryStatus::Downloading))),
            )
            .load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }

    pub fn list_for_event(&self, event_id: i64) -> Result<Vec<DownloadHistory>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<DownloadHistoryRow> = download_history::table
            .filter(download_history::event_id.eq(event_id))
            .order(download_history::created_at.desc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }
}

fn row_to_domain(row: DownloadHistoryRow) -> DownloadHistory {
    DownloadHistory {
        id: row.id,
        event_id: row.event_id,
        indexer_id: row.indexer_id,
        downloader_id: row.downloader_id,
        nzb_title: row.nzb_title,
        nzb_url: row.nzb_url,
        score: row.score,
        status: download_history_status_from_str(&row.status),
        last_polled_at: row.last_polled_at.map(from_naive),
        created_at: from_naive(row.created_at),
        updated_at: from_naive(row.updated_at),
        acquisition_id: row.acquisition_id,
    }
}
