use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::Downloader;

use crate::convert::{downloader_kind_from_str, downloader_kind_to_str};
use crate::models::{DownloaderRow, NewDownloaderRow};
use crate::pool::Store;
use crate::schema::downloaders;

pub struct DownloaderRepo<'a> {
    store: &'a Store,
}

impl<'a> DownloaderRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn create(&self, downloader: &Downloader) -> Result<Downloader, WatcherError> {
        let mut conn = self.store.writer().await;
        let new_row = to_new_row(downloader);
        diesel::insert_into(downloaders::table)
            .values(&new_row)
            .execute(&mut *conn)?;
        let row: DownloaderRow = downloaders::table
            .order(downloaders::id.desc())
            .first(&mut *conn)?;
        Ok(row_to_domain(row))
    }

    pub async fn update(&self, downloader: &Downloader) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(downloaders::table.filter(downloaders::id.eq(downloader.id)))
            .set(&to_new_row(downloader))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn record_error(&self, downloader_id: i64, message: &str) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(downloaders::table.filter(downloaders::id.eq(downloader_id)))
            .set(downloaders::last_error.eq(Some(message.to_string())))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn delete(&self, downloader_id: i64) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::delete(downloaders::table.filter(downloaders::id.eq(downloader_id)))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub fn get(&self, downloader_id: i64) -> Result<Downloader, WatcherError> {
        let mut conn = self.store.read()?;
        let row: DownloaderRow = downloaders::table
            .filter(downloaders::id.eq(downloader_id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("Downloader", downloader_id.to_string()))?;
        Ok(row_to_domain(row))
    }

    pub fn list_enabled(&self) -> Result<Vec<Downloader>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<DownloaderRow> = downloaders::table
            .filter(downloaders::enabled.eq(true))
            .order(downloaders::priority.desc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }

    pub fn list_all(&self) -> Result<Vec<Downloader>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<DownloaderRow> = downloaders::table
            .order(downloaders::priority.desc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }
}

fn to_new_row(downloader: &Downloader) -> NewDownloaderRow {
    NewDownloaderRow {
        name: downloader.name.clone(),
        kind: downloader_kind_to_str(downloader.kind).to_string(),
        base_url: downloader.base_url.clone(),
        api_key: downloader.api_key.clone(),
        category: downloader.category.clone(),
        priority: downloader.priority,
        enabled: downloader.enabled,
        last_error: downloader.last_error.clone(),
    }
}

fn row_to_domain(row: DownloaderRow) -> Downloader {
    Downloader {
        id: row.id,
        name: row.name,
        kind: downloader_kind_from_str(&row.kind),
        base_url: row.base_url,
        api_key: row.api_key,
        category: row.category,
        priority: row.priority,
        enabled: row.enabled,
        last_error: row.last_error,
    }
}
