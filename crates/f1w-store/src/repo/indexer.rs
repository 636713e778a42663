use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::Indexer;

use crate::convert::{indexer_kind_from_str, indexer_kind_to_str, join_csv, split_csv};
use crate::models::{IndexerRow, NewIndexerRow};
use crate::pool::Store;
use crate::schema::indexers;

pub struct IndexerRepo<'a> {
    store: &'a Store,
}

impl<'a> IndexerRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn create(&self, indexer: &Indexer) -> Result<Indexer, WatcherError> {
        let mut conn = self.store.writer().await;
        let new_row = to_new_row(indexer);
        diesel::insert_into(indexers::table)
            .values(&new_row)
            .execute(&mut *conn)?;
        let row: IndexerRow = indexers::table
            .order(indexers::id.desc())
            .first(&mut *conn)?;
        Ok(row_to_domain(row))
    }

    pub async fn update(&self, indexer: &Indexer) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(indexers::table.filter(indexers::id.eq(indexer.id)))
            .set(&to_new_row(indexer))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn record_error(&self, indexer_id: i64, message: &str) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(indexers::table.filter(indexers::id.eq(indexer_id)))
            .set(indexers::last_error.eq(Some(message.to_string())))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn delete(&self, indexer_id: i64) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::delete(indexers::table.filter(indexers::id.eq(indexer_id)))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub fn get(&self, indexer_id: i64) -> Result<Indexer, WatcherError> {
        let mut conn = self.store.read()?;
        let row: IndexerRow = indexers::table
            .filter(indexers::id.eq(indexer_id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("Indexer", indexer_id.to_string()))?;
        Ok(row_to_domain(row))
    }

    pub fn list_enabled(&self) -> Result<Vec<Indexer>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<IndexerRow> = indexers::table
            .filter(indexers::enabled.eq(true))
            .order(indexers::priority.desc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }

    pub fn list_all(&self) -> Result<Vec<Indexer>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<IndexerRow> = indexers::table.order(indexers::priority.desc()).load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }
}

fn to_new_row(indexer: &Indexer) -> NewIndexerRow {
    NewIndexerRow {
        name: indexer.name.clone(),
        kind: indexer_kind_to_str(indexer.kind).to_string(),
        base_url: indexer.base_url.clone(),
        api_key: indexer.api_key.clone(),
        category_ids: join_csv(&indexer.category_ids),
        priority: indexer.priority,
        enabled: indexer.enabled,
        last_error: indexer.last_error.clone(),
    }
}

fn row_to_domain(row: IndexerRow) -> Indexer {
    Indexer {
        id: row.id,
        name: row.name,
        kind: indexer_kind_from_str(&row.kind),
        base_url: row.base_url,
        api_key: row.api_key,
        category_ids: split_csv(&row.category_ids),
        priority: row.priority,
        enabled: row.enabled,
        last_error: row.last_error,
    }
}
