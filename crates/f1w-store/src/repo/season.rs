use chrono::Utc;
use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::Season;

use crate::convert::{from_naive, to_naive};
use crate::models::{NewSeasonRow, SeasonRow};
use crate::pool::Store;
use crate::schema::seasons;

pub struct SeasonRepo<'a> {
    store: &'a Store,
}

impl<'a> SeasonRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn upsert(&self, year: i32) -> Result<Season, WatcherError> {
        let mut conn = self.store.writer().await;
        let existing: Option<SeasonRow> = seasons::table
            .filter(seasons::year.eq(year))
            .first(&mut *conn)
            .optional()?;

        if let Some(row) = existing {
            return Ok(row_to_domain(row));
        }

        let new_row = NewSeasonRow {
            year,
            last_refreshed: None,
            is_hidden: false,
        };
        diesel::insert_into(seasons::table)
            .values(&new_row)
            .execute(&mut *conn)?;

        let row: SeasonRow = seasons::table
            .filter(seasons::year.eq(year))
            .first(&mut *conn)?;
        Ok(row_to_domain(row))
    }

    pub async fn mark_refreshed(&self, season_id: i64) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(seasons::table.filter(seasons::id.eq(season_id)))
            .set(seasons::last_refreshed.eq(Some(to_naive(Utc::now()))))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn set_hidden(&self, season_id: i64, hidden: bool) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(seasons::table.filter(seasons::id.eq(season_id)))
            .set(seasons::is_hidden.eq(hidden))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub fn get(&self, season_id: i64) -> Result<Season, WatcherError> {
        let mut conn = self.store.read()?;
        let row: SeasonRow = seasons::table
            .filter(seasons::id.eq(season_id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("Season", season_id.to_string()))?;
        Ok(row_to_domain(row))
    }

    pub fn list(&self, include_hidden: bool) -> Result<Vec<Season>, WatcherError> {
        let mut conn = self.store.read()?;
        let query = seasons::table.order(seasons::year.desc());
        let rows: Vec<SeasonRow> = if include_hidden {
            query.load(&mut conn)?
        } else {
            query.filter(seasons::is_hidden.eq(false)).load(&mut conn)?
        };
        Ok(rows.into_iter().map(row_to_domain).collect())
    }
}

fn row_to_domain(row: SeasonRow) -> Season {
    Season {
        id: row.id,
        year: row.year,
        last_refreshed: row.last_refreshed.map(from_naive),
        is_hidden: row.is_hidden,
    }
}
