use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::Round;

use crate::models::{NewRoundRow, RoundRow};
use crate::pool::Store;
use crate::schema::rounds;

pub struct RoundRepo<'a> {
    store: &'a Store,
}

impl<'a> RoundRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Upsert by `(season, round_number)` per §4.2 merge rules. Round
    /// payload wins when re-imported: every field is overwritten.
    pub async fn upsert(
        &self,
        season_id: i64,
        round_number: i32,
        name: &str,
        circuit: &str,
        country: &str,
        circuit_tz: Option<&str>,
    ) -> Result<Round, WatcherError> {
        let mut conn = self.store.writer().await;
        let existing: Option<RoundRow> = rounds::table
            .filter(rounds::season_id.eq(season_id))
            .filter(rounds::round_number.eq(round_number))
            .first(&mut *conn)
            .optional()?;

        let new_row = NewRoundRow {
            season_id,
            round_number,
            name: name.to_string(),
            circuit: circuit.to_string(),
            country: country.to_string(),
            circuit_tz: circuit_tz.map(|s| s.to_string()),
        };

        let row = if let Some(existing) = existing {
            diesel::update(rounds::table.filter(rounds::id.eq(existing.id)))
                .set(&new_row)
                .execute(&mut *conn)?;
            rounds::table.filter(rounds::id.eq(existing.id)).first(&mut *conn)?
        } else {
            diesel::insert_into(rounds::table)
                .values(&new_row)
                .execute(&mut *conn)?;
            rounds::table
                .filter(rounds::season_id.eq(season_id))
                .filter(rounds::round_number.eq(round_number))
                .first(&mut *conn)?
        };

        Ok(row_to_domain(row))
    }

    pub fn get(&self, round_id: i64) -> Result<Round, WatcherError> {
        let mut conn = self.store.read()?;
        let row: RoundRow = rounds::table
            .filter(rounds::id.eq(round_id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("Round", round_id.to_string()))?;
        Ok(row_to_domain(row))
    }

    pub fn list_for_season(&self, season_id: i64) -> Result<Vec<Round>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<RoundRow> = rounds::table
            .filter(rounds::season_id.eq(season_id))
            .order(rounds::round_number.asc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }
}

fn row_to_domain(row: RoundRow) -> Round {
    Round {
        id: row.id,
        season_id: row.season_id,
        round_number: row.round_number,
        name: row.name,
        circuit: row.circuit,
        country: row.country,
        circuit_tz: row.circuit_tz,
    }
}
