use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::{Event, EventType};

use crate::convert::{event_type_from_str, event_type_to_str, from_naive, to_naive};
use crate::models::{EventRow, NewEventRow};
use crate::pool::Store;
use crate::schema::events;
use chrono::{DateTime, Utc};

pub struct EventRepo<'a> {
    store: &'a Store,
}

impl<'a> EventRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Upsert by `(round, type)` (§4.2). Nulls tolerated: a provider that
    /// omits Sprint/FP2/FP3 simply never calls this for that type.
    pub async fn upsert(
        &self,
        round_id: i64,
        event_type: EventType,
        start_time_utc: Option<DateTime<Utc>>,
        end_time_utc: Option<DateTime<Utc>>,
    ) -> Result<Event, WatcherError> {
        let mut conn = self.store.writer().await;
        let type_str = event_type_to_str(event_type);
        let existing: Option<EventRow> = events::table
            .filter(events::round_id.eq(round_id))
            .filter(events::event_type.eq(type_str))
            .first(&mut *conn)
            .optional()?;

        let new_row = NewEventRow {
            round_id,
            event_type: type_str.to_string(),
            start_time_utc: start_time_utc.map(to_naive),
            end_time_utc: end_time_utc.map(to_naive),
        };

        let row = if let Some(existing) = existing {
            diesel::update(events::table.filter(events::id.eq(existing.id)))
                .set(&new_row)
                .execute(&mut *conn)?;
            events::table.filter(events::id.eq(existing.id)).first(&mut *conn)?
        } else {
            diesel::insert_into(events::table)
                .values(&new_row)
                .execute(&mut *conn)?;
            events::table
                .filter(events::round_id.eq(round_id))
                .filter(events::event_type.eq(type_str))
                .first(&mut *conn)?
        };

        Ok(row_to_domain(row))
    }

    pub fn get(&self, event_id: i64) -> Result<Event, WatcherError> {
        let mut conn = self.store.read()?;
        let row: EventRow = events::table
            .filter(events::id.eq(event_id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("Event", event_id.to_string()))?;
        Ok(row_to_domain(row))
    }

    pub fn list_for_round(&self, round_id: i64) -> Result<Vec<Event>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<EventRow> = events::table
            .filter(events::round_id.eq(round_id))
            .load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }
}

fn row_to_domain(row: EventRow) -> Event {
    Event {
        id: row.id,
        round_id: row.round_id,
        event_type: event_type_from_str(&row.event_type),
        start_time_utc: row.start_time_utc.map(from_naive),
        end_time_utc: row.end_time_utc.map(from_naive),
    }
}
