use chrono::{DateTime, Utc};
use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::CachedRoundSearch;

use crate::convert::{from_naive, to_naive};
use crate::models::CachedRoundSearchRow;
use crate::pool::Store;
use crate::schema::cached_round_searches;

pub struct CachedSearchRepo<'a> {
    store: &'a Store,
}

/// Result of a cache lookup (§4.5: `{results, from_cache, cached_at, ttl_hours}`).
pub enum CacheLookup {
    Hit(CachedRoundSearch),
    Miss,
}

impl<'a> CachedSearchRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Reads the cache entry and reports `Hit` only when `age < ttl_hours`.
    /// Callers with `force=true` should skip this and go straight to `put`.
    pub fn get(
        &self,
        round_id: i64,
        allowlist_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<CacheLookup, WatcherError> {
        let mut conn = self.store.read()?;
        let row: Option<CachedRoundSearchRow> = cached_round_searches::table
            .filter(cached_round_searches::round_id.eq(round_id))
            .filter(cached_round_searches::allowlist_fingerprint.eq(allowlist_fingerprint))
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(CacheLookup::Miss);
        };

        let cached_at = from_naive(row.created_at);
        let age_hours = (now - cached_at).num_seconds() as f64 / 3600.0;
        if age_hours < row.ttl_hours as f64 {
            Ok(CacheLookup::Hit(row_to_domain(row)))
        } else {
            Ok(CacheLookup::Miss)
        }
    }

    /// Writes replace the prior value atomically (§4.5) via upsert on the
    /// composite `(round_id, allowlist_fingerprint)` key.
    pub async fn put(
        &self,
        round_id: i64,
        allowlist_fingerprint: &str,
        results_json: &str,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        let row = CachedRoundSearchRow {
            round_id,
            allowlist_fingerprint: allowlist_fingerprint.to_string(),
            created_at: to_naive(now),
            ttl_hours,
            results_json: results_json.to_string(),
        };
        diesel::insert_into(cached_round_searches::table)
            .values(&row)
            .on_conflict((
                cached_round_searches::round_id,
                cached_round_searches::allowlist_fingerprint,
            ))
            .do_update()
            .set(&row)
            .execute(&mut *conn)?;
        Ok(())
    }
}

fn row_to_domain(row: CachedRoundSearchRow) -> CachedRoundSearch {
    CachedRoundSearch {
        round_id: row.round_id,
        allowlist_fingerprint: row.allowlist_fingerprint,
        created_at: from_naive(row.created_at),
        ttl_hours: row.ttl_hours,
        results_json: row.results_json,
    }
}
