//! Query fan-out builder (§4.4 "Query set"). Pure: takes a round/session
//! context and produces the tokenized query strings to run against every
//! enabled indexer. The venue-alias resolver table is Open Question (iii):
//! shipped empty, operator-editable via `f1w-store`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The canonical session tokens the query builder substitutes, per §4.4.
/// Distinct from `EventType` — this is the full superset of session words
/// that can appear in a query or a title, including non-gradable ones like
/// `Preview`/`Notebook`/`Shakedown`/`Post-Race` that never map to a
/// schedulable `EventType`.
pub const SESSION_TOKENS: &[&str] = &[
    "Race",
    "Qualifying",
    "Sprint",
    "Sprint Qualifying",
    "FP1",
    "FP2",
    "FP3",
    "Practice",
    "Shakedown",
    "Preview",
    "Post-Race",
    "Notebook",
];

/// A single indexer-bound query: either a classic `t=search` free-text query
/// or a `t=tvsearch` structured one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuerySpec {
    Search { query: String },
    TvSearch { query: String, season: i32, ep: i32 },
}

/// Per-circuit alternate names used to widen the query fan-out (Open
/// Question (iii)). Ships empty; `f1w-store` persists operator edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueAliasResolver {
    aliases: HashMap<String, Vec<String>>,
}

impl VenueAliasResolver {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set_aliases(&mut self, circuit_key: &str, aliases: Vec<String>) {
        self.aliases.insert(circuit_key.to_lowercase(), aliases);
    }

    /// Returns the circuit's configured aliases plus the provided source
    /// tokens (city, country, circuit short name) from round metadata,
    /// deduplicated.
    pub fn resolve(&self, circuit_key: &str, source_tokens: &[&str]) -> Vec<String> {
        let mut venues: Vec<String> = source_tokens
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();
        if let Some(extra) = self.aliases.get(&circuit_key.to_lowercase()) {
            venues.extend(extra.iter().cloned());
        }
        venues.sort();
        venues.dedup();
        venues
    }
}

/// Builds the full fan-out for one `(year, round, session)` target, using the
/// resolved venue aliases. Every indexer runs this same set (§4.4: "All five
/// are executed per enabled indexer per target session").
pub fn build_queries(year: i32, round: i32, session: &str, venues: &[String]) -> Vec<QuerySpec> {
    let mut queries = Vec::new();

    for venue in venues {
        queries.push(QuerySpec::Search {
            query: format!("Formula 1 {year} {venue} {session}"),
        });
        queries.push(QuerySpec::Search {
            query: format!("Formula1 {year} Round{round:02} {venue} {session}"),
        });
        queries.push(QuerySpec::Search {
            query: format!("F1 {year} {venue} {session}"),
        });
    }

    queries.push(QuerySpec::TvSearch {
        query: format!("Formula 1 {session}"),
        season: year,
        ep: round,
    });

    if venues.is_empty() {
        // No resolved venue tokens: still emit the three venue-shaped
        // templates with an empty token so the base series/year/session
        // signal is searched.
        queries.push(QuerySpec::Search {
            query: format!("Formula 1 {year} {session}"),
        });
        queries.push(QuerySpec::Search {
            query: format!("Formula1 {year} Round{round:02} {session}"),
        });
        queries.push(QuerySpec::Search {
            query: format!("F1 {year} {session}"),
        });
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_merges_source_tokens_and_configured_aliases() {
        let mut resolver = VenueAliasResolver::empty();
        resolver.set_aliases("bahrain_international", vec!["Sakhir".to_string()]);
        let venues = resolver.resolve("bahrain_international", &["Bahrain", "Manama"]);
        assert!(venues.contains(&"Sakhir".to_string()));
        assert!(venues.contains(&"Bahrain".to_string()));
        assert!(venues.contains(&"Manama".to_string()));
    }

    #[test]
    fn resolver_deduplicates() {
        let mut resolver = VenueAliasResolver::empty();
        resolver.set_aliases("bahrain_international", vec!["Bahrain".to_string()]);
        let venues = resolver.resolve("bahrain_international", &["Bahrain"]);
        assert_eq!(venues, vec!["Bahrain".to_string()]);
    }

    #[test]
    fn build_queries_emits_four_templates_per_venue_plus_tvsearch() {
        let venues = vec!["Bahrain".to_string()];
        let queries = build_queries(2025, 3, "Qualifying", &venues);
        // 3 Search templates for the one venue + 1 TvSearch.
        assert_eq!(queries.len(), 4);
        assert!(queries
            .iter()
            .any(|q| matches!(q, QuerySpec::TvSearch { season: 2025, ep: 3, .. })));
    }

    #[test]
    fn build_queries_falls_back_when_no_venue_resolved() {
        let queries = build_queries(2025, 3, "Race", &[]);
        assert_eq!(queries.len(), 4);
    }
}
