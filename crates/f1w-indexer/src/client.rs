//! Per-indexer HTTP dispatch (§4.3): turns a [`QuerySpec`] into a Newznab
//! query string, enforces global + per-indexer concurrency caps, retries
//! transient failures, and trips a circuit breaker after repeated failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use f1w_core::circuit::CircuitBreakerRegistry;
use f1w_core::error::IndexerError;
use f1w_core::model::Indexer;
use f1w_core::query::QuerySpec;
use f1w_core::retry::{retry_with_policy, RetryPolicy};
use tokio::sync::{Mutex, Semaphore};

use crate::parse::{parse_response, NewznabItem};

/// Outcome of running the full query set against one indexer.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub items: Vec<NewznabItem>,
    pub queries_run: usize,
}

#[async_trait]
pub trait IndexerClient: Send + Sync {
    async fn search(&self, indexer: &Indexer, queries: &[QuerySpec]) -> Result<SearchOutcome, IndexerError>;
    async fn test_connection(&self, indexer: &Indexer) -> Result<(), IndexerError>;
}

/// Newznab adapter. One instance is shared across the scheduler; per-indexer
/// semaphores are created lazily and cached by indexer id.
pub struct NewznabClient {
    http: reqwest::Client,
    global: Arc<Semaphore>,
    per_indexer: Mutex<HashMap<i64, Arc<Semaphore>>>,
    per_indexer_limit: usize,
    circuit_breakers: CircuitBreakerRegistry,
    retry_policy: RetryPolicy,
}

impl NewznabClient {
    pub fn new(global_concurrency: usize, per_indexer_concurrency: usize) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("reqwest client builds"),
            global: Arc::new(Semaphore::new(global_concurrency.max(1))),
            per_indexer: Mutex::new(HashMap::new()),
            per_indexer_limit: per_indexer_concurrency.max(1),
            circuit_breakers: CircuitBreakerRegistry::default(),
            retry_policy: RetryPolicy::newznab(),
        }
    }

    async fn semaphore_for(&self, indexer_id: i64) -> Arc<Semaphore> {
        let mut map = self.per_indexer.lock().await;
        map.entry(indexer_id)
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_indexer_limit)))
            .clone()
    }

    fn query_string(indexer: &Indexer, query: &QuerySpec) -> Vec<(String, String)> {
        let mut params = vec![
            ("apikey".to_string(), indexer.api_key.clone()),
            ("limit".to_string(), "100".to_string()),
            ("offset".to_string(), "0".to_string()),
            ("maxage".to_string(), "0".to_string()),
        ];
        if !indexer.category_ids.is_empty() {
            params.push(("cat".to_string(), indexer.category_ids.join(",")));
        }
        match query {
            QuerySpec::Search { query } => {
                params.push(("t".to_string(), "search".to_string()));
                params.push(("q".to_string(), query.clone()));
            }
            QuerySpec::TvSearch { query, season, ep } => {
                params.push(("t".to_string(), "tvsearch".to_string()));
                params.push(("q".to_string(), query.clone()));
                params.push(("season".to_string(), season.to_string()));
                params.push(("ep".to_string(), ep.to_string()));
            }
        }
        params
    }

    async fn run_one_query(&self, indexer: &Indexer, query: &QuerySpec) -> Result<Vec<NewznabItem>, IndexerError> {
        let params = Self::query_string(indexer, query);
        let url = format!("{}/api", indexer.base_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| IndexerError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IndexerError::AuthRejected);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(IndexerError::RateLimited);
        }
        if status.is_server_error() {
            return Err(IndexerError::Unavailable(format!("http {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::BadRequest(format!("http {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::Unavailable(e.to_string()))?;
        parse_response(&body)
    }
}

#[async_trait]
impl IndexerClient for NewznabClient {
    async fn search(&self, indexer: &Indexer, queries: &[QuerySpec]) -> Result<SearchOutcome, IndexerError> {
        let breaker = self.circuit_breakers.get(&indexer.id.to_string()).await;
        if !breaker.allow_request() {
            return Err(IndexerError::Unavailable(format!(
                "circuit open for indexer {}",
                indexer.name
            )));
        }

        let _global_permit = self.global.acquire().await.expect("global semaphore not closed");
        let per_indexer_sem = self.semaphore_for(indexer.id).await;
        let _per_indexer_permit = per_indexer_sem.acquire().await.expect("per-indexer semaphore not closed");

        let mut items = Vec::new();
        let mut queries_run = 0;
        for query in queries {
            let result = retry_with_policy(
                &self.retry_policy,
                |e: &IndexerError| e.category() == f1w_core::error::ErrorCategory::Transient,
                || self.run_one_query(indexer, query),
            )
            .await;

            match result {
                Ok(mut found) => {
                    breaker.on_success();
                    items.append(&mut found);
                    queries_run += 1;
                }
                Err(e) => {
                    breaker.on_failure();
                    return Err(e);
                }
            }
        }

        Ok(SearchOutcome { items, queries_run })
    }

    async fn test_connection(&self, indexer: &Indexer) -> Result<(), IndexerError> {
        let url = format!("{}/api", indexer.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[("t", "caps"), ("apikey", &indexer.api_key)])
            .send()
            .await
            .map_err(|e| IndexerError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IndexerError::AuthRejected);
        }
        if !response.status().is_success() {
            return Err(IndexerError::Unavailable(format!("http {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use f1w_core::model::IndexerKind;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_indexer(base_url: String) -> Indexer {
        Indexer {
            id: 1,
            name: "nzbgeek".to_string(),
            kind: IndexerKind::Newznab,
            base_url,
            api_key: "secret-key".to_string(),
            category_ids: vec!["5000".to_string()],
            priority: 0,
            enabled: true,
            last_error: None,
        }
    }

    const RSS_BODY: &str = r#"<rss><channel>
<item>
  <title>Formula.1.2025.Bahrain.Race.1080p</title>
  <link>https://indexer.example/nzb/abc</link>
  <pubDate>Sun, 16 Mar 2025 15:00:00 +0000</pubDate>
  <newznab:attr name="size" value="4294967296"/>
</item>
</channel></rss>"#;

    #[tokio::test]
    async fn search_runs_all_queries_and_aggregates_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("t", "search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_BODY))
            .mount(&server)
            .await;

        let client = NewznabClient::new(4, 2);
        let indexer = sample_indexer(server.uri());
        let queries = vec![QuerySpec::Search {
            query: "Formula 1 2025 Bahrain Race".to_string(),
        }];

        let outcome = client.search(&indexer, &queries).await.unwrap();
        assert_eq!(outcome.queries_run, 1);
        assert_eq!(outcome.items.len(), 1);
    }

    #[tokio::test]
    async fn auth_rejection_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = NewznabClient::new(2, 2);
        let indexer = sample_indexer(server.uri());
        let queries = vec![QuerySpec::Search {
            query: "x".to_string(),
        }];

        let err = client.search(&indexer, &queries).await.unwrap_err();
        assert!(matches!(err, IndexerError::AuthRejected));
    }

    #[tokio::test]
    async fn test_connection_uses_caps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("t", "caps"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<caps/>"))
            .mount(&server)
            .await;

        let client = NewznabClient::new(2, 2);
        let indexer = sample_indexer(server.uri());
        client.test_connection(&indexer).await.unwrap();
    }
}
