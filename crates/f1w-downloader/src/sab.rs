//! SAB-style GET API adapter: `mode=addurl` to submit, `mode=queue`/
//! `mode=history` to poll status.

use async_trait::async_trait;
use f1w_core::error::DownloaderError;
use serde::Deserialize;

use crate::adapter::{AcquisitionId, DownloadStatus, DownloaderAdapter};
use crate::idempotency::IdempotencyGuard;

pub struct SabAdapter {
    id: String,
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    guard: IdempotencyGuard,
}

impl SabAdapter {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            guard: IdempotencyGuard::new(),
        }
    }

    fn api_url(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct AddUrlResponse {
    status: bool,
    #[serde(default)]
    nzo_ids: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: QueueSlots,
}

#[derive(Debug, Deserialize)]
struct QueueSlots {
    #[serde(default)]
    slots: Vec<QueueSlot>,
}

#[derive(Debug, Deserialize)]
struct QueueSlot {
    nzo_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: HistorySlots,
}

#[derive(Debug, Deserialize)]
struct HistorySlots {
    #[serde(default)]
    slots: Vec<HistorySlot>,
}

#[derive(Debug, Deserialize)]
struct HistorySlot {
    nzo_id: String,
    status: String,
}

fn map_status(raw: &str) -> DownloadStatus {
    match raw.to_ascii_lowercase().as_str() {
        "queued" | "paused" => DownloadStatus::Queued,
        "downloading" | "fetching" | "checking" | "extracting" | "verifying" | "moving" | "running" => {
            DownloadStatus::Downloading
        }
        "completed" => DownloadStatus::Completed,
        "failed" => DownloadStatus::Failed,
        _ => DownloadStatus::Unknown,
    }
}

fn classify_transport(error: &reqwest::Error) -> DownloaderError {
    DownloaderError::Unavailable(error.to_string())
}

#[async_trait]
impl DownloaderAdapter for SabAdapter {
    async fn send(
        &self,
        url: &str,
        title: &str,
        category: &str,
        priority: i32,
    ) -> Result<AcquisitionId, DownloaderError> {
        if let Some(prior) = self.guard.lookup(&self.id, url).await {
            return Ok(prior);
        }

        let response = self
            .http
            .get(self.api_url())
            .query(&[
                ("mode", "addurl"),
                ("name", url),
                ("nzbname", title),
                ("cat", category),
                ("priority", &priority.to_string()),
                ("apikey", &self.api_key),
                ("output", "json"),
            ])
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DownloaderError::AuthRejected);
        }
        if !response.status().is_success() {
            return Err(DownloaderError::Unavailable(format!("http {}", response.status())));
        }

        let parsed: AddUrlResponse = response
            .json()
            .await
            .map_err(|e| DownloaderError::Unknown(e.to_string()))?;

        if !parsed.status {
            let message = parsed.error.unwrap_or_else(|| "addurl rejected".to_string());
            return Err(if message.to_lowercase().contains("category") {
                DownloaderError::BadCategory(message)
            } else {
                DownloaderError::Rejected(message)
            });
        }

        let nzo_id = parsed
            .nzo_ids
            .into_iter()
            .next()
            .ok_or_else(|| DownloaderError::Unknown("addurl returned no nzo_id".to_string()))?;

        let acquisition = AcquisitionId(nzo_id);
        self.guard.record(&self.id, url, acquisition.clone()).await;
        Ok(acquisition)
    }

    async fn status(&self, id: &AcquisitionId) -> Result<DownloadStatus, DownloaderError> {
        let queue: QueueResponse = self
            .http
            .get(self.api_url())
            .query(&[("mode", "queue"), ("apikey", &self.api_key), ("output", "json")])
            .send()
            .await
            .map_err(|e| classify_transport(&e))?
            .json()
            .await
            .map_err(|e| DownloaderError::Unknown(e.to_string()))?;

        if let Some(slot) = queue.queue.slots.iter().find(|s| s.nzo_id == id.0) {
            return Ok(map_status(&slot.status));
        }

        let history: HistoryResponse = self
            .http
            .get(self.api_url())
            .query(&[("mode", "history"), ("apikey", &self.api_key), ("output", "json")])
            .send()
            .await
            .map_err(|e| classify_transport(&e))?
            .json()
            .await
            .map_err(|e| DownloaderError::Unknown(e.to_string()))?;

        match history.history.slots.iter().find(|s| s.nzo_id == id.0) {
            Some(slot) => Ok(map_status(&slot.status)),
            None => Ok(DownloadStatus::Unknown),
        }
    }

    async fn test(&self) -> Result<(), DownloaderError> {
        let response = self
            .http
            .get(self.api_url())
            .query(&[("mode", "version"), ("apikey", &self.api_key), ("output", "json")])
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DownloaderError::AuthRejected);
        }
        if !response.status().is_success() {
            return Err(DownloaderError::Unavailable(format!("http {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_returns_nzo_id_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("mode", "addurl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "nzo_ids": ["SABnzbd_nzo_abc"]
            })))
            .mount(&server)
            .await;

        let adapter = SabAdapter::new("1", server.uri(), "key");
        let id = adapter
            .send("https://indexer/nzb/1", "Race.2025", "tv", 0)
            .await
            .unwrap();
        assert_eq!(id.as_str(), "SABnzbd_nzo_abc");
    }

    #[tokio::test]
    async fn repeat_send_within_window_does_not_repost() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("mode", "addurl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "nzo_ids": ["SABnzbd_nzo_abc"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = SabAdapter::new("1", server.uri(), "key");
        let first = adapter.send("https://indexer/nzb/1", "t", "tv", 0).await.unwrap();
        let second = adapter.send("https://indexer/nzb/1", "t", "tv", 0).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rejected_category_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("mode", "addurl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": false,
                "error": "Category does not exist"
            })))
            .mount(&server)
            .await;

        let adapter = SabAdapter::new("1", server.uri(), "key");
        let err = adapter.send("https://indexer/nzb/2", "t", "badcat", 0).await.unwrap_err();
        assert!(matches!(err, DownloaderError::BadCategory(_)));
    }
}
