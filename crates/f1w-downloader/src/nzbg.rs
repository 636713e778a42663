//! NZBGet-style JSON-RPC adapter: a tagged request and an untagged
//! result/error response envelope.

use async_trait::async_trait;
use f1w_core::error::DownloaderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::{AcquisitionId, DownloadStatus, DownloaderAdapter};
use crate::idempotency::IdempotencyGuard;

#[derive(Debug, Serialize)]
struct RpcRequest {
    method: String,
    params: Vec<Value>,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

pub struct NzbgAdapter {
    id: String,
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    guard: IdempotencyGuard,
}

impl NzbgAdapter {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            guard: IdempotencyGuard::new(),
        }
    }

    fn rpc_url(&self) -> String {
        format!("{}/jsonrpc", self.base_url.trim_end_matches('/'))
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, DownloaderError> {
        let request = RpcRequest {
            method: method.to_string(),
            params,
            id: 1,
        };
        let response = self
            .http
            .post(self.rpc_url())
            .basic_auth("nzbget", Some(&self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| DownloaderError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DownloaderError::AuthRejected);
        }
        if !response.status().is_success() {
            return Err(DownloaderError::Unavailable(format!("http {}", response.status())));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| DownloaderError::Unknown(e.to_string()))?;

        match parsed.result {
            Some(value) => Ok(value),
            None => {
                let message = parsed.error.map(|e| e.message).unwrap_or_else(|| "nzbget rpc error".to_string());
                Err(if message.to_lowercase().contains("categ") {
                    DownloaderError::BadCategory(message)
                } else {
                    DownloaderError::Rejected(message)
                })
            }
        }
    }
}

#[async_trait]
impl DownloaderAdapter for NzbgAdapter {
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

        let result = self
            .call(
                "append",
                vec![
                    Value::String(title.to_string()),
                    Value::String(url.to_string()),
                    Value::String(category.to_string()),
                    Value::Number(priority.into()),
                    Value::Bool(false),
                    Value::String(String::new()),
                    Value::String(String::new()),
                    Value::String("SCORE".to_string()),
                ],
            )
            .await?;

        let group_id = match result {
            Value::Number(n) if n.as_i64().unwrap_or(-1) > 0 => n.to_string(),
            Value::Number(_) => {
                return Err(DownloaderError::Rejected("append returned non-positive group id".to_string()))
            }
            other => other.to_string(),
        };

        let acquisition = AcquisitionId(group_id);
        self.guard.record(&self.id, url, acquisition.clone()).await;
        Ok(acquisition)
    }

    async fn status(&self, id: &AcquisitionId) -> Result<DownloadStatus, DownloaderError> {
        let groups = self.call("listgroups", vec![]).await?;
        if let Some(array) = groups.as_array() {
            for group in array {
                if group.get("NZBID").map(|v| v.to_string()) == Some(id.0.clone()) {
                    let status = group
                        .get("Status")
                        .and_then(|v| v.as_str())
                        .unwrap_or("UNKNOWN");
                    return Ok(map_group_status(status));
                }
            }
        }

        let history = self.call("history", vec![Value::Bool(false)]).await?;
        if let Some(array) = history.as_array() {
            for entry in array {
                if entry.get("NZBID").map(|v| v.to_string()) == Some(id.0.clone()) {
                    let status = entry
                        .get("Status")
                        .and_then(|v| v.as_str())
                        .unwrap_or("UNKNOWN");
                    return Ok(map_history_status(status));
                }
            }
        }

        Ok(DownloadStatus::Unknown)
    }

    async fn test(&self) -> Result<(), DownloaderError> {
        self.call("version", vec![]).await.map(|_| ())
    }
}

fn map_group_status(status: &str) -> DownloadStatus {
    match status {
        "QUEUED" | "PAUSED" => DownloadStatus::Queued,
        "DOWNLOADING" => DownloadStatus::Downloading,
        _ => DownloadStatus::Unknown,
    }
}

fn map_history_status(status: &str) -> DownloadStatus {
    if status.starts_with("SUCCESS") {
        DownloadStatus::Completed
    } else if status.starts_with("FAILURE") || status.starts_with("DELETED") {
        DownloadStatus::Failed
    } else {
        DownloadStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_returns_positive_group_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": 42
            })))
            .mount(&server)
            .await;

        let adapter = NzbgAdapter::new("1", server.uri(), "secret");
        let id = adapter.send("https://indexer/nzb/1", "Race", "tv", 0).await.unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[tokio::test]
    async fn rpc_error_becomes_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": { "message": "append failed" }
            })))
            .mount(&server)
            .await;

        let adapter = NzbgAdapter::new("1", server.uri(), "secret");
        let err = adapter.send("https://indexer/nzb/2", "Race", "tv", 0).await.unwrap_err();
        assert!(matches!(err, DownloaderError::Rejected(_)));
    }

    #[tokio::test]
    async fn repeat_send_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": 7 })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = NzbgAdapter::new("1", server.uri(), "secret");
        let a = adapter.send("https://indexer/nzb/3", "Race", "tv", 0).await.unwrap();
        let b = adapter.send("https://indexer/nzb/3", "Race", "tv", 0).await.unwrap();
        assert_eq!(a, b);
    }
}
