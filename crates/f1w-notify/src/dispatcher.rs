//! Fan-out dispatch (§4.7): given an event class, sends to every target
//! whose mask accepts it. Each target gets an independent 10s deadline and
//! three retries; a failing target never aborts the others and never
//! mutates entity state — the dispatcher only logs and returns outcomes for
//! the caller to record if it wants to.

use std::time::Duration;

use f1w_core::model::{NotificationEventClass, NotificationKind, NotificationTarget};
use f1w_core::retry::{retry_with_policy, RetryPolicy};
use serde::Serialize;

use crate::scheme;
use crate::webhook;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    UnsupportedScheme(String),
    Failed(String),
    TimedOut,
}

pub struct NotificationDispatcher {
    http: reqwest::Client,
    retry_policy: RetryPolicy,
    deadline: Duration,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            retry_policy: RetryPolicy::notification(),
            deadline: Duration::from_secs(10),
        }
    }

    /// Dispatches to every target accepting `class`. `Test` ignores masks
    /// (`NotificationTarget::accepts` already encodes that rule).
    pub async fn dispatch<T: Serialize + Send + Sync>(
        &self,
        class: NotificationEventClass,
        targets: &[NotificationTarget],
        payload: &T,
    ) -> Vec<(i64, DispatchOutcome)> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            if !target.accepts(class) {
                continue;
            }
            let outcome = self.dispatch_one(class, target, payload).await;
            if let DispatchOutcome::Failed(ref message) = outcome {
                tracing::warn!(target_id = target.id, message, "notification delivery failed");
            }
            outcomes.push((target.id, outcome));
        }
        outcomes
    }

    async fn dispatch_one<T: Serialize>(
        &self,
        class: NotificationEventClass,
        target: &NotificationTarget,
        payload: &T,
    ) -> DispatchOutcome {
        let event_type = event_type_name(class);

        let send = || self.send_once(target, event_type, payload);
        let result = tokio::time::timeout(
            self.deadline,
            retry_with_policy(&self.retry_policy, |e: &String| e != "unsupported-scheme", send),
        )
        .await;

        match result {
            Ok(Ok(())) => DispatchOutcome::Sent,
            Ok(Err(message)) if message == "unsupported-scheme" => {
                DispatchOutcome::UnsupportedScheme(target.url.clone())
            }
            Ok(Err(message)) => DispatchOutcome::Failed(message),
            Err(_) => DispatchOutcome::TimedOut,
        }
    }

    async fn send_once<T: Serialize>(&self, target: &NotificationTarget, event_type: &str, payload: &T) -> Result<(), String> {
        match target.kind {
            NotificationKind::Apprise => {
                let body_text = serde_json::to_string(payload).unwrap_or_default();
                match scheme::render(&target.url, event_type, &body_text) {
                    Some(rendered) => self.post_json(&rendered.url, &rendered.body).await,
                    None => Err("unsupported-scheme".to_string()),
                }
            }
            NotificationKind::Webhook => {
                let (body, signature) =
                    webhook::sign(event_type, payload, target.webhook_secret.as_deref())
                        .map_err(|e| e.to_string())?;
                let mut request = self.http.post(&target.url).header("Content-Type", "application/json");
                if let Some(signature) = signature {
                    request = request.header("X-Signature", signature);
                }
                let response = request
                    .body(body)
                    .send()
                    .await
                    .map_err(|e| e.to_string())?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(format!("http {}", response.status()))
                }
            }
        }
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<(), String> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("http {}", response.status()))
        }
    }
}

fn event_type_name(class: NotificationEventClass) -> &'static str {
    match class {
        NotificationEventClass::DownloadStart => "DownloadStart",
        NotificationEventClass::DownloadComplete => "DownloadComplete",
        NotificationEventClass::DownloadFail => "DownloadFail",
        NotificationEventClass::Test => "Test",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn webhook_target(id: i64, url: String, mask: Vec<NotificationEventClass>) -> NotificationTarget {
        NotificationTarget {
            id,
            kind: NotificationKind::Webhook,
            url,
            name: "test-hook".to_string(),
            event_mask: mask,
            webhook_secret: Some("s3cr3t".to_string()),
        }
    }

    #[tokio::test]
    async fn masked_out_target_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dispatcher = NotificationDispatcher::new();
        let target = webhook_target(1, server.uri(), vec![NotificationEventClass::DownloadFail]);
        let outcomes = dispatcher
            .dispatch(NotificationEventClass::DownloadStart, &[target], &json!({}))
            .await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_event_ignores_mask() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dispatcher = NotificationDispatcher::new();
        let target = webhook_target(1, server.uri(), vec![]);
        let outcomes = dispatcher
            .dispatch(NotificationEventClass::Test, &[target], &json!({}))
            .await;
        assert_eq!(outcomes, vec![(1, DispatchOutcome::Sent)]);
    }

    #[tokio::test]
    async fn failing_target_does_not_abort_other_targets() {
        let failing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&failing)
            .await;
        let healthy = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&healthy)
            .await;

        let dispatcher = NotificationDispatcher {
            retry_policy: RetryPolicy {
                max_attempts: 1,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                multiplier: 1.0,
                jitter_factor: 0.0,
            },
            ..NotificationDispatcher::new()
        };
        let targets = vec![
            webhook_target(1, failing.uri(), vec![NotificationEventClass::DownloadFail]),
            webhook_target(2, healthy.uri(), vec![NotificationEventClass::DownloadFail]),
        ];
        let outcomes = dispatcher
            .dispatch(NotificationEventClass::DownloadFail, &targets, &json!({}))
            .await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].1, DispatchOutcome::Failed(_)));
        assert_eq!(outcomes[1].1, DispatchOutcome::Sent);
    }

    #[tokio::test]
    async fn apprise_unsupported_scheme_degrades_non_fatally() {
        let dispatcher = NotificationDispatcher::new();
        let target = NotificationTarget {
            id: 1,
            kind: NotificationKind::Apprise,
            url: "pushover://token/user".to_string(),
            name: "apprise".to_string(),
            event_mask: vec![NotificationEventClass::DownloadFail],
            webhook_secret: None,
        };
        let outcomes = dispatcher
            .dispatch(NotificationEventClass::DownloadFail, &[target], &json!({}))
            .await;
        assert!(matches!(outcomes[0].1, DispatchOutcome::UnsupportedScheme(_)));
    }
}
