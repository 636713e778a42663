//! Raw webhook delivery: `POST {url}` with body `{type, payload}` and an
//! optional `X-Signature: sha256=<hex>` HMAC header computed over the
//! serialized body using `webhook_secret`.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
pub struct WebhookBody<'a, T: Serialize> {
    #[serde(rename = "type")]
    pub event_type: &'a str,
    pub payload: &'a T,
}

/// Signs the serialized JSON body if a secret is configured. Returns the
/// serialized body and the optional header value.
pub fn sign<T: Serialize>(
    event_type: &str,
    payload: &T,
    secret: Option<&str>,
) -> Result<(String, Option<String>), serde_json::Error> {
    let body = WebhookBody { event_type, payload };
    let serialized = serde_json::to_string(&body)?;

    let header = secret.map(|secret| {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
        mac.update(serialized.as_bytes());
        let digest = mac.finalize().into_bytes();
        format!("sha256={}", hex::encode(digest))
    });

    Ok((serialized, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unsigned_when_no_secret() {
        let (_, header) = sign("DownloadComplete", &json!({"a": 1}), None).unwrap();
        assert!(header.is_none());
    }

    #[test]
    fn signed_header_has_sha256_prefix_and_is_deterministic() {
        let (_, header_a) = sign("DownloadComplete", &json!({"a": 1}), Some("secret")).unwrap();
        let (_, header_b) = sign("DownloadComplete", &json!({"a": 1}), Some("secret")).unwrap();
        let header_a = header_a.unwrap();
        assert!(header_a.starts_with("sha256="));
        assert_eq!(header_a, header_b.unwrap());
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let (_, a) = sign("DownloadComplete", &json!({"a": 1}), Some("secret-a")).unwrap();
        let (_, b) = sign("DownloadComplete", &json!({"a": 1}), Some("secret-b")).unwrap();
        assert_ne!(a, b);
    }
}
