//! Structured logging (C1). One process-wide JSON-lines subscriber with a
//! reloadable filter handle so `Settings.log_level` changes apply live
//! (§4.8), plus the string-level redactor used before any secret-bearing
//! value reaches a log line.

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing_subscriber::{reload, EnvFilter};

static RELOAD_HANDLE: OnceCell<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceCell::new();

/// Initializes the global JSON subscriber. Safe to call once per process;
/// subsequent calls are no-ops.
pub fn init(default_level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    if RELOAD_HANDLE.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    let _ = RELOAD_HANDLE.set(handle);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json());

    // If a global subscriber was already installed (e.g. in tests that share
    // a process) this simply fails silently.
    let _ = subscriber.try_init();
}

/// Applies a new log level without restarting the process (§4.8: "Changes
/// to log_level update the live logger").
pub fn set_level(level: &str) -> Result<(), String> {
    let handle = RELOAD_HANDLE.get().ok_or("logging not initialized")?;
    let filter = EnvFilter::try_new(level).map_err(|e| e.to_string())?;
    handle.reload(filter).map_err(|e| e.to_string())
}

static APIKEY_RE: OnceCell<Regex> = OnceCell::new();
static HEADER_RE: OnceCell<Regex> = OnceCell::new();

fn apikey_re() -> &'static Regex {
    APIKEY_RE.get_or_init(|| Regex::new(r"(?i)(apikey|api_key)=([^&\s]+)").unwrap())
}

fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| Regex::new(r"(?i)(x-api-key|authorization):\s*\S+").unwrap())
}

/// Scans a string for API keys and known secret-bearing patterns and
/// replaces them with a redaction marker. Used on any string interpolated
/// into a log line or error message that might carry a secret (indexer/
/// downloader `api_key`, notification `url`, `webhook_secret`).
pub fn redact(input: &str, extra_secrets: &[&str]) -> String {
    let mut out = apikey_re()
        .replace_all(input, "$1=***REDACTED***")
        .into_owned();
    out = header_re()
        .replace_all(&out, "$1: ***REDACTED***")
        .into_owned();
    for secret in extra_secrets {
        if secret.is_empty() {
            continue;
        }
        out = out.replace(secret, "***REDACTED***");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_apikey_query_param() {
        let input = "GET /api?t=search&apikey=abc123def&cat=5000";
        let redacted = redact(input, &[]);
        assert!(!redacted.contains("abc123def"));
        assert!(redacted.contains("apikey=***REDACTED***"));
    }

    #[test]
    fn redacts_api_key_header() {
        let input = "X-Api-Key: deadbeef1234";
        let redacted = redact(input, &[]);
        assert!(!redacted.contains("deadbeef1234"));
    }

    #[test]
    fn redacts_configured_webhook_secret_substring() {
        let input = "sent webhook with secret whsec_topsecret123 attached";
        let redacted = redact(input, &["whsec_topsecret123"]);
        assert!(!redacted.contains("whsec_topsecret123"));
    }

    #[test]
    fn leaves_unrelated_text_untouched() {
        let input = "Formula 1 2025 Round03 Bahrain Qualifying";
        assert_eq!(redact(input, &[]), input);
    }
}
