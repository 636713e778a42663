//! Apprise-style URL scheme table: maps a handful of built-in schemes onto
//! an HTTP POST. Unrecognized schemes degrade to `UnsupportedScheme` rather
//! than failing the dispatch (§4.7).

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheme {
    Discord,
    Slack,
    Mailto,
    GenericJson,
    GenericXml,
    Unsupported(String),
}

impl Scheme {
    pub fn parse(url: &str) -> Self {
        let (scheme, _) = url.split_once("://").unwrap_or((url, ""));
        match scheme.to_ascii_lowercase().as_str() {
            "discord" => Scheme::Discord,
            "slack" => Scheme::Slack,
            "mailto" => Scheme::Mailto,
            "json" => Scheme::GenericJson,
            "xml" => Scheme::GenericXml,
            other => Scheme::Unsupported(other.to_string()),
        }
    }
}

/// An HTTP request translated from an Apprise-style URL, or `None` when the
/// scheme has no HTTP-POST representation (e.g. `mailto://`, which this
/// reduced table does not actually deliver).
pub struct RenderedRequest {
    pub url: String,
    pub body: Value,
}

/// Maps a scheme-qualified URL + a generic `{title, body}` payload onto a
/// `RenderedRequest`, or `None` if the scheme can't be rendered as HTTP.
pub fn render(url: &str, title: &str, body: &str) -> Option<RenderedRequest> {
    let scheme = Scheme::parse(url);
    let (_, rest) = url.split_once("://")?;

    match scheme {
        Scheme::Discord => Some(RenderedRequest {
            url: format!("https://{rest}"),
            body: serde_json::json!({ "content": format!("**{title}**\n{body}") }),
        }),
        Scheme::Slack => Some(RenderedRequest {
            url: format!("https://{rest}"),
            body: serde_json::json!({ "text": format!("*{title}*\n{body}") }),
        }),
        Scheme::GenericJson => Some(RenderedRequest {
            url: format!("https://{rest}"),
            body: serde_json::json!({ "title": title, "body": body }),
        }),
        Scheme::GenericXml => Some(RenderedRequest {
            url: format!("https://{rest}"),
            body: serde_json::json!({ "title": title, "body": body, "format": "xml" }),
        }),
        Scheme::Mailto | Scheme::Unsupported(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_built_in_schemes() {
        assert_eq!(Scheme::parse("discord://webhook/token"), Scheme::Discord);
        assert_eq!(Scheme::parse("slack://hooks/xyz"), Scheme::Slack);
        assert_eq!(Scheme::parse("mailto://user@example.com"), Scheme::Mailto);
    }

    #[test]
    fn unknown_scheme_is_unsupported_not_an_error() {
        assert_eq!(
            Scheme::parse("pushover://token/user"),
            Scheme::Unsupported("pushover".to_string())
        );
    }

    #[test]
    fn render_returns_none_for_unsupported() {
        assert!(render("pushover://token/user", "t", "b").is_none());
        assert!(render("mailto://a@b.com", "t", "b").is_none());
    }

    #[test]
    fn render_discord_produces_https_post_target() {
        let rendered = render("discord://webhook/abc123", "Download complete", "body").unwrap();
        assert_eq!(rendered.url, "https://webhook/abc123");
        assert!(rendered.body["content"].as_str().unwrap().contains("Download complete"));
    }
}
