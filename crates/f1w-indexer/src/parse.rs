//! Tolerant Newznab response parsing (§4.3, §6): accepts both the RSS/XML
//! shape (`<item>` with `newznab:attr` extensions) and a JSON shape,
//! normalizing both into one [`NewznabItem`] list.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;

use crate::IndexerError;

/// One normalized result row, regardless of whether the indexer answered
/// with XML or JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct NewznabItem {
    pub title: String,
    pub link: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
    pub category: Option<String>,
    pub group: Option<String>,
}

/// Dispatches on a light content sniff: JSON bodies start with `{` or `[`
/// once leading whitespace is trimmed, everything else is treated as XML.
pub fn parse_response(body: &str) -> Result<Vec<NewznabItem>, IndexerError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        parse_json(body)
    } else {
        parse_xml(body)
    }
}

#[derive(Debug, Deserialize)]
struct JsonEnvelope {
    #[serde(default)]
    channel: Option<JsonChannel>,
    #[serde(default)]
    item: Vec<JsonItem>,
}

#[derive(Debug, Deserialize)]
struct JsonChannel {
    #[serde(default)]
    item: Vec<JsonItem>,
}

#[derive(Debug, Deserialize)]
struct JsonItem {
    title: String,
    link: String,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    group: Option<String>,
}

fn parse_json(body: &str) -> Result<Vec<NewznabItem>, IndexerError> {
    let envelope: JsonEnvelope =
        serde_json::from_str(body).map_err(|e| IndexerError::Parse(e.to_string()))?;
    let items = if !envelope.item.is_empty() {
        envelope.item
    } else {
        envelope.channel.map(|c| c.item).unwrap_or_default()
    };
    Ok(items
        .into_iter()
        .map(|i| NewznabItem {
            title: i.title,
            link: i.link,
            pub_date: i.pub_date.as_deref().and_then(parse_pubdate),
            size_bytes: i.size,
            category: i.category,
            group: i.group,
        })
        .collect())
}

/// `<item>` with optional `<newznab:attr name="... " value="...">` children
/// for `size`/`category`/`group` (§4.3, §6). `quick-xml`'s push parser reads
/// the whole document once rather than via `serde`'s derive support, since
/// the attribute-bag shape doesn't map cleanly onto a struct.
fn parse_xml(body: &str) -> Result<Vec<NewznabItem>, IndexerError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();

    let mut in_item = false;
    let mut current: Option<PartialItem> = None;
    let mut text_target: Option<TextTarget> = None;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| IndexerError::Parse(e.to_string()))?
        {
            Event::Start(e) | Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                if local == "item" {
                    in_item = true;
                    current = Some(PartialItem::default());
                } else if in_item && local == "attr" {
                    let mut name = None;
                    let mut value = None;
                    for attr in e.attributes().flatten() {
                        let key = local_name(attr.key.as_ref());
                        let val = attr
                            .decode_and_unescape_value(reader.decoder())
                            .unwrap_or_default()
                            .into_owned();
                        match key {
                            "name" => name = Some(val),
                            "value" => value = Some(val),
                            _ => {}
                        }
                    }
                    if let (Some(name), Some(value), Some(item)) = (name, value, current.as_mut()) {
                        item.apply_attr(&name, &value);
                    }
                } else if in_item {
                    text_target = TextTarget::from_tag(local);
                }
            }
            Event::Text(e) => {
                if let (Some(target), Some(item)) = (text_target, current.as_mut()) {
                    let text = e
                        .unescape()
                        .map_err(|err| IndexerError::Parse(err.to_string()))?
                        .into_owned();
                    item.apply_text(target, text);
                }
            }
            Event::End(e) => {
                let local = local_name(e.name().as_ref());
                if local == "item" {
                    if let Some(item) = current.take() {
                        items.push(item.into_newznab_item()?);
                    }
                    in_item = false;
                }
                text_target = None;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

fn local_name(qname: &[u8]) -> &str {
    let full = std::str::from_utf8(qname).unwrap_or("");
    full.rsplit(':').next().unwrap_or(full)
}

#[derive(Debug, Clone, Copy)]
enum TextTarget {
    Title,
    Link,
    PubDate,
}

impl TextTarget {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "title" => Some(TextTarget::Title),
            "link" => Some(TextTarget::Link),
            "pubDate" => Some(TextTarget::PubDate),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct PartialItem {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    size_bytes: Option<u64>,
    category: Option<String>,
    group: Option<String>,
}

impl PartialItem {
    fn apply_text(&mut self, target: TextTarget, text: String) {
        match target {
            TextTarget::Title => self.title = Some(text),
            TextTarget::Link => self.link = Some(text),
            TextTarget::PubDate => self.pub_date = Some(text),
        }
    }

    fn apply_attr(&mut self, name: &str, value: &str) {
        match name {
            "size" => self.size_bytes = value.parse().ok(),
            "category" => self.category = Some(value.to_string()),
            "group" => self.group = Some(value.to_string()),
            _ => {}
        }
    }

    fn into_newznab_item(self) -> Result<NewznabItem, IndexerError> {
        Ok(NewznabItem {
            title: self
                .title
                .ok_or_else(|| IndexerError::Parse("item missing <title>".to_string()))?,
            link: self
                .link
                .ok_or_else(|| IndexerError::Parse("item missing <link>".to_string()))?,
            pub_date: self.pub_date.as_deref().and_then(parse_pubdate),
            size_bytes: self.size_bytes,
            category: self.category,
            group: self.group,
        })
    }
}

fn parse_pubdate(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss><channel>
<item>
  <title>Formula.1.2025.Round03.Bahrain.Qualifying.1080p.x265-NTb</title>
  <link>https://indexer.example/nzb/abc123</link>
  <pubDate>Sat, 15 Mar 2025 16:45:00 +0000</pubDate>
  <newznab:attr name="size" value="2147483648"/>
  <newznab:attr name="category" value="5000"/>
  <newznab:attr name="group" value="NTb"/>
</item>
</channel></rss>"#;

    const JSON_BODY: &str = r#"{
      "channel": {
        "item": [
          {
            "title": "F1 2025 Bahrain Qualifying Preview 720p",
            "link": "https://indexer.example/nzb/def456",
            "pubDate": "2025-03-15T12:00:00Z",
            "size": 1073741824,
            "category": "5000"
          }
        ]
      }
    }"#;

    #[test]
    fn parses_xml_shape_with_newznab_attrs() {
        let items = parse_response(XML_BODY).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].size_bytes, Some(2147483648));
        assert_eq!(items[0].group.as_deref(), Some("NTb"));
        assert!(items[0].pub_date.is_some());
    }

    #[test]
    fn parses_json_shape() {
        let items = parse_response(JSON_BODY).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].size_bytes, Some(1073741824));
        assert_eq!(items[0].title, "F1 2025 Bahrain Qualifying Preview 720p");
    }

    #[test]
    fn rejects_item_missing_required_fields() {
        let bad = r#"<rss><channel><item><title>only a title</title></item></channel></rss>"#;
        assert!(parse_response(bad).is_err());
    }
}
