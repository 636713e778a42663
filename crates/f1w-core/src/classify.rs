//! Title classifier (§4.4 "Classification"). Pure, regex-driven, no I/O:
//! tokenizes a release title and extracts year/round/venue/session plus
//! release metadata (resolution/codec/group/HDR/size) used downstream by
//! the scorer and the canonical merge key.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::model::EventType;

static F1_TITLE_RE: OnceCell<Regex> = OnceCell::new();
static TV_STYLE_RE: OnceCell<Regex> = OnceCell::new();
static RESOLUTION_RE: OnceCell<Regex> = OnceCell::new();
static CODEC_RE: OnceCell<Regex> = OnceCell::new();
static HDR_RE: OnceCell<Regex> = OnceCell::new();
static GROUP_RE: OnceCell<Regex> = OnceCell::new();

fn f1_title_re() -> &'static Regex {
    F1_TITLE_RE.get_or_init(|| {
        Regex::new(
            r"(?i)formula\.?(?P<series>1)\.?(?P<year>\d{4})\.?(round)?(?P<round>\d{2})?\.?(?P<venue>[a-z.]+)?\.?(?P<session>race|qualifying|sprint|fp[123]|practice(?:\.one|\.two|\.three)?|preview|notebook)",
        )
        .unwrap()
    })
}

fn tv_style_re() -> &'static Regex {
    TV_STYLE_RE.get_or_init(|| Regex::new(r"(?i)s(?P<season>\d{4})e(?P<ep>\d{2,3})").unwrap())
}

fn resolution_re() -> &'static Regex {
    RESOLUTION_RE.get_or_init(|| Regex::new(r"(?i)(\d{3,4})p").unwrap())
}

fn codec_re() -> &'static Regex {
    CODEC_RE.get_or_init(|| Regex::new(r"(?i)(x264|x265|h\.?264|h\.?265|hevc|avc)").unwrap())
}

fn hdr_re() -> &'static Regex {
    HDR_RE.get_or_init(|| Regex::new(r"(?i)(hdr10?\+?|hlg)").unwrap())
}

fn group_re() -> &'static Regex {
    GROUP_RE.get_or_init(|| Regex::new(r"-([A-Za-z0-9]+)$").unwrap())
}

/// Structured facts extracted from a release title. `None` fields mean the
/// title didn't carry that signal, not that it was zero/absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedTitle {
    pub year: Option<i32>,
    pub round: Option<i32>,
    pub venue_token: Option<String>,
    pub session: EventType,
    pub resolution: Option<u32>,
    pub codec: Option<String>,
    pub is_hdr: bool,
    pub release_group: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Normalizes separators (`.`/`_` → space) so release-scene titles read as
/// plain words, then runs the F1-style and TV-style regexes.
pub fn classify_title(raw_title: &str) -> ClassifiedTitle {
    let normalized = raw_title.replace(['.', '_'], " ");

    let mut result = ClassifiedTitle {
        session: EventType::Other,
        ..Default::default()
    };

    if let Some(caps) = f1_title_re().captures(raw_title) {
        result.year = caps.name("year").and_then(|m| m.as_str().parse().ok());
        result.round = caps.name("round").and_then(|m| m.as_str().parse().ok());
        result.venue_token = caps
            .name("venue")
            .map(|m| m.as_str().trim_matches('.').to_lowercase());
        if let Some(session) = caps.name("session") {
            result.session = canonicalize_session(session.as_str());
        }
    } else if let Some(caps) = tv_style_re().captures(raw_title) {
        result.year = caps.name("season").and_then(|m| m.as_str().parse().ok());
        result.round = caps.name("ep").and_then(|m| m.as_str().parse().ok());
    }

    result.resolution = resolution_re()
        .captures(&normalized)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    result.codec = codec_re()
        .captures(&normalized)
        .map(|c| c.get(1).unwrap().as_str().to_lowercase());

    result.is_hdr = hdr_re().is_match(&normalized);

    result.release_group = group_re()
        .captures(raw_title.trim())
        .map(|c| c.get(1).unwrap().as_str().to_string());

    result
}

fn canonicalize_session(token: &str) -> EventType {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "race" => EventType::Race,
        "qualifying" => EventType::Qualifying,
        "sprint" => EventType::Sprint,
        "fp1" => EventType::FP1,
        "fp2" => EventType::FP2,
        "fp3" => EventType::FP3,
        s if s.starts_with("practice.one") => EventType::FP1,
        s if s.starts_with("practice.two") => EventType::FP2,
        s if s.starts_with("practice.three") => EventType::FP3,
        "practice" => EventType::Other,
        "preview" | "notebook" => EventType::Other,
        _ => EventType::Other,
    }
}

/// `true` when the title was classified as a Preview/Notebook but the caller
/// asked for a "real" session (§4.4 scoring row, the −20 signal).
pub fn is_preview_or_notebook(raw_title: &str) -> bool {
    raw_title.to_lowercase().contains("preview") || raw_title.to_lowercase().contains("notebook")
}

/// Canonical merge key: identical-keyed candidates across queries/indexers
/// are merged, keeping the highest score and pooling source indexer names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalKey {
    pub year: Option<i32>,
    pub round: Option<i32>,
    pub session: EventType,
    pub venue: Option<String>,
    pub resolution: Option<u32>,
    pub codec: Option<String>,
    pub group: Option<String>,
    pub size_bucket: Option<u64>,
}

/// Buckets size into coarse ~100 MiB increments so near-identical uploads
/// from different indexers collapse into one candidate.
const SIZE_BUCKET_BYTES: u64 = 100 * 1024 * 1024;

impl ClassifiedTitle {
    pub fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey {
            year: self.year,
            round: self.round,
            session: self.session,
            venue: self.venue_token.clone(),
            resolution: self.resolution,
            codec: self.codec.clone(),
            group: self.release_group.clone(),
            size_bucket: self.size_bytes.map(|b| b / SIZE_BUCKET_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_dotted_release_title() {
        let c = classify_title("Formula.1.2025.Round03.Bahrain.Qualifying.1080p.x265-NTb");
        assert_eq!(c.year, Some(2025));
        assert_eq!(c.round, Some(3));
        assert_eq!(c.session, EventType::Qualifying);
        assert_eq!(c.resolution, Some(1080));
        assert_eq!(c.codec.as_deref(), Some("x265"));
        assert_eq!(c.release_group.as_deref(), Some("NTb"));
        assert!(!c.is_hdr);
    }

    #[test]
    fn classifies_spaced_preview_title() {
        let c = classify_title("F1 2025 Bahrain Qualifying Preview 720p");
        assert!(is_preview_or_notebook("F1 2025 Bahrain Qualifying Preview 720p"));
        assert_eq!(c.resolution, Some(720));
    }

    #[test]
    fn detects_hdr_marker() {
        let c = classify_title("Formula.1.2025.Round05.Miami.Race.2160p.HDR10.x265-GROUP");
        assert!(c.is_hdr);
        assert_eq!(c.resolution, Some(2160));
    }

    #[test]
    fn tv_style_title_extracts_season_and_episode() {
        let c = classify_title("Formula1.2025.S2025E03.1080p.WEB.x264-GROUP");
        assert_eq!(c.year, Some(2025));
        assert_eq!(c.round, Some(3));
    }

    #[test]
    fn unrelated_title_classifies_as_other() {
        let c = classify_title("Some Unrelated Show S01E02 1080p");
        assert_eq!(c.session, EventType::Other);
    }

    #[test]
    fn canonical_key_merges_on_identical_signals() {
        let a = classify_title("Formula.1.2025.Round03.Bahrain.Qualifying.1080p.x265-NTb");
        let b = classify_title("Formula.1.2025.Round03.Bahrain.Qualifying.1080p.x265-OTHER");
        // Different release groups still differ because group is part of the key.
        assert_ne!(a.canonical_key(), b.canonical_key());
        let c = classify_title("Formula.1.2025.Round03.Bahrain.Qualifying.1080p.x265-NTb");
        assert_eq!(a.canonical_key(), c.canonical_key());
    }
}
