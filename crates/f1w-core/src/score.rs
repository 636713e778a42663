//! Scorer (§4.4 "Scoring"/"Tie-break"/"Hard filters"). Pure: given a
//! classified title and the request context (expected year/round/session
//! plus the operative `Settings`), produces an additive integer score with
//! a `reasons[]` trail, and a hard-filter verdict for auto-grab eligibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{is_preview_or_notebook, ClassifiedTitle};
use crate::model::EventType;

#[derive(Debug, Clone)]
pub struct ScoreContext<'a> {
    pub expected_year: i32,
    pub expected_round: i32,
    pub requested_session: EventType,
    pub preferred_groups: &'a [String],
    pub preferred_codecs: &'a [String],
    pub min_resolution: u32,
    pub max_resolution: u32,
    pub allow_hdr: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub score: i32,
    pub reasons: Vec<String>,
    pub hard_mismatch: bool,
    pub pubdate: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
}

/// Scores one classified title against the request context. `raw_title` is
/// passed separately from `classified` because the Preview/Notebook signal
/// is a raw substring check (§4.4), not part of `ClassifiedTitle`.
pub fn score_candidate(
    raw_title: &str,
    classified: &ClassifiedTitle,
    ctx: &ScoreContext,
    pubdate: Option<DateTime<Utc>>,
    size_bytes: Option<u64>,
) -> ScoredCandidate {
    let mut score = 0i32;
    let mut reasons = Vec::new();
    let mut hard_mismatch = false;

    match classified.year {
        Some(y) if y == ctx.expected_year => {
            score += 40;
            reasons.push("year matches".to_string());
        }
        Some(_) => {
            score -= 40;
            reasons.push("year mismatch".to_string());
            hard_mismatch = true;
        }
        None => {}
    }

    match classified.round {
        Some(r) if r == ctx.expected_round => {
            score += 35;
            reasons.push("round matches".to_string());
        }
        Some(_) => {
            score -= 40;
            reasons.push("round mismatch".to_string());
            hard_mismatch = true;
        }
        None => {}
    }

    if classified.session == ctx.requested_session {
        score += 25;
        reasons.push("session matches".to_string());
    }

    if classified.venue_token.is_some() {
        score += 15;
        reasons.push("venue token matches".to_string());
    }

    if is_preview_or_notebook(raw_title)
        && matches!(
            ctx.requested_session,
            EventType::Race
                | EventType::Qualifying
                | EventType::Sprint
                | EventType::FP1
                | EventType::FP2
                | EventType::FP3
        )
    {
        score -= 20;
        reasons.push("classified as Preview/Notebook when a session was requested".to_string());
    }

    if let Some(group) = &classified.release_group {
        if ctx
            .preferred_groups
            .iter()
            .any(|g| g.eq_ignore_ascii_case(group))
        {
            score += 10;
            reasons.push("release group preferred".to_string());
        }
    }

    let within_resolution = classified
        .resolution
        .map(|r| r >= ctx.min_resolution && r <= ctx.max_resolution)
        .unwrap_or(false);

    if let Some(codec) = &classified.codec {
        if ctx
            .preferred_codecs
            .iter()
            .any(|c| c.eq_ignore_ascii_case(codec))
            && within_resolution
        {
            score += 5;
            reasons.push("codec preferred and within resolution bounds".to_string());
        }
    }

    if classified.is_hdr && !ctx.allow_hdr {
        score -= 25;
        reasons.push("HDR present but disallowed".to_string());
    }

    if classified.resolution.is_some() && !within_resolution {
        score -= 30;
        reasons.push("resolution outside configured bounds".to_string());
    }

    ScoredCandidate {
        score,
        reasons,
        hard_mismatch,
        pubdate,
        size_bytes,
    }
}

/// Picks the winner among equally-scored candidates (§4.4 "Tie-break"):
/// preferred resolution > preferred codec > newer pubdate > smaller size
/// deviation from the median of equally-keyed releases. `candidates` must
/// already share the top score; `median_size` is the size-bucket median.
pub fn tie_break<'a>(
    candidates: &'a [(ScoredCandidate, &'a ClassifiedTitle)],
    ctx: &ScoreContext,
    median_size: Option<u64>,
) -> Option<&'a (ScoredCandidate, &'a ClassifiedTitle)> {
    candidates.iter().max_by_key(|(scored, classified)| {
        let resolution_rank = resolution_rank(classified, ctx);
        let codec_rank = codec_rank(classified, ctx);
        let pubdate_rank = scored.pubdate.map(|d| d.timestamp()).unwrap_or(i64::MIN);
        let size_closeness = size_closeness(scored.size_bytes, median_size);
        (resolution_rank, codec_rank, pubdate_rank, size_closeness)
    })
}

fn resolution_rank(c: &ClassifiedTitle, ctx: &ScoreContext) -> u8 {
    match c.resolution {
        Some(r) if r >= ctx.min_resolution && r <= ctx.max_resolution => 1,
        _ => 0,
    }
}

fn codec_rank(c: &ClassifiedTitle, ctx: &ScoreContext) -> u8 {
    match &c.codec {
        Some(codec) if ctx.preferred_codecs.iter().any(|p| p.eq_ignore_ascii_case(codec)) => 1,
        _ => 0,
    }
}

/// Negative absolute deviation from the median size bucket, so "closer to
/// the median" sorts higher under `max_by_key`.
fn size_closeness(size_bytes: Option<u64>, median: Option<u64>) -> i64 {
    match (size_bytes, median) {
        (Some(size), Some(median)) => -(size as i64 - median as i64).abs(),
        _ => 0,
    }
}
