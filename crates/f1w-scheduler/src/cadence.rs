//! Pure cadence math (§4.9 "Cadence"): given a session's `start_time_utc`
//! and the operative `Settings`, decides which window an entry is in and
//! what its next run time should be. No I/O, no clock reads — `now` is
//! always passed in so scheduler tests can drive it with `FixedClock`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use f1w_core::model::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceWindow {
    /// Session start is unknown; re-check on the decay cadence until the
    /// provider fills it in.
    Unscheduled,
    /// Before `start + 30 min`: a single gated first search.
    Gated,
    /// `start + 30 min .. start + aggressive_window_h`: every tick.
    Aggressive,
    /// After the aggressive window, before `stop_after_days`: every
    /// `decay_interval_h`.
    Decay,
    /// `stop_after_days` since `start` has elapsed.
    Expired,
}

pub fn classify_window(now: DateTime<Utc>, start: Option<DateTime<Utc>>, settings: &Settings) -> CadenceWindow {
    let Some(start) = start else {
        return CadenceWindow::Unscheduled;
    };

    if now >= start + ChronoDuration::days(settings.stop_after_days) {
        return CadenceWindow::Expired;
    }
    if now < start + ChronoDuration::minutes(30) {
        return CadenceWindow::Gated;
    }
    if now < start + ChronoDuration::hours(settings.aggressive_window_h) {
        return CadenceWindow::Aggressive;
    }
    CadenceWindow::Decay
}

/// The next `next_run_at` to write after a search that found nothing
/// acceptable, given the window the entry was in at search time. `jitter`
/// is a signed offset in seconds, applied uniformly within
/// `±settings.jitter_seconds` by the caller (the ticker, which owns the RNG)
/// so this function stays pure and deterministic under test.
pub fn next_run_after_search(
    now: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    settings: &Settings,
    tick_interval: ChronoDuration,
    jitter: i64,
) -> DateTime<Utc> {
    let base = match classify_window(now, start, settings) {
        CadenceWindow::Unscheduled => now + ChronoDuration::hours(settings.decay_interval_h),
        CadenceWindow::Gated => start.unwrap() + ChronoDuration::minutes(30),
        CadenceWindow::Aggressive => now + tick_interval,
        CadenceWindow::Decay => now + ChronoDuration::hours(settings.decay_interval_h),
        CadenceWindow::Expired => now,
    };
    base + ChronoDuration::seconds(jitter)
}

/// §8 property 5 (`S5`): a failed post-send poll returns the entry to
/// `Scheduled` with a flat 1h cooldown, not the aggressive/decay cadence
/// (Open Question (ii)).
pub fn next_run_after_download_failure(now: DateTime<Utc>) -> DateTime<Utc> {
    now + ChronoDuration::hours(1)
}

/// Exponential cooldown for a transient search-time failure, capped at the
/// decay window (§4.9 "Failure semantics").
pub fn next_run_after_transient_failure(now: DateTime<Utc>, attempts: i32, settings: &Settings) -> DateTime<Utc> {
    let minutes = 2i64.saturating_pow(attempts.max(0) as u32).min(settings.decay_interval_h * 60);
    now + ChronoDuration::minutes(minutes)
}
