//! Schedule metadata importer (C3). Treats the schedule-metadata service as
//! the opaque `fetchSeason(year) -> Season` collaborator spec.md names, and
//! owns only the merge-into-the-store logic plus a tolerant wire parser for
//! the documented provider shape (§6).

pub mod client;
pub mod merge;
pub mod payload;

pub use client::{HttpSchedulingProvider, ProviderError, ProviderSeason, SchedulingProvider, StaticProvider};
pub use merge::{RefreshSummary, SeasonImporter};
