//! Scheduler / rules engine (C9) and operator surface (C11): the ticker
//! that selects due watches and runs them against the indexer/downloader/
//! notification seams, plus the trait an application front drives to
//! manage watches, seasons, settings, and entity CRUD.

pub mod cadence;
pub mod operator;
pub mod poll;
pub mod registry;
pub mod run;
pub mod ticker;

pub use cadence::CadenceWindow;
pub use operator::{DefaultOperatorService, ManualSearchResult, OperatorService};
pub use poll::PollTask;
pub use registry::{DownloaderRegistry, InMemoryDownloaderRegistry};
pub use run::{EntryRunner, RunOutcome};
pub use ticker::SchedulerTicker;
