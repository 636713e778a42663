//! Downloader adapter set (C7, §4.6): a uniform `Send`/`Status`/`Test`
//! contract over SAB-style GET APIs and NZBGet-style JSON-RPC, with
//! adapter-level send idempotency.

pub use f1w_core::error::DownloaderError;

pub mod adapter;
pub mod idempotency;
pub mod nzbg;
pub mod sab;

pub use adapter::{AcquisitionId, DownloadStatus, DownloaderAdapter};
pub use nzbg::NzbgAdapter;
pub use sab::SabAdapter;
