pub mod cached_search;
pub mod download_history;
pub mod downloader;
pub mod event;
pub mod indexer;
pub mod notification_target;
pub mod round;
pub mod scheduled_search;
pub mod season;
pub mod settings;

pub use cached_search::{CacheLookup, CachedSearchRepo};
pub use download_history::DownloadHistoryRepo;
pub use downloader::DownloaderRepo;
pub use event::EventRepo;
pub use indexer::IndexerRepo;
pub use notification_target::NotificationTargetRepo;
pub use round::RoundRepo;
pub use scheduled_search::ScheduledSearchRepo;
pub use season::SeasonRepo;
pub use settings::SettingsRepo;
