//! Error taxonomy shared by every crate in the workspace.
//!
//! Component crates (`f1w-indexer`, `f1w-downloader`, `f1w-notify`, ...) keep
//! their own small error enums for extra detail and convert into
//! [`WatcherError`] at the boundary, keeping transport-level errors
//! separate from the scheduler-level error.

use thiserror::Error;

/// Coarse classification used by the scheduler to decide whether a failure
/// should be retried (cooldown + reschedule) or is terminal (`Failed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Worth retrying after a backoff.
    Transient,
    /// Will never succeed without operator intervention.
    Permanent,
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("schedule provider error: {message}")]
    Provider { message: String, retryable: bool },

    #[error("indexer error: {0}")]
    Indexer(#[from] IndexerError),

    #[error("downloader error: {0}")]
    Downloader(#[from] DownloaderError),

    #[error("notification error: {message}")]
    Notification { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("state conflict: {message}")]
    StateConflict { message: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("database error: {message}")]
    Database { message: String },
}

impl WatcherError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WatcherError::Provider { retryable, .. } => {
                if *retryable {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Permanent
                }
            }
            WatcherError::Indexer(e) => e.category(),
            WatcherError::Downloader(e) => e.category(),
            WatcherError::Database { .. } => ErrorCategory::Transient,
            WatcherError::Notification { .. } => ErrorCategory::Transient,
            WatcherError::Configuration { .. }
            | WatcherError::NotFound { .. }
            | WatcherError::StateConflict { .. }
            | WatcherError::Validation { .. } => ErrorCategory::Permanent,
        }
    }

    pub fn retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        WatcherError::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        WatcherError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        WatcherError::StateConflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        WatcherError::Validation {
            message: message.into(),
        }
    }
}

#[cfg(feature = "diesel-types")]
impl From<diesel::result::Error> for WatcherError {
    fn from(e: diesel::result::Error) -> Self {
        WatcherError::Database {
            message: e.to_string(),
        }
    }
}

/// Errors from a Newznab-compatible indexer call.
#[derive(Debug, Error, Clone)]
pub enum IndexerError {
    #[error("indexer rejected credentials")]
    AuthRejected,
    #[error("indexer rate limited the request")]
    RateLimited,
    #[error("indexer unavailable: {0}")]
    Unavailable(String),
    #[error("bad request to indexer: {0}")]
    BadRequest(String),
    #[error("failed to parse indexer response: {0}")]
    Parse(String),
}

impl IndexerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IndexerError::AuthRejected
            | IndexerError::RateLimited
            | IndexerError::Unavailable(_) => ErrorCategory::Transient,
            IndexerError::BadRequest(_) | IndexerError::Parse(_) => ErrorCategory::Permanent,
        }
    }
}

/// Errors from a downloader adapter (SAB-style or NZBGet-style).
#[derive(Debug, Error, Clone)]
pub enum DownloaderError {
    #[error("downloader rejected credentials")]
    AuthRejected,
    #[error("downloader unavailable: {0}")]
    Unavailable(String),
    #[error("downloader rejected the submission: {0}")]
    Rejected(String),
    #[error("downloader reported an invalid category: {0}")]
    BadCategory(String),
    #[error("unknown downloader error: {0}")]
    Unknown(String),
}

impl DownloaderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DownloaderError::Unavailable(_) | DownloaderError::Unknown(_) => {
                ErrorCategory::Transient
            }
            DownloaderError::AuthRejected
            | DownloaderError::Rejected(_)
            | DownloaderError::BadCategory(_) => ErrorCategory::Permanent,
        }
    }
}

pub type WatcherResult<T> = Result<T, WatcherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_retryable_follows_flag() {
        let transient = WatcherError::Provider {
            message: "timeout".into(),
            retryable: true,
        };
        assert!(transient.retryable());

        let permanent = WatcherError::Provider {
            message: "bad request".into(),
            retryable: false,
        };
        assert!(!permanent.retryable());
    }

    #[test]
    fn indexer_auth_and_rate_limit_are_transient() {
        assert_eq!(IndexerError::AuthRejected.category(), ErrorCategory::Transient);
        assert_eq!(IndexerError::RateLimited.category(), ErrorCategory::Transient);
        assert_eq!(
            IndexerError::BadRequest("x".into()).category(),
            ErrorCategory::Permanent
        );
    }

    #[test]
    fn downloader_unavailable_and_unknown_are_transient() {
        assert_eq!(
            DownloaderError::Unavailable("down".into()).category(),
            ErrorCategory::Transient
        );
        assert_eq!(
            DownloaderError::Unknown("?".into()).category(),
            ErrorCategory::Transient
        );
        assert_eq!(
            DownloaderError::AuthRejected.category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            DownloaderError::Rejected("no".into()).category(),
            ErrorCategory::Permanent
        );
    }

    #[test]
    fn validation_and_not_found_are_permanent() {
        assert_eq!(
            WatcherError::validation("bad input").category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            WatcherError::not_found("Season", "2099").category(),
            ErrorCategory::Permanent
        );
    }
}
