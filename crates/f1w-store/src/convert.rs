//! String/enum and timestamp conversions between Diesel row structs and
//! `f1w-core::model` domain types.

use chrono::{DateTime, NaiveDateTime, Utc};
use f1w_core::model::{
    DownloadHistoryStatus, DownloaderKind, EventType, IndexerKind, NotificationEventClass,
    NotificationKind, ScheduledSearchStatus,
};

pub fn to_naive(at: DateTime<Utc>) -> NaiveDateTime {
    at.naive_utc()
}

pub fn from_naive(at: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(at, Utc)
}

pub fn event_type_to_str(event_type: EventType) -> &'static str {
    event_type.tag()
}

pub fn event_type_from_str(raw: &str) -> EventType {
    EventType::from_tag(raw).unwrap_or(EventType::Other)
}

pub fn indexer_kind_to_str(kind: IndexerKind) -> &'static str {
    match kind {
        IndexerKind::Newznab => "newznab",
        IndexerKind::Hydra => "hydra",
        IndexerKind::Custom => "custom",
    }
}

pub fn indexer_kind_from_str(raw: &str) -> IndexerKind {
    match raw {
        "hydra" => IndexerKind::Hydra,
        "custom" => IndexerKind::Custom,
        _ => IndexerKind::Newznab,
    }
}

pub fn downloader_kind_to_str(kind: DownloaderKind) -> &'static str {
    match kind {
        DownloaderKind::Sab => "sab",
        DownloaderKind::Nzbg => "nzbg",
    }
}

pub fn downloader_kind_from_str(raw: &str) -> DownloaderKind {
    match raw {
        "nzbg" => DownloaderKind::Nzbg,
        _ => DownloaderKind::Sab,
    }
}

pub fn scheduled_status_to_str(status: ScheduledSearchStatus) -> &'static str {
    match status {
        ScheduledSearchStatus::Scheduled => "scheduled",
        ScheduledSearchStatus::Running => "running",
        ScheduledSearchStatus::WaitingDownload => "waiting_download",
        ScheduledSearchStatus::Completed => "completed",
        ScheduledSearchStatus::Failed => "failed",
        ScheduledSearchStatus::Paused => "paused",
    }
}

pub fn scheduled_status_from_str(raw: &str) -> ScheduledSearchStatus {
    match raw {
        "running" => ScheduledSearchStatus::Running,
        "waiting_download" => ScheduledSearchStatus::WaitingDownload,
        "completed" => ScheduledSearchStatus::Completed,
        "failed" => ScheduledSearchStatus::Failed,
        "paused" => ScheduledSearchStatus::Paused,
        _ => ScheduledSearchStatus::Scheduled,
    }
}

pub fn download_history_status_to_str(status: DownloadHistoryStatus) -> &'static str {
    match status {
        DownloadHistoryStatus::Sent => "sent",
        DownloadHistoryStatus::Downloading => "downloading",
        DownloadHistoryStatus::Completed => "completed",
        DownloadHistoryStatus::Failed => "failed",
    }
}

pub fn download_history_status_from_str(raw: &str) -> DownloadHistoryStatus {
    match raw {
        "downloading" => DownloadHistoryStatus::Downloading,
        "completed" => DownloadHistoryStatus::Completed,
        "failed" => DownloadHistoryStatus::Failed,
        _ => DownloadHistoryStatus::Sent,
    }
}

pub fn notification_kind_to_str(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Apprise => "apprise",
        NotificationKind::Webhook => "webhook",
    }
}

pub fn notification_kind_from_str(raw: &str) -> NotificationKind {
    match raw {
        "webhook" => NotificationKind::Webhook,
        _ => NotificationKind::Apprise,
    }
}

pub fn event_class_to_str(class: NotificationEventClass) -> &'static str {
    match class {
        NotificationEventClass::DownloadStart => "download_start",
        NotificationEventClass::DownloadComplete => "download_complete",
        NotificationEventClass::DownloadFail => "download_fail",
        NotificationEventClass::Test => "test",
    }
}

pub fn event_class_from_str(raw: &str) -> Option<NotificationEventClass> {
    match raw {
        "download_start" => Some(NotificationEventClass::DownloadStart),
        "download_complete" => Some(NotificationEventClass::DownloadComplete),
        "download_fail" => Some(NotificationEventClass::DownloadFail),
        "test" => Some(NotificationEventClass::Test),
        _ => None,
    }
}

pub fn join_csv(items: &[String]) -> String {
    items.join(",")
}

pub fn split_csv(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',').map(|s| s.to_string()).collect()
    }
}

pub fn join_event_mask(classes: &[NotificationEventClass]) -> String {
    classes
        .iter()
        .copied()
        .map(event_class_to_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn split_event_mask(raw: &str) -> Vec<NotificationEventClass> {
    split_csv(raw)
        .iter()
        .filter_map(|s| event_class_from_str(s))
        .collect()
}

pub fn join_event_allowlist(events: &[EventType]) -> String {
    events
        .iter()
        .copied()
        .map(event_type_to_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn split_event_allowlist(raw: &str) -> Vec<EventType> {
    split_csv(raw)
        .iter()
        .map(|s| event_type_from_str(s))
        .collect()
}
