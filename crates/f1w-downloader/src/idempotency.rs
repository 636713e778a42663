//! Adapter-level send dedupe (§4.6): a content hash of
//! `(downloader_id, nzb_url)`, with a 5-minute window. A repeat `Send`
//! within the window returns the prior `AcquisitionId` without re-POSTing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::adapter::AcquisitionId;

const WINDOW: Duration = Duration::from_secs(5 * 60);

fn content_hash(downloader_id: &str, nzb_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(downloader_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(nzb_url.as_bytes());
    hex::encode(hasher.finalize())
}

struct Entry {
    id: AcquisitionId,
    recorded_at: Instant,
}

/// Keyed by content hash of `(downloader_id, nzb_url)`. Shared by an
/// adapter instance across calls; entries older than the window are
/// treated as expired on lookup rather than proactively swept.
#[derive(Default)]
pub struct IdempotencyGuard {
    seen: Mutex<HashMap<String, Entry>>,
}

impl IdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the prior `AcquisitionId` if this `(downloader_id, nzb_url)`
    /// pair was recorded within the last 5 minutes.
    pub async fn lookup(&self, downloader_id: &str, nzb_url: &str) -> Option<AcquisitionId> {
        let key = content_hash(downloader_id, nzb_url);
        let mut seen = self.seen.lock().await;
        match seen.get(&key) {
            Some(entry) if entry.recorded_at.elapsed() < WINDOW => Some(entry.id.clone()),
            Some(_) => {
                seen.remove(&key);
                None
            }
            None => None,
        }
    }

    pub async fn record(&self, downloader_id: &str, nzb_url: &str, id: AcquisitionId) {
        let key = content_hash(downloader_id, nzb_url);
        self.seen.lock().await.insert(
            key,
            Entry {
                id,
                recorded_at: Instant::now(),
            },
        );
    }
}
