//! Lookup from a stored `Downloader.id` to the live adapter instance.
//! `f1w-app` builds the concrete map at boot from `DownloaderRepo::list_all`
//! plus each row's `kind`; the scheduler only needs to resolve by id.

use std::collections::HashMap;
use std::sync::Arc;

use f1w_downloader::DownloaderAdapter;

pub trait DownloaderRegistry: Send + Sync {
    fn get(&self, downloader_id: i64) -> Option<Arc<dyn DownloaderAdapter>>;
}

#[derive(Default)]
pub struct InMemoryDownloaderRegistry {
    adapters: HashMap<i64, Arc<dyn DownloaderAdapter>>,
}

impl InMemoryDownloaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, downloader_id: i64, adapter: Arc<dyn DownloaderAdapter>) {
        self.adapters.insert(downloader_id, adapter);
    }
}

impl DownloaderRegistry for InMemoryDownloaderRegistry {
    fn get(&self, downloader_id: i64) -> Option<Arc<dyn DownloaderAdapter>> {
        self.adapters.get(&downloader_id).cloned()
    }
}
