//! Process entry point (§5 "Process model"): loads `WatcherConfig`, opens
//! the store, rebuilds the indexer/downloader adapter set from stored
//! entities, and runs the scheduler ticker until SIGINT/SIGTERM.

use std::sync::Arc;

use f1w_core::clock::SystemClock;
use f1w_core::config::WatcherConfig;
use f1w_core::model::DownloaderKind;
use f1w_downloader::{DownloaderAdapter, NzbgAdapter, SabAdapter};
use f1w_indexer::NewznabClient;
use f1w_notify::NotificationDispatcher;
use f1w_scheduler::{DownloaderRegistry, EntryRunner, InMemoryDownloaderRegistry, PollTask, SchedulerTicker};
use f1w_store::{DownloaderRepo, SettingsRepo, Store};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = WatcherConfig::from_env().map_err(|e| format!("configuration error: {e}"))?;
    f1w_core::logging::init(&config.log_level);

    tracing::info!(database_path = %config.database_path, "starting f1w");

    let store = Arc::new(Store::connect(&config.database_path)?);
    let settings = SettingsRepo::new(&store).get_or_init().await?;

    let notifier = Arc::new(NotificationDispatcher::new());
    let clock = Arc::new(SystemClock);

    let runner = Arc::new(EntryRunner {
        store: Arc::clone(&store),
        indexer_client: Arc::new(NewznabClient::new(
            config.global_concurrency,
            config.per_indexer_concurrency,
        )),
        downloaders: build_downloader_registry(&store)?,
        notifier: Arc::clone(&notifier),
        clock: clock.clone(),
        tick_interval: chrono::Duration::seconds(settings.scheduler_tick_seconds as i64),
        jitter_seconds: settings.jitter_seconds,
    });
    let poll_task = Arc::new(PollTask {
        store: Arc::clone(&store),
        downloaders: build_downloader_registry(&store)?,
        notifier,
        clock,
    });
    let ticker = Arc::new(SchedulerTicker {
        store: Arc::clone(&store),
        runner,
        poll_task,
    });

    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, stopping ticker");
        shutdown_cancel.cancel();
    });

    ticker.run(cancel).await;
    tracing::info!("f1w stopped");
    Ok(())
}

fn build_downloader_registry(store: &Store) -> Result<Arc<dyn DownloaderRegistry>, Box<dyn std::error::Error>> {
    let mut registry = InMemoryDownloaderRegistry::new();
    for downloader in DownloaderRepo::new(store).list_all()? {
        if !downloader.enabled {
            continue;
        }
        let adapter: Arc<dyn DownloaderAdapter> = match downloader.kind {
            DownloaderKind::Sab => Arc::new(SabAdapter::new(
                downloader.id.to_string(),
                downloader.base_url.clone(),
                downloader.api_key.clone(),
            )),
            DownloaderKind::Nzbg => Arc::new(NzbgAdapter::new(
                downloader.id.to_string(),
                downloader.base_url.clone(),
                downloader.api_key.clone(),
            )),
        };
        registry.insert(downloader.id, adapter);
    }
    Ok(Arc::new(registry))
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
