//! waitlist-sync - keeps a local waitlist replica in step with the server.
//!
//! Runs a single pass and prints the settled entries, or keeps syncing on
//! an interval when `WAITLIST_SYNC_INTERVAL_SECS` is set.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waitlist_client::{CollectionKey, Config, FileStore, HttpRemote, SyncService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waitlist_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        server_url = %config.server_url,
        queue_id = config.queue_id,
        store_path = %config.store_path.display(),
        "starting waitlist sync"
    );

    let local = Arc::new(FileStore::open(&config.store_path).await?);
    let remote = Arc::new(HttpRemote::from_config(&config)?);
    if !remote.is_alive().await {
        tracing::warn!(server_url = %config.server_url, "server not reachable, working offline");
    }

    let service = SyncService::new(local, remote).with_tolerance_ms(config.sync_tolerance_ms);
    let key = CollectionKey::entries(config.queue_id);

    let Some(period) = config.sync_interval else {
        let entries = service.read_collection(&key).await?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    };

    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match service.read_collection(&key).await {
                    Ok(entries) => tracing::info!(collection = %key, entries = entries.len(), "entries synced"),
                    Err(e) => tracing::error!(collection = %key, code = %e.code(), error = %e, "sync failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
