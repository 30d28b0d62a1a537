pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod paths;
pub mod scheduler;
pub mod vault;

use std::sync::Arc;
use std::time::Duration;

use archive::Archiver;
use config::{ConfigStore, SharedConfig};
use db::Database;
use scheduler::{ScanContext, ScanScheduler};
use vault::FsVault;

/// Start the archive service and block until Ctrl+C.
pub fn run() {
    env_logger::init();

    let config = SharedConfig::load(ConfigStore::open_default());
    let settings = config.snapshot().settings;

    if !settings.vault_root.is_dir() {
        log::warn!(
            "Vault root {} is not a directory; every rule will be skipped until it exists",
            settings.vault_root.display()
        );
    }
    let vault = FsVault::new(&settings.vault_root);

    // The activity log is optional; archiving works without it
    let db = match Database::new() {
        Ok(db) => Some(Arc::new(db)),
        Err(e) => {
            log::warn!("Failed to open activity database, activity will not be recorded: {}", e);
            None
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return;
        }
    };

    runtime.block_on(async move {
        let ctx = ScanContext::new(Archiver::new(vault), config, db);
        let mut scheduler = ScanScheduler::start(
            ctx,
            Duration::from_secs(u64::from(settings.startup_delay_seconds)),
            Duration::from_secs(u64::from(settings.scan_interval_minutes.max(1)) * 60),
        );

        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
        }
        log::info!("Shutdown signal received, stopping archive scheduler");
        scheduler.stop().await;
    });
}
