use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::archive::{Archiver, ScanReport};
use crate::config::{AppConfig, SharedConfig};
use crate::db::{Database, NewActivity};
use crate::vault::Vault;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything a scheduled scan needs.
pub struct ScanContext<V> {
    pub archiver: Arc<Archiver<V>>,
    pub config: SharedConfig,
    /// Activity log; scans still run without one
    pub db: Option<Arc<Database>>,
}

impl<V> Clone for ScanContext<V> {
    fn clone(&self) -> Self {
        Self {
            archiver: self.archiver.clone(),
            config: self.config.clone(),
            db: self.db.clone(),
        }
    }
}

impl<V: Vault + 'static> ScanContext<V> {
    pub fn new(archiver: Archiver<V>, config: SharedConfig, db: Option<Arc<Database>>) -> Self {
        Self {
            archiver: Arc::new(archiver),
            config,
            db,
        }
    }
}

/// Run one scan against a fresh config snapshot, then record activity and
/// prune old log rows. Returns `None` if the scan task itself died.
pub async fn run_scan<V: Vault + 'static>(ctx: &ScanContext<V>) -> Option<ScanReport> {
    let ctx = ctx.clone();
    let result = tokio::task::spawn_blocking(move || {
        let config = ctx.config.snapshot();
        let report = ctx.archiver.scan(&config.rules);
        if let Some(db) = &ctx.db {
            record_activity(db, &report);
            run_scheduled_cleanup(&config, db);
        }
        report
    })
    .await;

    match result {
        Ok(report) => Some(report),
        Err(e) => {
            log::error!("Archive scan task failed: {}", e);
            None
        }
    }
}

fn record_activity(db: &Database, report: &ScanReport) {
    let now_str = Utc::now().format(TIMESTAMP_FORMAT).to_string();

    for record in &report.archived {
        let mut notes = Vec::new();
        if record.replaced_existing {
            notes.push("replaced existing file".to_string());
        }
        if !record.copied {
            notes.push("destination was recreated during the move".to_string());
        }
        if !record.pruned_folders.is_empty() {
            notes.push(format!("removed empty folders: {}", record.pruned_folders.join(", ")));
        }
        let details = (!notes.is_empty()).then(|| notes.join("; "));

        if let Err(e) = db.insert_activity(NewActivity {
            file_path: &record.source_path,
            file_name: &record.file_name,
            action: "archived",
            rule_name: Some(&record.rule_name),
            destination: Some(&record.destination),
            timestamp: &now_str,
            result: "success",
            details: details.as_deref(),
        }) {
            log::warn!("Failed to log activity for {}: {}", record.source_path, e);
        }
    }

    for failure in &report.failures {
        if let Err(e) = db.insert_activity(NewActivity {
            file_path: &failure.path,
            file_name: &failure.file_name,
            action: "archive",
            rule_name: Some(&failure.rule_name),
            destination: None,
            timestamp: &now_str,
            result: "error",
            details: Some(&failure.error),
        }) {
            log::warn!("Failed to log activity for {}: {}", failure.path, e);
        }
    }
}

/// Prune activity rows older than the retention setting.
pub fn run_scheduled_cleanup(config: &AppConfig, db: &Database) {
    let retention_days = config.settings.log_retention_days;
    if retention_days == 0 {
        return;
    }

    let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
    let cutoff_str = cutoff.format(TIMESTAMP_FORMAT).to_string();
    match db.prune_old_logs(&cutoff_str) {
        Ok(pruned) if pruned > 0 => log::info!("Pruned {} activity log entries", pruned),
        Ok(_) => {}
        Err(e) => log::warn!("Failed to prune activity log: {}", e),
    }
}

/// Drives scans: one after a startup delay, then one per interval.
///
/// Both timers live in a single task, so stopping the scheduler cancels
/// them together. A scan in progress always runs to completion.
pub struct ScanScheduler {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScanScheduler {
    /// Must be called from within a tokio runtime.
    pub fn start<V: Vault + 'static>(
        ctx: ScanContext<V>,
        startup_delay: Duration,
        interval: Duration,
    ) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            log::info!(
                "Archive scheduler started (first scan in {:?}, then every {:?})",
                startup_delay,
                interval
            );

            tokio::select! {
                _ = tokio::time::sleep(startup_delay) => {
                    run_scan(&ctx).await;
                }
                _ = &mut shutdown_rx => {
                    log::info!("Archive scheduler stopped before the first scan");
                    return;
                }
            }

            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_scan(&ctx).await;
                    }
                    _ = &mut shutdown_rx => break,
                }
            }

            log::info!("Archive scheduler stopped");
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal shutdown and wait for the task (and any scan in flight) to end.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Archive scheduler task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
