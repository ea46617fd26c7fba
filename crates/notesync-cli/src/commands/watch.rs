//! Watch command - Run the auto-sync scheduler in the foreground
//!
//! Every tick the scheduler checks whether the check interval has elapsed
//! since the last completed run; when it has, all targets are synced. The
//! catalog is reloaded before each run so edits made meanwhile with other
//! commands are picked up.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use notesync_core::catalog::TargetCatalog;
use notesync_core::config::MIN_CHECK_INTERVAL_MINUTES;
use notesync_core::domain::{DownloadOptions, SyncTarget};
use notesync_sync::{AutoSyncScheduler, LocalStore, SyncOrchestrator};
use tracing::{info, warn};

use super::sync::run_batch;
use super::Context;
use crate::output::OutputFormatter;

/// Sync periodically until interrupted
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Minutes between runs; overrides schedule.check_interval_minutes
    #[arg(long)]
    pub interval: Option<u64>,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let ws = ctx.workspace()?;

        let interval = match self.interval {
            Some(minutes) => Duration::from_secs(minutes.max(MIN_CHECK_INTERVAL_MINUTES) * 60),
            None => ws.config.check_interval(),
        };
        if !ws.config.schedule.auto_sync && self.interval.is_none() {
            formatter.warn("schedule.auto_sync is off in the configuration; watching anyway");
        }

        let orchestrator = ws.orchestrator()?;
        let options = ws.config.download_options();
        let store = ws.store.clone();
        let format = ctx.format();

        let mut scheduler = AutoSyncScheduler::new(interval);
        let stop = scheduler.cancellation_token();
        let interrupt = orchestrator.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
                stop.cancel();
            }
        });

        formatter.success(&format!(
            "Watching, syncing every {} minutes (Ctrl-C to stop)",
            interval.as_secs() / 60
        ));

        scheduler
            .run(|| {
                let orchestrator = orchestrator.clone();
                let store = store.clone();
                async move {
                    let formatter = format.formatter();
                    match sync_all(&orchestrator, &store, options, &*formatter).await {
                        Ok(ran) => ran,
                        Err(e) => {
                            warn!(error = %e, "Auto-sync run failed");
                            formatter.error(&format!("{e:#}"));
                            false
                        }
                    }
                }
            })
            .await;

        formatter.info("Stopped watching.");
        Ok(())
    }
}

/// One scheduled run over every target
///
/// # Returns
/// `false` when nothing ran (busy orchestrator or no targets)
async fn sync_all(
    orchestrator: &SyncOrchestrator,
    store: &LocalStore,
    options: DownloadOptions,
    formatter: &dyn OutputFormatter,
) -> Result<bool> {
    if orchestrator.is_running() {
        return Ok(false);
    }

    let catalog_path = store.catalog_path();
    let mut catalog = TargetCatalog::load(&catalog_path)?;
    let targets: Vec<SyncTarget> = catalog
        .all_sync_ids()
        .iter()
        .filter_map(|id| catalog.find(id).cloned())
        .collect();
    if targets.is_empty() {
        return Ok(false);
    }

    info!(targets = targets.len(), "Auto-sync started");
    let (summary, _) = run_batch(
        orchestrator,
        &mut catalog,
        &catalog_path,
        targets,
        options,
        formatter,
    )
    .await?;

    formatter.success(&summary.message());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use notesync_core::config::NetworkConfig;
    use notesync_fetch::PublicLinkSource;

    #[tokio::test]
    async fn test_sync_all_with_empty_catalog_does_not_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        let source = PublicLinkSource::new(&NetworkConfig::default()).unwrap();
        let orchestrator = SyncOrchestrator::new(Arc::new(source), store.clone());
        let formatter = crate::output::OutputFormat::Json.formatter();

        let ran = sync_all(&orchestrator, &store, DownloadOptions::default(), &*formatter)
            .await
            .unwrap();
        assert!(!ran);
        assert!(!orchestrator.is_running());
    }
}
