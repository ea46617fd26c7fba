//! Sync command - Synchronize targets with their public links
//!
//! Provides the `notesync sync` CLI command which:
//! 1. Loads configuration and the target catalog
//! 2. Expands the requested ids (groups sync their descendants)
//! 3. Runs a batch on the sync orchestrator, printing progress
//! 4. Writes every synced target back to the catalog as it completes
//!
//! Ctrl-C requests a stop; the target being fetched ends as "Stopped" and
//! the remaining ones are left untouched.

use std::path::Path;

use anyhow::{Context as _, Result};
use clap::Args;
use notesync_core::catalog::TargetCatalog;
use notesync_core::domain::{DownloadOptions, SyncTarget, TargetId};
use notesync_sync::{RunSummary, SyncEvent, SyncOrchestrator};
use tracing::{info, warn};

use super::{target_json, Context};
use crate::output::OutputFormatter;

/// Sync some or all targets
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Target or group ids (or id prefixes); all targets when omitted
    pub ids: Vec<String>,

    /// Sync every target
    #[arg(long, conflicts_with = "ids")]
    pub all: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let mut ws = ctx.workspace()?;

        let ids = if self.all || self.ids.is_empty() {
            ws.catalog.all_sync_ids()
        } else {
            let mut ids: Vec<TargetId> = Vec::new();
            for prefix in &self.ids {
                let id = ws.resolve(prefix)?;
                for sync_id in ws.catalog.sync_ids_for(&id) {
                    if !ids.contains(&sync_id) {
                        ids.push(sync_id);
                    }
                }
            }
            ids
        };

        let targets: Vec<SyncTarget> = ids
            .iter()
            .filter_map(|id| ws.catalog.find(id).cloned())
            .collect();
        if targets.is_empty() {
            formatter.info("Nothing to sync.");
            return Ok(());
        }

        let orchestrator = ws.orchestrator()?;
        let catalog_path = ws.store.catalog_path();
        let options = ws.config.download_options();
        let (summary, synced) = run_batch(
            &orchestrator,
            &mut ws.catalog,
            &catalog_path,
            targets,
            options,
            &*formatter,
        )
        .await?;

        if ctx.is_json() {
            let targets = synced
                .iter()
                .map(target_json)
                .collect::<Result<Vec<_>>>()?;
            formatter.print_json(&serde_json::json!({
                "updatedCount": summary.updated_count,
                "errorCount": summary.error_count,
                "stopped": summary.stopped,
                "message": summary.message(),
                "targets": targets,
            }));
        } else if summary.stopped || summary.error_count > 0 {
            formatter.warn(&summary.message());
        } else {
            formatter.success(&summary.message());
        }
        Ok(())
    }
}

/// Runs one batch to completion, writing each result into `catalog`
///
/// Ctrl-C cancels the batch; the function still waits for the final event
/// so the stopped target is written back.
///
/// # Returns
/// The run totals and the synced target records, in processing order
pub(crate) async fn run_batch(
    orchestrator: &SyncOrchestrator,
    catalog: &mut TargetCatalog,
    catalog_path: &Path,
    targets: Vec<SyncTarget>,
    options: DownloadOptions,
    formatter: &dyn OutputFormatter,
) -> Result<(RunSummary, Vec<SyncTarget>)> {
    let (handle, mut events) = orchestrator.start_batch(targets, options)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;
    let mut synced = Vec::new();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    SyncEvent::Precheck { index, total, target_id } => {
                        let title = catalog.find(&target_id).map(|t| t.title.as_str()).unwrap_or("?");
                        formatter.progress(&format!("Checking ({index}/{total}) {title}"));
                    }
                    SyncEvent::Progress { progress, .. } => {
                        let latest = progress
                            .latest_file
                            .as_ref()
                            .map(|f| format!(" {}", f.local_relative_path))
                            .unwrap_or_default();
                        formatter.progress(&format!(
                            "  {}/{}{latest}",
                            progress.processed_count, progress.total_count
                        ));
                    }
                    SyncEvent::Synced { target } => {
                        formatter.info(&format!("{}: {}", target.title, target.status));
                        catalog.replace(target.clone())?;
                        catalog.save(catalog_path)?;
                        synced.push(target);
                    }
                    SyncEvent::Finished(summary) => {
                        info!(message = %summary.message(), "Batch finished");
                    }
                }
            }
            _ = &mut ctrl_c, if !stopping => {
                stopping = true;
                warn!("Interrupt received, stopping sync");
                formatter.warn("Stopping after the current request...");
                orchestrator.cancel();
            }
        }
    }

    let summary = handle.await.context("Sync task failed")?;
    Ok((summary, synced))
}
