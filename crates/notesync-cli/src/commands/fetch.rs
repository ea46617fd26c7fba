//! Fetch command - Download one file of a folder target
//!
//! Restores a listed file whose local copy is missing, for example one
//! skipped by the size or video policy during `notesync sync`. Only Yandex
//! Disk folder targets support this.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{ctrl_c_token, target_json, Context};

/// Download a single listed file
#[derive(Debug, Args)]
pub struct FetchCommand {
    /// Target id or id prefix
    pub id: String,

    /// Local relative path of the file, as shown by `notesync show`
    pub path: String,
}

impl FetchCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let mut ws = ctx.workspace()?;

        let target = ws.target(&self.id)?.clone();
        let orchestrator = ws.orchestrator()?;
        let cancel = ctrl_c_token();

        formatter.progress(&format!("Downloading {}", self.path));
        let updated = orchestrator
            .download_missing_file(&target, &self.path, &cancel)
            .await?;
        let local = ws.store.source_file_path(&updated, &self.path);

        ws.catalog.replace(updated.clone())?;
        ws.save_catalog()?;
        info!(target_id = %updated.id, path = %self.path, "File fetched");

        if ctx.is_json() {
            let mut json = target_json(&updated)?;
            json["localPath"] = local.display().to_string().into();
            formatter.print_json(&json);
        } else {
            formatter.success(&updated.status);
            formatter.info(&format!("Saved to {}", local.display()));
        }
        Ok(())
    }
}
