//! Remove command - Delete a target and its local copy

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use super::Context;

/// Remove a target or an empty group
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Target id or id prefix
    pub id: String,
}

impl RemoveCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let mut ws = ctx.workspace()?;

        let id = ws.resolve(&self.id)?;
        let removed = ws.catalog.remove(&id)?;
        if !removed.is_group {
            ws.store
                .purge_target(&removed)
                .await
                .context("Failed to remove local copy")?;
        }
        ws.save_catalog()?;
        info!(target_id = %id, "Target removed");

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "removed": removed.id.to_string(),
                "title": removed.title,
            }));
        } else {
            formatter.success(&format!("Removed \"{}\"", removed.title));
        }
        Ok(())
    }
}
