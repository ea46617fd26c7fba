//! Edit command - Change a target's title, URL or parent
//!
//! A new URL invalidates everything mirrored from the old one, so the
//! target's local copy is deleted and its sync state reset.

use anyhow::{bail, Context as _, Result};
use clap::Args;
use notesync_core::catalog::TargetEdit;
use tracing::info;

use super::{target_json, Context};

/// Edit a target or group
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Target id or id prefix
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New source URL
    #[arg(long)]
    pub url: Option<String>,

    /// Move into this group
    #[arg(long, conflicts_with = "top_level")]
    pub parent: Option<String>,

    /// Move to the top level
    #[arg(long)]
    pub top_level: bool,
}

impl EditCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let mut ws = ctx.workspace()?;

        let id = ws.resolve(&self.id)?;
        let parent = if self.top_level {
            Some(None)
        } else {
            ws.resolve_parent(self.parent.as_deref())?.map(Some)
        };
        let edit = TargetEdit {
            title: self.title.clone(),
            url: self.url.clone(),
            parent,
        };
        if edit.title.is_none() && edit.url.is_none() && edit.parent.is_none() {
            bail!("Nothing to change. Pass --title, --url, --parent or --top-level");
        }

        let outcome = ws.catalog.edit(&id, edit)?;
        let target = ws.catalog.find(&id).cloned().context("Edited target vanished")?;
        if outcome.url_changed {
            ws.store
                .purge_target(&target)
                .await
                .context("Failed to remove the previous local copy")?;
            info!(target_id = %id, "Source URL changed, local copy removed");
        }
        ws.save_catalog()?;

        if ctx.is_json() {
            formatter.print_json(&target_json(&target)?);
        } else {
            formatter.success(&format!("Updated \"{}\"", target.title));
            formatter.info(&format!("Path:   {}", ws.catalog.display_path(&id)));
            if !target.is_group {
                formatter.info(&format!("Status: {}", target.status));
            }
            if outcome.url_changed {
                formatter.info("The previous local copy was removed.");
            }
        }
        Ok(())
    }
}
