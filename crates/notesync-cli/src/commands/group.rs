//! Group command - Create a group for organizing targets

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{target_json, Context};

/// Add a group
#[derive(Debug, Args)]
pub struct GroupCommand {
    /// Group title
    pub title: String,

    /// Id (or id prefix) of the enclosing group
    #[arg(long)]
    pub parent: Option<String>,
}

impl GroupCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let mut ws = ctx.workspace()?;

        let parent = ws.resolve_parent(self.parent.as_deref())?;
        let group = ws.catalog.add_group(&self.title, parent)?.clone();
        ws.save_catalog()?;
        info!(target_id = %group.id, "Group added");

        if ctx.is_json() {
            formatter.print_json(&target_json(&group)?);
        } else {
            formatter.success(&format!("Added group \"{}\"", group.title));
            formatter.info(&format!("ID: {}", group.id));
        }
        Ok(())
    }
}
