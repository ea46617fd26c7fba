//! List command - Print the target tree

use anyhow::Result;
use clap::Args;
use notesync_core::domain::{SourceType, SyncTarget};

use super::{plural, Context};

/// List all targets
#[derive(Debug, Args)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let ws = ctx.workspace()?;
        let rows = ws.catalog.flatten();

        if ctx.is_json() {
            let items: Vec<serde_json::Value> = rows
                .iter()
                .map(|(target, depth)| {
                    serde_json::json!({
                        "id": target.id.to_string(),
                        "title": target.title,
                        "depth": depth,
                        "isGroup": target.is_group,
                        "parentId": target.parent_id.map(|p| p.to_string()),
                        "status": target.status,
                        "sourceType": target.source_type,
                        "lastUpdatedAt": target.last_updated_at,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::Value::Array(items));
            return Ok(());
        }

        if rows.is_empty() {
            formatter.info("No targets yet. Add one with 'notesync add <url>'.");
            return Ok(());
        }

        let syncable = rows.iter().filter(|(t, _)| t.is_syncable()).count();
        formatter.success(&format!("{} ({})", plural(syncable, "target"), ws.store.base_dir().display()));
        for (target, depth) in rows {
            formatter.info(&format_row(target, depth));
        }
        Ok(())
    }
}

fn format_row(target: &SyncTarget, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let id = target.id.short();
    if target.is_group {
        return format!("{indent}[Folder] {}  {id}", target.title);
    }
    let files = match target.source_type {
        SourceType::Folder => format!(", {}", plural(target.synced_files.len(), "file")),
        _ => String::new(),
    };
    format!("{indent}{}  {id}  ({}{files})", target.title, target.status)
}
