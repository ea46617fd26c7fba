//! Show command - Print one target in detail
//!
//! For folder targets, every listed file is shown with a marker when its
//! local copy is missing (skipped, failed, or deleted by hand). Such files
//! can be restored with `notesync fetch`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use notesync_core::domain::{sorted_files, FileSortMode, SourceType};

use super::{plural, target_json, Context};

/// Show target details
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Target id or id prefix
    pub id: String,

    /// File order for folder targets; `display.file_sort_mode` when omitted
    #[arg(long, value_parser = ["name", "date"])]
    pub sort: Option<String>,
}

impl ShowCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let ws = ctx.workspace()?;
        let target = ws.target(&self.id)?;

        let local_path = match target.source_type {
            SourceType::Folder => ws.store.source_dir(target),
            _ => ws.store.single_file_path(target),
        };

        if ctx.is_json() {
            let mut json = target_json(target)?;
            json["displayPath"] = ws.catalog.display_path(&target.id).into();
            if !target.is_group {
                json["localPath"] = local_path.display().to_string().into();
            }
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&ws.catalog.display_path(&target.id));
        formatter.info(&format!("ID:           {}", target.id));
        if target.is_group {
            let children = ws
                .catalog
                .targets()
                .iter()
                .filter(|t| t.parent_id == Some(target.id))
                .count();
            formatter.info(&format!("Contains:     {}", plural(children, "item")));
            return Ok(());
        }

        formatter.info(&format!("URL:          {}", target.url));
        formatter.info(&format!("Status:       {}", target.status));
        formatter.info(&format!("Source type:  {}", target.source_type));
        formatter.info(&format!("Last checked: {}", when(target.last_checked_at)));
        formatter.info(&format!("Last updated: {}", when(target.last_updated_at)));
        if let Some(hash) = &target.sha256 {
            formatter.info(&format!("SHA-256:      {hash}"));
        }
        if let Some(error) = &target.last_error {
            formatter.warn(error);
        }
        formatter.info(&format!("Local path:   {}", local_path.display()));

        if target.source_type == SourceType::Folder {
            formatter.info("");
            let mode = self
                .sort
                .as_deref()
                .map(str::parse::<FileSortMode>)
                .transpose()?
                .unwrap_or(ws.config.display.file_sort_mode);
            formatter.info(&format!("Files ({}):", target.synced_files.len()));
            for item in sorted_files(&target.synced_files, mode) {
                let present = ws
                    .store
                    .source_file_path(target, &item.local_relative_path)
                    .exists();
                let marker = if present { " " } else { "!" };
                let size = item
                    .size_bytes
                    .map(|b| format!("  {}", human_size(b)))
                    .unwrap_or_default();
                formatter.info(&format!("{marker} {}{size}", item.local_relative_path));
            }
        }
        Ok(())
    }
}

fn when(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
