//! Add command - Register a new sync target
//!
//! Provides the `notesync add` CLI command which validates the URL, stores
//! the target in the catalog and prints its id. Nothing is downloaded until
//! the next `notesync sync`.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{target_json, Context};

/// Add a target by URL
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Public link (http/https or ya-disk-public://)
    pub url: String,

    /// Display title; defaults to the last segment of the URL
    #[arg(long)]
    pub title: Option<String>,

    /// Id (or id prefix) of the group to place the target in
    #[arg(long)]
    pub parent: Option<String>,
}

impl AddCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let mut ws = ctx.workspace()?;

        let parent = ws.resolve_parent(self.parent.as_deref())?;
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| default_title(&self.url));

        let target = ws.catalog.add_target(&title, &self.url, parent)?.clone();
        ws.save_catalog()?;
        info!(target_id = %target.id, url = %target.url, "Target added");

        if ctx.is_json() {
            formatter.print_json(&target_json(&target)?);
        } else {
            formatter.success(&format!("Added \"{}\"", target.title));
            formatter.info(&format!("ID:   {}", target.id));
            formatter.info(&format!("URL:  {}", target.url));
            formatter.info(&format!("Path: {}", ws.catalog.display_path(&target.id)));
            formatter.info("Run 'notesync sync' to download it.");
        }
        Ok(())
    }
}

/// Title derived from a URL: its last non-empty path segment, else the URL
fn default_title(url: &str) -> String {
    let trimmed = url.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    let without_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);

    without_scheme
        .split(['/', ':'])
        .skip(1)
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::temp_context;

    #[test]
    fn test_default_title() {
        assert_eq!(default_title("https://example.com/docs/week1.pdf?x=1"), "week1.pdf");
        assert_eq!(default_title("https://disk.yandex.ru/d/AbCd123/"), "AbCd123");
        assert_eq!(default_title("https://example.com"), "https://example.com");
        assert_eq!(default_title("ya-disk-public://KEY:/Lectures"), "Lectures");
    }

    #[tokio::test]
    async fn test_add_under_group() {
        let (ctx, _dir) = temp_context();
        let mut ws = ctx.workspace().unwrap();
        let group = ws.catalog.add_group("Semester", None).unwrap().id;
        ws.save_catalog().unwrap();

        let cmd = AddCommand {
            url: "example.com/notes.pdf".into(),
            title: None,
            parent: Some(group.to_string()),
        };
        cmd.execute(&ctx).await.unwrap();

        let ws = ctx.workspace().unwrap();
        let added = ws
            .catalog
            .targets()
            .iter()
            .find(|t| !t.is_group)
            .unwrap();
        assert_eq!(added.title, "notes.pdf");
        assert_eq!(added.url, "https://example.com/notes.pdf");
        assert_eq!(added.parent_id, Some(group));
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_url() {
        let (ctx, _dir) = temp_context();
        let cmd = AddCommand {
            url: "ftp://example.com/x".into(),
            title: Some("X".into()),
            parent: None,
        };
        assert!(cmd.execute(&ctx).await.is_err());
        assert!(ctx.workspace().unwrap().catalog.is_empty());
    }
}
