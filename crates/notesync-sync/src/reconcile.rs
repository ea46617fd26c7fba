//! Reconciliation of fetched content against recorded sync state
//!
//! Both entry points take a snapshot of the target, apply the fetched
//! content to the local store, and return a new target record. SHA-256 of
//! the bytes is the only criterion for "changed"; provider metadata such
//! as modification time is recorded but never compared.
//!
//! ## Folder mode
//!
//! For every fetched entry:
//! - downloaded: replaced on disk when its hash differs from the local copy
//! - skipped or failed: the local copy (if any) is left as it is, and the
//!   entry stays listed with the hash of whatever is on disk, else the
//!   previously recorded hash
//!
//! Previously listed files missing from the new listing are deleted, then
//! empty directories are pruned. The new listing replaces the old one.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use notesync_core::domain::{
    SourceType, SyncTarget, SyncedFileItem, STATUS_NO_CHANGES, STATUS_UPDATED,
};
use notesync_core::ports::{EntryOutcome, FolderEntry, StagedFile};
use tracing::{debug, info, instrument};

use crate::store::{
    hash_file, hash_if_exists, prune_empty_dirs, remove_dir_if_exists, remove_file_if_exists,
    replace_file, LocalStore,
};

// ============================================================================
// Summaries
// ============================================================================

/// Counts from one folder reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    /// Entries in the new listing
    pub total: usize,
    /// Files written because their content changed or was new
    pub changed: usize,
    /// Local files deleted because they left the listing
    pub removed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// The target was not in folder mode before this run
    pub entered_folder_mode: bool,
}

impl FolderSummary {
    /// Whether the run counts as an update for the run-level summary
    pub fn is_update(&self) -> bool {
        self.changed > 0 || self.removed > 0 || self.entered_folder_mode
    }

    /// Human-readable status line stored on the target
    pub fn status(&self) -> String {
        if self.total == 0 {
            return "Folder synced: 0 files".to_string();
        }
        if self.changed > 0 || self.removed > 0 || self.failed > 0 || self.skipped > 0 {
            return format!(
                "Folder synced: {} files ({} updated, {} removed, {} failed, {} skipped)",
                self.total, self.changed, self.removed, self.failed, self.skipped
            );
        }
        format!("Folder no changes: {} files", self.total)
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Applies fetched content to the local store
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: LocalStore,
}

impl Reconciler {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Reconciles a single downloaded file
    ///
    /// # Returns
    /// The updated target and whether the local copy was replaced
    #[instrument(skip_all, fields(target_id = %target.id))]
    pub async fn reconcile_single(
        &self,
        target: &SyncTarget,
        staged: StagedFile,
        now: DateTime<Utc>,
    ) -> std::io::Result<(SyncTarget, bool)> {
        let mut next = target.clone();
        let destination = self.store.single_file_path(target);

        let new_hash = hash_file(staged.path()).await?;
        let changed = hash_if_exists(&destination).await?.as_ref() != Some(&new_hash);

        if changed {
            replace_file(staged, &destination).await?;
            next.last_updated_at = Some(now);
            next.status = STATUS_UPDATED.to_string();
            info!(hash = %new_hash, "Single file updated");
        } else {
            drop(staged);
            next.status = STATUS_NO_CHANGES.to_string();
            debug!("Single file unchanged");
        }

        next.sha256 = Some(new_hash);
        next.source_type = SourceType::File;
        next.synced_files.clear();
        next.last_error = None;

        remove_dir_if_exists(&self.store.source_dir(target)).await?;
        Ok((next, changed))
    }

    /// Reconciles a folder listing
    ///
    /// `entries` are expected sorted by local path, case-insensitive; the
    /// resulting listing is sorted the same way regardless.
    #[instrument(skip_all, fields(target_id = %target.id, entries = entries.len()))]
    pub async fn reconcile_folder(
        &self,
        target: &SyncTarget,
        entries: Vec<FolderEntry>,
        now: DateTime<Utc>,
    ) -> std::io::Result<(SyncTarget, FolderSummary)> {
        let root = self.store.source_dir(target);
        tokio::fs::create_dir_all(&root).await?;

        let mut summary = FolderSummary {
            entered_folder_mode: target.source_type != SourceType::Folder,
            ..FolderSummary::default()
        };
        let previous: HashMap<&str, &SyncedFileItem> = target
            .synced_files
            .iter()
            .map(|item| (item.local_relative_path.as_str(), item))
            .collect();

        remove_file_if_exists(&self.store.single_file_path(target)).await?;

        let mut next_items = Vec::with_capacity(entries.len());
        for entry in entries {
            let destination = self.store.source_file_path(target, &entry.local_relative_path);

            let sha256 = match entry.outcome {
                EntryOutcome::Downloaded(staged) => {
                    let new_hash = hash_file(staged.path()).await?;
                    if hash_if_exists(&destination).await?.as_ref() != Some(&new_hash) {
                        replace_file(staged, &destination).await?;
                        summary.changed += 1;
                        debug!(path = %entry.local_relative_path, "File updated");
                    }
                    Some(new_hash)
                }
                outcome => {
                    match outcome {
                        EntryOutcome::Skipped(_) => summary.skipped += 1,
                        _ => summary.failed += 1,
                    }
                    match hash_if_exists(&destination).await? {
                        Some(hash) => Some(hash),
                        None => previous
                            .get(entry.local_relative_path.as_str())
                            .and_then(|item| item.sha256.clone()),
                    }
                }
            };

            next_items.push(SyncedFileItem {
                remote_path: entry.remote_path,
                local_relative_path: entry.local_relative_path,
                sha256,
                modified_at: entry.modified_at,
                size_bytes: entry.size_bytes,
                mime_type: entry.mime_type,
            });
        }

        let listed: HashSet<&str> = next_items
            .iter()
            .map(|item| item.local_relative_path.as_str())
            .collect();
        for old in &target.synced_files {
            if listed.contains(old.local_relative_path.as_str()) {
                continue;
            }
            let stale = self.store.source_file_path(target, &old.local_relative_path);
            if remove_file_if_exists(&stale).await? {
                summary.removed += 1;
                debug!(path = %old.local_relative_path, "Removed file no longer listed");
            }
        }

        let pruned = prune_empty_dirs(&root);
        if pruned > 0 {
            debug!(pruned, "Pruned empty directories");
        }

        next_items.sort_by_key(|item| item.local_relative_path.to_lowercase());
        summary.total = next_items.len();

        let mut next = target.clone();
        next.source_type = SourceType::Folder;
        next.synced_files = next_items;
        next.sha256 = None;
        next.last_error = None;
        if summary.is_update() {
            next.last_updated_at = Some(now);
        }
        next.status = summary.status();

        info!(
            total = summary.total,
            changed = summary.changed,
            removed = summary.removed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Folder reconciled"
        );
        Ok((next, summary))
    }
}
