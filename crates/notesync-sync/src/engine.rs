//! Sync orchestration
//!
//! The [`SyncOrchestrator`] drives targets through fetch and reconciliation.
//! It works on snapshots: each run takes a copy of the target and produces
//! a new record, and the caller performs the single write-back into the
//! catalog.
//!
//! ## Batch Flow
//!
//! ```text
//! start_batch ──→ spawned task ──→ for each non-group target:
//!                      │              Precheck → Progress* → Synced
//!                      └──→ Finished(RunSummary)
//! ```
//!
//! Targets are processed strictly one after another. A cancelled target
//! ends the batch; an error on one target is recorded on it and the batch
//! moves on.
//!
//! ## Exclusivity
//!
//! At most one batch runs per orchestrator, and at most one on-demand
//! download per `(target, file)` pair is in flight. On-demand downloads are
//! refused while a batch runs. Both are tracked in memory only.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use notesync_core::domain::{
    DownloadOptions, FolderProgress, SyncTarget, TargetId, STATUS_STOPPED,
};
use notesync_core::ports::{IRemoteSource, ProgressCallback, RemoteFetch};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::reconcile::Reconciler;
use crate::store::{hash_file, replace_file, LocalStore};
use crate::SyncError;

// ============================================================================
// Results and events
// ============================================================================

/// Outcome of syncing one target
#[derive(Debug, Clone)]
pub struct TargetSyncResult {
    /// The updated target record to write back
    pub target: SyncTarget,
    /// 1 when local content changed, else 0
    pub updated_count: u32,
    /// 1 when the run failed, else 0
    pub error_count: u32,
    /// The run was stopped on request
    pub cancelled: bool,
}

/// Totals for a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub updated_count: u32,
    pub error_count: u32,
    /// The batch ended early because of a cancel request
    pub stopped: bool,
}

impl RunSummary {
    /// One-line description of the run
    pub fn message(&self) -> String {
        if self.stopped {
            format!(
                "Sync stopped. Updated: {}, errors: {}",
                self.updated_count, self.error_count
            )
        } else if self.error_count == 0 {
            format!("Sync complete. Updated: {}", self.updated_count)
        } else {
            format!(
                "Sync complete. Updated: {}, errors: {}",
                self.updated_count, self.error_count
            )
        }
    }
}

/// Event emitted by a running batch, in order
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A target is about to be fetched; `index` is 1-based
    Precheck {
        index: usize,
        total: usize,
        target_id: TargetId,
    },
    /// Folder download progress for the current target
    Progress {
        target_id: TargetId,
        progress: FolderProgress,
    },
    /// The target finished; the record should be written back
    Synced { target: SyncTarget },
    /// The batch is over; always the last event
    Finished(RunSummary),
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

struct Inner {
    source: Arc<dyn IRemoteSource + Send + Sync>,
    store: LocalStore,
    reconciler: Reconciler,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
    in_flight: Mutex<HashSet<(TargetId, String)>>,
}

/// Runs sync targets through fetch and reconciliation
///
/// Cheap to clone; clones share the run guard and cancellation state.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("store", &self.inner.store)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    /// * `source` - Remote content access (IRemoteSource)
    /// * `store` - Local store the mirrors live in
    pub fn new(source: Arc<dyn IRemoteSource + Send + Sync>, store: LocalStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                reconciler: Reconciler::new(store.clone()),
                store,
                running: AtomicBool::new(false),
                cancel: Mutex::new(CancellationToken::new()),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    /// Whether a batch is currently running
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Requests the running batch to stop
    ///
    /// Takes effect at the next cancellation check; the request in flight
    /// is allowed to finish.
    pub fn cancel(&self) {
        info!("Sync cancellation requested");
        lock(&self.inner.cancel).cancel();
    }

    // ========================================================================
    // Single target
    // ========================================================================

    /// Syncs one target and returns its updated record
    ///
    /// Never fails: errors are folded into the returned target's status.
    /// Groups are returned unchanged.
    ///
    /// # Arguments
    /// * `target` - Snapshot of the target to sync
    /// * `options` - Skip policy for folder entries
    /// * `progress` - Receives folder download progress
    /// * `cancel` - Stop request token
    #[instrument(skip_all, fields(target_id = %target.id, url = %target.url))]
    pub async fn sync_target(
        &self,
        target: &SyncTarget,
        options: &DownloadOptions,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> TargetSyncResult {
        let mut snapshot = target.clone();
        if !snapshot.is_syncable() {
            debug!("Skipping group");
            return TargetSyncResult {
                target: snapshot,
                updated_count: 0,
                error_count: 0,
                cancelled: false,
            };
        }
        snapshot.last_checked_at = Some(Utc::now());

        match self.fetch_and_reconcile(&snapshot, options, progress, cancel).await {
            Ok((next, updated)) => {
                info!(status = %next.status, updated, "Target synced");
                TargetSyncResult {
                    target: next,
                    updated_count: u32::from(updated),
                    error_count: 0,
                    cancelled: false,
                }
            }
            Err(e) if e.is_cancelled() => {
                info!("Target sync stopped");
                snapshot.status = STATUS_STOPPED.to_string();
                snapshot.last_error = None;
                TargetSyncResult {
                    target: snapshot,
                    updated_count: 0,
                    error_count: 0,
                    cancelled: true,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Target sync failed");
                snapshot.status = format!("Error: {message}");
                snapshot.last_error = Some(message);
                TargetSyncResult {
                    target: snapshot,
                    updated_count: 0,
                    error_count: 1,
                    cancelled: false,
                }
            }
        }
    }

    async fn fetch_and_reconcile(
        &self,
        target: &SyncTarget,
        options: &DownloadOptions,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<(SyncTarget, bool), SyncError> {
        let store = &self.inner.store;
        store.ensure_dirs().await?;

        let fetched = self
            .inner
            .source
            .fetch(&target.url, options, &store.temp_dir(), progress, cancel)
            .await?;

        let now = Utc::now();
        match fetched {
            RemoteFetch::Single(staged) => {
                let (next, changed) = self
                    .inner
                    .reconciler
                    .reconcile_single(target, staged, now)
                    .await?;
                Ok((next, changed))
            }
            RemoteFetch::Folder(entries) => {
                let (next, summary) = self
                    .inner
                    .reconciler
                    .reconcile_folder(target, entries, now)
                    .await?;
                Ok((next, summary.is_update()))
            }
        }
    }

    // ========================================================================
    // Batch
    // ========================================================================

    /// Starts syncing `targets` on a background task
    ///
    /// # Returns
    /// The task handle (resolving to the run totals) and the event receiver.
    /// The receiver always ends with [`SyncEvent::Finished`].
    ///
    /// # Errors
    /// [`SyncError::AlreadyRunning`] if a batch is in progress.
    pub fn start_batch(
        &self,
        targets: Vec<SyncTarget>,
        options: DownloadOptions,
    ) -> Result<(JoinHandle<RunSummary>, mpsc::UnboundedReceiver<SyncEvent>), SyncError> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }
        // Lives in the task future, polled or not
        let guard = RunningGuard(Arc::clone(&self.inner));

        let cancel = CancellationToken::new();
        *lock(&self.inner.cancel) = cancel.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let this = self.clone();
        let handle =
            tokio::spawn(async move { this.run_batch(targets, options, cancel, tx, guard).await });
        Ok((handle, rx))
    }

    #[instrument(skip_all, fields(targets = targets.len()))]
    async fn run_batch(
        &self,
        targets: Vec<SyncTarget>,
        options: DownloadOptions,
        cancel: CancellationToken,
        events: mpsc::UnboundedSender<SyncEvent>,
        guard: RunningGuard,
    ) -> RunSummary {
        let syncable: Vec<SyncTarget> = targets.into_iter().filter(SyncTarget::is_syncable).collect();
        let total = syncable.len();
        info!(total, "Sync run started");

        let mut summary = RunSummary::default();
        for (position, target) in syncable.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.stopped = true;
                break;
            }

            let _ = events.send(SyncEvent::Precheck {
                index: position + 1,
                total,
                target_id: target.id,
            });

            let progress_events = events.clone();
            let target_id = target.id;
            let progress: ProgressCallback = Arc::new(move |progress| {
                let _ = progress_events.send(SyncEvent::Progress {
                    target_id,
                    progress,
                });
            });

            let result = self
                .sync_target(&target, &options, Some(progress), &cancel)
                .await;
            summary.updated_count += result.updated_count;
            summary.error_count += result.error_count;
            let _ = events.send(SyncEvent::Synced {
                target: result.target,
            });

            if result.cancelled {
                summary.stopped = true;
                break;
            }
        }

        info!(
            updated = summary.updated_count,
            errors = summary.error_count,
            stopped = summary.stopped,
            "Sync run finished"
        );
        drop(guard);
        let _ = events.send(SyncEvent::Finished(summary));
        summary
    }

    // ========================================================================
    // On-demand download
    // ========================================================================

    /// Downloads one listed file of a folder target into its mirror
    ///
    /// # Arguments
    /// * `target` - Snapshot of a folder-mode target
    /// * `local_relative_path` - Listed path of the file to fetch
    /// * `cancel` - Stop request token
    ///
    /// # Returns
    /// A copy of the target with the file's hash and the status updated
    ///
    /// # Errors
    /// [`SyncError::AlreadyRunning`] while a batch is in progress,
    /// [`SyncError::AlreadyInFlight`] if the same file is being fetched.
    #[instrument(skip(self, target, cancel), fields(target_id = %target.id))]
    pub async fn download_missing_file(
        &self,
        target: &SyncTarget,
        local_relative_path: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncTarget, SyncError> {
        if !target.is_syncable() {
            return Err(SyncError::NotSyncable);
        }
        if self.is_running() {
            return Err(SyncError::AlreadyRunning);
        }
        let item = target
            .synced_file(local_relative_path)
            .ok_or_else(|| SyncError::UnknownFile(local_relative_path.to_string()))?;

        let _in_flight = InFlightGuard::acquire(&self.inner.in_flight, target.id, local_relative_path)?;

        let store = &self.inner.store;
        store.ensure_dirs().await?;
        let staged = self
            .inner
            .source
            .fetch_file(&target.url, &item.remote_path, &store.temp_dir(), cancel)
            .await
            .inspect_err(|e| error!(error = %e, remote_path = %item.remote_path, "On-demand download failed"))?;

        let destination = store.source_file_path(target, local_relative_path);
        replace_file(staged, &destination).await?;
        let hash = hash_file(&destination).await?;
        info!(remote_path = %item.remote_path, hash = %hash, "Downloaded missing file");

        let mut next = target.clone();
        if let Some(entry) = next
            .synced_files
            .iter_mut()
            .find(|f| f.local_relative_path == local_relative_path)
        {
            entry.sha256 = Some(hash);
        }
        next.status = format!("Downloaded file: {local_relative_path}");
        next.last_error = None;
        Ok(next)
    }
}

// ============================================================================
// Guards
// ============================================================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the running flag when the batch task ends, even by panic or abort
struct RunningGuard(Arc<Inner>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

/// Holds a `(target, file)` slot in the in-flight set
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<(TargetId, String)>>,
    key: (TargetId, String),
}

impl<'a> InFlightGuard<'a> {
    fn acquire(
        set: &'a Mutex<HashSet<(TargetId, String)>>,
        target_id: TargetId,
        local_relative_path: &str,
    ) -> Result<Self, SyncError> {
        let key = (target_id, local_relative_path.to_string());
        if !lock(set).insert(key.clone()) {
            return Err(SyncError::AlreadyInFlight(local_relative_path.to_string()));
        }
        Ok(Self { set, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.key);
    }
}

// ============================================================================
// Unit tests
// ============================================================================
