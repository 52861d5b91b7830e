//! Reference synchronizer
//!
//! Tasks list the projects they belong to (`project_ids`) and projects list
//! their tasks (`task_ids`). The task side is authoritative: handlers write the
//! task document first, then call into [`ReferenceSync`] to bring the project
//! side in line. Project-side adjustments are best effort. A failure is logged,
//! queued as a [`LinkRepair`], and the surrounding request still succeeds.
//!
//! Queued repairs are replayed at the start of the next pass. Replay re-reads
//! the task and only applies a repair that still agrees with the task's
//! current `project_ids`.

use crate::store::models::{LinkOutcome, TaskDoc};
use crate::store::traits::DocumentStore;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Total attempts (initial + replays) before a repair is dropped
pub const MAX_REPAIR_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairAction {
    Link,
    Unlink,
}

/// A project-side operation that failed and is waiting to be retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRepair {
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub task_id: Uuid,
    pub action: RepairAction,
    pub attempts: u32,
}

/// Counts for one synchronizer pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Task id appended to a project list
    pub linked: usize,
    /// Task id pulled from a project list
    pub unlinked: usize,
    /// Ids that did not resolve to an owned project, or were already linked
    pub skipped: usize,
    /// Backend errors (queued for repair)
    pub failed: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Split a change of `project_ids` into `(removed, added)`.
///
/// Order of first appearance is preserved and duplicates are collapsed.
pub fn diff_project_ids(before: &[String], after: &[String]) -> (Vec<String>, Vec<String>) {
    let before_set: HashSet<&str> = before.iter().map(String::as_str).collect();
    let after_set: HashSet<&str> = after.iter().map(String::as_str).collect();

    let removed = dedup(before.iter().filter(|id| !after_set.contains(id.as_str())));
    let added = dedup(after.iter().filter(|id| !before_set.contains(id.as_str())));
    (removed, added)
}

fn dedup<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&String> = HashSet::new();
    ids.filter(|id| seen.insert(*id)).cloned().collect()
}

/// Keeps project task lists in line with task `project_ids`
pub struct ReferenceSync {
    store: Arc<dyn DocumentStore>,
    pending: Mutex<VecDeque<LinkRepair>>,
}

impl ReferenceSync {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of repairs waiting for the next pass
    pub async fn pending_repairs(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Link a freshly created task into every project it lists
    pub async fn link_new_task(&self, task: &TaskDoc) -> SyncReport {
        self.replay_pending().await;

        let mut report = SyncReport::default();
        for id in dedup(task.project_ids.iter()) {
            self.link(task.owner_id, &id, task.id, &mut report).await;
        }
        log_report("create", task.id, &report);
        report
    }

    /// Apply a change of `project_ids` from `before` to `task.project_ids`
    pub async fn reconcile(&self, task: &TaskDoc, before: &[String]) -> SyncReport {
        self.replay_pending().await;

        let (removed, added) = diff_project_ids(before, &task.project_ids);
        let mut report = SyncReport::default();
        for id in &removed {
            self.unlink(task.owner_id, id, task.id, &mut report).await;
        }
        for id in &added {
            self.link(task.owner_id, id, task.id, &mut report).await;
        }
        log_report("update", task.id, &report);
        report
    }

    /// Pull a task out of every project it lists. Call before deleting it.
    pub async fn unlink_deleted_task(&self, task: &TaskDoc) -> SyncReport {
        self.replay_pending().await;

        let mut report = SyncReport::default();
        for id in dedup(task.project_ids.iter()) {
            self.unlink(task.owner_id, &id, task.id, &mut report).await;
        }
        log_report("delete", task.id, &report);
        report
    }

    /// Drop a deleted project's id from the owner's tasks.
    ///
    /// Only used when cascading project deletes is enabled. Failures are
    /// logged and reported as zero tasks touched.
    pub async fn unlink_deleted_project(&self, project_id: Uuid, owner_id: Uuid) -> usize {
        match self
            .store
            .pull_project_from_tasks(&project_id.to_string(), owner_id)
            .await
        {
            Ok(count) => {
                debug!(project_id = %project_id, tasks = count, "Pulled deleted project from tasks");
                count
            }
            Err(e) => {
                warn!(project_id = %project_id, "Failed to pull deleted project from tasks: {:#}", e);
                0
            }
        }
    }

    // ========================================================================
    // Single project-side operations
    // ========================================================================

    async fn link(&self, owner_id: Uuid, project_id: &str, task_id: Uuid, report: &mut SyncReport) {
        let Ok(project_id) = Uuid::parse_str(project_id) else {
            debug!(project_id, task_id = %task_id, "Skipping non-resolving project id");
            report.skipped += 1;
            return;
        };

        match self
            .store
            .push_task_to_project(project_id, owner_id, &task_id.to_string())
            .await
        {
            Ok(LinkOutcome::Linked) => report.linked += 1,
            Ok(LinkOutcome::AlreadyLinked) | Ok(LinkOutcome::ProjectNotFound) => {
                report.skipped += 1
            }
            Err(e) => {
                warn!(project_id = %project_id, task_id = %task_id, "Failed to link task to project: {:#}", e);
                report.failed += 1;
                self.enqueue(owner_id, project_id, task_id, RepairAction::Link)
                    .await;
            }
        }
    }

    async fn unlink(
        &self,
        owner_id: Uuid,
        project_id: &str,
        task_id: Uuid,
        report: &mut SyncReport,
    ) {
        let Ok(project_id) = Uuid::parse_str(project_id) else {
            debug!(project_id, task_id = %task_id, "Skipping non-resolving project id");
            report.skipped += 1;
            return;
        };

        match self
            .store
            .pull_task_from_project(project_id, owner_id, &task_id.to_string())
            .await
        {
            Ok(true) => report.unlinked += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                warn!(project_id = %project_id, task_id = %task_id, "Failed to unlink task from project: {:#}", e);
                report.failed += 1;
                self.enqueue(owner_id, project_id, task_id, RepairAction::Unlink)
                    .await;
            }
        }
    }

    async fn enqueue(&self, owner_id: Uuid, project_id: Uuid, task_id: Uuid, action: RepairAction) {
        self.pending.lock().await.push_back(LinkRepair {
            owner_id,
            project_id,
            task_id,
            action,
            attempts: 1,
        });
    }

    // ========================================================================
    // Repair queue
    // ========================================================================

    /// Replay queued repairs. Never fails; repairs that fail again are
    /// re-queued until [`MAX_REPAIR_ATTEMPTS`] is reached.
    pub async fn replay_pending(&self) -> SyncReport {
        let batch: Vec<LinkRepair> = self.pending.lock().await.drain(..).collect();
        let mut report = SyncReport::default();
        if batch.is_empty() {
            return report;
        }

        let mut retry = Vec::new();
        for repair in batch {
            match self.apply_repair(&repair).await {
                Ok(Some(true)) => match repair.action {
                    RepairAction::Link => report.linked += 1,
                    RepairAction::Unlink => report.unlinked += 1,
                },
                Ok(Some(false)) | Ok(None) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    let attempts = repair.attempts + 1;
                    if attempts >= MAX_REPAIR_ATTEMPTS {
                        warn!(
                            project_id = %repair.project_id,
                            task_id = %repair.task_id,
                            action = ?repair.action,
                            attempts,
                            "Dropping link repair: {:#}", e
                        );
                    } else {
                        retry.push(LinkRepair { attempts, ..repair });
                    }
                }
            }
        }

        if !retry.is_empty() {
            self.pending.lock().await.extend(retry);
        }
        debug!(
            linked = report.linked,
            unlinked = report.unlinked,
            skipped = report.skipped,
            failed = report.failed,
            "Replayed link repairs"
        );
        report
    }

    /// `Ok(None)` when the repair no longer matches the task,
    /// `Ok(Some(changed))` when it was applied.
    async fn apply_repair(&self, repair: &LinkRepair) -> anyhow::Result<Option<bool>> {
        let project_key = repair.project_id.to_string();
        let still_listed = self
            .store
            .get_task(repair.task_id, repair.owner_id)
            .await?
            .is_some_and(|task| task.project_ids.iter().any(|id| *id == project_key));

        match repair.action {
            RepairAction::Link if still_listed => {
                let outcome = self
                    .store
                    .push_task_to_project(
                        repair.project_id,
                        repair.owner_id,
                        &repair.task_id.to_string(),
                    )
                    .await?;
                Ok(Some(outcome == LinkOutcome::Linked))
            }
            RepairAction::Unlink if !still_listed => {
                let pulled = self
                    .store
                    .pull_task_from_project(
                        repair.project_id,
                        repair.owner_id,
                        &repair.task_id.to_string(),
                    )
                    .await?;
                Ok(Some(pulled))
            }
            _ => {
                debug!(
                    project_id = %repair.project_id,
                    task_id = %repair.task_id,
                    action = ?repair.action,
                    "Discarding stale link repair"
                );
                Ok(None)
            }
        }
    }
}

fn log_report(op: &str, task_id: Uuid, report: &SyncReport) {
    debug!(
        op,
        task_id = %task_id,
        linked = report.linked,
        unlinked = report.unlinked,
        skipped = report.skipped,
        failed = report.failed,
        "Reference sync"
    );
    if !report.is_clean() {
        warn!(op, task_id = %task_id, failed = report.failed, "Reference sync incomplete, repairs queued");
    }
}
