use super::probe::WorktreeProbe;
use super::vcs::VersionControl;
use crate::domain::{AgentStatus, AssignmentInconsistency, MergeStatus, WorktreeRecord};
use crate::shared::{EngineError, EngineLog, RunMode, WorktreeId};
use crate::store::SqliteStore;
use serde::{Serialize, Serializer};
use serde_json::json;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Status of the agent owning a worktree record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerStatus {
    Known(AgentStatus),
    NotFound,
}

impl OwnerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Known(status) => status.as_str(),
            Self::NotFound => "not_found",
        }
    }
}

impl Serialize for OwnerStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleWorktree {
    pub worktree: WorktreeRecord,
    pub exists_on_disk: bool,
    pub in_version_control_listing: bool,
    pub agent_status: OwnerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BranchOutcome {
    Deleted,
    Absent,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchAction {
    pub branch: String,
    #[serde(flatten)]
    pub outcome: BranchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalenessReport {
    pub mode: RunMode,
    pub scanned: usize,
    pub stale: Vec<StaleWorktree>,
    pub marked_cleaned: Vec<WorktreeId>,
    pub branch_actions: Vec<BranchAction>,
    pub orphaned_assignments: Vec<AssignmentInconsistency>,
}

impl StalenessReport {
    pub fn failed_branches(&self) -> usize {
        self.branch_actions
            .iter()
            .filter(|action| matches!(action.outcome, BranchOutcome::Failed { .. }))
            .count()
    }
}

/// Exact match first; an existing path also matches through its canonical
/// form, since git lists worktrees with symlinks resolved.
fn is_listed(listed: &BTreeSet<PathBuf>, path: &Path) -> bool {
    if listed.contains(path) {
        return true;
    }
    fs::canonicalize(path)
        .map(|canonical| listed.contains(&canonical))
        .unwrap_or(false)
}

pub struct StalenessDetector<'a> {
    store: &'a SqliteStore,
    probe: &'a dyn WorktreeProbe,
    vcs: &'a dyn VersionControl,
    log: &'a EngineLog,
}

impl<'a> StalenessDetector<'a> {
    pub fn new(
        store: &'a SqliteStore,
        probe: &'a dyn WorktreeProbe,
        vcs: &'a dyn VersionControl,
        log: &'a EngineLog,
    ) -> Self {
        Self {
            store,
            probe,
            vcs,
            log,
        }
    }

    /// Active worktree records missing from disk or from the worktree
    /// listing, plus the number of active records scanned.
    pub fn detect(&self) -> Result<(usize, Vec<StaleWorktree>), EngineError> {
        let mut listed = BTreeSet::new();
        for path in self.vcs.list_worktree_paths()? {
            if let Ok(canonical) = fs::canonicalize(&path) {
                listed.insert(canonical);
            }
            listed.insert(path);
        }
        let active = self.store.worktrees_with_status(MergeStatus::Active)?;
        let scanned = active.len();

        let mut stale = Vec::new();
        for worktree in active {
            let exists_on_disk = self.probe.exists(&worktree.worktree_path);
            let in_version_control_listing = is_listed(&listed, &worktree.worktree_path);
            if exists_on_disk && in_version_control_listing {
                continue;
            }
            let agent_status = match self.store.agent(&worktree.agent_id)? {
                Some(agent) => OwnerStatus::Known(agent.status),
                None => OwnerStatus::NotFound,
            };
            stale.push(StaleWorktree {
                worktree,
                exists_on_disk,
                in_version_control_listing,
                agent_status,
            });
        }
        Ok((scanned, stale))
    }

    pub fn run(&self, mode: RunMode) -> Result<StalenessReport, EngineError> {
        let (scanned, stale) = self.detect()?;
        let orphaned_assignments = self.store.assignment_inconsistencies()?;
        self.log.info(
            "staleness.scanned",
            &[
                ("mode", json!(mode)),
                ("scanned", json!(scanned)),
                ("stale", json!(stale.len())),
                ("orphaned_assignments", json!(orphaned_assignments.len())),
            ],
        );

        let mut report = StalenessReport {
            mode,
            scanned,
            stale,
            marked_cleaned: Vec::new(),
            branch_actions: Vec::new(),
            orphaned_assignments,
        };
        if mode == RunMode::Report || report.stale.is_empty() {
            return Ok(report);
        }

        let ids: Vec<WorktreeId> = report
            .stale
            .iter()
            .map(|item| item.worktree.id.clone())
            .collect();
        report.marked_cleaned = self.store.mark_worktrees_cleaned(&ids)?;
        self.log.info(
            "staleness.marked_cleaned",
            &[("worktrees", json!(report.marked_cleaned))],
        );

        if let Err(err) = self.vcs.prune_worktrees() {
            self.log.warn(
                "staleness.prune_failed",
                &[("error", json!(err.to_string()))],
            );
        }

        let marked: BTreeSet<&WorktreeId> = report.marked_cleaned.iter().collect();
        let mut seen = BTreeSet::new();
        let branches: Vec<String> = report
            .stale
            .iter()
            .filter(|item| marked.contains(&item.worktree.id))
            .map(|item| item.worktree.branch_name.clone())
            .filter(|branch| !branch.trim().is_empty() && seen.insert(branch.clone()))
            .collect();
        report.branch_actions = branches
            .into_iter()
            .map(|branch| self.remove_branch(branch))
            .collect();
        Ok(report)
    }

    fn remove_branch(&self, branch: String) -> BranchAction {
        let outcome = match self.vcs.branch_exists(&branch) {
            Ok(false) => BranchOutcome::Absent,
            Ok(true) => match self.vcs.delete_branch(&branch) {
                Ok(()) => BranchOutcome::Deleted,
                Err(err) => BranchOutcome::Failed {
                    error: err.to_string(),
                },
            },
            Err(err) => BranchOutcome::Failed {
                error: err.to_string(),
            },
        };
        match &outcome {
            BranchOutcome::Failed { error } => self.log.warn(
                "staleness.branch_delete_failed",
                &[("branch", json!(branch)), ("error", json!(error))],
            ),
            other => self.log.debug(
                "staleness.branch_checked",
                &[("branch", json!(branch)), ("outcome", json!(other))],
            ),
        }
        BranchAction { branch, outcome }
    }
}
