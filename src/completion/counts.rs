use crate::domain::{TaskBucket, TaskStatus};
use serde::{Deserialize, Serialize};

/// Task tallies for one phase, in the shape both fact sources report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTaskCounts {
    #[serde(default)]
    pub total_tasks: u64,
    #[serde(default)]
    pub completed_tasks: u64,
    #[serde(default)]
    pub active_tasks: u64,
    #[serde(default)]
    pub pending_tasks: u64,
}

impl PhaseTaskCounts {
    pub fn new(total: u64, completed: u64, active: u64, pending: u64) -> Self {
        Self {
            total_tasks: total,
            completed_tasks: completed,
            active_tasks: active,
            pending_tasks: pending,
        }
    }

    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        let mut counts = Self::default();
        for status in statuses {
            counts.add_status(status, 1);
        }
        counts
    }

    /// Counts `n` tasks of `status`.
    pub fn add_status(&mut self, status: TaskStatus, n: u64) {
        self.total_tasks += n;
        match status.bucket() {
            TaskBucket::Completed => self.completed_tasks += n,
            TaskBucket::Active => self.active_tasks += n,
            TaskBucket::Pending => self.pending_tasks += n,
            TaskBucket::Uncounted => {}
        }
    }

    pub fn is_complete(&self) -> bool {
        phase_complete(self)
    }

    /// Tasks counted in `total` but in none of the other buckets: failed,
    /// blocked and queued work.
    pub fn unsettled_tasks(&self) -> u64 {
        self.total_tasks
            .saturating_sub(self.completed_tasks)
            .saturating_sub(self.active_tasks)
            .saturating_sub(self.pending_tasks)
    }

    pub fn add(&mut self, other: &Self) {
        self.total_tasks += other.total_tasks;
        self.completed_tasks += other.completed_tasks;
        self.active_tasks += other.active_tasks;
        self.pending_tasks += other.pending_tasks;
    }
}

/// A phase is complete once it has finished work and nothing outstanding.
///
/// An empty phase is never complete: "not yet populated" must not read as
/// "done". Failed, blocked and queued tasks are excluded from the active and
/// pending buckets, so they are checked through `unsettled_tasks` instead.
pub fn phase_complete(counts: &PhaseTaskCounts) -> bool {
    counts.completed_tasks > 0
        && counts.active_tasks == 0
        && counts.pending_tasks == 0
        && counts.unsettled_tasks() == 0
}

pub fn completion_percentage(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}
