//! Per-task outcome and the orchestrator's run-level tally (`spec.md` §4.6).

use std::collections::HashMap;
use std::fmt;

/// The outcome of a single task on a single security (or date). Workers
/// catch every error at their top level and convert it to one of these
/// instead of propagating (`spec.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Success,
    SuccessNoData,
    SuccessNoNewData,
    SuccessUpToDate,
    Error,
    FatalError,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "SUCCESS",
            Self::SuccessNoData => "SUCCESS_NO_DATA",
            Self::SuccessNoNewData => "SUCCESS_NO_NEW_DATA",
            Self::SuccessUpToDate => "SUCCESS_UP_TO_DATE",
            Self::Error => "ERROR",
            Self::FatalError => "FATAL_ERROR",
        };
        f.write_str(label)
    }
}

/// Accumulates per-status counts across a run. Not part of the contract is
/// any particular ordering of how results arrive — only the final counts
/// matter (`spec.md` §4.6).
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    counts: HashMap<TaskStatus, usize>,
    total: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: TaskStatus) {
        *self.counts.entry(status).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn merge(&mut self, other: &RunSummary) {
        for (status, count) in &other.counts {
            *self.counts.entry(*status).or_insert(0) += count;
        }
        self.total += other.total;
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn had_errors(&self) -> bool {
        self.count(TaskStatus::Error) > 0 || self.count(TaskStatus::FatalError) > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total: {} success, {} no_data, {} no_new_data, {} up_to_date, {} error, {} fatal_error",
            self.total,
            self.count(TaskStatus::Success),
            self.count(TaskStatus::SuccessNoData),
            self.count(TaskStatus::SuccessNoNewData),
            self.count(TaskStatus::SuccessUpToDate),
            self.count(TaskStatus::Error),
            self.count(TaskStatus::FatalError),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_counts_independently() {
        let mut summary = RunSummary::new();
        summary.record(TaskStatus::Success);
        summary.record(TaskStatus::Success);
        summary.record(TaskStatus::Error);
        assert_eq!(summary.count(TaskStatus::Success), 2);
        assert_eq!(summary.count(TaskStatus::Error), 1);
        assert_eq!(summary.total(), 3);
        assert!(summary.had_errors());
    }

    #[test]
    fn merge_combines_two_summaries() {
        let mut a = RunSummary::new();
        a.record(TaskStatus::Success);
        let mut b = RunSummary::new();
        b.record(TaskStatus::Error);
        a.merge(&b);
        assert_eq!(a.total(), 2);
        assert!(a.had_errors());
    }
}
