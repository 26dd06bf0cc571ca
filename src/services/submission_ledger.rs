use serde::Serialize;

use crate::models::{MAX_PROBLEMS, Submission, SubmissionStatus, Team};

const PROBLEM_SLOTS: usize = MAX_PROBLEMS + 1;
const STATUS_SLOTS: usize = SubmissionStatus::ALL.len() + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProblemFilter {
    Problem(usize),
    All,
}

impl ProblemFilter {
    fn slot(&self) -> usize {
        match self {
            Self::Problem(problem) => *problem,
            Self::All => MAX_PROBLEMS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusFilter {
    Status(SubmissionStatus),
    All,
}

impl StatusFilter {
    fn slot(&self) -> usize {
        match self {
            Self::Status(status) => status.slot(),
            Self::All => SubmissionStatus::ALL.len(),
        }
    }
}

/// Index of the latest submission for every (problem or ALL, status or ALL) pair of one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionLookup {
    slots: [[Option<usize>; STATUS_SLOTS]; PROBLEM_SLOTS],
}

impl Default for SubmissionLookup {
    fn default() -> Self {
        Self {
            slots: [[None; STATUS_SLOTS]; PROBLEM_SLOTS],
        }
    }
}

impl SubmissionLookup {
    pub fn record(&mut self, problem: usize, status: SubmissionStatus, index: usize) {
        for p in [ProblemFilter::Problem(problem), ProblemFilter::All] {
            for s in [StatusFilter::Status(status), StatusFilter::All] {
                self.slots[p.slot()][s.slot()] = Some(index);
            }
        }
    }

    pub fn last(&self, problem: ProblemFilter, status: StatusFilter) -> Option<usize> {
        self.slots[problem.slot()][status.slot()]
    }
}

/// Append-only log of every submission in arrival order.
#[derive(Debug, Default)]
pub struct SubmissionLedger {
    submissions: Vec<Submission>,
}

impl SubmissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the submission and points the team's lookup slots at it.
    pub fn append(&mut self, team: &mut Team, submission: Submission) -> usize {
        let index = self.submissions.len();
        self.submissions.push(submission);
        team.lookup
            .record(submission.problem, submission.status, index);
        index
    }

    pub fn last_matching(
        &self,
        team: &Team,
        problem: ProblemFilter,
        status: StatusFilter,
    ) -> Option<&Submission> {
        team.lookup
            .last(problem, status)
            .and_then(|index| self.submissions.get(index))
    }

    pub(crate) fn len(&self) -> usize {
        self.submissions.len()
    }
}
