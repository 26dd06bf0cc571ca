use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::services::submission_ledger::SubmissionLookup;

/// Problems are addressed by a single upper-case letter, so a contest has at most 26.
pub const MAX_PROBLEMS: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub usize);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Verdict of a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong_Answer")]
    WrongAnswer,
    #[serde(rename = "Runtime_Error")]
    RuntimeError,
    #[serde(rename = "Time_Limit_Exceed")]
    TimeLimitExceeded,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 4] = [
        Self::Accepted,
        Self::WrongAnswer,
        Self::RuntimeError,
        Self::TimeLimitExceeded,
    ];

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Protocol spelling of the verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong_Answer",
            Self::RuntimeError => "Runtime_Error",
            Self::TimeLimitExceeded => "Time_Limit_Exceed",
        }
    }

    /// Stable slot used by per-team lookup tables.
    pub fn slot(&self) -> usize {
        match self {
            Self::Accepted => 0,
            Self::WrongAnswer => 1,
            Self::RuntimeError => 2,
            Self::TimeLimitExceeded => 3,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status '{invalid}'")]
pub struct ParseStatusError {
    invalid: String,
}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}

/// Renders a zero-based problem index as its contest letter.
pub fn problem_letter(problem: usize) -> char {
    (b'A' + problem as u8) as char
}

/// Fixed-width set of problem indices, one bit per problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSet(u32);

impl ProblemSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, problem: usize) {
        self.0 |= 1 << problem;
    }

    pub fn remove(&mut self, problem: usize) {
        self.0 &= !(1 << problem);
    }

    pub fn contains(&self, problem: usize) -> bool {
        (self.0 >> problem) & 1 == 1
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Lowest problem index in the set.
    pub fn first(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemState {
    pub wrong: u32,
    pub solved: bool,
    /// Only meaningful once `solved` is set.
    pub solve_time: u64,
}

impl ProblemState {
    /// Applies a verdict. Once solved the state never changes again.
    pub fn apply(&mut self, status: SubmissionStatus, time: u64) {
        if self.solved {
            return;
        }
        if status.is_accepted() {
            self.solved = true;
            self.solve_time = time;
        } else {
            self.wrong += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub team: TeamId,
    pub problem: usize,
    pub status: SubmissionStatus,
    pub time: u64,
}

/// Per-problem state captured when the scoreboard freezes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreezeSnapshot {
    pub wrong_at_freeze: Vec<u32>,
    /// Submissions received since the freeze on problems unsolved at freeze time.
    pub hidden_count: Vec<u32>,
    pub unsolved_at_freeze: ProblemSet,
    /// Problems with at least one outcome not yet revealed.
    pub frozen_mask: ProblemSet,
}

impl FreezeSnapshot {
    pub fn new(problem_count: usize) -> Self {
        Self {
            wrong_at_freeze: vec![0; problem_count],
            hidden_count: vec![0; problem_count],
            unsolved_at_freeze: ProblemSet::empty(),
            frozen_mask: ProblemSet::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Position of the name in sorted roster order, fixed at contest start.
    pub lex_rank: usize,
    pub problems: Vec<ProblemState>,
    pub freeze: FreezeSnapshot,
    pub lookup: SubmissionLookup,
}

impl Team {
    pub fn new(id: TeamId, name: String) -> Self {
        Self {
            id,
            name,
            lex_rank: 0,
            problems: Vec::new(),
            freeze: FreezeSnapshot::default(),
            lookup: SubmissionLookup::default(),
        }
    }

    /// Allocates per-problem storage once the problem count is known.
    pub fn allocate_problems(&mut self, problem_count: usize) {
        self.problems = vec![ProblemState::default(); problem_count];
        self.freeze = FreezeSnapshot::new(problem_count);
    }

    pub fn has_hidden_problems(&self) -> bool {
        !self.freeze.frozen_mask.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub solved: u32,
    pub penalty: u64,
    /// Visible solve times, latest first.
    pub solve_times: Vec<u64>,
}

/// Sortable projection of a team. Smaller keys rank better.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankKey {
    pub metric: Metric,
    pub lex_rank: usize,
    pub team: TeamId,
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // More solved problems first
        other
            .metric
            .solved
            .cmp(&self.metric.solved)
            // Lower penalty first
            .then_with(|| self.metric.penalty.cmp(&other.metric.penalty))
            // Earlier latest solve, then earlier second latest, ...
            .then_with(|| self.metric.solve_times.cmp(&other.metric.solve_times))
            .then_with(|| self.lex_rank.cmp(&other.lex_rank))
            .then_with(|| self.team.cmp(&other.team))
    }
}
