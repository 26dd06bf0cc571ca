use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{MAX_PROBLEMS, RankKey, Submission, SubmissionStatus, TeamId};
use crate::services::config_loader::ScoreboardConfig;
use crate::services::freeze::{FreezeController, ScoreboardPhase, ScrollReport};
use crate::services::metrics;
use crate::services::rank_index::RankIndex;
use crate::services::scoreboard::{self, ScoreboardSnapshot};
use crate::services::submission_ledger::{ProblemFilter, StatusFilter, SubmissionLedger};
use crate::services::team_registry::TeamRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation not allowed in the current contest state.
    State,
    /// Unknown team.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("competition has already started")]
    AlreadyStarted,
    #[error("team name '{0}' is already registered")]
    DuplicateTeam(String),
    #[error("competition has not started")]
    NotStarted,
    #[error("scoreboard is already frozen")]
    AlreadyFrozen,
    #[error("scoreboard is not frozen")]
    NotFrozen,
    #[error("team '{0}' not found")]
    TeamNotFound(String),
    #[error("problem {0} is outside the contest problem set")]
    ProblemOutOfRange(usize),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TeamNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::State,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingAnswer {
    pub team: String,
    pub rank: usize,
    /// Set while the board is frozen: the rank may change once scrolled.
    pub frozen: bool,
}

/// Owns all contest state and applies one command at a time.
#[derive(Debug)]
pub struct ContestEngine {
    config: ScoreboardConfig,
    registry: TeamRegistry,
    ledger: SubmissionLedger,
    index: RankIndex<RankKey>,
    /// Rank of every team as of the last refresh, indexed by team id.
    published_ranks: Vec<usize>,
    freeze: FreezeController,
    problem_count: usize,
    duration: u64,
}

impl Default for ContestEngine {
    fn default() -> Self {
        Self::new(ScoreboardConfig::default())
    }
}

impl ContestEngine {
    pub fn new(config: ScoreboardConfig) -> Self {
        Self {
            config,
            registry: TeamRegistry::new(),
            ledger: SubmissionLedger::new(),
            index: RankIndex::new(),
            published_ranks: Vec::new(),
            freeze: FreezeController::new(),
            problem_count: 0,
            duration: 0,
        }
    }

    pub fn is_started(&self) -> bool {
        self.registry.is_locked()
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.is_frozen()
    }

    pub fn phase(&self) -> ScoreboardPhase {
        self.freeze.phase()
    }

    pub fn team_exists(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn problem_count(&self) -> usize {
        self.problem_count
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn submission_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn add_team(&mut self, name: &str) -> Result<TeamId, EngineError> {
        self.registry.add(name)
    }

    /// Locks the roster and ranks teams by name until the first flush.
    pub fn start(&mut self, duration: u64, problem_count: usize) -> Result<(), EngineError> {
        if self.is_started() {
            return Err(EngineError::AlreadyStarted);
        }
        if problem_count > MAX_PROBLEMS {
            return Err(EngineError::ProblemOutOfRange(problem_count));
        }

        self.registry.lock(problem_count);
        self.problem_count = problem_count;
        self.duration = duration;
        self.rebuild();
        info!(
            "Competition started: {} teams, {} problems, duration {}",
            self.registry.len(),
            problem_count,
            duration
        );
        Ok(())
    }

    pub fn submit(
        &mut self,
        team_name: &str,
        problem: usize,
        status: SubmissionStatus,
        time: u64,
    ) -> Result<usize, EngineError> {
        if !self.is_started() {
            return Err(EngineError::NotStarted);
        }
        if problem >= self.problem_count {
            return Err(EngineError::ProblemOutOfRange(problem));
        }
        let id = self
            .registry
            .find(team_name)
            .ok_or_else(|| EngineError::TeamNotFound(team_name.to_string()))?;

        let team = self.registry.get_mut(id);
        let index = self.ledger.append(
            team,
            Submission {
                team: id,
                problem,
                status,
                time,
            },
        );
        team.problems[problem].apply(status, time);
        self.freeze.record_submission(team, problem);
        debug!(
            "Submission {} by {}: problem {} {} at {}",
            index, team_name, problem, status, time
        );
        Ok(index)
    }

    /// Recomputes every team's standing under the current visibility.
    pub fn flush(&mut self) {
        if !self.is_started() {
            debug!("Flush before start leaves the empty ranking untouched");
            return;
        }
        self.rebuild();
    }

    pub fn freeze(&mut self) -> Result<(), EngineError> {
        self.freeze.freeze(self.registry.teams_mut())
    }

    pub fn scroll(&mut self) -> Result<ScrollReport, EngineError> {
        let report = self.freeze.scroll(
            self.registry.teams_mut(),
            &mut self.index,
            self.config.penalty_per_wrong,
        )?;
        self.publish_ranks();
        Ok(report)
    }

    pub fn query_ranking(&self, team_name: &str) -> Result<RankingAnswer, EngineError> {
        let id = self
            .registry
            .find(team_name)
            .ok_or_else(|| EngineError::TeamNotFound(team_name.to_string()))?;
        Ok(RankingAnswer {
            team: team_name.to_string(),
            rank: self.published_rank(id),
            frozen: self.is_frozen(),
        })
    }

    pub fn query_submission(
        &self,
        team_name: &str,
        problem: ProblemFilter,
        status: StatusFilter,
    ) -> Result<Option<Submission>, EngineError> {
        let id = self
            .registry
            .find(team_name)
            .ok_or_else(|| EngineError::TeamNotFound(team_name.to_string()))?;
        Ok(self
            .ledger
            .last_matching(self.registry.get(id), problem, status)
            .copied())
    }

    /// Standings as currently held by the index.
    pub fn scoreboard(&self) -> ScoreboardSnapshot {
        scoreboard::render(&self.index, self.registry.teams(), self.is_frozen())
    }

    fn published_rank(&self, id: TeamId) -> usize {
        // No ranking exists before START: report registration order.
        self.published_ranks
            .get(id.0)
            .copied()
            .unwrap_or(id.0 + 1)
    }

    fn rebuild(&mut self) {
        let frozen = self.is_frozen();
        metrics::rebuild_ranking(
            &mut self.index,
            self.registry.teams(),
            frozen,
            self.config.penalty_per_wrong,
        );
        self.publish_ranks();
    }

    fn publish_ranks(&mut self) {
        self.published_ranks = vec![0; self.registry.len()];
        for (position, key) in self.index.iter().enumerate() {
            self.published_ranks[key.team.0] = position + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(names: &[&str], problems: usize) -> ContestEngine {
        let mut engine = ContestEngine::default();
        for name in names {
            engine.add_team(name).unwrap();
        }
        engine.start(300, problems).unwrap();
        engine
    }

    fn rank(engine: &ContestEngine, name: &str) -> usize {
        engine.query_ranking(name).unwrap().rank
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut engine = ContestEngine::default();
        engine.add_team("a").unwrap();
        assert_eq!(
            engine.add_team("a"),
            Err(EngineError::DuplicateTeam("a".into()))
        );
        assert_eq!(
            engine.submit("a", 0, SubmissionStatus::Accepted, 1),
            Err(EngineError::NotStarted)
        );
        engine.start(100, 2).unwrap();
        assert_eq!(engine.start(100, 2), Err(EngineError::AlreadyStarted));
        assert_eq!(engine.add_team("b"), Err(EngineError::AlreadyStarted));
        assert_eq!(engine.scroll().unwrap_err().kind(), ErrorKind::State);
        let missing = engine.query_ranking("zzz").unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_initial_ranking_is_name_order() {
        let engine = started(&["mango", "apple", "kiwi"], 1);
        assert_eq!(rank(&engine, "apple"), 1);
        assert_eq!(rank(&engine, "kiwi"), 2);
        assert_eq!(rank(&engine, "mango"), 3);
    }

    #[test]
    fn test_ranks_only_move_on_flush() {
        let mut engine = started(&["a", "b"], 1);
        engine.submit("b", 0, SubmissionStatus::Accepted, 10).unwrap();
        assert_eq!(rank(&engine, "b"), 2);
        engine.flush();
        assert_eq!(rank(&engine, "b"), 1);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut engine = started(&["a", "b", "c"], 2);
        engine.submit("c", 1, SubmissionStatus::WrongAnswer, 3).unwrap();
        engine.submit("c", 1, SubmissionStatus::Accepted, 9).unwrap();
        engine.submit("a", 0, SubmissionStatus::Accepted, 40).unwrap();
        engine.flush();
        let first = engine.scoreboard();
        engine.flush();
        assert_eq!(engine.scoreboard(), first);
    }

    #[test]
    fn test_frozen_flush_hides_new_solves() {
        let mut engine = started(&["a", "b"], 2);
        engine.submit("a", 0, SubmissionStatus::Accepted, 10).unwrap();
        engine.flush();
        engine.freeze().unwrap();
        engine.submit("b", 0, SubmissionStatus::Accepted, 1).unwrap();
        engine.submit("b", 1, SubmissionStatus::Accepted, 2).unwrap();
        engine.flush();

        let answer = engine.query_ranking("b").unwrap();
        assert_eq!(answer.rank, 2);
        assert!(answer.frozen);

        let report = engine.scroll().unwrap();
        assert_eq!(report.changes.len(), 1);
        // the first reveal already lifts b over a, the second keeps it on top
        assert_eq!(report.changes[0].to_string(), "b a 1 1");
        assert_eq!(rank(&engine, "b"), 1);
        assert!(!engine.query_ranking("b").unwrap().frozen);
    }

    #[test]
    fn test_query_submission_latest_overall() {
        let mut engine = started(&["a"], 3);
        engine.submit("a", 2, SubmissionStatus::RuntimeError, 5).unwrap();
        engine.submit("a", 0, SubmissionStatus::Accepted, 8).unwrap();
        engine.submit("a", 1, SubmissionStatus::WrongAnswer, 13).unwrap();

        let last = engine
            .query_submission("a", ProblemFilter::All, StatusFilter::All)
            .unwrap()
            .unwrap();
        assert_eq!((last.problem, last.status, last.time), (1, SubmissionStatus::WrongAnswer, 13));

        let none = engine
            .query_submission(
                "a",
                ProblemFilter::Problem(2),
                StatusFilter::Status(SubmissionStatus::Accepted),
            )
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_rejects_unknown_problem() {
        let mut engine = started(&["a"], 2);
        assert_eq!(
            engine.submit("a", 2, SubmissionStatus::Accepted, 1),
            Err(EngineError::ProblemOutOfRange(2))
        );
        assert_eq!(engine.submission_count(), 0);
    }
}
