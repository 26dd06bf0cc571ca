use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::models::{FreezeSnapshot, ProblemSet, RankKey, Team, problem_letter};
use crate::services::contest_engine::EngineError;
use crate::services::metrics;
use crate::services::rank_index::RankIndex;
use crate::services::scoreboard::{self, ScoreboardSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ScoreboardPhase {
    #[default]
    Running,
    Frozen,
}

/// A reveal that lifted a team above at least one other team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub team: String,
    /// Team that held the position the revealed team moves into.
    pub displaced: String,
    pub solved: u32,
    pub penalty: u64,
    pub from_rank: usize,
    pub to_rank: usize,
}

impl fmt::Display for RankChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.team, self.displaced, self.solved, self.penalty
        )
    }
}

/// One revealed problem and where its team stood around the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealStep {
    pub team: String,
    pub problem: usize,
    pub from_rank: usize,
    pub to_rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrollReport {
    pub before: ScoreboardSnapshot,
    /// Every reveal in order, including those that moved nobody.
    pub steps: Vec<RevealStep>,
    pub changes: Vec<RankChange>,
    pub after: ScoreboardSnapshot,
}

#[derive(Debug, Default)]
pub struct FreezeController {
    phase: ScoreboardPhase,
}

impl FreezeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ScoreboardPhase {
        self.phase
    }

    pub fn is_frozen(&self) -> bool {
        self.phase == ScoreboardPhase::Frozen
    }

    pub fn freeze(&mut self, teams: &mut [Team]) -> Result<(), EngineError> {
        if self.is_frozen() {
            return Err(EngineError::AlreadyFrozen);
        }

        for team in teams.iter_mut() {
            let mut unsolved_at_freeze = ProblemSet::empty();
            for (problem, state) in team.problems.iter().enumerate() {
                if !state.solved {
                    unsolved_at_freeze.insert(problem);
                }
            }
            team.freeze = FreezeSnapshot {
                wrong_at_freeze: team.problems.iter().map(|state| state.wrong).collect(),
                hidden_count: vec![0; team.problems.len()],
                unsolved_at_freeze,
                frozen_mask: ProblemSet::empty(),
            };
        }

        self.phase = ScoreboardPhase::Frozen;
        info!("Scoreboard frozen");
        Ok(())
    }

    /// Hides the outcome of a submission that arrived during the freeze,
    /// whatever its verdict, if the problem was unsolved when the board froze.
    pub fn record_submission(&self, team: &mut Team, problem: usize) {
        if !self.is_frozen() || !team.freeze.unsolved_at_freeze.contains(problem) {
            return;
        }
        team.freeze.hidden_count[problem] += 1;
        team.freeze.frozen_mask.insert(problem);
    }

    /// Reveals every hidden outcome, one problem at a time, always from the
    /// worst ranked team that still has something hidden. Leaves the board
    /// running with `index` holding the final standings.
    pub fn scroll(
        &mut self,
        teams: &mut [Team],
        index: &mut RankIndex<RankKey>,
        penalty_per_wrong: u64,
    ) -> Result<ScrollReport, EngineError> {
        if !self.is_frozen() {
            return Err(EngineError::NotFrozen);
        }

        metrics::rebuild_ranking(index, teams, true, penalty_per_wrong);
        let mut pending = RankIndex::new();
        for key in index.iter() {
            if teams[key.team.0].has_hidden_problems() {
                pending.insert(key.clone());
            }
        }
        info!("Scrolling scoreboard with {} pending teams", pending.len());
        let before = scoreboard::render(index, teams, true);

        let mut steps = Vec::new();
        let mut changes = Vec::new();
        while let Some(current) = pending.max().cloned() {
            pending.remove(&current);
            let team = &mut teams[current.team.0];
            let Some(problem) = team.freeze.frozen_mask.first() else {
                continue;
            };

            let from_rank = index.rank_of(&current);
            index.remove(&current);
            team.freeze.frozen_mask.remove(problem);
            let revealed = metrics::rank_key(team, true, penalty_per_wrong);
            let still_hidden = team.has_hidden_problems();
            let to_rank = index.rank_of(&revealed);
            debug!(
                "Revealed problem {} of {}: rank {} -> {}",
                problem_letter(problem),
                team.name,
                from_rank,
                to_rank
            );
            steps.push(RevealStep {
                team: team.name.clone(),
                problem,
                from_rank,
                to_rank,
            });

            if to_rank < from_rank
                && let Some(displaced) = index.select(to_rank)
            {
                changes.push(RankChange {
                    team: teams[current.team.0].name.clone(),
                    displaced: teams[displaced.team.0].name.clone(),
                    solved: revealed.metric.solved,
                    penalty: revealed.metric.penalty,
                    from_rank,
                    to_rank,
                });
            }

            if still_hidden {
                pending.insert(revealed.clone());
            }
            index.insert(revealed);
        }

        let after = scoreboard::render(index, teams, true);

        for team in teams.iter_mut() {
            team.freeze = FreezeSnapshot::new(team.problems.len());
        }
        self.phase = ScoreboardPhase::Running;
        info!("Scroll finished with {} rank changes", changes.len());

        Ok(ScrollReport {
            before,
            steps,
            changes,
            after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubmissionStatus, TeamId};

    const PENALTY: u64 = 20;

    fn roster(names: &[&str], problems: usize) -> Vec<Team> {
        let mut sorted: Vec<&str> = names.to_vec();
        sorted.sort();
        names
            .iter()
            .enumerate()
            .map(|(id, name)| {
                let mut team = Team::new(TeamId(id), name.to_string());
                team.lex_rank = sorted.iter().position(|n| n == name).unwrap();
                team.allocate_problems(problems);
                team
            })
            .collect()
    }

    fn submit(
        controller: &FreezeController,
        team: &mut Team,
        problem: usize,
        status: SubmissionStatus,
        time: u64,
    ) {
        team.problems[problem].apply(status, time);
        controller.record_submission(team, problem);
    }

    fn order(index: &RankIndex<RankKey>, teams: &[Team]) -> Vec<String> {
        index
            .iter()
            .map(|key| teams[key.team.0].name.clone())
            .collect()
    }

    #[test]
    fn test_freeze_twice_fails() {
        let mut controller = FreezeController::new();
        let mut teams = roster(&["a"], 1);
        controller.freeze(&mut teams).unwrap();
        assert!(matches!(
            controller.freeze(&mut teams),
            Err(EngineError::AlreadyFrozen)
        ));
        assert_eq!(controller.phase(), ScoreboardPhase::Frozen);
    }

    #[test]
    fn test_scroll_requires_freeze() {
        let mut controller = FreezeController::new();
        let mut teams = roster(&["a"], 1);
        let mut index = RankIndex::new();
        assert!(matches!(
            controller.scroll(&mut teams, &mut index, PENALTY),
            Err(EngineError::NotFrozen)
        ));
    }

    #[test]
    fn test_only_problems_unsolved_at_freeze_are_hidden() {
        let mut controller = FreezeController::new();
        let mut teams = roster(&["a"], 2);
        submit(&controller, &mut teams[0], 0, SubmissionStatus::Accepted, 5);
        controller.freeze(&mut teams).unwrap();

        submit(&controller, &mut teams[0], 0, SubmissionStatus::WrongAnswer, 7);
        submit(&controller, &mut teams[0], 1, SubmissionStatus::WrongAnswer, 8);
        submit(&controller, &mut teams[0], 1, SubmissionStatus::Accepted, 9);

        let freeze = &teams[0].freeze;
        assert!(!freeze.frozen_mask.contains(0));
        assert!(freeze.frozen_mask.contains(1));
        assert_eq!(freeze.hidden_count, vec![0, 2]);
        assert_eq!(teams[0].problems[1].wrong, 1);
        assert!(teams[0].problems[1].solved);
    }

    #[test]
    fn test_unsolved_reveal_emits_nothing() {
        let mut controller = FreezeController::new();
        let mut teams = roster(&["A", "B"], 2);
        submit(&controller, &mut teams[0], 0, SubmissionStatus::WrongAnswer, 1);
        submit(&controller, &mut teams[0], 0, SubmissionStatus::Accepted, 10);
        submit(&controller, &mut teams[1], 1, SubmissionStatus::Accepted, 5);
        controller.freeze(&mut teams).unwrap();
        submit(&controller, &mut teams[0], 1, SubmissionStatus::WrongAnswer, 20);

        let mut index = RankIndex::new();
        let report = controller.scroll(&mut teams, &mut index, PENALTY).unwrap();

        assert!(report.changes.is_empty());
        assert_eq!(
            report.before.lines().collect::<Vec<_>>(),
            vec!["B 1 1 5 . +", "A 2 1 30 +1 0/1"]
        );
        assert_eq!(
            report.after.lines().collect::<Vec<_>>(),
            vec!["B 1 1 5 . +", "A 2 1 30 +1 -1"]
        );
        assert!(!controller.is_frozen());
        assert!(teams.iter().all(|team| !team.has_hidden_problems()));
    }

    #[test]
    fn test_reveals_worst_team_first_and_reports_overtakes() {
        let mut controller = FreezeController::new();
        let mut teams = roster(&["x", "y", "z"], 2);
        submit(&controller, &mut teams[0], 0, SubmissionStatus::Accepted, 10);
        submit(&controller, &mut teams[1], 0, SubmissionStatus::Accepted, 20);
        controller.freeze(&mut teams).unwrap();

        // z solves both during the freeze, y solves one more
        submit(&controller, &mut teams[2], 0, SubmissionStatus::Accepted, 200);
        submit(&controller, &mut teams[2], 1, SubmissionStatus::Accepted, 210);
        submit(&controller, &mut teams[1], 1, SubmissionStatus::WrongAnswer, 220);
        submit(&controller, &mut teams[1], 1, SubmissionStatus::Accepted, 230);

        let mut index = RankIndex::new();
        let report = controller.scroll(&mut teams, &mut index, PENALTY).unwrap();

        let lines: Vec<String> = report.changes.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                // z (3rd) reveals A: 1 solved / 200 stays behind x and y
                // then z reveals B: 2 solved, jumps over x
                "z x 2 410",
                // y reveals B: 2 solved / 270 beats z
                "y z 2 270",
            ]
        );
        assert_eq!(report.changes[0].from_rank, 3);
        assert_eq!(report.changes[0].to_rank, 1);
        assert_eq!(order(&index, &teams), vec!["y", "z", "x"]);
        assert_eq!(
            report.after.lines().collect::<Vec<_>>(),
            vec!["y 1 2 270 + +1", "z 2 2 410 + +", "x 3 1 10 + ."]
        );
    }

    #[test]
    fn test_scroll_preserves_problem_states() {
        let mut controller = FreezeController::new();
        let mut teams = roster(&["p", "q"], 3);
        submit(&controller, &mut teams[0], 2, SubmissionStatus::Accepted, 15);
        controller.freeze(&mut teams).unwrap();
        submit(&controller, &mut teams[1], 0, SubmissionStatus::TimeLimitExceeded, 40);
        submit(&controller, &mut teams[1], 0, SubmissionStatus::Accepted, 45);
        submit(&controller, &mut teams[0], 1, SubmissionStatus::RuntimeError, 50);
        let before: Vec<_> = teams.iter().map(|team| team.problems.clone()).collect();

        let mut index = RankIndex::new();
        controller.scroll(&mut teams, &mut index, PENALTY).unwrap();

        let after: Vec<_> = teams.iter().map(|team| team.problems.clone()).collect();
        assert_eq!(before, after);
    }

    fn step(team: &str, problem: usize, from_rank: usize, to_rank: usize) -> RevealStep {
        RevealStep {
            team: team.to_string(),
            problem,
            from_rank,
            to_rank,
        }
    }

    #[test]
    fn test_no_reveal_moves_a_team_down() {
        let mut controller = FreezeController::new();
        let mut teams = roster(&["p", "q", "r", "s"], 3);
        submit(&controller, &mut teams[0], 0, SubmissionStatus::Accepted, 10);
        submit(&controller, &mut teams[1], 0, SubmissionStatus::Accepted, 20);
        submit(&controller, &mut teams[2], 0, SubmissionStatus::Accepted, 30);
        controller.freeze(&mut teams).unwrap();

        // s solves A late with two rejections, then fails B
        submit(&controller, &mut teams[3], 0, SubmissionStatus::WrongAnswer, 280);
        submit(&controller, &mut teams[3], 0, SubmissionStatus::WrongAnswer, 290);
        submit(&controller, &mut teams[3], 0, SubmissionStatus::Accepted, 299);
        submit(&controller, &mut teams[3], 1, SubmissionStatus::WrongAnswer, 100);
        submit(&controller, &mut teams[2], 2, SubmissionStatus::Accepted, 200);
        submit(&controller, &mut teams[1], 1, SubmissionStatus::RuntimeError, 150);
        submit(&controller, &mut teams[0], 2, SubmissionStatus::Accepted, 100);

        let mut index = RankIndex::new();
        let report = controller.scroll(&mut teams, &mut index, PENALTY).unwrap();

        assert_eq!(
            report.steps,
            vec![
                step("s", 0, 4, 4),
                step("s", 1, 4, 4),
                step("r", 2, 3, 1),
                step("q", 1, 3, 3),
                step("p", 2, 2, 1),
            ]
        );
        assert!(report.steps.iter().all(|step| step.to_rank <= step.from_rank));
        let lines: Vec<String> = report.changes.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["r p 2 230", "p r 2 110"]);
        assert_eq!(order(&index, &teams), vec!["p", "r", "q", "s"]);
    }

    #[test]
    fn test_tied_pending_teams_reveal_in_name_order() {
        let mut controller = FreezeController::new();
        // ids run against name order: 0 is "b", 1 is "a"
        let mut teams = roster(&["b", "a", "c"], 1);
        submit(&controller, &mut teams[2], 0, SubmissionStatus::Accepted, 50);
        controller.freeze(&mut teams).unwrap();
        submit(&controller, &mut teams[0], 0, SubmissionStatus::Accepted, 10);
        submit(&controller, &mut teams[1], 0, SubmissionStatus::Accepted, 10);

        let mut index = RankIndex::new();
        let report = controller.scroll(&mut teams, &mut index, PENALTY).unwrap();

        assert_eq!(
            report.before.lines().collect::<Vec<_>>(),
            vec!["c 1 1 50 +", "a 2 0 0 0/1", "b 3 0 0 0/1"]
        );
        // b sorts after a on name, so it is the worst pending team
        assert_eq!(report.steps, vec![step("b", 0, 3, 1), step("a", 0, 3, 1)]);
        let lines: Vec<String> = report.changes.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["b c 1 10", "a b 1 10"]);
        assert_eq!(order(&index, &teams), vec!["a", "b", "c"]);
    }
}
