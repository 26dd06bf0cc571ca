use std::fmt;

use serde::Serialize;

use crate::models::{RankKey, Team};
use crate::services::rank_index::RankIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cell {
    /// Outcome not revealed yet: rejected tries before the freeze, submissions after it.
    Hidden { wrong_at_freeze: u32, hidden: u32 },
    Solved { wrong: u32 },
    Unsolved { wrong: u32 },
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Cell::Hidden {
                wrong_at_freeze: 0,
                hidden,
            } => write!(f, "0/{hidden}"),
            Cell::Hidden {
                wrong_at_freeze,
                hidden,
            } => write!(f, "-{wrong_at_freeze}/{hidden}"),
            Cell::Solved { wrong: 0 } => f.write_str("+"),
            Cell::Solved { wrong } => write!(f, "+{wrong}"),
            Cell::Unsolved { wrong: 0 } => f.write_str("."),
            Cell::Unsolved { wrong } => write!(f, "-{wrong}"),
        }
    }
}

pub fn cell_for(team: &Team, problem: usize, frozen: bool) -> Cell {
    if frozen && team.freeze.frozen_mask.contains(problem) {
        return Cell::Hidden {
            wrong_at_freeze: team.freeze.wrong_at_freeze[problem],
            hidden: team.freeze.hidden_count[problem],
        };
    }
    let state = &team.problems[problem];
    if state.solved {
        Cell::Solved { wrong: state.wrong }
    } else {
        Cell::Unsolved { wrong: state.wrong }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreboardRow {
    pub team_name: String,
    pub rank: usize,
    pub solved: u32,
    pub penalty: u64,
    pub cells: Vec<Cell>,
}

impl fmt::Display for ScoreboardRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.team_name, self.rank, self.solved, self.penalty
        )?;
        for cell in &self.cells {
            write!(f, " {cell}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreboardSnapshot {
    pub rows: Vec<ScoreboardRow>,
}

impl ScoreboardSnapshot {
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.rows.iter().map(ToString::to_string)
    }
}

impl fmt::Display for ScoreboardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Captures the standings held by `index`, masking hidden outcomes when `frozen`.
pub fn render(index: &RankIndex<RankKey>, teams: &[Team], frozen: bool) -> ScoreboardSnapshot {
    let rows = index
        .iter()
        .enumerate()
        .map(|(position, key)| {
            let team = &teams[key.team.0];
            ScoreboardRow {
                team_name: team.name.clone(),
                rank: position + 1,
                solved: key.metric.solved,
                penalty: key.metric.penalty,
                cells: (0..team.problems.len())
                    .map(|problem| cell_for(team, problem, frozen))
                    .collect(),
            }
        })
        .collect();
    ScoreboardSnapshot { rows }
}
