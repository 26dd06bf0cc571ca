use tracing::debug;

use crate::models::{Metric, RankKey, Team};
use crate::services::rank_index::RankIndex;

/// Scores a team from its problem states.
///
/// With `frozen` set, problems whose outcome is still hidden are skipped.
/// Always computed from scratch: visibility can change between calls.
pub fn compute_metric(team: &Team, frozen: bool, penalty_per_wrong: u64) -> Metric {
    let mut metric = Metric::default();
    for (problem, state) in team.problems.iter().enumerate() {
        if frozen && team.freeze.frozen_mask.contains(problem) {
            continue;
        }
        if state.solved {
            metric.solved += 1;
            metric.penalty += penalty_per_wrong * u64::from(state.wrong) + state.solve_time;
            metric.solve_times.push(state.solve_time);
        }
    }
    metric.solve_times.sort_unstable_by(|a, b| b.cmp(a));
    metric
}

pub fn rank_key(team: &Team, frozen: bool, penalty_per_wrong: u64) -> RankKey {
    RankKey {
        metric: compute_metric(team, frozen, penalty_per_wrong),
        lex_rank: team.lex_rank,
        team: team.id,
    }
}

/// Recomputes every team's key and rebuilds `index` from nothing.
pub fn rebuild_ranking(
    index: &mut RankIndex<RankKey>,
    teams: &[Team],
    frozen: bool,
    penalty_per_wrong: u64,
) {
    index.clear();
    for team in teams {
        index.insert(rank_key(team, frozen, penalty_per_wrong));
    }
    debug!("Rebuilt ranking of {} teams (frozen: {})", index.len(), frozen);
}
