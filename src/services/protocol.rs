//! Text responses of the judging protocol.
//!
//! Every command produces the exact acknowledgement lines judges and
//! downstream tools expect; the engine only reports typed results.

use tracing::warn;

use crate::models::problem_letter;
use crate::services::command::Command;
use crate::services::contest_engine::{ContestEngine, EngineError};
use crate::services::freeze::ScrollReport;

const FROZEN_WARNING: &str =
    "[Warning]Scoreboard is frozen. The ranking may be inaccurate until it were scrolled.";

#[derive(Debug, Default)]
pub struct Outcome {
    pub lines: Vec<String>,
    /// Set by END: no further commands should be processed.
    pub finished: bool,
    pub scroll: Option<ScrollReport>,
}

impl Outcome {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            ..Self::default()
        }
    }

    fn silent() -> Self {
        Self::default()
    }
}

fn add_failure(err: &EngineError) -> &'static str {
    match err {
        EngineError::DuplicateTeam(_) => "[Error]Add failed: duplicated team name.",
        _ => "[Error]Add failed: competition has started.",
    }
}

pub fn execute(engine: &mut ContestEngine, command: Command) -> Outcome {
    match command {
        Command::AddTeam { name } => match engine.add_team(&name) {
            Ok(_) => Outcome::line("[Info]Add successfully."),
            Err(err) => {
                warn!("ADDTEAM {} rejected: {}", name, err);
                Outcome::line(add_failure(&err))
            }
        },
        Command::Start {
            duration,
            problem_count,
        } => match engine.start(duration, problem_count) {
            Ok(()) => Outcome::line("[Info]Competition starts."),
            Err(EngineError::AlreadyStarted) => {
                Outcome::line("[Error]Start failed: competition has started.")
            }
            Err(err) => {
                warn!("START rejected: {}", err);
                Outcome::silent()
            }
        },
        Command::Submit {
            problem,
            team,
            status,
            time,
        } => {
            if let Err(err) = engine.submit(&team, problem, status, time) {
                warn!(
                    "SUBMIT {} by {} ignored: {}",
                    problem_letter(problem),
                    team,
                    err
                );
            }
            Outcome::silent()
        }
        Command::Flush => {
            engine.flush();
            Outcome::line("[Info]Flush scoreboard.")
        }
        Command::Freeze => match engine.freeze() {
            Ok(()) => Outcome::line("[Info]Freeze scoreboard."),
            Err(_) => Outcome::line("[Error]Freeze failed: scoreboard has been frozen."),
        },
        Command::Scroll => match engine.scroll() {
            Ok(report) => {
                let mut lines = vec!["[Info]Scroll scoreboard.".to_string()];
                lines.extend(report.before.lines());
                lines.extend(report.changes.iter().map(ToString::to_string));
                lines.extend(report.after.lines());
                Outcome {
                    lines,
                    finished: false,
                    scroll: Some(report),
                }
            }
            Err(_) => Outcome::line("[Error]Scroll failed: scoreboard has not been frozen."),
        },
        Command::QueryRanking { team } => match engine.query_ranking(&team) {
            Ok(answer) => {
                let mut lines = vec!["[Info]Complete query ranking.".to_string()];
                if answer.frozen {
                    lines.push(FROZEN_WARNING.to_string());
                }
                lines.push(format!("{} NOW AT RANKING {}", answer.team, answer.rank));
                Outcome {
                    lines,
                    ..Outcome::default()
                }
            }
            Err(_) => Outcome::line("[Error]Query ranking failed: cannot find the team."),
        },
        Command::QuerySubmission {
            team,
            problem,
            status,
        } => match engine.query_submission(&team, problem, status) {
            Ok(found) => {
                let answer = match found {
                    Some(submission) => format!(
                        "{} {} {} {}",
                        team,
                        problem_letter(submission.problem),
                        submission.status,
                        submission.time
                    ),
                    None => "Cannot find any submission.".to_string(),
                };
                Outcome {
                    lines: vec!["[Info]Complete query submission.".to_string(), answer],
                    ..Outcome::default()
                }
            }
            Err(_) => Outcome::line("[Error]Query submission failed: cannot find the team."),
        },
        Command::End => Outcome {
            lines: vec!["[Info]Competition ends.".to_string()],
            finished: true,
            scroll: None,
        },
    }
}
