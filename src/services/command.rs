use std::str::FromStr;

use thiserror::Error;

use crate::models::{MAX_PROBLEMS, SubmissionStatus};
use crate::services::submission_ledger::{ProblemFilter, StatusFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTeam {
        name: String,
    },
    Start {
        duration: u64,
        problem_count: usize,
    },
    Submit {
        problem: usize,
        team: String,
        status: SubmissionStatus,
        time: u64,
    },
    Flush,
    Freeze,
    Scroll,
    QueryRanking {
        team: String,
    },
    QuerySubmission {
        team: String,
        problem: ProblemFilter,
        status: StatusFilter,
    },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty line")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("{command}: expected {expected}")]
    Malformed {
        command: &'static str,
        expected: &'static str,
    },
    #[error("invalid problem '{0}'")]
    InvalidProblem(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error(transparent)]
    InvalidStatus(#[from] crate::models::ParseStatusError),
}

fn parse_problem(token: &str) -> Result<usize, ParseCommandError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(letter @ 'A'..='Z'), None) => Ok((letter as u8 - b'A') as usize),
        _ => Err(ParseCommandError::InvalidProblem(token.to_string())),
    }
}

fn parse_number<T: FromStr>(token: &str) -> Result<T, ParseCommandError> {
    token
        .parse()
        .map_err(|_| ParseCommandError::InvalidNumber(token.to_string()))
}

/// Value of a `KEY=value` token, if the key matches.
fn keyed<'a>(token: &'a str, key: &str) -> Option<&'a str> {
    token.strip_prefix(key)?.strip_prefix('=')
}

fn expect_word(
    token: Option<&str>,
    word: &str,
    command: &'static str,
    expected: &'static str,
) -> Result<(), ParseCommandError> {
    match token {
        Some(found) if found == word => Ok(()),
        _ => Err(ParseCommandError::Malformed { command, expected }),
    }
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else {
            return Err(ParseCommandError::Empty);
        };

        let command = match head {
            "ADDTEAM" => {
                const EXPECTED: &str = "ADDTEAM <name>";
                let name = tokens.next().ok_or(ParseCommandError::Malformed {
                    command: "ADDTEAM",
                    expected: EXPECTED,
                })?;
                Command::AddTeam {
                    name: name.to_string(),
                }
            }
            "START" => {
                const EXPECTED: &str = "START DURATION <n> PROBLEM <n>";
                let malformed = || ParseCommandError::Malformed {
                    command: "START",
                    expected: EXPECTED,
                };
                expect_word(tokens.next(), "DURATION", "START", EXPECTED)?;
                let duration: u64 = parse_number(tokens.next().ok_or_else(malformed)?)?;
                expect_word(tokens.next(), "PROBLEM", "START", EXPECTED)?;
                let problem_count: usize = parse_number(tokens.next().ok_or_else(malformed)?)?;
                if problem_count > MAX_PROBLEMS {
                    return Err(ParseCommandError::InvalidNumber(problem_count.to_string()));
                }
                Command::Start {
                    duration,
                    problem_count,
                }
            }
            "SUBMIT" => {
                const EXPECTED: &str = "SUBMIT <problem> BY <team> WITH <status> AT <time>";
                let malformed = || ParseCommandError::Malformed {
                    command: "SUBMIT",
                    expected: EXPECTED,
                };
                let problem = parse_problem(tokens.next().ok_or_else(malformed)?)?;
                expect_word(tokens.next(), "BY", "SUBMIT", EXPECTED)?;
                let team = tokens.next().ok_or_else(malformed)?.to_string();
                expect_word(tokens.next(), "WITH", "SUBMIT", EXPECTED)?;
                let status: SubmissionStatus = tokens.next().ok_or_else(malformed)?.parse()?;
                expect_word(tokens.next(), "AT", "SUBMIT", EXPECTED)?;
                let time: u64 = parse_number(tokens.next().ok_or_else(malformed)?)?;
                Command::Submit {
                    problem,
                    team,
                    status,
                    time,
                }
            }
            "FLUSH" => Command::Flush,
            "FREEZE" => Command::Freeze,
            "SCROLL" => Command::Scroll,
            "QUERY_RANKING" => {
                let team = tokens.next().ok_or(ParseCommandError::Malformed {
                    command: "QUERY_RANKING",
                    expected: "QUERY_RANKING <team>",
                })?;
                Command::QueryRanking {
                    team: team.to_string(),
                }
            }
            "QUERY_SUBMISSION" => {
                const EXPECTED: &str =
                    "QUERY_SUBMISSION <team> WHERE PROBLEM=<problem> AND STATUS=<status>";
                let malformed = || ParseCommandError::Malformed {
                    command: "QUERY_SUBMISSION",
                    expected: EXPECTED,
                };
                let team = tokens.next().ok_or_else(malformed)?.to_string();
                expect_word(tokens.next(), "WHERE", "QUERY_SUBMISSION", EXPECTED)?;
                let problem = match tokens.next().and_then(|t| keyed(t, "PROBLEM")) {
                    Some("ALL") => ProblemFilter::All,
                    Some(value) => ProblemFilter::Problem(parse_problem(value)?),
                    None => return Err(malformed()),
                };
                expect_word(tokens.next(), "AND", "QUERY_SUBMISSION", EXPECTED)?;
                let status = match tokens.next().and_then(|t| keyed(t, "STATUS")) {
                    Some("ALL") => StatusFilter::All,
                    Some(value) => StatusFilter::Status(value.parse::<SubmissionStatus>()?),
                    None => return Err(malformed()),
                };
                Command::QuerySubmission {
                    team,
                    problem,
                    status,
                }
            }
            "END" => Command::End,
            other => return Err(ParseCommandError::UnknownCommand(other.to_string())),
        };

        Ok(command)
    }
}
