use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::{Team, TeamId};
use crate::services::contest_engine::EngineError;

/// Team roster. Open for registration until the contest starts, then locked.
#[derive(Debug, Default)]
pub struct TeamRegistry {
    teams: Vec<Team>,
    by_name: HashMap<String, TeamId>,
    locked: bool,
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str) -> Result<TeamId, EngineError> {
        if self.locked {
            return Err(EngineError::AlreadyStarted);
        }
        if self.by_name.contains_key(name) {
            return Err(EngineError::DuplicateTeam(name.to_string()));
        }

        let id = TeamId(self.teams.len());
        self.teams.push(Team::new(id, name.to_string()));
        self.by_name.insert(name.to_string(), id);
        debug!("Registered team {} as {}", name, id);
        Ok(id)
    }

    /// Freezes the roster, allocates problem storage and fixes the name order tiebreak.
    pub fn lock(&mut self, problem_count: usize) {
        let mut order: Vec<usize> = (0..self.teams.len()).collect();
        order.sort_by(|&a, &b| self.teams[a].name.cmp(&self.teams[b].name));
        for (lex_rank, index) in order.into_iter().enumerate() {
            self.teams[index].lex_rank = lex_rank;
        }

        for team in &mut self.teams {
            team.allocate_problems(problem_count);
        }
        self.locked = true;
        info!(
            "Roster locked with {} teams and {} problems",
            self.teams.len(),
            problem_count
        );
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn find(&self, name: &str) -> Option<TeamId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, id: TeamId) -> &Team {
        &self.teams[id.0]
    }

    pub fn get_mut(&mut self, id: TeamId) -> &mut Team {
        &mut self.teams[id.0]
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn teams_mut(&mut self) -> &mut [Team] {
        &mut self.teams
    }

    pub(crate) fn len(&self) -> usize {
        self.teams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_duplicate_names() {
        let mut registry = TeamRegistry::new();
        assert_eq!(registry.add("alpha").unwrap(), TeamId(0));
        assert!(matches!(
            registry.add("alpha"),
            Err(EngineError::DuplicateTeam(name)) if name == "alpha"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejects_after_lock() {
        let mut registry = TeamRegistry::new();
        registry.add("alpha").unwrap();
        registry.lock(3);
        assert!(matches!(
            registry.add("beta"),
            Err(EngineError::AlreadyStarted)
        ));
        assert_eq!(registry.get(TeamId(0)).problems.len(), 3);
    }

    #[test]
    fn test_lex_ranks_follow_name_order() {
        let mut registry = TeamRegistry::new();
        for name in ["delta", "Bravo", "alpha", "charlie"] {
            registry.add(name).unwrap();
        }
        registry.lock(1);

        let ranks: Vec<(&str, usize)> = registry
            .teams()
            .iter()
            .map(|team| (team.name.as_str(), team.lex_rank))
            .collect();
        // byte order: upper case sorts before lower case
        assert_eq!(
            ranks,
            vec![("delta", 3), ("Bravo", 0), ("alpha", 1), ("charlie", 2)]
        );
        assert_eq!(registry.find("charlie"), Some(TeamId(3)));
        assert_eq!(registry.find("echo"), None);
    }
}
