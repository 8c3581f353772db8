use super::error::EngineError;
use super::frontier::{Candidate, Frontier};
use crate::core::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    /// The best score stopped improving for the configured patience.
    Converged,
    /// The iteration or evaluation budget ran out.
    BudgetExhausted,
    /// Every candidate within the mutation bounds has been visited.
    ExhaustedSpace,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Converged => "CONVERGED",
            Self::BudgetExhausted => "BUDGET_EXHAUSTED",
            Self::ExhaustedSpace => "EXHAUSTED_SPACE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStatus {
    Initialized,
    Iterating,
    Terminated(TerminationReason),
}

impl SearchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        match self {
            Self::Terminated(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Bookkeeping for one completed iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub proposed: usize,
    pub evaluated: usize,
    /// Candidates dropped because they could not be encoded.
    pub dropped: usize,
    /// Candidates from this batch that entered the frontier.
    pub admitted: usize,
    pub best_score: Option<f64>,
    pub frontier_size: usize,
    pub seeds: usize,
}

#[derive(Debug, Clone)]
pub struct SearchState {
    pub(crate) seeds: Vec<Sequence>,
    pub(crate) derived_seeds: Vec<Sequence>,
    pub(crate) visited: HashSet<Sequence>,
    pub(crate) frontier: Frontier,
    pub(crate) iteration: usize,
    pub(crate) evaluations: usize,
    pub(crate) status: SearchStatus,
    pub(crate) best_score: Option<f64>,
    pub(crate) stale_iterations: usize,
    pub(crate) history: Vec<IterationSummary>,
}

impl SearchState {
    pub(crate) fn new(seeds: Vec<Sequence>, frontier_size: usize) -> Self {
        Self {
            seeds,
            derived_seeds: Vec::new(),
            visited: HashSet::new(),
            frontier: Frontier::new(frontier_size),
            iteration: 0,
            evaluations: 0,
            status: SearchStatus::Initialized,
            best_score: None,
            stale_iterations: 0,
            history: Vec::new(),
        }
    }

    /// The original seeds, deduplicated, in input order.
    pub fn seeds(&self) -> &[Sequence] {
        &self.seeds
    }

    /// Frontier members promoted to seeds by the re-seeding policy.
    pub fn derived_seeds(&self) -> &[Sequence] {
        &self.derived_seeds
    }

    pub fn visited(&self) -> &HashSet<Sequence> {
        &self.visited
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Completed iterations.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Candidates scored by the model so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_score
    }

    /// Consecutive iterations without an improvement larger than the minimum delta.
    pub fn stale_iterations(&self) -> usize {
        self.stale_iterations
    }

    pub fn history(&self) -> &[IterationSummary] {
        &self.history
    }

    /// The outcome of a finished search, or `None` while it can still advance.
    pub fn result(&self) -> Option<SearchResult> {
        let reason = self.status.termination()?;
        Some(SearchResult {
            frontier: self.frontier.members().to_vec(),
            reason,
            iterations: self.iteration,
            evaluations: self.evaluations,
            history: self.history.clone(),
        })
    }

    pub(crate) fn to_checkpoint(&self) -> SearchCheckpoint {
        let mut visited: Vec<Sequence> = self.visited.iter().cloned().collect();
        visited.sort();
        SearchCheckpoint {
            seeds: self.seeds.clone(),
            derived_seeds: self.derived_seeds.clone(),
            iteration: self.iteration,
            evaluations: self.evaluations,
            status: self.status,
            best_score: self.best_score,
            stale_iterations: self.stale_iterations,
            visited,
            frontier: self.frontier.members().to_vec(),
            history: self.history.clone(),
        }
    }
}

/// Ranked frontier and termination reason of a finished search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub frontier: Vec<Candidate>,
    pub reason: TerminationReason,
    pub iterations: usize,
    pub evaluations: usize,
    pub history: Vec<IterationSummary>,
}

/// A serialisable snapshot of [`SearchState`] taken between iterations.
///
/// Generation is a deterministic function of the seeds, the visited set and the iteration
/// number, so resuming from a checkpoint continues exactly where the search stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchCheckpoint {
    pub seeds: Vec<Sequence>,
    #[serde(default)]
    pub derived_seeds: Vec<Sequence>,
    pub iteration: usize,
    pub evaluations: usize,
    pub status: SearchStatus,
    #[serde(default)]
    pub best_score: Option<f64>,
    #[serde(default)]
    pub stale_iterations: usize,
    #[serde(default)]
    pub visited: Vec<Sequence>,
    #[serde(default)]
    pub frontier: Vec<Candidate>,
    #[serde(default)]
    pub history: Vec<IterationSummary>,
}

impl SearchCheckpoint {
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let content = toml::to_string(self)
            .map_err(|e| EngineError::Checkpoint(format!("serialization failed: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| EngineError::Checkpoint(format!("cannot write '{}': {e}", path.display())))
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Checkpoint(format!("cannot read '{}': {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| EngineError::Checkpoint(format!("cannot parse '{}': {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seq(s: &str) -> Sequence {
        s.parse().unwrap()
    }

    #[test]
    fn termination_reasons_display_as_state_names() {
        assert_eq!(TerminationReason::Converged.to_string(), "CONVERGED");
        assert_eq!(
            TerminationReason::BudgetExhausted.to_string(),
            "BUDGET_EXHAUSTED"
        );
        assert_eq!(
            TerminationReason::ExhaustedSpace.to_string(),
            "EXHAUSTED_SPACE"
        );
    }

    #[test]
    fn result_is_only_available_once_terminal() {
        let mut state = SearchState::new(vec![seq("AAA")], 2);
        assert!(state.result().is_none());
        state.status = SearchStatus::Iterating;
        assert!(state.result().is_none());
        state.status = SearchStatus::Terminated(TerminationReason::Converged);
        assert_eq!(state.result().unwrap().reason, TerminationReason::Converged);
    }

    #[test]
    fn checkpoint_survives_a_file_round_trip() {
        let mut state = SearchState::new(vec![seq("AAA")], 2);
        state.status = SearchStatus::Iterating;
        state.iteration = 1;
        state.evaluations = 2;
        state.best_score = Some(1.0);
        state.visited.insert(seq("AAB"));
        state.visited.insert(seq("ABA"));
        state.frontier = Frontier::new(2);
        state.history.push(IterationSummary {
            iteration: 1,
            proposed: 2,
            evaluated: 2,
            dropped: 0,
            admitted: 2,
            best_score: Some(1.0),
            frontier_size: 2,
            seeds: 1,
        });

        let checkpoint = state.to_checkpoint();
        assert_eq!(checkpoint.visited, vec![seq("AAB"), seq("ABA")]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.toml");
        checkpoint.save(&path).unwrap();
        assert_eq!(SearchCheckpoint::load(&path).unwrap(), checkpoint);
    }
}
