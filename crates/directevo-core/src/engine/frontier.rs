use super::acquisition::compare_ranked;
use crate::core::alphabet::Alphabet;
use crate::core::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A scored sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub sequence: Sequence,
    pub mean: f64,
    /// Standard deviation of the prediction.
    pub uncertainty: f64,
    pub score: f64,
    /// Distance to the nearest original seed.
    pub mutation_distance: usize,
    /// Iteration in which the candidate was scored.
    pub iteration: usize,
    /// Encoded features, kept from scoring. Not persisted.
    #[serde(skip)]
    pub features: Option<Arc<[f64]>>,
}

/// The best `capacity` candidates seen so far, kept in ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontier {
    capacity: usize,
    members: Vec<Candidate>,
}

impl Frontier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            members: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.members.first()
    }

    pub fn contains(&self, sequence: &Sequence) -> bool {
        self.members.iter().any(|c| &c.sequence == sequence)
    }

    /// Merges a fully scored batch, returning how many of its candidates were kept.
    pub fn merge(&mut self, batch: Vec<Candidate>, alphabet: &Alphabet) -> usize {
        let incoming: HashSet<Sequence> = batch.iter().map(|c| c.sequence.clone()).collect();
        self.members.extend(batch);
        self.members.sort_by(|a, b| compare_ranked(a, b, alphabet));
        self.members.dedup_by(|a, b| a.sequence == b.sequence);
        self.members.truncate(self.capacity);
        self.members
            .iter()
            .filter(|c| incoming.contains(&c.sequence))
            .count()
    }

    pub(crate) fn restore(capacity: usize, members: Vec<Candidate>, alphabet: &Alphabet) -> Self {
        let mut frontier = Self::new(capacity);
        frontier.merge(members, alphabet);
        frontier
    }

    pub fn into_members(self) -> Vec<Candidate> {
        self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(sequence: &str, score: f64) -> Candidate {
        Candidate {
            sequence: sequence.parse().unwrap(),
            mean: score,
            uncertainty: 0.0,
            score,
            mutation_distance: 1,
            iteration: 1,
            features: None,
        }
    }

    #[test]
    fn merge_keeps_the_best_k_in_rank_order() {
        let alphabet = Alphabet::new("ABCD").unwrap();
        let mut frontier = Frontier::new(2);

        let kept = frontier.merge(
            vec![candidate("AAB", 1.0), candidate("AAC", 3.0), candidate("AAD", 2.0)],
            &alphabet,
        );
        assert_eq!(kept, 2);
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.best().unwrap().sequence.to_string(), "AAC");

        let kept = frontier.merge(vec![candidate("ABA", 0.5)], &alphabet);
        assert_eq!(kept, 0);
        let order: Vec<String> = frontier
            .members()
            .iter()
            .map(|c| c.sequence.to_string())
            .collect();
        assert_eq!(order, ["AAC", "AAD"]);
    }

    #[test]
    fn frontier_never_exceeds_capacity() {
        let alphabet = Alphabet::new("ABCD").unwrap();
        let symbols = ['A', 'B', 'C', 'D'];
        let mut frontier = Frontier::new(3);
        for round in 0..4 {
            let batch = (0..4)
                .map(|i| {
                    let sequence: String = [symbols[round], symbols[i], 'A'].iter().collect();
                    candidate(&sequence, (round * 4 + i) as f64)
                })
                .collect();
            frontier.merge(batch, &alphabet);
            assert!(frontier.len() <= 3);
        }
        assert_eq!(frontier.best().unwrap().sequence.to_string(), "DDA");
    }

    #[test]
    fn equal_scores_prefer_canonical_order() {
        let alphabet = Alphabet::new("DCBA").unwrap();
        let mut frontier = Frontier::new(1);
        frontier.merge(vec![candidate("AAA", 1.0), candidate("DAA", 1.0)], &alphabet);
        assert_eq!(frontier.best().unwrap().sequence.to_string(), "DAA");
    }
}
