use super::config::{GenerationMode, MutationConstraint, SearchConfig};
use crate::core::alphabet::Alphabet;
use crate::core::sequence::Sequence;
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Neighbourhoods up to this size are enumerated and shuffled rather than rejection-sampled.
const ENUMERATION_THRESHOLD: u128 = 4096;
const MAX_DRAWS_PER_CANDIDATE: usize = 32;
/// Upper bound on how many unvisited candidates one enumeration pass collects.
const REMAINDER_CAP: usize = ENUMERATION_THRESHOLD as usize;

/// Per-position, per-symbol proposal weights for stochastic generation.
///
/// Positions without an entry weight every symbol equally. A zero weight removes that
/// substitution from the mutation space altogether, in every generation mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProposalDistribution {
    weights: BTreeMap<usize, Vec<f64>>,
}

impl ProposalDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// `weights` holds one entry per alphabet symbol, in rank order.
    pub fn with_position(mut self, position: usize, weights: Vec<f64>) -> Self {
        self.weights.insert(position, weights);
        self
    }

    pub fn weight(&self, position: usize, rank: usize) -> f64 {
        self.weights
            .get(&position)
            .and_then(|w| w.get(rank).copied())
            .unwrap_or(1.0)
    }

    pub(crate) fn validate(&self, alphabet: &Alphabet, sequence_length: usize) -> Result<(), String> {
        for (&position, weights) in &self.weights {
            if position >= sequence_length {
                return Err(format!(
                    "position {position} is outside a sequence of length {sequence_length}"
                ));
            }
            if weights.len() != alphabet.len() {
                return Err(format!(
                    "position {position} has {} weights, expected one per symbol ({})",
                    weights.len(),
                    alphabet.len()
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(format!(
                    "weights for position {position} must be finite and non-negative"
                ));
            }
        }
        Ok(())
    }
}

/// A generated candidate awaiting evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub sequence: Sequence,
    /// Index of the seed the candidate was derived from (original seeds first).
    pub seed_index: usize,
    /// Distance to the nearest original seed.
    pub mutation_distance: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Batch(Vec<Proposal>),
    /// No unvisited candidate remains within the constraint bounds.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMode {
    Exhaustive,
    Sampling { sample_size: usize },
}

#[derive(Debug)]
struct PositionOptions {
    position: usize,
    substitutes: Vec<u8>,
    weights: Vec<f64>,
    mass: f64,
}

#[derive(Debug)]
struct SeedNeighbourhood {
    sequence: Sequence,
    options: Arc<Vec<PositionOptions>>,
    /// `suffix[i][k]`: summed weight of choosing `k` mutations among `options[i..]`.
    suffix: Vec<Vec<f64>>,
    /// Exact number of mutants at each distance, saturating.
    counts: Vec<u128>,
}

impl SeedNeighbourhood {
    fn new(
        sequence: Sequence,
        alphabet: &Alphabet,
        constraint: &MutationConstraint,
        proposal: Option<&ProposalDistribution>,
    ) -> Self {
        let max_k = constraint.max_mutations_per_candidate;
        let options: Vec<PositionOptions> = (0..sequence.len())
            .filter(|&position| constraint.is_position_allowed(position))
            .filter_map(|position| {
                let current = sequence.symbol(position);
                let mut candidates = match constraint.allowed_substitutes.get(&position) {
                    Some(symbols) => symbols.clone(),
                    None => alphabet.symbols().to_vec(),
                };
                candidates.sort_by_key(|&s| alphabet.rank_of(s));
                candidates.dedup();

                let mut substitutes = Vec::with_capacity(candidates.len());
                let mut weights = Vec::with_capacity(candidates.len());
                for symbol in candidates {
                    if Some(symbol) == current {
                        continue;
                    }
                    let Some(rank) = alphabet.rank_of(symbol) else {
                        continue;
                    };
                    let weight = proposal.map_or(1.0, |p| p.weight(position, rank));
                    if weight > 0.0 {
                        substitutes.push(symbol);
                        weights.push(weight);
                    }
                }
                (!substitutes.is_empty()).then(|| PositionOptions {
                    position,
                    mass: weights.iter().sum(),
                    substitutes,
                    weights,
                })
            })
            .collect();

        let m = options.len();
        let mut suffix = vec![vec![0.0; max_k + 1]; m + 1];
        suffix[m][0] = 1.0;
        for i in (0..m).rev() {
            suffix[i][0] = 1.0;
            for k in 1..=max_k {
                suffix[i][k] = suffix[i + 1][k] + options[i].mass * suffix[i + 1][k - 1];
            }
        }

        let mut counts = vec![0u128; max_k + 1];
        counts[0] = 1;
        for option in &options {
            let c = option.substitutes.len() as u128;
            for k in (1..=max_k).rev() {
                counts[k] = counts[k].saturating_add(counts[k - 1].saturating_mul(c));
            }
        }

        Self {
            sequence,
            options: Arc::new(options),
            suffix,
            counts,
        }
    }

    fn space_size(&self) -> u128 {
        self.counts
            .iter()
            .skip(1)
            .fold(0u128, |acc, &c| acc.saturating_add(c))
    }

    fn total_mass(&self) -> f64 {
        self.suffix[0].iter().skip(1).sum()
    }

    /// Draws one substitution set with probability proportional to the product of its weights.
    fn draw(&self, max_k: usize, rng: &mut StdRng) -> Option<Vec<(usize, u8)>> {
        let by_distance = WeightedIndex::new(&self.suffix[0][1..=max_k]).ok()?;
        let mut remaining = by_distance.sample(rng) + 1;
        let mut substitutions = Vec::with_capacity(remaining);

        for (i, option) in self.options.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let total = self.suffix[i][remaining];
            let include = option.mass * self.suffix[i + 1][remaining - 1];
            if rng.r#gen::<f64>() * total < include {
                let pick = WeightedIndex::new(&option.weights).ok()?.sample(rng);
                substitutions.push((option.position, option.substitutes[pick]));
                remaining -= 1;
            }
        }
        (remaining == 0).then_some(substitutions)
    }
}

type MutantIter = Box<dyn Iterator<Item = Vec<(usize, u8)>> + Send>;

/// Every substitution set of size `1..=max_k`, in canonical order: by distance, then by
/// ascending position combination, then by ascending substitute rank.
fn mutants_of(options: Arc<Vec<PositionOptions>>, max_k: usize) -> MutantIter {
    let m = options.len();
    Box::new((1..=max_k.min(m)).flat_map(move |k| {
        let options = Arc::clone(&options);
        (0..m).combinations(k).flat_map(move |combo| {
            combo
                .iter()
                .map(|&i| {
                    let option = &options[i];
                    option
                        .substitutes
                        .iter()
                        .map(|&s| (option.position, s))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
                .into_iter()
                .multi_cartesian_product()
        })
    }))
}

fn iteration_rng(random_seed: u64, iteration: usize) -> StdRng {
    StdRng::seed_from_u64(random_seed ^ (iteration as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

#[derive(Default)]
struct ExhaustiveCursor {
    seed_index: usize,
    mutants: Option<MutantIter>,
}

/// Produces unvisited candidates within the mutation bounds of the current seeds.
pub struct MutationSpaceGenerator {
    alphabet: Alphabet,
    constraint: MutationConstraint,
    proposal: Option<ProposalDistribution>,
    mode: ResolvedMode,
    random_seed: u64,
    max_total_mutations: usize,
    origins: Vec<Sequence>,
    seeds: Vec<SeedNeighbourhood>,
    seed_set: HashSet<Sequence>,
    cursor: ExhaustiveCursor,
    pending: VecDeque<Proposal>,
}

impl fmt::Debug for MutationSpaceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationSpaceGenerator")
            .field("mode", &self.mode)
            .field("seeds", &self.seeds.len())
            .field("cursor_seed", &self.cursor.seed_index)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl MutationSpaceGenerator {
    /// `seeds` must already be validated against the alphabet and the session length.
    pub fn new(config: &SearchConfig, seeds: &[Sequence]) -> Self {
        let mut generator = Self {
            alphabet: config.alphabet.clone(),
            constraint: config.constraint.clone(),
            proposal: config.proposal.clone(),
            mode: ResolvedMode::Exhaustive,
            random_seed: config.random_seed,
            max_total_mutations: config.max_total_mutations(),
            origins: Vec::new(),
            seeds: Vec::new(),
            seed_set: HashSet::new(),
            cursor: ExhaustiveCursor::default(),
            pending: VecDeque::new(),
        };
        for seed in seeds {
            if generator.add_seed(seed.clone()) {
                generator.origins.push(seed.clone());
            }
        }

        generator.mode = match config.generation {
            GenerationMode::Exhaustive => ResolvedMode::Exhaustive,
            GenerationMode::Sampling { sample_size } => ResolvedMode::Sampling { sample_size },
            GenerationMode::Auto { exhaustive_limit } => {
                if generator.space_size() <= exhaustive_limit {
                    ResolvedMode::Exhaustive
                } else {
                    ResolvedMode::Sampling {
                        sample_size: config.batch_size_per_iteration,
                    }
                }
            }
        };
        debug!(
            mode = ?generator.mode,
            space_size = generator.space_size(),
            "Mutation space generator ready"
        );
        generator
    }

    pub fn mode(&self) -> ResolvedMode {
        self.mode
    }

    pub fn origins(&self) -> &[Sequence] {
        &self.origins
    }

    pub fn seeds(&self) -> impl Iterator<Item = &Sequence> {
        self.seeds.iter().map(|s| &s.sequence)
    }

    pub fn is_seed(&self, sequence: &Sequence) -> bool {
        self.seed_set.contains(sequence)
    }

    /// Number of mutants in the neighbourhoods of all current seeds, counted per seed.
    pub fn space_size(&self) -> u128 {
        self.seeds
            .iter()
            .fold(0u128, |acc, s| acc.saturating_add(s.space_size()))
    }

    /// Registers another sequence whose neighbourhood is explored in later calls.
    ///
    /// Returns `false` when the sequence is already a seed.
    pub fn add_seed(&mut self, sequence: Sequence) -> bool {
        if self.seed_set.contains(&sequence) {
            return false;
        }
        let neighbourhood = SeedNeighbourhood::new(
            sequence.clone(),
            &self.alphabet,
            &self.constraint,
            self.proposal.as_ref(),
        );
        self.seeds.push(neighbourhood);
        self.seed_set.insert(sequence);
        true
    }

    /// Returns proposals that were never evaluated so the next call hands them out first.
    pub fn requeue(&mut self, proposals: Vec<Proposal>) {
        for proposal in proposals.into_iter().rev() {
            self.pending.push_front(proposal);
        }
    }

    /// Minimum distance from `sequence` to any original seed.
    pub fn distance_to_origins(&self, sequence: &Sequence) -> usize {
        self.origins
            .iter()
            .map(|o| o.mutation_distance(sequence))
            .min()
            .unwrap_or(0)
    }

    /// Up to `limit` distinct candidates absent from `visited`.
    #[instrument(skip(self, visited), fields(visited = visited.len()))]
    pub fn propose(
        &mut self,
        limit: usize,
        visited: &HashSet<Sequence>,
        iteration: usize,
    ) -> Generation {
        let limit = match self.mode {
            ResolvedMode::Exhaustive => limit,
            ResolvedMode::Sampling { sample_size } => limit.min(sample_size),
        };
        let mut batch = Vec::with_capacity(limit.min(4096));
        let mut taken = HashSet::new();

        while batch.len() < limit {
            let Some(proposal) = self.pending.pop_front() else {
                break;
            };
            if !visited.contains(&proposal.sequence) && taken.insert(proposal.sequence.clone()) {
                batch.push(proposal);
            }
        }

        if batch.len() < limit {
            match self.mode {
                ResolvedMode::Exhaustive => {
                    self.fill_exhaustive(limit, visited, &mut batch, &mut taken)
                }
                ResolvedMode::Sampling { .. } => {
                    self.fill_sampled(limit, visited, iteration, &mut batch, &mut taken)
                }
            }
        }

        if batch.is_empty() {
            debug!("Mutation space exhausted");
            Generation::Exhausted
        } else {
            trace!(count = batch.len(), "Proposed candidates");
            Generation::Batch(batch)
        }
    }

    fn admit(
        &self,
        seed_index: usize,
        substitutions: &[(usize, u8)],
        visited: &HashSet<Sequence>,
        taken: &mut HashSet<Sequence>,
    ) -> Option<Proposal> {
        let sequence = self.seeds[seed_index]
            .sequence
            .with_substitutions(substitutions)
            .ok()?;
        if visited.contains(&sequence) || self.seed_set.contains(&sequence) || taken.contains(&sequence)
        {
            return None;
        }
        let mutation_distance = self.distance_to_origins(&sequence);
        if mutation_distance > self.max_total_mutations {
            return None;
        }
        taken.insert(sequence.clone());
        Some(Proposal {
            sequence,
            seed_index,
            mutation_distance,
        })
    }

    fn fill_exhaustive(
        &mut self,
        limit: usize,
        visited: &HashSet<Sequence>,
        batch: &mut Vec<Proposal>,
        taken: &mut HashSet<Sequence>,
    ) {
        let max_k = self.constraint.max_mutations_per_candidate;
        while batch.len() < limit {
            if self.cursor.mutants.is_none() {
                let Some(seed) = self.seeds.get(self.cursor.seed_index) else {
                    return;
                };
                self.cursor.mutants = Some(mutants_of(Arc::clone(&seed.options), max_k));
            }
            let next = self.cursor.mutants.as_mut().and_then(Iterator::next);
            match next {
                Some(substitutions) => {
                    if let Some(proposal) =
                        self.admit(self.cursor.seed_index, &substitutions, visited, taken)
                    {
                        batch.push(proposal);
                    }
                }
                None => {
                    self.cursor.mutants = None;
                    self.cursor.seed_index += 1;
                }
            }
        }
    }

    fn fill_sampled(
        &self,
        limit: usize,
        visited: &HashSet<Sequence>,
        iteration: usize,
        batch: &mut Vec<Proposal>,
        taken: &mut HashSet<Sequence>,
    ) {
        let mut rng = iteration_rng(self.random_seed, iteration);
        if self.space_size() <= ENUMERATION_THRESHOLD {
            self.fill_from_enumeration(limit, visited, &mut rng, batch, taken);
            return;
        }

        let masses: Vec<f64> = self.seeds.iter().map(SeedNeighbourhood::total_mass).collect();
        let Ok(seed_choice) = WeightedIndex::new(&masses) else {
            return;
        };
        let max_k = self.constraint.max_mutations_per_candidate;
        let mut draws = (limit - batch.len()).saturating_mul(MAX_DRAWS_PER_CANDIDATE);
        while batch.len() < limit && draws > 0 {
            draws -= 1;
            let seed_index = seed_choice.sample(&mut rng);
            let Some(substitutions) = self.seeds[seed_index].draw(max_k, &mut rng) else {
                continue;
            };
            if let Some(proposal) = self.admit(seed_index, &substitutions, visited, taken) {
                batch.push(proposal);
            }
        }

        // Rejection only starves once nearly every candidate has been visited, at which
        // point the unvisited remainder is small enough to list.
        if batch.is_empty() {
            debug!("Sampling found no unvisited candidate, enumerating the remainder");
            self.fill_from_enumeration(limit, visited, &mut rng, batch, taken);
        }
    }

    fn fill_from_enumeration(
        &self,
        limit: usize,
        visited: &HashSet<Sequence>,
        rng: &mut StdRng,
        batch: &mut Vec<Proposal>,
        taken: &mut HashSet<Sequence>,
    ) {
        let max_k = self.constraint.max_mutations_per_candidate;
        let mut remainder = Vec::new();
        'seeds: for (seed_index, seed) in self.seeds.iter().enumerate() {
            for substitutions in mutants_of(Arc::clone(&seed.options), max_k) {
                if remainder.len() >= REMAINDER_CAP {
                    trace!("Remainder enumeration reached its cap");
                    break 'seeds;
                }
                if let Some(proposal) = self.admit(seed_index, &substitutions, visited, taken) {
                    let weight = self.weight_of(&substitutions);
                    remainder.push((proposal, weight));
                }
            }
        }

        let wanted = limit - batch.len();
        if remainder.len() <= wanted {
            remainder.shuffle(rng);
            batch.extend(remainder.into_iter().map(|(p, _)| p));
            return;
        }
        if self.proposal.is_some() {
            if let Ok(chosen) = remainder.choose_multiple_weighted(rng, wanted, |(_, w)| *w) {
                batch.extend(chosen.map(|(p, _)| p.clone()));
                return;
            }
        }
        remainder.shuffle(rng);
        batch.extend(remainder.into_iter().take(wanted).map(|(p, _)| p));
    }

    fn weight_of(&self, substitutions: &[(usize, u8)]) -> f64 {
        let Some(proposal) = &self.proposal else {
            return 1.0;
        };
        substitutions
            .iter()
            .filter_map(|&(position, symbol)| {
                self.alphabet
                    .rank_of(symbol)
                    .map(|rank| proposal.weight(position, rank))
            })
            .product()
    }
}
