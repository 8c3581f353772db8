use super::generator::ProposalDistribution;
use crate::core::alphabet::Alphabet;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Parameter '{0}' must be at least 1")]
    ZeroParameter(&'static str),

    #[error(
        "max_mutations_per_candidate ({max_mutations}) exceeds sequence_length ({sequence_length})"
    )]
    MutationsExceedLength {
        max_mutations: usize,
        sequence_length: usize,
    },

    #[error("Allowed position {position} is outside a sequence of length {sequence_length}")]
    PositionOutOfRange {
        position: usize,
        sequence_length: usize,
    },

    #[error("The allowed position set is empty")]
    EmptyAllowedPositions,

    #[error("The allowed substitute set for position {position} is empty")]
    EmptySubstitutes { position: usize },

    #[error("Allowed substitute '{symbol}' for position {position} is not in the alphabet")]
    SubstituteNotInAlphabet { position: usize, symbol: char },

    #[error("acquisition_beta must be finite and non-negative, got {0}")]
    InvalidBeta(f64),

    #[error("min_improvement_delta must be finite and non-negative, got {0}")]
    InvalidDelta(f64),

    #[error("Invalid proposal distribution: {0}")]
    InvalidProposal(String),

    #[error("Invalid re-seeding policy: {0}")]
    InvalidReseed(String),

    #[error("No seed sequences were supplied")]
    NoSeeds,

    #[error("Seed {index} has length {found}, expected sequence_length {expected}")]
    SeedLength {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Model expects {model} features but the encoder produces {encoder}")]
    ModelDimension { model: usize, encoder: usize },
}

/// Where and how far a candidate may move away from the seed it was generated from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutationConstraint {
    pub max_mutations_per_candidate: usize,
    /// `None` allows every position.
    pub allowed_positions: Option<BTreeSet<usize>>,
    /// Positions absent from the map may take any alphabet symbol.
    pub allowed_substitutes: BTreeMap<usize, Vec<u8>>,
}

impl MutationConstraint {
    pub fn new(max_mutations_per_candidate: usize) -> Self {
        Self {
            max_mutations_per_candidate,
            ..Self::default()
        }
    }

    pub fn is_position_allowed(&self, position: usize) -> bool {
        self.allowed_positions
            .as_ref()
            .is_none_or(|set| set.contains(&position))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenerationMode {
    /// Enumerate every candidate once, in canonical order.
    Exhaustive,
    /// Draw up to `sample_size` unvisited candidates per iteration (never more than
    /// `batch_size_per_iteration`).
    Sampling { sample_size: usize },
    /// Exhaustive when the neighbourhood holds at most `exhaustive_limit` candidates.
    Auto { exhaustive_limit: u128 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceConfig {
    pub min_improvement_delta: f64,
    pub patience_iterations: usize,
}

/// Whether frontier members become seeds for later iterations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReseedPolicy {
    #[default]
    Disabled,
    /// After every merge the best `count` frontier members not yet used become seeds.
    /// Candidates more than `max_total_mutations` away from every original seed are dropped.
    TopFrontier {
        count: usize,
        max_total_mutations: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub alphabet: Alphabet,
    pub sequence_length: usize,
    pub constraint: MutationConstraint,
    pub acquisition_beta: f64,
    pub frontier_size: usize,
    pub batch_size_per_iteration: usize,
    pub max_iterations: usize,
    pub max_evaluations: Option<usize>,
    pub convergence: ConvergenceConfig,
    pub generation: GenerationMode,
    pub proposal: Option<ProposalDistribution>,
    pub reseed: ReseedPolicy,
    pub random_seed: u64,
    /// Failing candidates a batch may drop before the search aborts.
    pub encoding_failure_tolerance: usize,
}

impl SearchConfig {
    /// Cap on the distance between any candidate and its nearest original seed.
    pub fn max_total_mutations(&self) -> usize {
        match self.reseed {
            ReseedPolicy::Disabled => self.constraint.max_mutations_per_candidate,
            ReseedPolicy::TopFrontier {
                max_total_mutations,
                ..
            } => max_total_mutations,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequence_length == 0 {
            return Err(ConfigError::ZeroParameter("sequence_length"));
        }
        let constraint = &self.constraint;
        if constraint.max_mutations_per_candidate == 0 {
            return Err(ConfigError::ZeroParameter("max_mutations_per_candidate"));
        }
        if constraint.max_mutations_per_candidate > self.sequence_length {
            return Err(ConfigError::MutationsExceedLength {
                max_mutations: constraint.max_mutations_per_candidate,
                sequence_length: self.sequence_length,
            });
        }
        if let Some(positions) = &constraint.allowed_positions {
            if positions.is_empty() {
                return Err(ConfigError::EmptyAllowedPositions);
            }
            if let Some(&position) = positions.iter().find(|&&p| p >= self.sequence_length) {
                return Err(ConfigError::PositionOutOfRange {
                    position,
                    sequence_length: self.sequence_length,
                });
            }
        }
        for (&position, symbols) in &constraint.allowed_substitutes {
            if position >= self.sequence_length {
                return Err(ConfigError::PositionOutOfRange {
                    position,
                    sequence_length: self.sequence_length,
                });
            }
            if symbols.is_empty() {
                return Err(ConfigError::EmptySubstitutes { position });
            }
            if let Some(&symbol) = symbols.iter().find(|&&s| !self.alphabet.contains(s)) {
                return Err(ConfigError::SubstituteNotInAlphabet {
                    position,
                    symbol: symbol as char,
                });
            }
        }

        if !self.acquisition_beta.is_finite() || self.acquisition_beta < 0.0 {
            return Err(ConfigError::InvalidBeta(self.acquisition_beta));
        }
        if self.frontier_size == 0 {
            return Err(ConfigError::ZeroParameter("frontier_size"));
        }
        if self.batch_size_per_iteration == 0 {
            return Err(ConfigError::ZeroParameter("batch_size_per_iteration"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroParameter("max_iterations"));
        }
        if self.max_evaluations == Some(0) {
            return Err(ConfigError::ZeroParameter("max_evaluations"));
        }
        let delta = self.convergence.min_improvement_delta;
        if !delta.is_finite() || delta < 0.0 {
            return Err(ConfigError::InvalidDelta(delta));
        }
        if self.generation == (GenerationMode::Sampling { sample_size: 0 }) {
            return Err(ConfigError::ZeroParameter("sample_size"));
        }
        if self.convergence.patience_iterations == 0 {
            return Err(ConfigError::ZeroParameter("convergence_patience"));
        }

        if let Some(proposal) = &self.proposal {
            proposal
                .validate(&self.alphabet, self.sequence_length)
                .map_err(ConfigError::InvalidProposal)?;
        }

        if let ReseedPolicy::TopFrontier {
            count,
            max_total_mutations,
        } = self.reseed
        {
            if count == 0 {
                return Err(ConfigError::InvalidReseed(
                    "count must be at least 1".to_string(),
                ));
            }
            if max_total_mutations < constraint.max_mutations_per_candidate {
                return Err(ConfigError::InvalidReseed(format!(
                    "max_total_mutations ({max_total_mutations}) is smaller than max_mutations_per_candidate ({})",
                    constraint.max_mutations_per_candidate
                )));
            }
            if max_total_mutations > self.sequence_length {
                return Err(ConfigError::InvalidReseed(format!(
                    "max_total_mutations ({max_total_mutations}) exceeds sequence_length ({})",
                    self.sequence_length
                )));
            }
        }
        Ok(())
    }
}

pub const DEFAULT_ACQUISITION_BETA: f64 = 1.0;
pub const DEFAULT_FRONTIER_SIZE: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 256;
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
pub const DEFAULT_MIN_IMPROVEMENT_DELTA: f64 = 1e-6;
pub const DEFAULT_PATIENCE: usize = 3;
pub const DEFAULT_EXHAUSTIVE_LIMIT: u128 = 100_000;
pub const DEFAULT_ENCODING_FAILURE_TOLERANCE: usize = 0;

#[derive(Default)]
pub struct SearchConfigBuilder {
    alphabet: Option<Alphabet>,
    sequence_length: Option<usize>,
    max_mutations_per_candidate: Option<usize>,
    allowed_positions: Option<BTreeSet<usize>>,
    allowed_substitutes: BTreeMap<usize, Vec<u8>>,
    acquisition_beta: Option<f64>,
    frontier_size: Option<usize>,
    batch_size_per_iteration: Option<usize>,
    max_iterations: Option<usize>,
    max_evaluations: Option<usize>,
    min_improvement_delta: Option<f64>,
    convergence_patience: Option<usize>,
    generation: Option<GenerationMode>,
    proposal: Option<ProposalDistribution>,
    reseed: Option<ReseedPolicy>,
    random_seed: Option<u64>,
    encoding_failure_tolerance: Option<usize>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = Some(alphabet);
        self
    }
    pub fn sequence_length(mut self, length: usize) -> Self {
        self.sequence_length = Some(length);
        self
    }
    pub fn max_mutations_per_candidate(mut self, n: usize) -> Self {
        self.max_mutations_per_candidate = Some(n);
        self
    }
    pub fn allowed_positions(mut self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.allowed_positions = Some(positions.into_iter().collect());
        self
    }
    pub fn allowed_substitutes(mut self, position: usize, symbols: impl AsRef<[u8]>) -> Self {
        self.allowed_substitutes
            .insert(position, symbols.as_ref().to_vec());
        self
    }
    pub fn acquisition_beta(mut self, beta: f64) -> Self {
        self.acquisition_beta = Some(beta);
        self
    }
    pub fn frontier_size(mut self, k: usize) -> Self {
        self.frontier_size = Some(k);
        self
    }
    pub fn batch_size_per_iteration(mut self, n: usize) -> Self {
        self.batch_size_per_iteration = Some(n);
        self
    }
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }
    pub fn max_evaluations(mut self, n: Option<usize>) -> Self {
        self.max_evaluations = n;
        self
    }
    pub fn min_improvement_delta(mut self, delta: f64) -> Self {
        self.min_improvement_delta = Some(delta);
        self
    }
    pub fn convergence_patience(mut self, n: usize) -> Self {
        self.convergence_patience = Some(n);
        self
    }
    pub fn generation(mut self, mode: GenerationMode) -> Self {
        self.generation = Some(mode);
        self
    }
    pub fn proposal(mut self, proposal: Option<ProposalDistribution>) -> Self {
        self.proposal = proposal;
        self
    }
    pub fn reseed(mut self, policy: ReseedPolicy) -> Self {
        self.reseed = Some(policy);
        self
    }
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
    pub fn encoding_failure_tolerance(mut self, n: usize) -> Self {
        self.encoding_failure_tolerance = Some(n);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        let config = SearchConfig {
            alphabet: self
                .alphabet
                .ok_or(ConfigError::MissingParameter("alphabet"))?,
            sequence_length: self
                .sequence_length
                .ok_or(ConfigError::MissingParameter("sequence_length"))?,
            constraint: MutationConstraint {
                max_mutations_per_candidate: self
                    .max_mutations_per_candidate
                    .ok_or(ConfigError::MissingParameter("max_mutations_per_candidate"))?,
                allowed_positions: self.allowed_positions,
                allowed_substitutes: self.allowed_substitutes,
            },
            acquisition_beta: self.acquisition_beta.unwrap_or(DEFAULT_ACQUISITION_BETA),
            frontier_size: self.frontier_size.unwrap_or(DEFAULT_FRONTIER_SIZE),
            batch_size_per_iteration: self
                .batch_size_per_iteration
                .unwrap_or(DEFAULT_BATCH_SIZE),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            max_evaluations: self.max_evaluations,
            convergence: ConvergenceConfig {
                min_improvement_delta: self
                    .min_improvement_delta
                    .unwrap_or(DEFAULT_MIN_IMPROVEMENT_DELTA),
                patience_iterations: self.convergence_patience.unwrap_or(DEFAULT_PATIENCE),
            },
            generation: self.generation.unwrap_or(GenerationMode::Auto {
                exhaustive_limit: DEFAULT_EXHAUSTIVE_LIMIT,
            }),
            proposal: self.proposal,
            reseed: self.reseed.unwrap_or_default(),
            random_seed: self.random_seed.unwrap_or(0),
            encoding_failure_tolerance: self
                .encoding_failure_tolerance
                .unwrap_or(DEFAULT_ENCODING_FAILURE_TOLERANCE),
        };
        config.validate()?;
        Ok(config)
    }
}
