use super::acquisition::{AcquisitionFunction, UpperConfidenceBound};
use super::config::{ConfigError, ReseedPolicy, SearchConfig};
use super::error::EngineError;
use super::frontier::{Candidate, Frontier};
use super::generator::{Generation, MutationSpaceGenerator, Proposal};
use super::progress::{Progress, ProgressReporter};
use super::state::{
    IterationSummary, SearchCheckpoint, SearchResult, SearchState, SearchStatus, TerminationReason,
};
use crate::core::alphabet::AlphabetError;
use crate::core::encoding::{EncodingError, EncodingScheme, SequenceEncoder};
use crate::core::model::SurrogateModel;
use crate::core::sequence::Sequence;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tracing target of the one-line summary logged when a search terminates.
pub const SUMMARY_TARGET: &str = "directevo::summary";

/// What a call to [`SearchEngine::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// An iteration completed and the search can continue.
    Continue(IterationSummary),
    /// The search is in a terminal state. `summary` is set when an iteration ran first.
    Finished {
        summary: Option<IterationSummary>,
        reason: TerminationReason,
    },
}

struct ScoredBatch {
    candidates: Vec<Candidate>,
    dropped: usize,
}

/// Drives the search one iteration at a time.
///
/// The engine borrows the model and never mutates it. Frontier and visited set change only
/// after a whole batch has been scored, so an error leaves the state exactly as it was.
pub struct SearchEngine<'a, M: SurrogateModel + ?Sized> {
    config: SearchConfig,
    encoder: SequenceEncoder,
    model: &'a M,
    acquisition: Box<dyn AcquisitionFunction>,
    generator: MutationSpaceGenerator,
    state: SearchState,
    reporter: Option<&'a ProgressReporter<'a>>,
}

impl<M: SurrogateModel + ?Sized> fmt::Debug for SearchEngine<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchEngine")
            .field("acquisition", &self.acquisition.name())
            .field("generator", &self.generator)
            .field("iteration", &self.state.iteration)
            .field("status", &self.state.status)
            .finish()
    }
}

impl<'a, M: SurrogateModel + ?Sized> SearchEngine<'a, M> {
    /// Validates everything that can be checked before the first iteration.
    #[instrument(skip_all, name = "search_engine_new", fields(seeds = seeds.len()))]
    pub fn new(
        config: SearchConfig,
        scheme: EncodingScheme,
        model: &'a M,
        seeds: &[Sequence],
    ) -> Result<Self, EngineError> {
        let (encoder, seeds) = prepare(&config, scheme, model, seeds)?;
        let acquisition = Box::new(UpperConfidenceBound::new(config.acquisition_beta)?);
        let generator = MutationSpaceGenerator::new(&config, &seeds);
        info!(
            seeds = seeds.len(),
            dimension = encoder.dimension(),
            space_size = generator.space_size(),
            mode = ?generator.mode(),
            "Search initialized"
        );
        let state = SearchState::new(seeds, config.frontier_size);
        Ok(Self {
            config,
            encoder,
            model,
            acquisition,
            generator,
            state,
            reporter: None,
        })
    }

    /// Rebuilds an engine from a checkpoint taken with [`checkpoint`](Self::checkpoint).
    #[instrument(skip_all, name = "search_engine_resume", fields(iteration = checkpoint.iteration))]
    pub fn resume(
        config: SearchConfig,
        scheme: EncodingScheme,
        model: &'a M,
        checkpoint: SearchCheckpoint,
    ) -> Result<Self, EngineError> {
        let (encoder, seeds) = prepare(&config, scheme, model, &checkpoint.seeds)?;
        for (index, sequence) in checkpoint
            .derived_seeds
            .iter()
            .chain(checkpoint.visited.iter())
            .chain(checkpoint.frontier.iter().map(|c| &c.sequence))
            .enumerate()
        {
            if sequence.len() != config.sequence_length {
                return Err(EngineError::Checkpoint(format!(
                    "sequence #{index} ({sequence}) has length {}, expected {}",
                    sequence.len(),
                    config.sequence_length
                )));
            }
            validate_symbols(&config, sequence)?;
        }

        let acquisition = Box::new(UpperConfidenceBound::new(config.acquisition_beta)?);
        let mut generator = MutationSpaceGenerator::new(&config, &seeds);
        for seed in &checkpoint.derived_seeds {
            generator.add_seed(seed.clone());
        }

        let state = SearchState {
            seeds,
            derived_seeds: checkpoint.derived_seeds,
            visited: checkpoint.visited.into_iter().collect(),
            frontier: Frontier::restore(config.frontier_size, checkpoint.frontier, &config.alphabet),
            iteration: checkpoint.iteration,
            evaluations: checkpoint.evaluations,
            status: checkpoint.status,
            best_score: checkpoint.best_score,
            stale_iterations: checkpoint.stale_iterations,
            history: checkpoint.history,
        };
        info!(
            iteration = state.iteration,
            visited = state.visited.len(),
            "Search resumed"
        );
        Ok(Self {
            config,
            encoder,
            model,
            acquisition,
            generator,
            state,
            reporter: None,
        })
    }

    pub fn with_acquisition(mut self, acquisition: Box<dyn AcquisitionFunction>) -> Self {
        self.acquisition = acquisition;
        self
    }

    pub fn with_reporter(mut self, reporter: &'a ProgressReporter<'a>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn encoder(&self) -> &SequenceEncoder {
        &self.encoder
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn checkpoint(&self) -> SearchCheckpoint {
        self.state.to_checkpoint()
    }

    /// Runs iterations until the search reaches a terminal state.
    #[instrument(skip_all, name = "search_run")]
    pub fn run(&mut self) -> Result<SearchResult, EngineError> {
        loop {
            if let StepOutcome::Finished { .. } = self.step()? {
                break;
            }
        }
        self.state
            .result()
            .ok_or_else(|| EngineError::Internal("search stopped in a non-terminal state".into()))
    }

    /// Performs exactly one iteration: propose, encode, predict, score, merge, check.
    ///
    /// Calling `step` on a finished search is a no-op that reports the termination reason.
    #[instrument(skip_all, fields(iteration = self.state.iteration + 1))]
    pub fn step(&mut self) -> Result<StepOutcome, EngineError> {
        if let Some(reason) = self.state.status.termination() {
            return Ok(StepOutcome::Finished {
                summary: None,
                reason,
            });
        }
        if self.state.status == SearchStatus::Initialized {
            self.report(Progress::SearchStart {
                max_iterations: self.config.max_iterations as u64,
            });
            self.state.status = SearchStatus::Iterating;
        }
        if self.budget_spent() {
            return Ok(self.finish(None, TerminationReason::BudgetExhausted));
        }

        let iteration = self.state.iteration + 1;
        self.report(Progress::IterationStart { iteration });

        let limit = self.batch_limit();
        let proposals = match self
            .generator
            .propose(limit, &self.state.visited, iteration)
        {
            Generation::Batch(proposals) => proposals,
            Generation::Exhausted => {
                return Ok(self.finish(None, TerminationReason::ExhaustedSpace));
            }
        };

        let scored = match self.score(iteration, &proposals) {
            Ok(scored) => scored,
            Err(error) => {
                self.generator.requeue(proposals);
                return Err(error);
            }
        };

        let summary = self.merge(iteration, proposals, scored);
        self.report(Progress::IterationFinish {
            iteration,
            best_score: summary.best_score,
            frontier_size: summary.frontier_size,
        });

        let reason = if self.state.stale_iterations >= self.config.convergence.patience_iterations {
            Some(TerminationReason::Converged)
        } else if self.budget_spent() {
            Some(TerminationReason::BudgetExhausted)
        } else {
            None
        };
        Ok(match reason {
            Some(reason) => self.finish(Some(summary), reason),
            None => StepOutcome::Continue(summary),
        })
    }

    fn score(&self, iteration: usize, proposals: &[Proposal]) -> Result<ScoredBatch, EngineError> {
        let sequences: Vec<Sequence> = proposals.iter().map(|p| p.sequence.clone()).collect();
        let encoded = self.encoder.encode_each(&sequences);

        let mut rows = Vec::with_capacity(proposals.len());
        let mut kept = Vec::with_capacity(proposals.len());
        let mut failures = Vec::new();
        for (proposal, result) in proposals.iter().zip(encoded) {
            match result {
                Ok(row) => {
                    rows.push(row);
                    kept.push(proposal);
                }
                Err(error) => failures.push(encoding_failure(&proposal.sequence, error)),
            }
        }

        let tolerance = self.config.encoding_failure_tolerance;
        if failures.len() > tolerance {
            let count = failures.len();
            let first = failures
                .into_iter()
                .next()
                .ok_or_else(|| EngineError::Internal("failure list emptied".into()))?;
            if tolerance == 0 {
                return Err(first);
            }
            return Err(EngineError::SystemicEncodingFailure {
                failures: count,
                batch_size: proposals.len(),
                tolerance,
                first: Box::new(first),
            });
        }
        for failure in &failures {
            warn!(%failure, "Dropping candidate that could not be encoded");
        }

        if kept.is_empty() {
            return Ok(ScoredBatch {
                candidates: Vec::new(),
                dropped: failures.len(),
            });
        }

        let features = SequenceEncoder::stack_rows(&rows, self.encoder.dimension());
        let kept_sequences: Vec<Sequence> = kept.iter().map(|p| p.sequence.clone()).collect();
        let prediction = self
            .model
            .predict(&features)
            .and_then(|p| p.validate(kept.len()).map(|()| p))
            .map_err(|e| EngineError::from_model(e, &kept_sequences))?
            .into_standard_deviation(self.model.uncertainty_kind());
        let scores = self.acquisition.score_batch(&prediction);
        if scores.len() != kept.len() {
            return Err(EngineError::Internal(format!(
                "acquisition '{}' returned {} scores for {} candidates",
                self.acquisition.name(),
                scores.len(),
                kept.len()
            )));
        }

        let candidates = kept
            .into_iter()
            .zip(rows)
            .enumerate()
            .map(|(i, (proposal, row))| Candidate {
                sequence: proposal.sequence.clone(),
                mean: prediction.mean[i],
                uncertainty: prediction.uncertainty[i],
                score: scores[i],
                mutation_distance: proposal.mutation_distance,
                iteration,
                features: Some(Arc::from(row)),
            })
            .collect::<Vec<_>>();
        self.report(Progress::BatchScored {
            proposed: proposals.len(),
            evaluated: candidates.len(),
        });
        Ok(ScoredBatch {
            candidates,
            dropped: failures.len(),
        })
    }

    fn merge(
        &mut self,
        iteration: usize,
        proposals: Vec<Proposal>,
        scored: ScoredBatch,
    ) -> IterationSummary {
        let proposed = proposals.len();
        let evaluated = scored.candidates.len();
        self.state
            .visited
            .extend(proposals.into_iter().map(|p| p.sequence));
        self.state.evaluations += evaluated;
        let admitted = self
            .state
            .frontier
            .merge(scored.candidates, &self.config.alphabet);
        self.state.iteration = iteration;

        let best = self.state.frontier.best().map(|c| c.score);
        let delta = self.config.convergence.min_improvement_delta;
        match (best, self.state.best_score) {
            (Some(best), Some(previous)) if best > previous + delta => {
                self.state.best_score = Some(best);
                self.state.stale_iterations = 0;
            }
            (Some(best), None) => {
                self.state.best_score = Some(best);
                self.state.stale_iterations = 0;
            }
            _ => self.state.stale_iterations += 1,
        }

        self.reseed();

        let summary = IterationSummary {
            iteration,
            proposed,
            evaluated,
            dropped: scored.dropped,
            admitted,
            best_score: best,
            frontier_size: self.state.frontier.len(),
            seeds: self.state.seeds.len() + self.state.derived_seeds.len(),
        };
        debug!(
            proposed,
            evaluated,
            admitted,
            best = ?best,
            stale = self.state.stale_iterations,
            "Iteration merged"
        );
        self.state.history.push(summary.clone());
        summary
    }

    fn reseed(&mut self) {
        let ReseedPolicy::TopFrontier { count, .. } = self.config.reseed else {
            return;
        };
        let promoted: Vec<Sequence> = self
            .state
            .frontier
            .members()
            .iter()
            .map(|c| &c.sequence)
            .filter(|s| !self.generator.is_seed(s))
            .take(count)
            .cloned()
            .collect();
        for sequence in promoted {
            debug!(%sequence, "Promoting frontier member to seed");
            if self.generator.add_seed(sequence.clone()) {
                self.state.derived_seeds.push(sequence);
            }
        }
    }

    fn budget_spent(&self) -> bool {
        self.state.iteration >= self.config.max_iterations
            || self
                .config
                .max_evaluations
                .is_some_and(|max| self.state.evaluations >= max)
    }

    fn batch_limit(&self) -> usize {
        let batch = self.config.batch_size_per_iteration;
        match self.config.max_evaluations {
            Some(max) => batch.min(max.saturating_sub(self.state.evaluations)),
            None => batch,
        }
    }

    fn finish(&mut self, summary: Option<IterationSummary>, reason: TerminationReason) -> StepOutcome {
        self.state.status = SearchStatus::Terminated(reason);
        info!(
            target: SUMMARY_TARGET,
            %reason,
            iterations = self.state.iteration,
            evaluations = self.state.evaluations,
            best = ?self.state.frontier.best().map(|c| c.score),
            "Search finished"
        );
        self.report(Progress::SearchFinish { reason });
        StepOutcome::Finished { summary, reason }
    }

    fn report(&self, event: Progress) {
        if let Some(reporter) = self.reporter {
            reporter.report(event);
        }
    }
}

fn prepare<M: SurrogateModel + ?Sized>(
    config: &SearchConfig,
    scheme: EncodingScheme,
    model: &M,
    seeds: &[Sequence],
) -> Result<(SequenceEncoder, Vec<Sequence>), EngineError> {
    config.validate()?;
    let encoder = SequenceEncoder::new(config.alphabet.clone(), scheme, config.sequence_length)
        .map_err(EngineError::EncoderSetup)?;
    if let Some(expected) = model.input_dimension() {
        if expected != encoder.dimension() {
            return Err(ConfigError::ModelDimension {
                model: expected,
                encoder: encoder.dimension(),
            }
            .into());
        }
    }

    if seeds.is_empty() {
        return Err(ConfigError::NoSeeds.into());
    }
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(seeds.len());
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() != config.sequence_length {
            return Err(ConfigError::SeedLength {
                index,
                expected: config.sequence_length,
                found: seed.len(),
            }
            .into());
        }
        validate_symbols(config, seed)?;
        // Seeds must also be encodable, otherwise a bad descriptor table only surfaces mid-search.
        encoder
            .encode(seed)
            .map_err(|e| encoding_failure(seed, e))?;
        if seen.insert(seed.clone()) {
            unique.push(seed.clone());
        }
    }
    Ok((encoder, unique))
}

fn validate_symbols(config: &SearchConfig, sequence: &Sequence) -> Result<(), EngineError> {
    match config.alphabet.validate(sequence) {
        Err(AlphabetError::InvalidSymbol { position, symbol }) => Err(EngineError::InvalidSymbol {
            sequence: sequence.clone(),
            position,
            symbol,
        }),
        Err(other) => Err(EngineError::Internal(other.to_string())),
        Ok(()) => Ok(()),
    }
}

fn encoding_failure(sequence: &Sequence, error: EncodingError) -> EngineError {
    match error {
        EncodingError::InvalidSymbol { position, symbol } => EngineError::InvalidSymbol {
            sequence: sequence.clone(),
            position,
            symbol,
        },
        source => EngineError::Encoding {
            sequence: sequence.clone(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alphabet::Alphabet;
    use crate::core::encoding::LookupTable;
    use crate::core::model::{ModelError, Prediction, UncertaintyKind};
    use crate::engine::config::{GenerationMode, SearchConfigBuilder};
    use nalgebra::{DMatrix, DVector};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn seq(s: &str) -> Sequence {
        s.parse().unwrap()
    }

    /// Counts occurrences of one symbol from a one-hot encoding.
    struct CountSymbol {
        rank: usize,
        alphabet_len: usize,
        uncertainty: f64,
    }

    impl CountSymbol {
        fn of_b() -> Self {
            Self {
                rank: 1,
                alphabet_len: 4,
                uncertainty: 0.0,
            }
        }
    }

    impl SurrogateModel for CountSymbol {
        fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
            let means = features.row_iter().map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(column, v)| column % self.alphabet_len == self.rank && **v == 1.0)
                    .count() as f64
            });
            Ok(Prediction::new(
                DVector::from_iterator(features.nrows(), means),
                DVector::from_element(features.nrows(), self.uncertainty),
            ))
        }
    }

    struct Constant;

    impl SurrogateModel for Constant {
        fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
            Ok(Prediction::new(
                DVector::zeros(features.nrows()),
                DVector::zeros(features.nrows()),
            ))
        }
    }

    struct NegativeUncertainty;

    impl SurrogateModel for NegativeUncertainty {
        fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
            Ok(Prediction::new(
                DVector::zeros(features.nrows()),
                DVector::from_element(features.nrows(), -1.0),
            ))
        }
    }

    struct VarianceModel;

    impl SurrogateModel for VarianceModel {
        fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
            Ok(Prediction::new(
                DVector::zeros(features.nrows()),
                DVector::from_element(features.nrows(), 4.0),
            ))
        }

        fn uncertainty_kind(&self) -> UncertaintyKind {
            UncertaintyKind::Variance
        }
    }

    /// Predicts `calls * step` for every row, so each batch beats the last by exactly `step`.
    struct Climbing {
        step: f64,
        calls: AtomicUsize,
    }

    impl Climbing {
        fn by(step: f64) -> Self {
            Self {
                step,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SurrogateModel for Climbing {
        fn predict(&self, features: &DMatrix<f64>) -> Result<Prediction, ModelError> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Prediction::new(
                DVector::from_element(features.nrows(), calls as f64 * self.step),
                DVector::zeros(features.nrows()),
            ))
        }
    }

    fn abcd(length: usize, max_mutations: usize) -> SearchConfigBuilder {
        SearchConfigBuilder::new()
            .alphabet(Alphabet::new("ABCD").unwrap())
            .sequence_length(length)
            .max_mutations_per_candidate(max_mutations)
            .generation(GenerationMode::Exhaustive)
            .acquisition_beta(0.0)
    }

    fn sequences(candidates: &[Candidate]) -> Vec<String> {
        candidates.iter().map(|c| c.sequence.to_string()).collect()
    }

    #[test]
    fn single_iteration_finds_a_single_b_mutant() {
        let config = abcd(3, 1)
            .frontier_size(1)
            .max_iterations(1)
            .build()
            .unwrap();
        let model = CountSymbol::of_b();
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAA")]).unwrap();
        assert_eq!(engine.state().status(), SearchStatus::Initialized);

        let result = engine.run().unwrap();
        assert_eq!(result.reason, TerminationReason::BudgetExhausted);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.evaluations, 9);
        assert_eq!(result.frontier.len(), 1);

        let best = &result.frontier[0];
        assert_eq!(best.sequence.to_string(), "AAB");
        assert_eq!(best.mean, 1.0);
        assert_eq!(best.uncertainty, 0.0);
        assert_eq!(best.mutation_distance, 1);
        assert_eq!(best.iteration, 1);
        assert_eq!(best.features.as_ref().unwrap().len(), 12);
    }

    #[test]
    fn stops_with_budget_exhausted_at_max_iterations() {
        let config = abcd(4, 2)
            .batch_size_per_iteration(3)
            .max_iterations(2)
            .convergence_patience(10)
            .build()
            .unwrap();
        let model = CountSymbol::of_b();
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAAA")]).unwrap();

        assert!(matches!(engine.step().unwrap(), StepOutcome::Continue(_)));
        assert_eq!(engine.state().status(), SearchStatus::Iterating);
        let outcome = engine.step().unwrap();
        assert!(matches!(
            outcome,
            StepOutcome::Finished {
                summary: Some(_),
                reason: TerminationReason::BudgetExhausted
            }
        ));
        assert_eq!(engine.state().iteration(), 2);
        assert_eq!(engine.state().evaluations(), 6);

        // Further steps are no-ops.
        assert!(matches!(
            engine.step().unwrap(),
            StepOutcome::Finished { summary: None, .. }
        ));
        assert_eq!(engine.state().iteration(), 2);
    }

    #[test]
    fn evaluation_budget_truncates_batches() {
        let config = abcd(4, 2)
            .batch_size_per_iteration(4)
            .max_evaluations(Some(6))
            .convergence_patience(10)
            .build()
            .unwrap();
        let model = CountSymbol::of_b();
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.reason, TerminationReason::BudgetExhausted);
        assert_eq!(result.evaluations, 6);
        assert_eq!(
            result.history.iter().map(|h| h.evaluated).collect::<Vec<_>>(),
            [4, 2]
        );
    }

    #[test]
    fn converges_when_best_score_stops_improving() {
        let config = abcd(4, 2)
            .batch_size_per_iteration(5)
            .max_iterations(50)
            .convergence_patience(2)
            .build()
            .unwrap();
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &Constant, &[seq("AAAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.reason, TerminationReason::Converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn gains_within_min_improvement_delta_count_as_stale() {
        let config = abcd(4, 2)
            .batch_size_per_iteration(5)
            .max_iterations(10)
            .min_improvement_delta(0.05)
            .convergence_patience(2)
            .build()
            .unwrap();
        let model = Climbing::by(0.01);
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.reason, TerminationReason::Converged);
        assert_eq!(result.iterations, 3);
        assert!(result.frontier[0].score > 0.025);
    }

    #[test]
    fn gains_beyond_min_improvement_delta_reset_patience() {
        let config = abcd(4, 2)
            .batch_size_per_iteration(5)
            .max_iterations(6)
            .min_improvement_delta(0.05)
            .convergence_patience(2)
            .build()
            .unwrap();
        let model = Climbing::by(0.1);
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.reason, TerminationReason::BudgetExhausted);
        assert_eq!(result.iterations, 6);
        assert_eq!(engine.state().stale_iterations(), 0);
    }

    #[test]
    fn exhausted_space_is_a_normal_terminal_state() {
        let config = abcd(3, 1)
            .batch_size_per_iteration(4)
            .max_iterations(10)
            .convergence_patience(10)
            .build()
            .unwrap();
        let model = CountSymbol::of_b();
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.reason, TerminationReason::ExhaustedSpace);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.evaluations, 9);
        assert_eq!(engine.state().visited().len(), 9);
    }

    #[test]
    fn visited_set_grows_and_frontier_stays_bounded() {
        let config = abcd(4, 2)
            .batch_size_per_iteration(7)
            .frontier_size(3)
            .max_iterations(20)
            .convergence_patience(20)
            .build()
            .unwrap();
        let model = CountSymbol::of_b();
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAAA")]).unwrap();

        let mut previous = 0;
        loop {
            let outcome = engine.step().unwrap();
            let visited = engine.state().visited().len();
            assert!(engine.state().frontier().len() <= 3);
            if let StepOutcome::Finished { summary, .. } = outcome {
                if summary.is_some() {
                    assert!(visited > previous);
                }
                break;
            }
            assert!(visited > previous);
            previous = visited;
        }
        assert_eq!(engine.state().visited().len(), 4 * 3 + 6 * 9);
        let best = engine.state().frontier().best().unwrap();
        assert_eq!(best.mean, 2.0);
    }

    #[test]
    fn invalid_configuration_is_rejected_before_any_iteration() {
        let mut config = abcd(3, 1).build().unwrap();
        config.constraint.max_mutations_per_candidate = 4;
        let result = SearchEngine::new(config, EncodingScheme::OneHot, &Constant, &[seq("AAA")]);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration(
                ConfigError::MutationsExceedLength { .. }
            ))
        ));
    }

    #[test]
    fn seeds_are_checked_against_alphabet_and_length() {
        let config = abcd(3, 1).build().unwrap();
        let result =
            SearchEngine::new(config.clone(), EncodingScheme::OneHot, &Constant, &[seq("AZA")]);
        match result {
            Err(EngineError::InvalidSymbol {
                sequence,
                position,
                symbol,
            }) => {
                assert_eq!(sequence, seq("AZA"));
                assert_eq!(position, 1);
                assert_eq!(symbol, 'Z');
            }
            other => panic!("expected InvalidSymbol, got {other:?}"),
        }

        let result = SearchEngine::new(config.clone(), EncodingScheme::OneHot, &Constant, &[seq("AAAA")]);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration(ConfigError::SeedLength { .. }))
        ));
        let result = SearchEngine::new(config, EncodingScheme::OneHot, &Constant, &[]);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration(ConfigError::NoSeeds))
        ));
    }

    #[test]
    fn model_dimension_must_match_encoder() {
        let config = abcd(3, 1).build().unwrap();
        let model = crate::core::model::LinearSurrogate::point_estimate(vec![1.0; 5], 0.0);
        let result = SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAA")]);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration(ConfigError::ModelDimension {
                model: 5,
                encoder: 12
            }))
        ));
    }

    #[test]
    fn invalid_prediction_aborts_without_touching_state() {
        let config = abcd(3, 1).build().unwrap();
        let mut engine = SearchEngine::new(
            config,
            EncodingScheme::OneHot,
            &NegativeUncertainty,
            &[seq("AAA")],
        )
        .unwrap();

        let error = engine.step().unwrap_err();
        match error {
            EngineError::InvalidPrediction { sequence, .. } => {
                assert_eq!(sequence, Some(seq("BAA")));
            }
            other => panic!("expected InvalidPrediction, got {other:?}"),
        }
        assert_eq!(engine.state().iteration(), 0);
        assert!(engine.state().visited().is_empty());
        assert!(engine.state().frontier().is_empty());
        assert!(!engine.state().status().is_terminal());
    }

    #[test]
    fn variance_uncertainty_is_converted_before_scoring() {
        let config = abcd(3, 1)
            .acquisition_beta(1.0)
            .max_iterations(1)
            .build()
            .unwrap();
        let mut engine =
            SearchEngine::new(config, EncodingScheme::OneHot, &VarianceModel, &[seq("AAA")])
                .unwrap();
        let result = engine.run().unwrap();
        assert!(result.frontier.iter().all(|c| c.uncertainty == 2.0));
        assert!(result.frontier.iter().all(|c| c.score == 2.0));
    }

    fn table_without_d() -> EncodingScheme {
        let table = LookupTable::new(
            vec!["x".to_string()],
            [(b'A', vec![0.0]), (b'B', vec![1.0]), (b'C', vec![2.0])],
        )
        .unwrap();
        EncodingScheme::Descriptor(Arc::new(table))
    }

    #[test]
    fn encoding_failure_aborts_by_default() {
        let config = abcd(3, 1).build().unwrap();
        let mut engine =
            SearchEngine::new(config, table_without_d(), &Constant, &[seq("AAA")]).unwrap();
        match engine.step().unwrap_err() {
            EngineError::InvalidSymbol {
                sequence,
                position,
                symbol,
            } => {
                assert_eq!(sequence, seq("DAA"));
                assert_eq!(position, 0);
                assert_eq!(symbol, 'D');
            }
            other => panic!("expected InvalidSymbol, got {other:?}"),
        }
        assert!(engine.state().visited().is_empty());
    }

    #[test]
    fn tolerated_encoding_failures_are_dropped_and_marked_visited() {
        let config = abcd(3, 1)
            .encoding_failure_tolerance(3)
            .max_iterations(1)
            .build()
            .unwrap();
        let mut engine =
            SearchEngine::new(config, table_without_d(), &Constant, &[seq("AAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.evaluations, 6);
        assert_eq!(result.history[0].dropped, 3);
        assert_eq!(engine.state().visited().len(), 9);

        let config = abcd(3, 1).encoding_failure_tolerance(2).build().unwrap();
        let mut engine =
            SearchEngine::new(config, table_without_d(), &Constant, &[seq("AAA")]).unwrap();
        assert!(matches!(
            engine.step(),
            Err(EngineError::SystemicEncodingFailure { failures: 3, .. })
        ));
    }

    #[test]
    fn repeated_sampled_runs_produce_identical_frontiers() {
        let build = || {
            SearchConfigBuilder::new()
                .alphabet(Alphabet::protein())
                .sequence_length(8)
                .max_mutations_per_candidate(3)
                .generation(GenerationMode::Sampling { sample_size: 20 })
                .batch_size_per_iteration(20)
                .frontier_size(5)
                .max_iterations(4)
                .convergence_patience(10)
                .random_seed(42)
                .build()
                .unwrap()
        };
        let model = crate::core::model::LinearSurrogate::new(
            (0..160).map(|i| ((i * 37) % 11) as f64 / 10.0 - 0.5).collect(),
            0.0,
            vec![0.01; 160],
            0.0,
        )
        .unwrap();
        let seeds = [seq("ACDEFGHI")];

        let first = SearchEngine::new(build(), EncodingScheme::OneHot, &model, &seeds)
            .unwrap()
            .run()
            .unwrap();
        let second = SearchEngine::new(build(), EncodingScheme::OneHot, &model, &seeds)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.evaluations, 80);
    }

    #[test]
    fn reseeding_walks_beyond_a_single_step_within_the_cap() {
        let base = || {
            abcd(4, 1)
                .frontier_size(1)
                .batch_size_per_iteration(100)
                .max_iterations(3)
                .convergence_patience(10)
        };
        let model = CountSymbol::of_b();

        let reseeded = base()
            .reseed(ReseedPolicy::TopFrontier {
                count: 1,
                max_total_mutations: 2,
            })
            .build()
            .unwrap();
        let mut engine =
            SearchEngine::new(reseeded, EncodingScheme::OneHot, &model, &[seq("AAAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.frontier[0].mean, 2.0);
        assert_eq!(result.frontier[0].sequence.to_string(), "AABB");
        assert_eq!(engine.state().derived_seeds(), [seq("AAAB"), seq("AABB")]);
        let origin = seq("AAAA");
        assert!(
            engine
                .state()
                .visited()
                .iter()
                .all(|s| s.mutation_distance(&origin) <= 2)
        );

        let fixed = base().build().unwrap();
        let mut engine =
            SearchEngine::new(fixed, EncodingScheme::OneHot, &model, &[seq("AAAA")]).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.reason, TerminationReason::ExhaustedSpace);
        assert_eq!(result.frontier[0].mean, 1.0);
    }

    #[test]
    fn resumed_search_matches_an_uninterrupted_one() {
        let config = || {
            abcd(3, 2)
                .batch_size_per_iteration(3)
                .frontier_size(4)
                .max_iterations(6)
                .convergence_patience(10)
                .build()
                .unwrap()
        };
        let model = CountSymbol::of_b();
        let seeds = [seq("AAA")];

        let uninterrupted = SearchEngine::new(config(), EncodingScheme::OneHot, &model, &seeds)
            .unwrap()
            .run()
            .unwrap();

        let mut engine =
            SearchEngine::new(config(), EncodingScheme::OneHot, &model, &seeds).unwrap();
        engine.step().unwrap();
        engine.step().unwrap();
        let checkpoint = engine.checkpoint();
        drop(engine);

        let mut resumed =
            SearchEngine::resume(config(), EncodingScheme::OneHot, &model, checkpoint).unwrap();
        let result = resumed.run().unwrap();
        assert_eq!(sequences(&result.frontier), sequences(&uninterrupted.frontier));
        assert_eq!(result.evaluations, uninterrupted.evaluations);
        assert_eq!(result.history, uninterrupted.history);
    }

    #[test]
    fn progress_events_bracket_the_search() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
            let name = match event {
                Progress::SearchStart { .. } => "start",
                Progress::IterationStart { .. } => "iteration",
                Progress::BatchScored { .. } => "scored",
                Progress::IterationFinish { .. } => "merged",
                Progress::SearchFinish { .. } => "finish",
                Progress::Message(_) => "message",
            };
            events.lock().unwrap().push(name);
        }));
        let config = abcd(3, 1).max_iterations(1).build().unwrap();
        let model = CountSymbol::of_b();
        SearchEngine::new(config, EncodingScheme::OneHot, &model, &[seq("AAA")])
            .unwrap()
            .with_reporter(&reporter)
            .run()
            .unwrap();
        drop(reporter);
        assert_eq!(
            events.into_inner().unwrap(),
            ["start", "iteration", "scored", "merged", "finish"]
        );
    }
}
