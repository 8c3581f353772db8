use crate::core::encoding::EncodingScheme;
use crate::core::model::SurrogateModel;
use crate::core::sequence::Sequence;
use crate::engine::config::SearchConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::search::{SearchEngine, StepOutcome};
use crate::engine::state::{SearchCheckpoint, SearchResult};
use std::path::Path;
use tracing::{info, instrument, warn};

/// Runs a search from `seeds` until it reaches a terminal state.
#[instrument(skip_all, name = "evolve_workflow", fields(seeds = seeds.len()))]
pub fn run<M: SurrogateModel + ?Sized>(
    seeds: &[Sequence],
    config: &SearchConfig,
    scheme: EncodingScheme,
    model: &M,
    reporter: &ProgressReporter,
) -> Result<SearchResult, EngineError> {
    let mut engine =
        SearchEngine::new(config.clone(), scheme, model, seeds)?.with_reporter(reporter);
    engine.run()
}

/// Like [`run`], but writes a checkpoint to `checkpoint_path` after every iteration.
///
/// When the file already exists the search resumes from it and `seeds` are ignored.
#[instrument(skip_all, name = "evolve_workflow", fields(checkpoint = %checkpoint_path.display()))]
pub fn run_with_checkpoints<M: SurrogateModel + ?Sized>(
    seeds: &[Sequence],
    config: &SearchConfig,
    scheme: EncodingScheme,
    model: &M,
    reporter: &ProgressReporter,
    checkpoint_path: &Path,
) -> Result<SearchResult, EngineError> {
    let engine = if checkpoint_path.exists() {
        let checkpoint = SearchCheckpoint::load(checkpoint_path)?;
        if !seeds.is_empty() && checkpoint.seeds.as_slice() != seeds {
            warn!("Seeds differ from the checkpoint; continuing with the checkpoint's seeds");
        }
        reporter.report(Progress::Message(format!(
            "Resuming from iteration {}",
            checkpoint.iteration
        )));
        info!(iteration = checkpoint.iteration, "Resuming from checkpoint");
        SearchEngine::resume(config.clone(), scheme, model, checkpoint)?
    } else {
        SearchEngine::new(config.clone(), scheme, model, seeds)?
    };
    let mut engine = engine.with_reporter(reporter);

    loop {
        let outcome = engine.step()?;
        engine.checkpoint().save(checkpoint_path)?;
        if let StepOutcome::Finished { .. } = outcome {
            break;
        }
    }
    engine.run()
}
