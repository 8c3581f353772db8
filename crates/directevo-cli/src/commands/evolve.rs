use crate::cli::{EvolveArgs, SeedSource};
use crate::config::PartialSearchConfig;
use crate::error::{CliError, Result};
use crate::utils::io;
use crate::utils::progress::CliProgressHandler;
use directevo::{
    core::{model::persistence::SurrogateSpec, sequence::Sequence},
    engine::progress::ProgressReporter,
    workflows,
};
use tracing::{info, warn};

pub fn run(args: EvolveArgs) -> Result<()> {
    let seeds = collect_seeds(&args.seeds)?;
    let sequence_length = seeds[0].len();
    info!(
        "Loaded {} seed sequence(s) of length {}",
        seeds.len(),
        sequence_length
    );

    let partial_config = match &args.config {
        Some(path) => PartialSearchConfig::from_file(path)?,
        None => PartialSearchConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let resolved = partial_config.merge_with_cli(&args, sequence_length)?;
    let scheme = io::load_scheme(&resolved.encoding)?;

    info!("Loading surrogate model from {:?}", &args.model);
    let model = SurrogateSpec::load(&args.model)
        .and_then(SurrogateSpec::build)
        .map_err(|e| CliError::FileParsing {
            path: args.model.clone(),
            source: e.into(),
        })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting search from {} seed(s)...", seeds.len());
    info!("Invoking the evolve workflow...");

    let result = match &args.checkpoint {
        Some(path) => workflows::evolve::run_with_checkpoints(
            &seeds,
            &resolved.search,
            scheme,
            model.as_ref(),
            &reporter,
            path,
        )?,
        None => workflows::evolve::run(
            &seeds,
            &resolved.search,
            scheme,
            model.as_ref(),
            &reporter,
        )?,
    };

    info!(
        reason = %result.reason,
        iterations = result.iterations,
        evaluations = result.evaluations,
        "Workflow finished"
    );

    if result.frontier.is_empty() {
        warn!("Search finished without scoring any candidate.");
        println!("Warning: the search finished without scoring any candidate.");
    }
    io::write_frontier(&args.output, &result.frontier)?;

    println!(
        "Search stopped: {} after {} iteration(s) and {} evaluation(s).",
        result.reason, result.iterations, result.evaluations
    );
    if let Some(best) = result.frontier.first() {
        println!(
            "✓ Best candidate {} (score {:.4}, mean {:.4} ± {:.4}) written to: {}",
            best.sequence,
            best.score,
            best.mean,
            best.uncertainty,
            args.output.display()
        );
    }

    Ok(())
}

fn collect_seeds(source: &SeedSource) -> Result<Vec<Sequence>> {
    let mut seeds = source
        .seed
        .iter()
        .map(|s| {
            s.trim()
                .parse::<Sequence>()
                .map_err(|e| CliError::Argument(format!("invalid seed '{s}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    if let Some(path) = &source.seeds_file {
        seeds.extend(io::read_sequences(path)?);
    }
    if seeds.is_empty() {
        return Err(CliError::Argument(
            "at least one seed sequence is required".to_string(),
        ));
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use directevo::core::model::LinearSurrogate;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// One-hot over ACGT at length 3; each T adds one to the mean.
    fn write_model(path: &Path) {
        let weights = (0..12).map(|c| if c % 4 == 3 { 1.0 } else { 0.0 }).collect();
        SurrogateSpec::from(LinearSurrogate::point_estimate(weights, 0.0))
            .save(path)
            .unwrap();
    }

    fn evolve_args(args: &[&str]) -> EvolveArgs {
        let mut full = vec!["directevo", "evolve"];
        full.extend_from_slice(args);
        match Cli::parse_from(full).command {
            Commands::Evolve(args) => args,
            _ => panic!("Expected 'evolve' subcommand"),
        }
    }

    #[test]
    fn evolve_writes_the_ranked_frontier() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.toml");
        let output = dir.path().join("frontier.csv");
        write_model(&model);

        let args = evolve_args(&[
            "--seed",
            "AAA",
            "-a",
            "dna",
            "-k",
            "1",
            "--exhaustive",
            "-m",
            model.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]);
        run(args).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines[1].starts_with("1,AAT,1.0,0.0,1.0,1,1"));
        assert!(lines[2].starts_with("2,ATA,1.0"));
        assert!(lines[3].starts_with("3,TAA,1.0"));
    }

    #[test]
    fn seeds_can_come_from_a_file_and_the_command_line() {
        let dir = tempdir().unwrap();
        let seeds_path = dir.path().join("seeds.fasta");
        fs::write(&seeds_path, ">a\nACG\n").unwrap();

        let args = evolve_args(&[
            "--seed",
            "TTT",
            "--seeds",
            seeds_path.to_str().unwrap(),
            "-m",
            "model.toml",
            "-o",
            "out.csv",
        ]);
        let seeds = collect_seeds(&args.seeds).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].to_string(), "TTT");
        assert_eq!(seeds[1].to_string(), "ACG");
    }

    #[test]
    fn seed_symbols_outside_the_alphabet_fail_the_command() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.toml");
        write_model(&model);

        let args = evolve_args(&[
            "--seed",
            "AXA",
            "-a",
            "dna",
            "-k",
            "1",
            "-m",
            model.to_str().unwrap(),
            "-o",
            dir.path().join("out.csv").to_str().unwrap(),
        ]);
        assert!(matches!(run(args), Err(CliError::Engine(_))));
    }

    #[test]
    fn missing_model_file_is_reported_with_its_path() {
        let dir = tempdir().unwrap();
        let args = evolve_args(&[
            "--seed",
            "AAA",
            "-a",
            "dna",
            "-k",
            "1",
            "-m",
            dir.path().join("absent.toml").to_str().unwrap(),
            "-o",
            dir.path().join("out.csv").to_str().unwrap(),
        ]);
        assert!(matches!(run(args), Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn checkpointed_runs_resume_to_the_same_frontier() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.toml");
        let checkpoint = dir.path().join("state.toml");
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        write_model(&model);

        let common = |output: &Path| {
            evolve_args(&[
                "--seed",
                "AAA",
                "-a",
                "dna",
                "-k",
                "2",
                "--exhaustive",
                "--batch-size",
                "8",
                "-m",
                model.to_str().unwrap(),
                "-o",
                output.to_str().unwrap(),
                "--checkpoint",
                checkpoint.to_str().unwrap(),
            ])
        };

        run(common(&first)).unwrap();
        assert!(checkpoint.exists());
        run(common(&second)).unwrap();

        assert_eq!(
            fs::read_to_string(&first).unwrap(),
            fs::read_to_string(&second).unwrap()
        );
    }
}
