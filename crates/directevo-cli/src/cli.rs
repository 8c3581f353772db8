use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "DirectEvo Developers",
    version,
    about = "DirectEvo CLI - surrogate-guided in silico directed evolution over bounded mutation neighbourhoods.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel encoding.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the mutation neighbourhood of one or more seed sequences for high-scoring variants.
    Evolve(EvolveArgs),
    /// Encode sequences into a numeric feature matrix.
    Encode(EncodeArgs),
}

/// Where the starting sequences come from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = true)]
pub struct SeedSource {
    /// A seed sequence. Can be used multiple times.
    #[arg(long = "seed", value_name = "SEQUENCE")]
    pub seed: Vec<String>,

    /// A FASTA file or a file with one sequence per line.
    #[arg(long = "seeds", value_name = "PATH")]
    pub seeds_file: Option<PathBuf>,
}

/// Arguments for the `evolve` subcommand.
#[derive(Args, Debug)]
pub struct EvolveArgs {
    // --- Core Arguments ---
    #[command(flatten)]
    pub seeds: SeedSource,

    /// Path to the surrogate model parameters in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Path for the ranked frontier in CSV format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the search configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a checkpoint after every iteration and resume from it if it already exists.
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,

    // --- Encoding Overrides ---
    /// Override the alphabet: 'protein', 'dna' or an explicit symbol string (e.g., 'ACGU').
    #[arg(short, long, value_name = "NAME_OR_SYMBOLS")]
    pub alphabet: Option<String>,

    /// Override the encoding: 'one-hot', 'ordinal', 'descriptor',
    /// 'descriptor@table.csv' or 'embedding@table.csv'.
    #[arg(short, long, value_name = "SCHEME")]
    pub encoding: Option<String>,

    // --- Search Overrides ---
    /// Override the maximum number of substitutions per candidate.
    #[arg(short = 'k', long, value_name = "INT")]
    pub max_mutations: Option<usize>,

    /// Override the exploration weight of the acquisition function.
    #[arg(short, long, value_name = "FLOAT")]
    pub beta: Option<f64>,

    /// Override the number of candidates kept in the frontier.
    #[arg(long, value_name = "INT")]
    pub frontier_size: Option<usize>,

    /// Override the number of candidates scored per iteration.
    #[arg(long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Override the maximum number of iterations.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Override the total number of candidate evaluations allowed.
    #[arg(long, value_name = "INT")]
    pub max_evaluations: Option<usize>,

    /// Override the random seed used for candidate sampling.
    #[arg(long, value_name = "INT")]
    pub random_seed: Option<u64>,

    /// Enumerate the whole neighbourhood instead of sampling it.
    #[arg(long, conflicts_with = "sample_size")]
    pub exhaustive: bool,

    /// Sample this many candidates per iteration instead of enumerating.
    #[arg(long, value_name = "INT")]
    pub sample_size: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.max-iterations=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `encode` subcommand.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// A FASTA file or a file with one sequence per line.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the feature matrix in CSV format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Alphabet: 'protein', 'dna' or an explicit symbol string.
    #[arg(short, long, value_name = "NAME_OR_SYMBOLS", default_value = "protein")]
    pub alphabet: String,

    /// Encoding: 'one-hot', 'ordinal', 'descriptor', 'descriptor@table.csv' or
    /// 'embedding@table.csv'.
    #[arg(short, long, value_name = "SCHEME", default_value = "one-hot")]
    pub encoding: String,
}
