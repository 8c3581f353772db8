pub mod defaults;

use crate::cli::EvolveArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::{self, EncodingName};
use defaults::DefaultsConfig;
use directevo::engine::config as core_config;
use directevo::engine::generator::ProposalDistribution;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialMutationConfig {
    #[serde(rename = "max-per-candidate")]
    max_per_candidate: Option<usize>,
    #[serde(rename = "allowed-positions")]
    allowed_positions: Option<Vec<usize>>,
    /// Position (as a string key) to the symbols allowed there.
    substitutes: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialConvergenceConfig {
    #[serde(rename = "min-improvement-delta")]
    min_improvement_delta: Option<f64>,
    #[serde(rename = "patience-iterations")]
    patience_iterations: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSearchSection {
    #[serde(rename = "acquisition-beta")]
    acquisition_beta: Option<f64>,
    #[serde(rename = "frontier-size")]
    frontier_size: Option<usize>,
    #[serde(rename = "batch-size")]
    batch_size: Option<usize>,
    #[serde(rename = "max-iterations")]
    max_iterations: Option<usize>,
    #[serde(rename = "max-evaluations")]
    max_evaluations: Option<usize>,
    #[serde(rename = "random-seed")]
    random_seed: Option<u64>,
    #[serde(rename = "encoding-failure-tolerance")]
    encoding_failure_tolerance: Option<usize>,
    convergence: Option<PartialConvergenceConfig>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum GenerationModeName {
    Auto,
    Exhaustive,
    Sampling,
}

impl FromStr for GenerationModeName {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "exhaustive" => Ok(Self::Exhaustive),
            "sampling" => Ok(Self::Sampling),
            _ => Err(CliError::Config(format!(
                "Unknown generation mode '{s}'. Expected 'auto', 'exhaustive' or 'sampling'."
            ))),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialGenerationConfig {
    mode: Option<GenerationModeName>,
    #[serde(rename = "sample-size")]
    sample_size: Option<usize>,
    #[serde(rename = "exhaustive-limit")]
    exhaustive_limit: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialProposalConfig {
    /// Position (as a string key) to one weight per alphabet symbol, in rank order.
    weights: BTreeMap<String, Vec<f64>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialReseedConfig {
    count: Option<usize>,
    #[serde(rename = "max-total-mutations")]
    max_total_mutations: Option<usize>,
}

/// The TOML search configuration; every field is optional so the command line can fill gaps.
///
/// ```toml
/// alphabet = "protein"
/// encoding = "descriptor"
///
/// [mutations]
/// max-per-candidate = 2
/// allowed-positions = [3, 7, 12]
/// substitutes = { "3" = "AVLI" }
///
/// [search]
/// max-iterations = 50
///
/// [search.convergence]
/// patience-iterations = 5
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSearchConfig {
    alphabet: Option<String>,
    encoding: Option<String>,
    mutations: Option<PartialMutationConfig>,
    search: Option<PartialSearchSection>,
    generation: Option<PartialGenerationConfig>,
    proposal: Option<PartialProposalConfig>,
    reseed: Option<PartialReseedConfig>,
}

/// Everything `evolve` needs besides the seeds and the model.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub search: core_config::SearchConfig,
    pub encoding: EncodingName,
}

impl PartialSearchConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(
        mut self,
        args: &EvolveArgs,
        sequence_length: usize,
    ) -> Result<ResolvedConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let alphabet_name = args
            .alphabet
            .as_deref()
            .or(self.alphabet.as_deref())
            .unwrap_or(defaults.alphabet.as_str());
        let alphabet =
            parser::parse_alphabet(alphabet_name).map_err(|e| CliError::Argument(e.to_string()))?;

        let encoding_name = args
            .encoding
            .as_deref()
            .or(self.encoding.as_deref())
            .unwrap_or(defaults.encoding.as_str());
        let encoding =
            parser::parse_encoding(encoding_name).map_err(|e| CliError::Argument(e.to_string()))?;

        let mutations = self.mutations.take().unwrap_or_default();
        let search = self.search.take().unwrap_or_default();
        let convergence = search.convergence.unwrap_or_default();

        let max_mutations = args
            .max_mutations
            .or(mutations.max_per_candidate)
            .ok_or_else(|| {
                CliError::Config(
                    "`mutations.max-per-candidate` is required either in the config file or via --max-mutations."
                        .to_string(),
                )
            })?;

        let mut builder = core_config::SearchConfigBuilder::new()
            .alphabet(alphabet)
            .sequence_length(sequence_length)
            .max_mutations_per_candidate(max_mutations)
            .acquisition_beta(
                args.beta
                    .or(search.acquisition_beta)
                    .unwrap_or(defaults.acquisition_beta),
            )
            .frontier_size(
                args.frontier_size
                    .or(search.frontier_size)
                    .unwrap_or(defaults.frontier_size),
            )
            .batch_size_per_iteration(
                args.batch_size
                    .or(search.batch_size)
                    .unwrap_or(defaults.batch_size),
            )
            .max_iterations(
                args.max_iterations
                    .or(search.max_iterations)
                    .unwrap_or(defaults.max_iterations),
            )
            .max_evaluations(args.max_evaluations.or(search.max_evaluations))
            .random_seed(
                args.random_seed
                    .or(search.random_seed)
                    .unwrap_or(defaults.random_seed),
            )
            .min_improvement_delta(
                convergence
                    .min_improvement_delta
                    .unwrap_or(defaults.min_improvement_delta),
            )
            .convergence_patience(
                convergence
                    .patience_iterations
                    .unwrap_or(defaults.patience_iterations),
            );

        if let Some(tolerance) = search.encoding_failure_tolerance {
            builder = builder.encoding_failure_tolerance(tolerance);
        }
        if let Some(positions) = mutations.allowed_positions {
            builder = builder.allowed_positions(positions);
        }
        for (key, symbols) in mutations.substitutes.unwrap_or_default() {
            let position =
                parser::parse_position(&key).map_err(|e| CliError::Config(e.to_string()))?;
            builder = builder.allowed_substitutes(position, symbols.trim().as_bytes());
        }

        builder = builder.generation(Self::merge_generation(
            args,
            self.generation.take(),
            &defaults,
        )?);
        builder = builder.proposal(Self::merge_proposal(self.proposal.take())?);
        builder = builder.reseed(Self::merge_reseed(self.reseed.take(), sequence_length));

        let search = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(ResolvedConfig { search, encoding })
    }

    fn merge_generation(
        args: &EvolveArgs,
        partial: Option<PartialGenerationConfig>,
        defaults: &DefaultsConfig,
    ) -> Result<core_config::GenerationMode> {
        if args.exhaustive {
            return Ok(core_config::GenerationMode::Exhaustive);
        }
        if let Some(sample_size) = args.sample_size {
            return Ok(core_config::GenerationMode::Sampling { sample_size });
        }

        let partial = partial.unwrap_or_default();
        let mode = partial.mode.unwrap_or(if partial.sample_size.is_some() {
            GenerationModeName::Sampling
        } else {
            GenerationModeName::Auto
        });
        Ok(match mode {
            GenerationModeName::Exhaustive => core_config::GenerationMode::Exhaustive,
            GenerationModeName::Sampling => core_config::GenerationMode::Sampling {
                sample_size: partial.sample_size.ok_or_else(|| {
                    CliError::Config("`generation.mode = \"sampling\"` requires `sample-size`".to_string())
                })?,
            },
            GenerationModeName::Auto => core_config::GenerationMode::Auto {
                exhaustive_limit: partial
                    .exhaustive_limit
                    .map_or(defaults.exhaustive_limit, u128::from),
            },
        })
    }

    fn merge_proposal(
        partial: Option<PartialProposalConfig>,
    ) -> Result<Option<ProposalDistribution>> {
        let Some(partial) = partial else {
            return Ok(None);
        };
        let mut proposal = ProposalDistribution::new();
        for (key, weights) in partial.weights {
            let position =
                parser::parse_position(&key).map_err(|e| CliError::Config(e.to_string()))?;
            proposal = proposal.with_position(position, weights);
        }
        Ok(Some(proposal))
    }

    fn merge_reseed(
        partial: Option<PartialReseedConfig>,
        sequence_length: usize,
    ) -> core_config::ReseedPolicy {
        match partial {
            None => core_config::ReseedPolicy::Disabled,
            Some(p) => core_config::ReseedPolicy::TopFrontier {
                count: p.count.unwrap_or(1),
                max_total_mutations: p.max_total_mutations.unwrap_or(sequence_length),
            },
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let key = key.trim();
            let value_str = value_str.trim();

            match key {
                "alphabet" => self.alphabet = Some(value_str.to_string()),
                "encoding" => self.encoding = Some(value_str.to_string()),
                "mutations.max-per-candidate" => {
                    self.mutations
                        .get_or_insert_with(Default::default)
                        .max_per_candidate = Some(parse_value(key, value_str)?);
                }
                "search.acquisition-beta" => {
                    self.search_section().acquisition_beta = Some(parse_value(key, value_str)?);
                }
                "search.frontier-size" => {
                    self.search_section().frontier_size = Some(parse_value(key, value_str)?);
                }
                "search.batch-size" => {
                    self.search_section().batch_size = Some(parse_value(key, value_str)?);
                }
                "search.max-iterations" => {
                    self.search_section().max_iterations = Some(parse_value(key, value_str)?);
                }
                "search.max-evaluations" => {
                    self.search_section().max_evaluations = Some(parse_value(key, value_str)?);
                }
                "search.random-seed" => {
                    self.search_section().random_seed = Some(parse_value(key, value_str)?);
                }
                "search.encoding-failure-tolerance" => {
                    self.search_section().encoding_failure_tolerance =
                        Some(parse_value(key, value_str)?);
                }
                "search.convergence.min-improvement-delta" => {
                    self.search_section()
                        .convergence
                        .get_or_insert_with(Default::default)
                        .min_improvement_delta = Some(parse_value(key, value_str)?);
                }
                "search.convergence.patience-iterations" => {
                    self.search_section()
                        .convergence
                        .get_or_insert_with(Default::default)
                        .patience_iterations = Some(parse_value(key, value_str)?);
                }
                "generation.mode" => {
                    self.generation_section().mode = Some(value_str.parse()?);
                }
                "generation.sample-size" => {
                    self.generation_section().sample_size = Some(parse_value(key, value_str)?);
                }
                "generation.exhaustive-limit" => {
                    self.generation_section().exhaustive_limit = Some(parse_value(key, value_str)?);
                }
                "reseed.count" => {
                    self.reseed.get_or_insert_with(Default::default).count =
                        Some(parse_value(key, value_str)?);
                }
                "reseed.max-total-mutations" => {
                    self.reseed
                        .get_or_insert_with(Default::default)
                        .max_total_mutations = Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn search_section(&mut self) -> &mut PartialSearchSection {
        self.search.get_or_insert_with(Default::default)
    }

    fn generation_section(&mut self) -> &mut PartialGenerationConfig {
        self.generation.get_or_insert_with(Default::default)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}
