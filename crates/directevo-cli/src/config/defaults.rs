use directevo::engine::config as core_config;

/// Values the CLI falls back to when neither the config file nor the command line sets them.
#[derive(Debug, Clone)]
pub struct DefaultsConfig {
    pub alphabet: String,
    pub encoding: String,
    pub acquisition_beta: f64,
    pub frontier_size: usize,
    pub batch_size: usize,
    pub max_iterations: usize,
    pub min_improvement_delta: f64,
    pub patience_iterations: usize,
    pub exhaustive_limit: u128,
    pub random_seed: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            alphabet: "protein".to_string(),
            encoding: "one-hot".to_string(),
            acquisition_beta: core_config::DEFAULT_ACQUISITION_BETA,
            frontier_size: core_config::DEFAULT_FRONTIER_SIZE,
            batch_size: core_config::DEFAULT_BATCH_SIZE,
            max_iterations: core_config::DEFAULT_MAX_ITERATIONS,
            min_improvement_delta: core_config::DEFAULT_MIN_IMPROVEMENT_DELTA,
            patience_iterations: core_config::DEFAULT_PATIENCE,
            exhaustive_limit: core_config::DEFAULT_EXHAUSTIVE_LIMIT,
            random_seed: 42,
        }
    }
}
