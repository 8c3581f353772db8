//! # Engine Module
//!
//! The stateful half of the library: everything that changes while a search runs.
//!
//! ## Overview
//!
//! A search starts from one or more validated seed sequences and repeatedly asks the
//! [`generator`] for unvisited mutants, encodes them, lets the surrogate model predict a mean and
//! an uncertainty for each, ranks them with an [`acquisition`] function and merges the scored
//! batch into a bounded [`frontier`]. The loop is an explicit state machine held in
//! [`state::SearchState`] and advanced one iteration at a time by
//! [`search::SearchEngine::step`]:
//!
//! ```text
//! INITIALIZED -> ITERATING -> { CONVERGED | BUDGET_EXHAUSTED | EXHAUSTED_SPACE }
//! ```
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Search parameters, builder and eager validation
//! - **Generation** ([`generator`]) - Exhaustive and seeded stochastic mutation space traversal
//! - **Ranking** ([`acquisition`], [`frontier`]) - Upper confidence bound scores and the top-K set
//! - **State Tracking** ([`state`]) - Status, iteration history and serialisable checkpoints
//! - **Orchestration** ([`search`]) - The per-iteration pipeline and termination checks
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error taxonomy
//!
//! ## Concurrency
//!
//! Encoding runs in parallel across the candidates of a batch when the `parallel` feature is
//! enabled. The frontier and the visited set are only touched after the whole batch has been
//! scored, in a single merge.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod frontier;
pub mod generator;
pub mod progress;
pub mod search;
pub mod state;
