//! # Workflows Module
//!
//! Top-level entry points that tie the encoder, the surrogate model and the search engine
//! together.
//!
//! - **Evolution Workflow** ([`evolve`]) - Runs a complete search from seeds (or from a saved
//!   checkpoint) and returns the ranked frontier with its termination reason.

pub mod evolve;
