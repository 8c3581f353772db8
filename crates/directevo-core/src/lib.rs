//! # DirectEvo Core Library
//!
//! A library for *in silico* directed evolution: given a fitted surrogate model that predicts
//! a fitness score together with an uncertainty estimate, it searches the mutation neighbourhood
//! of one or more seed sequences and proposes a small, diverse batch of improved candidates.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: the symbol [`core::alphabet`],
//!   validated [`core::sequence`] values, deterministic feature [`core::encoding`] schemes and the
//!   uncertainty-aware [`core::model`] contract that every surrogate must satisfy.
//!
//! - **[`engine`]: The Logic Core.** The stateful search. It owns the mutation space generator,
//!   the acquisition function, the bounded frontier and the visited set, and advances them one
//!   iteration at a time through [`engine::search::SearchEngine::step`].
//!
//! - **[`workflows`]: The Public API.** Ties `core` and `engine` together into a single call that
//!   runs a complete search and returns the ranked frontier with its termination reason.

pub mod core;
pub mod engine;
pub mod workflows;
