//! # Core Module
//!
//! Stateless building blocks shared by the search engine and by external collaborators.
//!
//! ## Architecture
//!
//! - **Symbols** ([`alphabet`]) - The fixed, ordered symbol set a session works over
//! - **Sequences** ([`sequence`]) - Owned symbol strings and mutation distance
//! - **Features** ([`encoding`]) - One-hot, ordinal, descriptor and embedding encoders
//! - **Surrogates** ([`model`]) - The `(mean, uncertainty)` prediction contract and reference models
//!
//! Nothing in this module mutates shared state; every operation is a pure function of its
//! inputs plus static tables supplied at construction.

pub mod alphabet;
pub mod encoding;
pub mod model;
pub mod sequence;
