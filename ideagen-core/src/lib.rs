//! Markov-chain phrase generation library.
//!
//! This crate provides a column-oriented Markov model system including:
//! - A trainer that turns tabular text samples into per-column models
//! - A generator that produces novel phrases via constrained random walks
//! - Plain and template-filling idea generation
//! - A model storage collaborator with an explicit fetch cache
//!
//! Models are trained once, immutable afterwards, and safe to share
//! read-only across threads. All generation entry points take an explicit
//! random source so results are reproducible under a fixed seed.

/// Core Markov models, training and generation logic.
pub mod model;

/// Error taxonomy shared by the trainer, generator and storage layers.
pub mod error;

/// Model storage collaborator: listing, fetching and caching model sets.
pub mod storage;

/// I/O utilities (path helpers, directory listing).
///
/// Not part of the public API.
pub(crate) mod io;
