//! Top-level module for the Markov phrase generation system.
//!
//! This module provides the column-oriented Markov pipeline, including:
//! - The shared model schema (`ColumnModel`, `ModelSet`)
//! - A trainer turning tabular phrases into per-column models (`Trainer`)
//! - Constrained random-walk generation (`generate_phrase` and friends)
//! - The weighted sampling primitive (`weighted_random_choice`)

/// Shared model schema: per-column Markov models and ordered model sets.
///
/// This is the JSON-serializable contract connecting the trainer and
/// the generator.
pub mod column_model;

/// Trainer: tokenization, counting and normalization of tabular
/// phrase samples into column models.
pub mod trainer;

/// Generator: constrained random walks over trained models, with plain
/// and template-filling idea generation.
pub mod generator;

/// Weighted random selection primitive shared by the generator.
pub mod sampling;
