use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Identifier of the source column a model was trained from.
///
/// The serialized contract allows either an integer position or a
/// string header, so the two are kept as an untagged enum.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum ColumnIndex {
	Position(u64),
	Header(String),
}

/// A per-column Markov model over word tokens.
///
/// Built once at training time from a finite batch of phrases and
/// immutable thereafter; the generator consumes it read-only.
///
/// # Invariants
/// - Every distribution's values sum to 1.0 (within floating tolerance)
///   whenever the distribution is non-empty
/// - Every token appearing as a transition destination, start word or
///   end word was observed at least once in training
/// - `lengths` keys are exactly the observed phrase token counts
///   (including zero for phrases that preprocess to nothing)
///
/// # Notes
/// - All distributions are `BTreeMap`s so iteration order, and therefore
///   generation under a fixed random seed, is deterministic.
/// - An all-empty model is a valid degenerate state (e.g. a column of
///   blank cells); generation on such a model fails, training does not.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColumnModel {
	/// Position or header of the source column.
	pub column_index: ColumnIndex,

	/// Token to probability distribution over successor tokens.
	pub transitions: BTreeMap<String, BTreeMap<String, f64>>,

	/// Probability distribution over tokens that may begin a phrase.
	pub start_words: BTreeMap<String, f64>,

	/// Probability distribution over tokens that may legally end a phrase.
	pub end_words: BTreeMap<String, f64>,

	/// Probability distribution over observed phrase lengths (token counts).
	/// Serialized with stringified-integer keys as JSON requires.
	pub lengths: BTreeMap<usize, f64>,
}

impl ColumnModel {
	/// Returns the largest observed phrase length, or `None` if the model
	/// has no length data.
	pub fn max_length(&self) -> Option<usize> {
		self.lengths.keys().next_back().copied()
	}

	/// Returns the working vocabulary: the sorted union of transition
	/// source tokens, start words and end words.
	///
	/// Used by the generator's uniform exploration step. Tokens that only
	/// ever appear as transition destinations are not part of it, matching
	/// the trained data exactly.
	pub fn vocabulary(&self) -> Vec<&str> {
		let mut words: BTreeSet<&str> = BTreeSet::new();
		words.extend(self.transitions.keys().map(String::as_str));
		words.extend(self.start_words.keys().map(String::as_str));
		words.extend(self.end_words.keys().map(String::as_str));
		words.into_iter().collect()
	}
}

/// An ordered sequence of column models trained from one source table.
///
/// Serializes as a bare JSON array of column models; other tooling
/// depends on that exact shape.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct ModelSet {
	columns: Vec<ColumnModel>,
}

impl ModelSet {
	/// Wraps an ordered sequence of column models.
	pub fn new(columns: Vec<ColumnModel>) -> Self {
		Self { columns }
	}

	/// Number of column models in the set.
	pub fn len(&self) -> usize {
		self.columns.len()
	}

	/// Whether the set contains no column models.
	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}

	/// Iterates over the column models in column order.
	pub fn iter(&self) -> std::slice::Iter<'_, ColumnModel> {
		self.columns.iter()
	}

	/// Read-only access to the underlying column models.
	pub fn columns(&self) -> &[ColumnModel] {
		&self.columns
	}
}
