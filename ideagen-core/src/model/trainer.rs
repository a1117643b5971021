use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;

use log::debug;

use super::column_model::{ColumnIndex, ColumnModel, ModelSet};

/// Splits normalized text into word tokens.
///
/// The tokenizer is a pluggable capability: the default splits on
/// whitespace, which is sufficient once `normalize_text` has stripped
/// punctuation. Implementations must be shareable across the training
/// worker threads.
pub trait Tokenizer: Send + Sync {
	fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Default tokenizer: whitespace-delimited words.
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		text.split_whitespace().map(str::to_owned).collect()
	}
}

/// Normalizes a raw phrase before tokenization.
///
/// - Strips every character except ASCII letters, digits and whitespace
/// - Collapses whitespace runs to a single space
/// - Trims leading and trailing whitespace
///
/// Malformed input cannot fail here; at worst it normalizes to an
/// empty string and contributes no statistics.
pub fn normalize_text(text: &str) -> String {
	let stripped: String = text
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
		.collect();
	stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds per-column Markov models from tabular text samples.
///
/// # Responsibilities
/// - Normalize and tokenize each phrase of each column
/// - Accumulate length, start-word, end-word and transition counts
/// - Convert every counter to a probability distribution
///
/// # Notes
/// - Columns are trained independently; `train_parallel` spreads them
///   across worker threads with per-column results identical to `train`.
/// - Training never fails on ill-formed phrases. A column of entirely
///   empty cells yields a model with four empty distributions, which is
///   a valid degenerate state.
pub struct Trainer {
	tokenizer: Box<dyn Tokenizer>,
}

impl Default for Trainer {
	fn default() -> Self {
		Self::new()
	}
}

impl Trainer {
	/// Creates a trainer with the default whitespace tokenizer.
	pub fn new() -> Self {
		Self { tokenizer: Box::new(WhitespaceTokenizer) }
	}

	/// Creates a trainer with a custom tokenizer.
	pub fn with_tokenizer(tokenizer: Box<dyn Tokenizer>) -> Self {
		Self { tokenizer }
	}

	/// Trains one model per column, in column order.
	///
	/// `table` is a sequence of columns, each a sequence of optional
	/// phrase cells. Missing (`None`) and empty cells are dropped.
	pub fn train(&self, table: &[Vec<Option<String>>]) -> ModelSet {
		let columns = table
			.iter()
			.enumerate()
			.map(|(index, cells)| self.train_column(index as u64, cells))
			.collect();
		ModelSet::new(columns)
	}

	/// Trains columns in parallel across worker threads.
	///
	/// # Behavior
	/// - Splits the columns into one chunk per available CPU core.
	/// - Each worker trains its chunk and sends it back over a channel.
	/// - Chunks are reassembled in column order.
	///
	/// Per-column results are identical to sequential `train`.
	pub fn train_parallel(&self, table: &[Vec<Option<String>>]) -> ModelSet {
		if table.len() <= 1 {
			return self.train(table);
		}

		let cpus = num_cpus::get();
		let chunk_size = table.len().div_ceil(cpus);
		debug!("training {} columns in chunks of {}", table.len(), chunk_size);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for (chunk_id, chunk) in table.chunks(chunk_size).enumerate() {
				let tx = tx.clone();
				scope.spawn(move || {
					let base = chunk_id * chunk_size;
					let models: Vec<ColumnModel> = chunk
						.iter()
						.enumerate()
						.map(|(offset, cells)| self.train_column((base + offset) as u64, cells))
						.collect();
					tx.send((base, models)).expect("failed to send from worker thread");
				});
			}
		});
		drop(tx);

		let mut indexed: Vec<(usize, Vec<ColumnModel>)> = rx.iter().collect();
		indexed.sort_by_key(|(base, _)| *base);

		ModelSet::new(indexed.into_iter().flat_map(|(_, models)| models).collect())
	}

	/// Trains a single column model from its cells.
	///
	/// # Behavior
	/// - Drops missing and empty cells.
	/// - Normalizes and tokenizes each remaining phrase.
	/// - Records the token count into `lengths` (zero included, for
	///   phrases that preprocess to nothing).
	/// - For non-empty token sequences, counts the first token as a start
	///   word, the last as an end word, and every consecutive pair as a
	///   transition.
	/// - Normalizes every counter to probabilities; a counter with zero
	///   total yields an empty distribution.
	pub fn train_column(&self, index: u64, cells: &[Option<String>]) -> ColumnModel {
		let mut transitions: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
		let mut start_words: BTreeMap<String, u64> = BTreeMap::new();
		let mut end_words: BTreeMap<String, u64> = BTreeMap::new();
		let mut lengths: BTreeMap<usize, u64> = BTreeMap::new();

		for cell in cells {
			let Some(raw) = cell else { continue };
			if raw.is_empty() {
				continue;
			}

			let clean = normalize_text(raw);
			let tokens = self.tokenizer.tokenize(&clean);
			*lengths.entry(tokens.len()).or_insert(0) += 1;

			if let (Some(first), Some(last)) = (tokens.first(), tokens.last()) {
				*start_words.entry(first.clone()).or_insert(0) += 1;
				*end_words.entry(last.clone()).or_insert(0) += 1;

				for pair in tokens.windows(2) {
					*transitions
						.entry(pair[0].clone())
						.or_default()
						.entry(pair[1].clone())
						.or_insert(0) += 1;
				}
			}
		}

		ColumnModel {
			column_index: ColumnIndex::Position(index),
			transitions: transitions
				.iter()
				.map(|(token, counter)| (token.clone(), normalize_counts(counter)))
				.collect(),
			start_words: normalize_counts(&start_words),
			end_words: normalize_counts(&end_words),
			lengths: normalize_counts(&lengths),
		}
	}
}

/// Converts a frequency counter to a probability distribution.
///
/// Each count is divided by the sum of all counts. A counter with zero
/// total yields an empty distribution.
fn normalize_counts<K: Ord + Clone>(counter: &BTreeMap<K, u64>) -> BTreeMap<K, f64> {
	let total: u64 = counter.values().sum();
	if total == 0 {
		return BTreeMap::new();
	}
	counter
		.iter()
		.map(|(key, count)| (key.clone(), *count as f64 / total as f64))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn column(phrases: &[&str]) -> Vec<Option<String>> {
		phrases.iter().map(|p| Some((*p).to_owned())).collect()
	}

	fn assert_sums_to_one(distribution: &BTreeMap<String, f64>) {
		let sum: f64 = distribution.values().sum();
		assert!((sum - 1.0).abs() < 1e-9, "distribution sums to {sum}");
	}

	#[test]
	fn normalize_text_strips_punctuation_and_collapses_whitespace() {
		assert_eq!(normalize_text("  Hello,   world! "), "Hello world");
		assert_eq!(normalize_text("it's a no-op"), "its a noop");
		assert_eq!(normalize_text("!!!"), "");
		assert_eq!(normalize_text("caf\u{e9} 42"), "caf 42");
	}

	#[test]
	fn distributions_are_normalized() {
		let trainer = Trainer::new();
		let model = trainer.train_column(
			0,
			&column(&["the red fox", "the red hen", "a red fox"]),
		);

		assert_sums_to_one(&model.start_words);
		assert_sums_to_one(&model.end_words);
		for successors in model.transitions.values() {
			assert_sums_to_one(successors);
		}
		let length_sum: f64 = model.lengths.values().sum();
		assert!((length_sum - 1.0).abs() < 1e-9);
	}

	#[test]
	fn counts_become_expected_probabilities() {
		let trainer = Trainer::new();
		let model = trainer.train_column(0, &column(&["the red fox", "the red hen"]));

		assert_eq!(model.start_words["the"], 1.0);
		assert_eq!(model.end_words["fox"], 0.5);
		assert_eq!(model.end_words["hen"], 0.5);
		assert_eq!(model.transitions["the"]["red"], 1.0);
		assert_eq!(model.transitions["red"]["fox"], 0.5);
		assert_eq!(model.transitions["red"]["hen"], 0.5);
		assert_eq!(model.lengths[&3], 1.0);
	}

	#[test]
	fn every_recorded_token_was_observed_in_training() {
		let trainer = Trainer::new();
		let phrases = ["a bright spark", "a dim spark", "bright future"];
		let model = trainer.train_column(0, &column(&phrases));

		let observed: std::collections::BTreeSet<&str> =
			phrases.iter().flat_map(|p| p.split_whitespace()).collect();

		for word in model.start_words.keys().chain(model.end_words.keys()) {
			assert!(observed.contains(word.as_str()), "unobserved token {word}");
		}
		for (source, successors) in &model.transitions {
			assert!(observed.contains(source.as_str()));
			for destination in successors.keys() {
				assert!(observed.contains(destination.as_str()));
			}
		}
	}

	#[test]
	fn missing_and_empty_cells_are_dropped() {
		let trainer = Trainer::new();
		let cells = vec![None, Some(String::new()), Some("solo word".to_owned()), None];
		let model = trainer.train_column(0, &cells);

		assert_eq!(model.lengths.len(), 1);
		assert_eq!(model.lengths[&2], 1.0);
		assert_eq!(model.start_words["solo"], 1.0);
	}

	#[test]
	fn all_empty_column_yields_fully_degenerate_model() {
		let trainer = Trainer::new();
		let cells = vec![None, Some(String::new()), None];
		let model = trainer.train_column(0, &cells);

		assert!(model.transitions.is_empty());
		assert!(model.start_words.is_empty());
		assert!(model.end_words.is_empty());
		assert!(model.lengths.is_empty());
	}

	#[test]
	fn phrase_that_preprocesses_to_nothing_still_counts_a_zero_length() {
		let trainer = Trainer::new();
		let model = trainer.train_column(0, &column(&["???", "one two"]));

		assert_eq!(model.lengths[&0], 0.5);
		assert_eq!(model.lengths[&2], 0.5);
		// But it contributes no start, end or transition statistics.
		assert!(!model.start_words.is_empty());
		assert!(!model.start_words.contains_key(""));
	}

	#[test]
	fn single_token_phrases_produce_no_transitions() {
		let trainer = Trainer::new();
		let model = trainer.train_column(0, &column(&["alone"]));

		assert!(model.transitions.is_empty());
		assert_eq!(model.start_words["alone"], 1.0);
		assert_eq!(model.end_words["alone"], 1.0);
	}

	#[test]
	fn columns_are_trained_independently_and_in_order() {
		let trainer = Trainer::new();
		let table = vec![column(&["left side"]), column(&["right side"])];
		let set = trainer.train(&table);

		assert_eq!(set.len(), 2);
		assert!(set.columns()[0].start_words.contains_key("left"));
		assert!(set.columns()[1].start_words.contains_key("right"));
	}

	#[test]
	fn parallel_training_matches_sequential() {
		let trainer = Trainer::new();
		let table: Vec<Vec<Option<String>>> = (0..17)
			.map(|i| vec![Some(format!("row {i} alpha")), Some(format!("row {i} beta"))])
			.collect();

		assert_eq!(trainer.train_parallel(&table), trainer.train(&table));
	}

	struct LowercaseTokenizer;

	impl Tokenizer for LowercaseTokenizer {
		fn tokenize(&self, text: &str) -> Vec<String> {
			text.split_whitespace().map(str::to_lowercase).collect()
		}
	}

	#[test]
	fn custom_tokenizer_is_honored() {
		let trainer = Trainer::with_tokenizer(Box::new(LowercaseTokenizer));
		let model = trainer.train_column(0, &column(&["Big Idea"]));

		assert!(model.start_words.contains_key("big"));
		assert!(model.end_words.contains_key("idea"));
	}
}
