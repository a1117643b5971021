use std::sync::LazyLock;

use rand::Rng;
use regex::{Captures, Regex};

use crate::error::GenError;

use super::column_model::{ColumnModel, ModelSet};
use super::sampling::{choose_weighted, weighted_random_choice};

/// Maximum steps of a single random walk before end-word repair kicks in.
pub const MAX_WALK_STEPS: usize = 1000;

/// Maximum full restarts of a phrase generation before giving up.
///
/// The reference behavior restarts without bound when a walk hits the
/// length ceiling; this budget converts the pathological case into a
/// `GenerationExhausted` error instead.
pub const MAX_RESTARTS: usize = 100;

/// Inclusive bounds on the `count` argument of idea generation.
pub const MIN_COUNT: usize = 1;
pub const MAX_COUNT: usize = 50;

/// Chance of jumping to a uniformly random vocabulary word instead of
/// following the transition table. Deliberate noise injection: it keeps
/// generation from being strictly corpus-bound.
const RANDOM_JUMP_CHANCE: f64 = 0.05;

static PLACEHOLDER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder pattern is valid"));

/// Generates one phrase from a column model via a constrained random walk.
///
/// # Behavior
/// - Samples a target length uniformly from `[2, max observed length]`.
/// - Starts from a weighted start word, then repeatedly follows the
///   transition table (or, 5% of the time, jumps to a random vocabulary
///   word), stopping at an end word once the target length is reached.
/// - A walk that reaches the maximum observed length restarts from
///   scratch, up to [`MAX_RESTARTS`] times.
/// - If the walk stops on a token that is not a legal end word, a repair
///   step appends one: preferably a successor of the last token that is
///   also an end word, otherwise a weighted draw straight from
///   `end_words`. The latter can produce a token with no grammatical
///   connection to what precedes it; that is a documented quirk of the
///   scheme, not a bug.
///
/// # Errors
/// - `DegenerateModel` if the model has no length data or no start words.
/// - `GenerationExhausted` if the restart budget runs out.
pub fn generate_phrase<R: Rng>(model: &ColumnModel, rng: &mut R) -> Result<String, GenError> {
	let max_length = model
		.max_length()
		.ok_or_else(|| GenError::DegenerateModel("no length data".to_owned()))?;
	if model.start_words.is_empty() {
		return Err(GenError::DegenerateModel("no start words".to_owned()));
	}

	let vocabulary = model.vocabulary();

	for _ in 0..MAX_RESTARTS {
		if let Some(phrase) = attempt_walk(model, &vocabulary, max_length, rng) {
			return Ok(phrase);
		}
	}

	Err(GenError::GenerationExhausted(MAX_RESTARTS))
}

/// One walk attempt. Returns `None` when the walk hits the hard length
/// ceiling and the whole generation must restart.
fn attempt_walk<R: Rng>(
	model: &ColumnModel,
	vocabulary: &[&str],
	max_length: usize,
	rng: &mut R,
) -> Option<String> {
	// The sampler needs a non-empty range even when only one-token
	// phrases were observed.
	let target_length = rng.random_range(2..=max_length.max(2));

	let mut current = choose_weighted(&model.start_words, rng)?;
	let mut phrase: Vec<&str> = vec![current];

	for _ in 0..MAX_WALK_STEPS {
		let next = if rng.random::<f64>() < RANDOM_JUMP_CHANCE {
			Some(vocabulary[rng.random_range(0..vocabulary.len())])
		} else {
			model
				.transitions
				.get(current)
				.and_then(|successors| choose_weighted(successors, rng))
		};

		// No valid continuation: stop the walk.
		let Some(next) = next else { break };

		phrase.push(next);
		current = next;

		// Natural termination: legal end point at or after target length.
		if phrase.len() >= target_length && model.end_words.contains_key(current) {
			break;
		}

		// Hard ceiling, independent of target: restart the whole phrase.
		if phrase.len() >= max_length {
			return None;
		}
	}

	// Repair: make sure the phrase ends on a legal end word.
	if !model.end_words.contains_key(current) {
		let candidates: Vec<(&str, f64)> = model
			.transitions
			.get(current)
			.map(|successors| {
				successors
					.iter()
					.filter(|(word, _)| model.end_words.contains_key(*word))
					.map(|(word, probability)| (word.as_str(), *probability))
					.collect()
			})
			.unwrap_or_default();

		if candidates.is_empty() {
			phrase.push(choose_weighted(&model.end_words, rng)?);
		} else {
			let items: Vec<&str> = candidates.iter().map(|(word, _)| *word).collect();
			let weights: Vec<f64> = candidates.iter().map(|(_, probability)| *probability).collect();
			phrase.push(weighted_random_choice(&items, &weights, rng).copied()?);
		}
	}

	Some(phrase.join(" "))
}

/// Generates `count` ideas: one phrase per column model, in column
/// order, concatenated with single spaces.
///
/// # Errors
/// - `InvalidArgument` if `count` is outside `[1, 50]`.
/// - Any `generate_phrase` error for the individual columns.
pub fn generate_ideas<R: Rng>(
	models: &ModelSet,
	count: usize,
	rng: &mut R,
) -> Result<Vec<String>, GenError> {
	validate_count(count)?;

	let mut ideas = Vec::with_capacity(count);
	for _ in 0..count {
		ideas.push(generate_row(models, rng)?.join(" "));
	}
	Ok(ideas)
}

/// Generates `count` ideas by filling `$N` placeholders in a template.
///
/// Each trial generates one phrase per column model; every occurrence of
/// `$i` in the template is replaced with the phrase from the i-th column
/// (1-indexed), so repeated placeholders receive the same phrase within
/// a trial.
///
/// # Errors
/// - `InvalidArgument` if `count` is outside `[1, 50]`.
/// - `InvalidTemplate` if the template contains no `$N` placeholders.
/// - `InsufficientModels` if the highest referenced slot exceeds the
///   number of column models.
pub fn generate_with_template<R: Rng>(
	models: &ModelSet,
	template: &str,
	count: usize,
	rng: &mut R,
) -> Result<Vec<String>, GenError> {
	validate_count(count)?;

	let mut max_slot: usize = 0;
	let mut found = false;
	for captures in PLACEHOLDER.captures_iter(template) {
		found = true;
		// A slot too large to parse still exceeds any real model count.
		let slot: usize = captures[1].parse().unwrap_or(usize::MAX);
		max_slot = max_slot.max(slot);
	}

	if !found {
		return Err(GenError::InvalidTemplate(
			"template must contain placeholders like $1, $2".to_owned(),
		));
	}
	if max_slot > models.len() {
		return Err(GenError::InsufficientModels { required: max_slot, available: models.len() });
	}

	let mut ideas = Vec::with_capacity(count);
	for _ in 0..count {
		let phrases = generate_row(models, rng)?;
		let filled = PLACEHOLDER.replace_all(template, |captures: &Captures| {
			match captures[1].parse::<usize>() {
				Ok(slot) if (1..=phrases.len()).contains(&slot) => phrases[slot - 1].clone(),
				// $0 and unparsable slots stay as written.
				_ => captures[0].to_owned(),
			}
		});
		ideas.push(filled.into_owned());
	}
	Ok(ideas)
}

/// Generates one phrase per column model, in column order.
fn generate_row<R: Rng>(models: &ModelSet, rng: &mut R) -> Result<Vec<String>, GenError> {
	models.iter().map(|model| generate_phrase(model, rng)).collect()
}

fn validate_count(count: usize) -> Result<(), GenError> {
	if !(MIN_COUNT..=MAX_COUNT).contains(&count) {
		return Err(GenError::InvalidArgument(format!(
			"count must be between {MIN_COUNT} and {MAX_COUNT}, got {count}"
		)));
	}
	Ok(())
}
