use std::collections::BTreeMap;

use rand::Rng;

/// Selects an item from parallel slices of items and non-negative weights.
///
/// Weights do not need to be pre-normalized. The selection walks the
/// cumulative-sum array and returns the first item whose cumulative weight
/// reaches a uniform draw in `[0, total_weight)`.
///
/// # Returns
/// - `Some(&item)` for non-empty, equal-length inputs
/// - `None` if the slices are empty or their lengths differ
///
/// # Notes
/// - If floating-point edge effects leave no qualifying item, the last
///   item is returned. This is a defined fallback, not an error.
pub fn weighted_random_choice<'a, T, R: Rng>(
	items: &'a [T],
	weights: &[f64],
	rng: &mut R,
) -> Option<&'a T> {
	if items.is_empty() || items.len() != weights.len() {
		return None;
	}

	let total: f64 = weights.iter().sum();
	let draw = rng.random::<f64>() * total;

	let mut cumulative = 0.0;
	for (item, weight) in items.iter().zip(weights) {
		cumulative += weight;
		if cumulative >= draw {
			return Some(item);
		}
	}

	// Floating-point fallback
	items.last()
}

/// Weighted choice over a token probability distribution.
///
/// Convenience wrapper used by the generator for `start_words`, `end_words`
/// and per-token transition rows. Returns `None` on an empty distribution.
pub(crate) fn choose_weighted<'a, R: Rng>(
	distribution: &'a BTreeMap<String, f64>,
	rng: &mut R,
) -> Option<&'a str> {
	let items: Vec<&str> = distribution.keys().map(String::as_str).collect();
	let weights: Vec<f64> = distribution.values().copied().collect();
	weighted_random_choice(&items, &weights, rng).copied()
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;

	#[test]
	fn zero_weight_items_are_never_selected() {
		let items = ["a", "b"];
		let weights = [0.0, 1.0];
		let mut rng = StdRng::seed_from_u64(7);

		for _ in 0..100 {
			let choice = weighted_random_choice(&items, &weights, &mut rng);
			assert_eq!(choice, Some(&"b"));
		}
	}

	#[test]
	fn empty_input_yields_none() {
		let mut rng = StdRng::seed_from_u64(0);
		let choice = weighted_random_choice::<&str, _>(&[], &[], &mut rng);
		assert_eq!(choice, None);
	}

	#[test]
	fn mismatched_lengths_yield_none() {
		let mut rng = StdRng::seed_from_u64(0);
		let choice = weighted_random_choice(&["a", "b"], &[1.0], &mut rng);
		assert_eq!(choice, None);
	}

	#[test]
	fn single_item_is_always_selected() {
		let mut rng = StdRng::seed_from_u64(3);
		for _ in 0..10 {
			let choice = weighted_random_choice(&["only"], &[0.25], &mut rng);
			assert_eq!(choice, Some(&"only"));
		}
	}

	#[test]
	fn selection_respects_weight_proportions() {
		let items = ["rare", "common"];
		let weights = [1.0, 9.0];
		let mut rng = StdRng::seed_from_u64(42);

		let mut common = 0;
		for _ in 0..1000 {
			if weighted_random_choice(&items, &weights, &mut rng) == Some(&"common") {
				common += 1;
			}
		}
		// Expected around 900; a wide band keeps the test stable.
		assert!(common > 800 && common < 980, "got {common} of 1000");
	}

	#[test]
	fn choose_weighted_on_empty_distribution_yields_none() {
		let mut rng = StdRng::seed_from_u64(0);
		assert_eq!(choose_weighted(&BTreeMap::new(), &mut rng), None);
	}
}
