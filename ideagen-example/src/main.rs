use std::fs;

use ideagen_core::error::GenError;
use ideagen_core::model::generator::{generate_ideas, generate_with_template};
use ideagen_core::model::trainer::Trainer;
use ideagen_core::storage::{CachingStore, FsCache, FsModelStore, ModelStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();

	// A tiny two-column training table: adjectives + objects on the left,
	// audiences on the right. Cells are optional; blanks are dropped.
	let table: Vec<Vec<Option<String>>> = vec![
		vec![
			Some("a clockwork parrot".to_owned()),
			Some("a clockwork compass".to_owned()),
			Some("a brass compass".to_owned()),
			Some("a tiny brass parrot".to_owned()),
			None,
		],
		vec![
			Some("for tired sailors".to_owned()),
			Some("for curious sailors".to_owned()),
			Some("for curious kids".to_owned()),
			Some(String::new()),
		],
	];

	// Train one Markov model per column. Training never fails on odd
	// phrases; they just contribute no statistics.
	let trainer = Trainer::new();
	let models = trainer.train(&table);
	println!("Trained {} column models", models.len());

	// Persist the model set as JSON and read it back through the store,
	// the way a serving process would.
	fs::create_dir_all("./data")?;
	let store = FsModelStore::new("./data")?;
	store.store_model("demo", &models)?;

	let store = CachingStore::new(store, FsCache::new("./data/cache")?);
	println!("Available models: {:?}", store.list_models()?);

	let models = store.fetch_model("demo")?;
	let mut rng = rand::rng();

	// Plain idea generation: one phrase per column, joined with spaces.
	for (i, idea) in generate_ideas(&models, 5, &mut rng)?.iter().enumerate() {
		println!("Idea {}: {}", i + 1, idea);
	}

	// Template generation: $1 and $2 are filled per trial from the
	// first and second column models.
	let filled = generate_with_template(&models, "Pitch: $1, made $2.", 3, &mut rng)?;
	for line in &filled {
		println!("{line}");
	}

	// Count is bounded to [1, 50]
	match generate_ideas(&models, 0, &mut rng) {
		Ok(_) => println!("Should not happen"),
		Err(e) => println!("Count 0 is invalid: {e}"),
	}

	// A template needs at least one $N placeholder
	match generate_with_template(&models, "no placeholders", 1, &mut rng) {
		Ok(_) => println!("Should not happen"),
		Err(e) => println!("Template rejected: {e}"),
	}

	// Fetching an unknown model surfaces an opaque storage error
	match store.fetch_model("unknown") {
		Ok(_) => println!("Should not happen"),
		Err(GenError::ModelUnavailable(reason)) => println!("As expected: {reason}"),
		Err(e) => println!("Unexpected error kind: {e}"),
	}

	Ok(())
}
