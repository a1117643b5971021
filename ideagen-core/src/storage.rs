use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};

use crate::error::GenError;
use crate::io;
use crate::model::column_model::ModelSet;

/// Model storage collaborator.
///
/// The generator side of the pipeline obtains trained model sets through
/// this trait, once per generation request. Implementations own their
/// retries and transport details; any fetch failure surfaces as an opaque
/// `ModelUnavailable`.
pub trait ModelStore {
	/// Lists the identifiers of the available model sets.
	fn list_models(&self) -> Result<Vec<String>, GenError>;

	/// Fetches a model set by name.
	fn fetch_model(&self, name: &str) -> Result<ModelSet, GenError>;
}

/// Explicit fetch cache for model sets.
///
/// Passed into [`CachingStore`] rather than living as global state, so
/// tests can control cache hits and misses deterministically. A miss or
/// a failed write is never an error; the store simply re-fetches.
pub trait ModelCache {
	fn get(&self, name: &str) -> Option<ModelSet>;
	fn put(&self, name: &str, models: &ModelSet);
}

/// Validates a model name before it touches any storage path.
///
/// Rejects empty names, path traversal (`..`), absolute paths, protocol
/// schemes, characters outside `[A-Za-z0-9._/-]` and names longer than
/// 200 bytes.
///
/// # Errors
/// Returns `InvalidArgument` describing the first violated rule.
pub fn validate_model_name(name: &str) -> Result<(), GenError> {
	if name.is_empty() {
		return Err(GenError::InvalidArgument("model name cannot be empty".to_owned()));
	}
	if name.contains("..") {
		return Err(GenError::InvalidArgument(
			"model name cannot contain '..' sequences".to_owned(),
		));
	}
	if name.starts_with('/') || name.starts_with('\\') {
		return Err(GenError::InvalidArgument(
			"model name cannot be an absolute path".to_owned(),
		));
	}
	if name.contains("://") {
		return Err(GenError::InvalidArgument(
			"model name cannot contain protocol schemes".to_owned(),
		));
	}
	if !name
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
	{
		return Err(GenError::InvalidArgument(
			"model name contains invalid characters".to_owned(),
		));
	}
	if name.len() > 200 {
		return Err(GenError::InvalidArgument("model name is too long".to_owned()));
	}
	Ok(())
}

/// Filesystem-backed model store.
///
/// Serves `.json` model sets from a single directory. The model name is
/// the file name without extension.
pub struct FsModelStore {
	folder: PathBuf,
}

impl FsModelStore {
	/// Creates a store over a directory of `.json` model sets.
	///
	/// Both `"folder"` and `"folder/"` are accepted.
	///
	/// # Errors
	/// Returns `ModelUnavailable` if the path is not a directory.
	pub fn new<P: AsRef<Path>>(folder: P) -> Result<Self, GenError> {
		let folder = io::normalize_folder(folder);
		if !folder.is_dir() {
			return Err(GenError::ModelUnavailable(format!(
				"expected a directory, got: {}",
				folder.display()
			)));
		}
		Ok(Self { folder })
	}

	/// Writes a model set to the store as pretty-printed JSON.
	///
	/// # Errors
	/// - `InvalidArgument` for a malformed name.
	/// - `ModelUnavailable` if serialization or the write fails.
	pub fn store_model(&self, name: &str, models: &ModelSet) -> Result<(), GenError> {
		validate_model_name(name)?;
		let json = serde_json::to_string_pretty(models)
			.map_err(|e| GenError::ModelUnavailable(format!("failed to serialize '{name}': {e}")))?;
		fs::write(self.model_path(name), json)
			.map_err(|e| GenError::ModelUnavailable(format!("failed to write '{name}': {e}")))
	}

	fn model_path(&self, name: &str) -> PathBuf {
		self.folder.join(format!("{name}.json"))
	}
}

impl ModelStore for FsModelStore {
	fn list_models(&self) -> Result<Vec<String>, GenError> {
		let files = io::list_files(&self.folder, "json")
			.map_err(|e| GenError::ModelUnavailable(format!("failed to list models: {e}")))?;
		Ok(files
			.iter()
			.map(|file| file.trim_end_matches(".json").to_owned())
			.collect())
	}

	fn fetch_model(&self, name: &str) -> Result<ModelSet, GenError> {
		validate_model_name(name)?;
		let path = self.model_path(name);
		let data = fs::read_to_string(&path)
			.map_err(|e| GenError::ModelUnavailable(format!("failed to read model '{name}': {e}")))?;
		serde_json::from_str(&data)
			.map_err(|e| GenError::ModelUnavailable(format!("failed to parse model '{name}': {e}")))
	}
}

/// Filesystem fetch cache keeping JSON copies of fetched model sets.
///
/// Entries are keyed by the base file name of the model, mirroring how
/// the serving side lays out nested model paths.
pub struct FsCache {
	folder: PathBuf,
}

impl FsCache {
	/// Creates the cache, making the directory if needed.
	pub fn new<P: AsRef<Path>>(folder: P) -> Result<Self, GenError> {
		let folder = folder.as_ref().to_path_buf();
		fs::create_dir_all(&folder)
			.map_err(|e| GenError::ModelUnavailable(format!("failed to create cache dir: {e}")))?;
		Ok(Self { folder })
	}

	fn entry_path(&self, name: &str) -> PathBuf {
		let stem = io::get_filename(name).unwrap_or_else(|_| name.to_owned());
		self.folder.join(format!("{stem}.json"))
	}
}

impl ModelCache for FsCache {
	fn get(&self, name: &str) -> Option<ModelSet> {
		let bytes = fs::read_to_string(self.entry_path(name)).ok()?;
		match serde_json::from_str(&bytes) {
			Ok(models) => Some(models),
			Err(e) => {
				// Corrupted entry: treat as a miss and re-fetch.
				warn!("discarding corrupt cache entry for '{name}': {e}");
				None
			}
		}
	}

	fn put(&self, name: &str, models: &ModelSet) {
		match serde_json::to_string(models) {
			Ok(json) => {
				if let Err(e) = fs::write(self.entry_path(name), json) {
					warn!("failed to cache model '{name}': {e}");
				}
			}
			Err(e) => warn!("failed to serialize model '{name}' for caching: {e}"),
		}
	}
}

/// In-memory fetch cache.
///
/// Mainly useful in tests and short-lived processes where persisting
/// fetched models is not worth it.
#[derive(Default)]
pub struct MemoryCache {
	entries: Mutex<HashMap<String, ModelSet>>,
}

impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}
}

impl ModelCache for MemoryCache {
	fn get(&self, name: &str) -> Option<ModelSet> {
		self.entries.lock().ok()?.get(name).cloned()
	}

	fn put(&self, name: &str, models: &ModelSet) {
		if let Ok(mut entries) = self.entries.lock() {
			entries.insert(name.to_owned(), models.clone());
		}
	}
}

/// A model store wrapped with an explicit fetch cache.
///
/// # Behavior
/// - `fetch_model` consults the cache first; on a miss it fetches from
///   the inner store and fills the cache.
/// - `list_models` always goes to the inner store.
/// - Cache failures degrade to a re-fetch, never an error.
pub struct CachingStore<S: ModelStore, C: ModelCache> {
	store: S,
	cache: C,
}

impl<S: ModelStore, C: ModelCache> CachingStore<S, C> {
	pub fn new(store: S, cache: C) -> Self {
		Self { store, cache }
	}
}

impl<S: ModelStore, C: ModelCache> ModelStore for CachingStore<S, C> {
	fn list_models(&self) -> Result<Vec<String>, GenError> {
		self.store.list_models()
	}

	fn fetch_model(&self, name: &str) -> Result<ModelSet, GenError> {
		validate_model_name(name)?;

		if let Some(models) = self.cache.get(name) {
			debug!("cache hit for model '{name}'");
			return Ok(models);
		}

		let models = self.store.fetch_model(name)?;
		self.cache.put(name, &models);
		Ok(models)
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::collections::BTreeMap;

	use crate::model::column_model::{ColumnIndex, ColumnModel};

	use super::*;

	fn sample_set() -> ModelSet {
		ModelSet::new(vec![ColumnModel {
			column_index: ColumnIndex::Position(0),
			transitions: BTreeMap::new(),
			start_words: BTreeMap::from([("hello".to_owned(), 1.0)]),
			end_words: BTreeMap::from([("hello".to_owned(), 1.0)]),
			lengths: BTreeMap::from([(1, 1.0)]),
		}])
	}

	/// Counts fetches so cache hits and misses are observable.
	struct CountingStore {
		models: ModelSet,
		fetches: Cell<usize>,
	}

	impl CountingStore {
		fn new(models: ModelSet) -> Self {
			Self { models, fetches: Cell::new(0) }
		}
	}

	impl ModelStore for CountingStore {
		fn list_models(&self) -> Result<Vec<String>, GenError> {
			Ok(vec!["sample".to_owned()])
		}

		fn fetch_model(&self, name: &str) -> Result<ModelSet, GenError> {
			if name != "sample" {
				return Err(GenError::ModelUnavailable(format!("no such model '{name}'")));
			}
			self.fetches.set(self.fetches.get() + 1);
			Ok(self.models.clone())
		}
	}

	#[test]
	fn valid_model_names_pass() {
		for name in ["sample", "samples/sample", "a-b_c.d", "MODEL42"] {
			assert!(validate_model_name(name).is_ok(), "rejected {name}");
		}
	}

	#[test]
	fn hostile_model_names_are_rejected() {
		let hostile = [
			"",
			"../etc/passwd",
			"/absolute",
			"\\absolute",
			"http://evil.example/x",
			"name with spaces",
			"semi;colon",
		];
		for name in hostile {
			assert!(
				matches!(validate_model_name(name), Err(GenError::InvalidArgument(_))),
				"accepted {name:?}"
			);
		}

		let too_long = "a".repeat(201);
		assert!(matches!(
			validate_model_name(&too_long),
			Err(GenError::InvalidArgument(_))
		));
	}

	#[test]
	fn caching_store_fetches_once_per_model() {
		let store = CountingStore::new(sample_set());
		let caching = CachingStore::new(store, MemoryCache::new());

		let first = caching.fetch_model("sample").unwrap();
		let second = caching.fetch_model("sample").unwrap();

		assert_eq!(first, second);
		assert_eq!(caching.store.fetches.get(), 1);
	}

	#[test]
	fn caching_store_propagates_fetch_failures() {
		let store = CountingStore::new(sample_set());
		let caching = CachingStore::new(store, MemoryCache::new());

		let err = caching.fetch_model("missing").unwrap_err();
		assert!(matches!(err, GenError::ModelUnavailable(_)));
	}

	#[test]
	fn caching_store_validates_names_before_touching_the_cache() {
		let store = CountingStore::new(sample_set());
		let caching = CachingStore::new(store, MemoryCache::new());

		let err = caching.fetch_model("../sample").unwrap_err();
		assert!(matches!(err, GenError::InvalidArgument(_)));
		assert_eq!(caching.store.fetches.get(), 0);
	}

	#[test]
	fn fs_store_round_trips_a_model_set() {
		let dir = std::env::temp_dir().join(format!("ideagen-store-{}", std::process::id()));
		fs::create_dir_all(&dir).unwrap();

		let store = FsModelStore::new(&dir).unwrap();
		let set = sample_set();
		store.store_model("sample", &set).unwrap();

		assert_eq!(store.list_models().unwrap(), vec!["sample".to_owned()]);
		assert_eq!(store.fetch_model("sample").unwrap(), set);

		let err = store.fetch_model("absent").unwrap_err();
		assert!(matches!(err, GenError::ModelUnavailable(_)));

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn fs_store_rejects_missing_directories() {
		let missing = std::env::temp_dir().join("ideagen-no-such-dir");
		assert!(matches!(
			FsModelStore::new(&missing),
			Err(GenError::ModelUnavailable(_))
		));
	}
}
