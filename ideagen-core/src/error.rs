use thiserror::Error;

/// Errors produced by the trainer, generator and storage collaborator.
///
/// All core errors are deterministic given the same inputs and random seed.
/// The trainer itself never raises on malformed phrases (they degrade to
/// empty token sequences); errors surface from generation and storage only.
#[derive(Error, Debug)]
pub enum GenError {
	/// The model is missing a distribution that generation requires
	/// (no start words, or no length data).
	#[error("degenerate model: {0}")]
	DegenerateModel(String),

	/// The retry budget was exhausted without reaching a valid termination.
	#[error("generation exhausted after {0} restarts")]
	GenerationExhausted(usize),

	/// The template contains no recognizable `$N` placeholders.
	#[error("invalid template: {0}")]
	InvalidTemplate(String),

	/// The template references more placeholder slots than the model set has columns.
	#[error("template requires {required} models but only {available} available")]
	InsufficientModels { required: usize, available: usize },

	/// A caller-supplied argument is out of range or malformed.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// Opaque passthrough for storage failures.
	#[error("model unavailable: {0}")]
	ModelUnavailable(String),
}
