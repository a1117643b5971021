use std::env;
use std::path::Path;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware, web};
use serde::Deserialize;

use ideagen_core::error::GenError;
use ideagen_core::model::generator::{generate_ideas, generate_with_template};
use ideagen_core::storage::{CachingStore, FsCache, FsModelStore, ModelStore};

const DEFAULT_COUNT: usize = 5;

/// Struct representing query parameters for the `/v1/ideas` endpoint
#[derive(Deserialize)]
struct IdeasParams {
	model: String,
	count: Option<usize>,
}

/// Struct representing query parameters for the `/v1/template` endpoint
#[derive(Deserialize)]
struct TemplateParams {
	model: String,
	template: String,
	count: Option<usize>,
}

struct SharedData {
	store: CachingStore<FsModelStore, FsCache>,
}

/// Maps core errors to HTTP responses.
///
/// Caller mistakes map to 400, unknown models to 404, models that cannot
/// generate to 422, and an exhausted retry budget to 500.
fn error_response(error: &GenError) -> HttpResponse {
	match error {
		GenError::InvalidArgument(_)
		| GenError::InvalidTemplate(_)
		| GenError::InsufficientModels { .. } => HttpResponse::BadRequest().body(error.to_string()),
		GenError::ModelUnavailable(_) => HttpResponse::NotFound().body(error.to_string()),
		GenError::DegenerateModel(_) => HttpResponse::UnprocessableEntity().body(error.to_string()),
		GenError::GenerationExhausted(_) => {
			HttpResponse::InternalServerError().body(error.to_string())
		}
	}
}

/// HTTP GET endpoint `/v1/models`
///
/// Lists the available model sets as a JSON array of names.
#[get("/v1/models")]
async fn get_models(data: web::Data<SharedData>) -> impl Responder {
	match data.store.list_models() {
		Ok(names) => HttpResponse::Ok().json(names),
		Err(e) => error_response(&e),
	}
}

/// HTTP GET endpoint `/v1/ideas`
///
/// Generates `count` ideas (default 5) from the named model set and
/// returns them as a JSON array of strings.
#[get("/v1/ideas")]
async fn get_ideas(data: web::Data<SharedData>, query: web::Query<IdeasParams>) -> impl Responder {
	let count = query.count.unwrap_or(DEFAULT_COUNT);

	let models = match data.store.fetch_model(&query.model) {
		Ok(models) => models,
		Err(e) => return error_response(&e),
	};

	match generate_ideas(&models, count, &mut rand::rng()) {
		Ok(ideas) => HttpResponse::Ok().json(ideas),
		Err(e) => error_response(&e),
	}
}

/// HTTP GET endpoint `/v1/template`
///
/// Fills `$N` placeholders in the given template with generated phrases,
/// `count` times (default 5).
#[get("/v1/template")]
async fn get_template(
	data: web::Data<SharedData>,
	query: web::Query<TemplateParams>,
) -> impl Responder {
	let count = query.count.unwrap_or(DEFAULT_COUNT);

	let models = match data.store.fetch_model(&query.model) {
		Ok(models) => models,
		Err(e) => return error_response(&e),
	};

	match generate_with_template(&models, &query.template, count, &mut rand::rng()) {
		Ok(ideas) => HttpResponse::Ok().json(ideas),
		Err(e) => error_response(&e),
	}
}

/// Main entry point for the server.
///
/// Wires a filesystem model store (directory from `IDEAGEN_MODELS_DIR`,
/// default `./models`) behind a fetch cache and starts an Actix-web
/// HTTP server exposing the generation endpoints.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Models are fetched per request; the cache keeps repeat requests cheap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let models_dir = env::var("IDEAGEN_MODELS_DIR").unwrap_or_else(|_| "./models".to_owned());
	let store = FsModelStore::new(&models_dir).map_err(std::io::Error::other)?;
	let cache = FsCache::new(Path::new(&models_dir).join("cache")).map_err(std::io::Error::other)?;

	let shared_data = web::Data::new(SharedData { store: CachingStore::new(store, cache) });

	log::info!("serving models from {models_dir} on 127.0.0.1:5000");

	HttpServer::new(move || {
		App::new()
			.app_data(shared_data.clone())
			.wrap(middleware::Logger::default())
			.wrap(Cors::permissive())
			.service(get_models)
			.service(get_ideas)
			.service(get_template)
	})
	.bind(("127.0.0.1", 5000))?
	.run()
	.await
}
