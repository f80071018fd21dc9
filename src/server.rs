use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use warp::http::header::{HeaderMap, HeaderValue, ORIGIN};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::cors::CorsPolicy;
use crate::error::Error;
use crate::MovieDb;

/// Largest request body accepted on write routes.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

const WELCOME: &str = "Welcome to the Movies API";

#[derive(Serialize)]
struct ErrorBody<T: Serialize> {
    error: T,
}

// --- Rejections ---

#[derive(Debug)]
struct InvalidJson(String);

impl warp::reject::Reject for InvalidJson {}

#[derive(Debug)]
struct BodyTooLarge;

impl warp::reject::Reject for BodyTooLarge {}

pub struct MovieServer {
    db: Arc<MovieDb>,
    cors: Arc<CorsPolicy>,
}

impl MovieServer {
    pub fn new(db: Arc<MovieDb>, cors: CorsPolicy) -> Self {
        Self { db, cors: Arc::new(cors) }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        routes(self.db.clone(), self.cors.clone())
    }

    /// Binds `addr` and returns the bound address plus the future that serves
    /// until `shutdown` resolves.
    pub fn bind(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(SocketAddr, impl Future<Output = ()>), warp::Error> {
        warp::serve(self.routes()).try_bind_with_graceful_shutdown(addr, shutdown)
    }

    pub async fn run(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), warp::Error> {
        let (bound, server) = self.bind(addr, shutdown)?;
        tracing::info!("Server listening on http://{}", bound);
        server.await;
        Ok(())
    }
}

/// The complete route tree.
///
/// Everything under `/movies` is recovered into a JSON response before the
/// CORS layer runs, so error responses carry the same headers as successes.
pub fn routes(
    db: Arc<MovieDb>,
    cors: Arc<CorsPolicy>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // GET /
    let welcome = warp::path::end()
    .and(warp::get())
    .map(|| json_response(&json!({ "message": WELCOME }), StatusCode::OK));

    let movies = warp::path("movies")
    .and(origin())
    .and(movie_routes(db, cors.clone()).recover(handle_rejection).unify())
    .and(with_cors(cors))
    .map(|origin: Option<HeaderValue>, response: Response, cors: Arc<CorsPolicy>| {
        cors.decorate(response, origin.as_ref())
    });

    welcome
    .or(movies)
    .unify()
    .recover(handle_rejection)
    .unify()
    .with(warp::trace::request())
}

/// Routes below the `/movies` prefix.
fn movie_routes(
    db: Arc<MovieDb>,
    cors: Arc<CorsPolicy>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    // GET /movies?genre=X
    let list = warp::path::end()
    .and(warp::get())
    .and(warp::query::<Vec<(String, String)>>())
    .and(with_db(db.clone()))
    .and_then(|params: Vec<(String, String)>, db: Arc<MovieDb>| async move {
        let result = db.list(first_param(&params, "genre"));
        Ok::<_, Rejection>(respond(result, StatusCode::OK))
    });

    // GET /movies/:id
    let get = warp::path::param::<String>()
    .and(warp::path::end())
    .and(warp::get())
    .and(with_db(db.clone()))
    .and_then(|id: String, db: Arc<MovieDb>| async move {
        Ok::<_, Rejection>(respond(db.get(&id), StatusCode::OK))
    });

    // POST /movies
    let create = warp::path::end()
    .and(warp::post())
    .and(json_body())
    .and(with_db(db.clone()))
    .and_then(|body: Value, db: Arc<MovieDb>| async move {
        let result = db.create(&body);
        if let Ok(movie) = &result {
            tracing::info!(id = %movie.id, "Created movie");
        }
        Ok::<_, Rejection>(respond(result, StatusCode::CREATED))
    });

    // PATCH /movies/:id
    let update = warp::path::param::<String>()
    .and(warp::path::end())
    .and(warp::patch())
    .and(json_body())
    .and(with_db(db.clone()))
    .and_then(|id: String, body: Value, db: Arc<MovieDb>| async move {
        Ok::<_, Rejection>(respond(db.update(&id, &body), StatusCode::OK))
    });

    // DELETE /movies/:id
    let delete = warp::path::param::<String>()
    .and(warp::path::end())
    .and(warp::delete())
    .and(with_db(db))
    .and_then(|id: String, db: Arc<MovieDb>| async move {
        let response = match db.delete(&id) {
            Ok(movie) => {
                tracing::info!(id = %movie.id, "Deleted movie");
                StatusCode::NO_CONTENT.into_response()
            }
            Err(e) => error_response(&e),
        };
        Ok::<_, Rejection>(response)
    });

    // OPTIONS /movies/:id
    let preflight = warp::path::param::<String>()
    .and(warp::path::end())
    .and(warp::options())
    .and(origin())
    .and(with_cors(cors))
    .map(|_id: String, origin: Option<HeaderValue>, cors: Arc<CorsPolicy>| {
        cors.preflight(StatusCode::NO_CONTENT.into_response(), origin.as_ref())
    });

    list
    .or(get)
    .unify()
    .or(create)
    .unify()
    .or(update)
    .unify()
    .or(delete)
    .unify()
    .or(preflight)
    .unify()
}

fn with_db(db: Arc<MovieDb>) -> impl Filter<Extract = (Arc<MovieDb>,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}

fn with_cors(cors: Arc<CorsPolicy>) -> impl Filter<Extract = (Arc<CorsPolicy>,), Error = Infallible> + Clone {
    warp::any().map(move || cors.clone())
}

/// Raw `Origin` header. Values that are not visible ASCII are kept as-is and
/// simply fail the allow-list check.
fn origin() -> impl Filter<Extract = (Option<HeaderValue>,), Error = Infallible> + Clone {
    warp::header::headers_cloned().map(|headers: HeaderMap| headers.get(ORIGIN).cloned())
}

fn first_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Untyped JSON body; the schema module decides what is acceptable.
///
/// Chunked bodies are accepted; a missing or blank body reads as `{}`.
fn json_body() -> impl Filter<Extract = (Value,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
    .and_then(|declared: Option<u64>| async move {
        match declared {
            Some(len) if len > MAX_BODY_BYTES => Err(warp::reject::custom(BodyTooLarge)),
            _ => Ok(()),
        }
    })
    .untuple_one()
    .and(warp::body::bytes())
    .and_then(|bytes: Bytes| async move { parse_json_body(&bytes) })
}

fn parse_json_body(bytes: &[u8]) -> Result<Value, Rejection> {
    if bytes.len() as u64 > MAX_BODY_BYTES {
        return Err(warp::reject::custom(BodyTooLarge));
    }
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| warp::reject::custom(InvalidJson(e.to_string())))
}

// --- Responses ---

fn json_response<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn respond<T: Serialize>(result: crate::error::Result<T>, status: StatusCode) -> Response {
    match result {
        Ok(value) => json_response(&value, status),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &Error) -> Response {
    match err {
        Error::Validation(errors) => json_response(&ErrorBody { error: errors }, StatusCode::BAD_REQUEST),
        Error::NotFound => json_response(&ErrorBody { error: "Movie not found" }, StatusCode::NOT_FOUND),
        Error::Seed(_) | Error::Poisoned => {
            tracing::error!(error = %err, "Internal error");
            json_response(&ErrorBody { error: "Internal Server Error" }, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(InvalidJson(e)) = err.find::<InvalidJson>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e))
    } else if err.find::<BodyTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::InvalidHeader>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid header".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::warn!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };

    Ok(json_response(&ErrorBody { error: message }, status))
}
