use warp::http::header::{HeaderValue, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN};
use warp::reply::Response;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://127.0.0.1:5500",
    "http://localhost:5500",
    "https://genuine-rabanadas-638b0f.netlify.app",
];

pub const ALLOWED_METHODS: &str = "GET, POST, PATCH, DELETE, OPTIONS";

/// Origin allow-list. Requests without an `Origin` header are always allowed.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()))
    }
}

impl CorsPolicy {
    pub fn new(origins: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: origins.into_iter().map(|o| o.trim_end_matches('/').to_string()).collect(),
        }
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed
    }

    /// Value for `Access-Control-Allow-Origin`, or `None` when the origin is
    /// refused. An origin that is not valid text is never on the list.
    pub fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        match origin {
            None => Some(HeaderValue::from_static("*")),
            Some(value) => {
                let origin = value.to_str().ok()?;
                self.allowed.iter().any(|a| a == origin).then(|| value.clone())
            }
        }
    }

    /// Adds the allow-origin header to `response` when the origin passes.
    pub fn decorate(&self, mut response: Response, origin: Option<&HeaderValue>) -> Response {
        if let Some(value) = self.allow_origin(origin) {
            response.headers_mut().insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        response
    }

    /// Same as [`decorate`](Self::decorate), plus the allowed methods for a preflight.
    pub fn preflight(&self, mut response: Response, origin: Option<&HeaderValue>) -> Response {
        if self.allow_origin(origin).is_some() {
            response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        }
        self.decorate(response, origin)
    }
}
