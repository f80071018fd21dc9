//! Field contract for movie records.
//!
//! Request bodies arrive as untyped JSON. [`validate_movie`] turns a body into a
//! [`NewMovie`] (every field required except `rate`), [`validate_partial_movie`]
//! turns it into a [`MoviePatch`] (every field optional). Both report all
//! offending fields at once as [`ValidationErrors`]; unknown keys are ignored.

use std::fmt;
use std::sync::Arc;

use chrono::Datelike;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::model::{Genre, MoviePatch, NewMovie};

pub const MIN_YEAR: i32 = 1900;
pub const DEFAULT_RATE: f64 = 5.0;
pub const MAX_RATE: f64 = 10.0;

/// Source of the current calendar year, read on every validation.
pub trait Clock: Send + Sync {
    fn current_year(&self) -> i32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

/// A clock pinned to one year. Useful for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i32);

impl Clock for FixedClock {
    fn current_year(&self) -> i32 {
        self.0
    }
}

/// Tunable parts of the contract: the `rate` default and the `year` window.
#[derive(Clone)]
pub struct SchemaRules {
    pub min_year: i32,
    pub default_rate: f64,
    clock: Arc<dyn Clock>,
}

impl Default for SchemaRules {
    fn default() -> Self {
        Self {
            min_year: MIN_YEAR,
            default_rate: DEFAULT_RATE,
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for SchemaRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRules")
        .field("min_year", &self.min_year)
        .field("max_year", &self.max_year())
        .field("default_rate", &self.default_rate)
        .finish()
    }
}

impl SchemaRules {
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_default_rate(mut self, rate: f64) -> Self {
        self.default_rate = rate;
        self
    }

    pub fn max_year(&self) -> i32 {
        self.clock.current_year()
    }
}

// --- Error reporting ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// One failed rule, addressed by its path inside the body.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl Issue {
    /// Top-level field the issue belongs to, if any.
    pub fn field(&self) -> Option<&str> {
        match self.path.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }
}

/// Every issue found in one candidate. Serializes as a bare JSON array.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<Issue>);

impl ValidationErrors {
    pub fn issues(&self) -> &[Issue] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message reported for `field`.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0.iter().find(|i| i.field() == Some(field)).map(|i| i.message.as_str())
    }

    fn push(&mut self, path: Vec<PathSegment>, message: impl Into<String>) {
        self.0.push(Issue { path, message: message.into() });
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, issue) in self.0.iter().enumerate() {
            if n > 0 {
                f.write_str("; ")?;
            }
            let path: Vec<String> = issue.path.iter().map(|p| p.to_string()).collect();
            if path.is_empty() {
                f.write_str(&issue.message)?;
            } else {
                write!(f, "{}: {}", path.join("."), issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// --- Entry points ---

/// Full validation, used on create.
pub fn validate_movie(input: &Value, rules: &SchemaRules) -> Result<NewMovie, ValidationErrors> {
    let mut fields = Fields::new(input, rules, true)?;

    let title = fields.text("title", "Title");
    let year = fields.year();
    let director = fields.text("director", "Director");
    let duration = fields.duration();
    let rate = fields.rate().unwrap_or(rules.default_rate);
    let poster = fields.poster();
    let genre = fields.genre();

    match (title, year, director, duration, poster, genre) {
        (Some(title), Some(year), Some(director), Some(duration), Some(poster), Some(genre)) if fields.is_clean() => {
            Ok(NewMovie { title, year, director, duration, rate, poster, genre })
        }
        _ => Err(fields.into_errors()),
    }
}

/// Partial validation, used on update. Absent fields stay `None`.
pub fn validate_partial_movie(input: &Value, rules: &SchemaRules) -> Result<MoviePatch, ValidationErrors> {
    let mut fields = Fields::new(input, rules, false)?;

    let patch = MoviePatch {
        title: fields.text("title", "Title"),
        year: fields.year(),
        director: fields.text("director", "Director"),
        duration: fields.duration(),
        rate: fields.rate(),
        poster: fields.poster(),
        genre: fields.genre(),
    };

    fields.finish()?;
    Ok(patch)
}

// --- Per-field rules ---

struct Fields<'a> {
    object: &'a Map<String, Value>,
    rules: &'a SchemaRules,
    required: bool,
    errors: ValidationErrors,
}

impl<'a> Fields<'a> {
    fn new(input: &'a Value, rules: &'a SchemaRules, required: bool) -> Result<Self, ValidationErrors> {
        match input {
            Value::Object(object) => Ok(Self { object, rules, required, errors: ValidationErrors::default() }),
            _ => {
                let mut errors = ValidationErrors::default();
                errors.push(Vec::new(), "Expected an object");
                Err(errors)
            }
        }
    }

    fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.is_clean() { Ok(()) } else { Err(self.into_errors()) }
    }

    /// Never empty: a rejected candidate always carries at least one issue.
    fn into_errors(mut self) -> ValidationErrors {
        if self.errors.is_empty() {
            self.errors.push(Vec::new(), "Invalid movie");
        }
        self.errors
    }

    fn fail(&mut self, key: &str, message: impl Into<String>) {
        self.errors.push(vec![PathSegment::Field(key.to_string())], message);
    }

    fn lookup(&mut self, key: &str, label: &str, required: bool) -> Option<&'a Value> {
        let value = self.object.get(key);
        if value.is_none() && required {
            self.fail(key, format!("{} is required", label));
        }
        value
    }

    fn text(&mut self, key: &str, label: &str) -> Option<String> {
        let value = self.lookup(key, label, self.required)?;
        match value.as_str() {
            Some("") => {
                self.fail(key, format!("{} must not be empty", label));
                None
            }
            Some(s) => Some(s.to_string()),
            None => {
                self.fail(key, format!("{} must be a string", label));
                None
            }
        }
    }

    fn integer(&mut self, key: &str, label: &str) -> Option<i64> {
        let value = self.lookup(key, label, self.required)?;
        if let Some(n) = value.as_i64() {
            return Some(n);
        }
        match value.as_f64() {
            // `2000.0` is an integer; anything past i64 is out of every range we check.
            Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(n as i64),
            Some(_) if value.is_u64() => Some(i64::MAX),
            Some(_) => {
                self.fail(key, format!("{} must be an integer", label));
                None
            }
            None => {
                self.fail(key, format!("{} must be a number", label));
                None
            }
        }
    }

    fn year(&mut self) -> Option<i32> {
        let year = self.integer("year", "Year")?;
        let (min, max) = (self.rules.min_year, self.rules.max_year());
        if year < min as i64 {
            self.fail("year", format!("Year must be greater than or equal to {}", min));
            None
        } else if year > max as i64 {
            self.fail("year", format!("Year must be less than or equal to {}", max));
            None
        } else {
            i32::try_from(year).ok()
        }
    }

    fn duration(&mut self) -> Option<u32> {
        let duration = self.integer("duration", "Duration")?;
        if duration <= 0 {
            self.fail("duration", "Duration must be a positive number");
            return None;
        }
        match u32::try_from(duration) {
            Ok(d) => Some(d),
            Err(_) => {
                self.fail("duration", "Duration is too large");
                None
            }
        }
    }

    fn rate(&mut self) -> Option<f64> {
        let value = self.lookup("rate", "Rate", false)?;
        match value.as_f64() {
            Some(rate) if (0.0..=MAX_RATE).contains(&rate) => Some(rate),
            Some(_) => {
                self.fail("rate", format!("Rate must be between 0 and {}", MAX_RATE));
                None
            }
            None => {
                self.fail("rate", "Rate must be a number");
                None
            }
        }
    }

    fn poster(&mut self) -> Option<String> {
        let value = self.lookup("poster", "Poster", self.required)?;
        match value.as_str() {
            Some(s) if Url::parse(s).is_ok() => Some(s.to_string()),
            Some(_) => {
                self.fail("poster", "Poster must be a valid URL");
                None
            }
            None => {
                self.fail("poster", "Poster must be a string");
                None
            }
        }
    }

    fn genre(&mut self) -> Option<Vec<Genre>> {
        let value = self.lookup("genre", "Genre", self.required)?;
        let Some(items) = value.as_array() else {
            self.fail("genre", "Genre must be an array of valid genres");
            return None;
        };
        if items.is_empty() {
            self.fail("genre", "Genre must contain at least one genre");
            return None;
        }

        let mut genres = Vec::with_capacity(items.len());
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            match item.as_str().and_then(|s| s.parse::<Genre>().ok()) {
                Some(genre) => genres.push(genre),
                None => {
                    valid = false;
                    self.errors.push(
                        vec![PathSegment::Field("genre".to_string()), PathSegment::Index(i)],
                        format!("Genre must be one of: {}", genre_list()),
                    );
                }
            }
        }
        if valid { Some(genres) } else { None }
    }
}

fn genre_list() -> String {
    Genre::ALL.iter().map(|g| g.as_str()).collect::<Vec<_>>().join(", ")
}
