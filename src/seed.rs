use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::Movie;
use crate::schema::{validate_movie, SchemaRules};

/// Data set bundled with the binary, used when no seed file is given.
pub const BUNDLED_SEED: &str = include_str!("../data/movies.json");

pub fn load_file(path: &Path, rules: &SchemaRules) -> Result<Vec<Movie>> {
    let raw = fs::read_to_string(path)
    .map_err(|e| Error::Seed(format!("{}: {}", path.display(), e)))?;
    parse(&raw, rules)
}

pub fn bundled(rules: &SchemaRules) -> Result<Vec<Movie>> {
    parse(BUNDLED_SEED, rules)
}

/// Parses a JSON array of records. Every record must carry a unique `id` and
/// pass full validation; the first offending record aborts the load.
pub fn parse(raw: &str, rules: &SchemaRules) -> Result<Vec<Movie>> {
    let value: Value = serde_json::from_str(raw).map_err(|e| Error::Seed(e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(Error::Seed("expected a JSON array of movies".to_string()));
    };

    let mut seen = HashSet::with_capacity(entries.len());
    let mut movies = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let id = match entry.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => return Err(Error::Seed(format!("record {} has no string id", i))),
        };
        if !seen.insert(id.clone()) {
            return Err(Error::Seed(format!("record {} duplicates id {}", i, id)));
        }

        let movie = validate_movie(entry, rules)
        .map_err(|e| Error::Seed(format!("record {} ({}): {}", i, id, e)))?;
        movies.push(movie.with_id(id));
    }

    Ok(movies)
}
