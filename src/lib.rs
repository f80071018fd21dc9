pub mod model;
pub mod schema;
pub mod error;
pub mod seed;
pub mod cors;
pub mod server;

use std::fmt;
use std::sync::RwLock;
use serde_json::Value;
use uuid::Uuid;
use crate::error::{Error, Result};
use crate::model::Movie;
use crate::schema::{validate_movie, validate_partial_movie, SchemaRules};

/// The in-memory movie store.
///
/// Records are kept in insertion order. Every mutation holds the write lock
/// for its whole lookup-validate-apply sequence, so each one is atomic.
pub struct MovieDb {
    movies: RwLock<Vec<Movie>>,
    rules: SchemaRules,
}

impl fmt::Debug for MovieDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieDb")
        .field("count", &self.len())
        .field("rules", &self.rules)
        .finish()
    }
}

impl MovieDb {
    /// Builds a store from already validated records.
    pub fn new(seed: Vec<Movie>, rules: SchemaRules) -> Self {
        Self {
            movies: RwLock::new(seed),
            rules,
        }
    }

    /// Builds a store from the data set bundled with the crate.
    pub fn with_bundled_seed(rules: SchemaRules) -> Result<Self> {
        let movies = seed::bundled(&rules)?;
        Ok(Self::new(movies, rules))
    }

    pub fn rules(&self) -> &SchemaRules {
        &self.rules
    }

    /// Number of stored records. Counting never mutates, so a poisoned lock
    /// is read through instead of reported.
    pub fn len(&self) -> usize {
        match self.movies.read() {
            Ok(movies) => movies.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Query ---

    /// All records in store order, optionally narrowed to one genre
    /// (case-insensitive). An empty token means no filter.
    pub fn list(&self, genre: Option<&str>) -> Result<Vec<Movie>> {
        let movies = self.movies.read().map_err(|_| Error::Poisoned)?;
        let result = match genre.filter(|g| !g.is_empty()) {
            Some(token) => movies
            .iter()
            .filter(|m| m.genre.iter().any(|g| g.matches(token)))
            .cloned()
            .collect(),
            None => movies.clone(),
        };
        Ok(result)
    }

    pub fn get(&self, id: &str) -> Result<Movie> {
        let movies = self.movies.read().map_err(|_| Error::Poisoned)?;
        movies.iter().find(|m| m.id == id).cloned().ok_or(Error::NotFound)
    }

    // --- Mutations ---

    /// Validates a full candidate, assigns a fresh id and appends it.
    pub fn create(&self, input: &Value) -> Result<Movie> {
        let candidate = validate_movie(input, &self.rules)?;

        let mut movies = self.movies.write().map_err(|_| Error::Poisoned)?;
        let mut id = Uuid::new_v4().to_string();
        while movies.iter().any(|m| m.id == id) {
            id = Uuid::new_v4().to_string();
        }

        let movie = candidate.with_id(id);
        movies.push(movie.clone());
        tracing::debug!(id = %movie.id, title = %movie.title, "movie created");
        Ok(movie)
    }

    /// Merges a partial candidate over the record with `id`, in place.
    pub fn update(&self, id: &str, input: &Value) -> Result<Movie> {
        let mut movies = self.movies.write().map_err(|_| Error::Poisoned)?;
        let index = movies.iter().position(|m| m.id == id).ok_or(Error::NotFound)?;

        let patch = validate_partial_movie(input, &self.rules)?;

        let mut updated = movies[index].clone();
        patch.apply_to(&mut updated);
        movies[index] = updated.clone();
        tracing::debug!(id = %id, "movie updated");
        Ok(updated)
    }

    /// Removes the record with `id`; later records shift down.
    pub fn delete(&self, id: &str) -> Result<Movie> {
        let mut movies = self.movies.write().map_err(|_| Error::Poisoned)?;
        let index = movies.iter().position(|m| m.id == id).ok_or(Error::NotFound)?;
        let removed = movies.remove(index);
        tracing::debug!(id = %id, "movie deleted");
        Ok(removed)
    }
}
