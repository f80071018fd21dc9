//! Error types for the movie store.

use thiserror::Error;

use crate::schema::ValidationErrors;

#[derive(Debug, Error)]
pub enum Error {
    /// One or more fields of a candidate record failed their rule.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// No record carries the requested identifier.
    #[error("Movie not found")]
    NotFound,

    /// The seed data set could not be loaded into the store.
    #[error("invalid seed data: {0}")]
    Seed(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
