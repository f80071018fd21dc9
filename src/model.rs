use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of genres a movie can be tagged with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Action,
    Comedy,
    Drama,
    Horror,
    #[serde(rename = "sci-fi")]
    SciFi,
}

impl Genre {
    pub const ALL: [Genre; 5] = [Genre::Action, Genre::Comedy, Genre::Drama, Genre::Horror, Genre::SciFi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Action => "action",
            Genre::Comedy => "comedy",
            Genre::Drama => "drama",
            Genre::Horror => "horror",
            Genre::SciFi => "sci-fi",
        }
    }

    /// Case-insensitive comparison used by the list filter.
    pub fn matches(&self, token: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(token)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact (case-sensitive) parse, as required on write paths.
impl FromStr for Genre {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL.into_iter().find(|g| g.as_str() == s).ok_or(())
    }
}

/// A stored movie. Every instance in the store satisfies the full schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub director: String,
    pub duration: u32,
    pub rate: f64,
    pub poster: String,
    pub genre: Vec<Genre>,
}

/// A fully validated candidate, waiting for an identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub director: String,
    pub duration: u32,
    pub rate: f64,
    pub poster: String,
    pub genre: Vec<Genre>,
}

impl NewMovie {
    pub fn with_id(self, id: String) -> Movie {
        Movie {
            id,
            title: self.title,
            year: self.year,
            director: self.director,
            duration: self.duration,
            rate: self.rate,
            poster: self.poster,
            genre: self.genre,
        }
    }
}

/// Validated fields of a partial update. `None` means "leave untouched".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub duration: Option<u32>,
    pub rate: Option<f64>,
    pub poster: Option<String>,
    pub genre: Option<Vec<Genre>>,
}

impl MoviePatch {
    pub fn is_empty(&self) -> bool {
        *self == MoviePatch::default()
    }

    /// Overwrite the fields present in the patch. The id is never touched.
    pub fn apply_to(self, movie: &mut Movie) {
        if let Some(title) = self.title { movie.title = title; }
        if let Some(year) = self.year { movie.year = year; }
        if let Some(director) = self.director { movie.director = director; }
        if let Some(duration) = self.duration { movie.duration = duration; }
        if let Some(rate) = self.rate { movie.rate = rate; }
        if let Some(poster) = self.poster { movie.poster = poster; }
        if let Some(genre) = self.genre { movie.genre = genre; }
    }
}
