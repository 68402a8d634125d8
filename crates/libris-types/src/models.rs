use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Genres a book can be catalogued under.
/// Stored in the database as the upper-case variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookGenre {
    Fiction,
    NonFiction,
    Science,
    History,
    Fantasy,
    Comedy,
    Drama,
}

impl BookGenre {
    pub const ALL: [BookGenre; 7] = [
        BookGenre::Fiction,
        BookGenre::NonFiction,
        BookGenre::Science,
        BookGenre::History,
        BookGenre::Fantasy,
        BookGenre::Comedy,
        BookGenre::Drama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookGenre::Fiction => "FICTION",
            BookGenre::NonFiction => "NON_FICTION",
            BookGenre::Science => "SCIENCE",
            BookGenre::History => "HISTORY",
            BookGenre::Fantasy => "FANTASY",
            BookGenre::Comedy => "COMEDY",
            BookGenre::Drama => "DRAMA",
        }
    }
}

impl fmt::Display for BookGenre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookGenre {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "genre",
                value: s.to_string(),
            })
    }
}

/// Languages a book can be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookLanguage {
    English,
    Ukrainian,
}

impl BookLanguage {
    pub const ALL: [BookLanguage; 2] = [BookLanguage::English, BookLanguage::Ukrainian];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookLanguage::English => "ENGLISH",
            BookLanguage::Ukrainian => "UKRAINIAN",
        }
    }
}

impl fmt::Display for BookLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookLanguage {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "language",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}
