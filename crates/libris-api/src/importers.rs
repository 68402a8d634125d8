//! Bulk book import from uploaded files.
//!
//! The importer is picked by file extension. Every item must pass the same
//! rules as a single book creation before anything is written.

use serde::Deserialize;
use serde_json::Value as Json;
use thiserror::Error;

use libris_types::api::CreateBookRequest;
use libris_types::{BookGenre, BookLanguage};

use crate::validation::validate_new_book;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File must have a filename")]
    MissingFilename,

    #[error("Unsupported file format. Use .json or .csv")]
    UnsupportedFormat,

    #[error("JSON must contain an array of books")]
    InvalidJsonStructure,

    #[error("Invalid CSV format")]
    InvalidCsvStructure,

    #[error("Invalid book data in imported file (item {item}): {reason}")]
    InvalidItem { item: usize, reason: String },
}

impl ImportError {
    fn item(index: usize, reason: impl ToString) -> Self {
        ImportError::InvalidItem {
            item: index + 1,
            reason: reason.to_string(),
        }
    }
}

/// One imported item. Keys beyond the book fields are ignored.
#[derive(Deserialize)]
struct ImportedBook {
    title: String,
    genre: BookGenre,
    language: BookLanguage,
    published_year: i32,
}

impl From<ImportedBook> for CreateBookRequest {
    fn from(book: ImportedBook) -> Self {
        CreateBookRequest {
            title: book.title,
            genre: book.genre,
            language: book.language,
            published_year: book.published_year,
        }
    }
}

pub trait BookImporter: Send + Sync {
    fn parse(&self, content: &[u8]) -> Result<Vec<CreateBookRequest>, ImportError>;
}

/// Top-level JSON array of book objects.
pub struct JsonBookImporter;

impl BookImporter for JsonBookImporter {
    fn parse(&self, content: &[u8]) -> Result<Vec<CreateBookRequest>, ImportError> {
        let Ok(Json::Array(items)) = serde_json::from_slice::<Json>(content) else {
            return Err(ImportError::InvalidJsonStructure);
        };

        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                serde_json::from_value::<ImportedBook>(item)
                    .map(CreateBookRequest::from)
                    .map_err(|e| ImportError::item(idx, e))
            })
            .collect()
    }
}

/// CSV with a `title,genre,language,published_year` header row.
pub struct CsvBookImporter;

impl BookImporter for CsvBookImporter {
    fn parse(&self, content: &[u8]) -> Result<Vec<CreateBookRequest>, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content);

        reader
            .headers()
            .map_err(|_| ImportError::InvalidCsvStructure)?;

        let mut books = Vec::new();
        for (idx, row) in reader.deserialize::<ImportedBook>().enumerate() {
            match row {
                Ok(book) => books.push(book.into()),
                Err(e) if matches!(e.kind(), csv::ErrorKind::Deserialize { .. }) => {
                    return Err(ImportError::item(idx, e));
                }
                Err(_) => return Err(ImportError::InvalidCsvStructure),
            }
        }
        Ok(books)
    }
}

pub fn importer_for(filename: Option<&str>) -> Result<Box<dyn BookImporter>, ImportError> {
    let filename = filename
        .filter(|name| !name.is_empty())
        .ok_or(ImportError::MissingFilename)?;

    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".json") {
        Ok(Box::new(JsonBookImporter))
    } else if lower.ends_with(".csv") {
        Ok(Box::new(CsvBookImporter))
    } else {
        Err(ImportError::UnsupportedFormat)
    }
}

/// Parses an upload and validates each book.
pub fn parse_upload(
    filename: Option<&str>,
    content: &[u8],
) -> Result<Vec<CreateBookRequest>, ImportError> {
    let books = importer_for(filename)?.parse(content)?;
    for (idx, book) in books.iter().enumerate() {
        validate_new_book(book).map_err(|e| ImportError::item(idx, e))?;
    }
    Ok(books)
}
