use rusqlite::ErrorCode;
use thiserror::Error;

use crate::guard::GuardError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("No filters provided for operation")]
    NoFilters,

    #[error("No update data provided")]
    NoUpdateData,

    #[error("No data provided for insert")]
    NoInsertData,

    #[error("Column '{column}' is missing or has an unexpected type")]
    Decode { column: String },

    #[error("DB lock poisoned: {0}")]
    LockPoisoned(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn decode(column: &str) -> Self {
        StoreError::Decode {
            column: column.to_string(),
        }
    }

    /// Caller misuse rather than a database fault.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Guard(_)
                | StoreError::NoFilters
                | StoreError::NoUpdateData
                | StoreError::NoInsertData
        )
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            }
            _ => false,
        }
    }
}
