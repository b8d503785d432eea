use thiserror::Error;

use crate::db::DatabaseError;

/// Errors surfaced by the record managers.
///
/// `Validation` is caller-input failure: correct the input and resubmit.
/// Every variant aborts the whole operation; nothing is partially applied.
#[derive(Error, Debug)]
pub enum HospitalError {
    #[error("Validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl HospitalError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(field, %message, "Validation rejected");
        Self::Validation { field, message }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<rusqlite::Error> for HospitalError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}
