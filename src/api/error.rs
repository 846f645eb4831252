// ==========================================
// Packing Station - API errors
// ==========================================
// Storage/import/label errors are folded into the kinds the
// request boundary reports to callers.
// ==========================================

use crate::engine::label::LabelError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Caller errors
    // ==========================================
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// PackUnitByCode on a detail that has reached its required quantity.
    #[error("detail {detail_id} already complete ({packed}/{required})")]
    AlreadyComplete {
        detail_id: i64,
        packed: i64,
        required: i64,
    },

    // ==========================================
    // Collaborator errors
    // ==========================================
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Never returned by packing operations; label failures are only logged.
    #[error("label generation failed: {0}")]
    LabelGenerationFailure(String),

    #[error("import failed: {0}")]
    ImportFailure(String),

    // ==========================================
    // Generic
    // ==========================================
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable machine-readable code for the request boundary.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ApiError::AlreadyComplete { .. } => "ALREADY_COMPLETE",
            ApiError::StorageFailure(_) => "STORAGE_FAILURE",
            ApiError::LabelGenerationFailure(_) => "LABEL_GENERATION_FAILURE",
            ApiError::ImportFailure(_) => "IMPORT_FAILURE",
            ApiError::Internal(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::InvalidArgument(format!("constraint violated: {}", msg))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::StorageFailure(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::from(RepositoryError::from(err))
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(repo_err) => ApiError::from(repo_err),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportFailure(other.to_string()),
        }
    }
}

impl From<LabelError> for ApiError {
    fn from(err: LabelError) -> Self {
        ApiError::LabelGenerationFailure(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
