//! Domain error type shared by the sizing engines, stores and services.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a single configuration operation.
///
/// An infeasible controller layout is deliberately not represented here:
/// it is a computed outcome carried on the selection record.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Concurrent update on project {project_id}: expected version {expected}, found {found}")]
    Conflict {
        project_id: Uuid,
        expected: u64,
        found: u64,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EngineError::InvalidInput(errors.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
