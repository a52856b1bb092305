use gcj_core::{CoreError, EntityKind, RowId, ValidationFailure};
use gcj_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: RowId },

    #[error("{kind} {id} is in use by {dependent} {dependent_id}")]
    InUse {
        kind: EntityKind,
        id: RowId,
        dependent: EntityKind,
        dependent_id: RowId,
    },

    #[error("{kind} \"{key}\" already exists")]
    DuplicateKey { kind: EntityKind, key: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: RowId) -> Self {
        Self::NotFound { kind, id }
    }
}
