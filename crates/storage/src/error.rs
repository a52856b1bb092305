use gcj_core::{CoreError, EntityKind, RowId, UnitOfWorkId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: RowId },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("commit log checksum mismatch for unit of work {0}")]
    ChecksumMismatch(UnitOfWorkId),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
