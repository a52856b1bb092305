use thiserror::Error;

use crate::kind::EntityKind;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("expected a {expected} row, found a {found} row")]
    KindMismatch {
        expected: EntityKind,
        found: EntityKind,
    },

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
