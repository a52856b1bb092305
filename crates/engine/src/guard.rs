use tracing::warn;

use gcj_core::{EntityKind, RowId};
use gcj_storage::{Filter, Storage};

use crate::error::EngineError;
use crate::unit_of_work::UnitOfWork;

/// The lowest-id row still referencing `kind` row `id`, if any.
pub fn first_dependent<S: Storage>(
    uow: &UnitOfWork<'_, S>,
    kind: EntityKind,
    id: RowId,
) -> Result<Option<(EntityKind, RowId)>, EngineError> {
    for &dependent in kind.dependents() {
        if let Some(row) = uow.find_one(dependent, &Filter::references(kind, id))? {
            return Ok(Some((dependent, row.id())));
        }
    }
    Ok(None)
}

pub fn can_delete<S: Storage>(
    uow: &UnitOfWork<'_, S>,
    kind: EntityKind,
    id: RowId,
) -> Result<bool, EngineError> {
    Ok(first_dependent(uow, kind, id)?.is_none())
}

/// Refuses with [`EngineError::InUse`] while anything references the row.
pub fn ensure_unreferenced<S: Storage>(
    uow: &UnitOfWork<'_, S>,
    kind: EntityKind,
    id: RowId,
) -> Result<(), EngineError> {
    match first_dependent(uow, kind, id)? {
        None => Ok(()),
        Some((dependent, dependent_id)) => {
            warn!(%kind, id = ?id, %dependent, dependent_id = ?dependent_id, "delete refused, row in use");
            Err(EngineError::InUse { kind, id, dependent, dependent_id })
        }
    }
}
