use tracing::debug;

use gcj_core::{Entity, LookupCandidate};
use gcj_storage::{Filter, Storage};

use crate::error::EngineError;
use crate::unit_of_work::UnitOfWork;

/// Get-or-create for a lookup kind.
///
/// A non-zero id that exists wins and the candidate's other fields are
/// ignored. Otherwise the first row whose natural key matches
/// case-insensitively is reused. Failing both, the candidate is validated and
/// staged as a new row. Rows staged earlier in `uow` take part in the lookup,
/// so resolving one key twice yields one row.
pub fn resolve<S, C>(uow: &mut UnitOfWork<'_, S>, candidate: &C) -> Result<C::Row, EngineError>
where
    S: Storage,
    C: LookupCandidate,
{
    let kind = <C::Row as Entity>::KIND;
    let id = candidate.id();

    if !id.is_unsaved() {
        if let Some(row) = uow.find_by_id(kind, id)? {
            debug!(%kind, id = ?row.id(), "resolved by id");
            return Ok(<C::Row>::try_from(row)?);
        }
        debug!(%kind, id = ?id, "id not found, trying natural key");
    }

    let key = candidate.natural_key();
    if let Some(row) = uow.find_one(kind, &Filter::natural_key(key))? {
        debug!(%kind, id = ?row.id(), key = key.trim(), "resolved by natural key");
        return Ok(<C::Row>::try_from(row)?);
    }

    candidate.validate()?;
    let row = uow.stage_insert(candidate.to_row().into());
    debug!(%kind, id = ?row.id(), key = key.trim(), "staged new row");
    Ok(<C::Row>::try_from(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcj_core::{EntityKind, FilamentColourCandidate, ManufacturerCandidate, RowId};
    use gcj_storage::SqliteStorage;

    fn seeded() -> SqliteStorage {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store.seed_reference_data().unwrap();
        store
    }

    #[test]
    fn id_wins_over_other_fields() {
        let mut store = seeded();
        let mut uow = UnitOfWork::begin(&mut store);
        let colour =
            resolve(&mut uow, &FilamentColourCandidate::with_id(RowId::new(3), "Blue")).unwrap();
        assert_eq!(colour.description, "Red");
        assert!(uow.is_empty());
    }

    #[test]
    fn missing_id_falls_back_to_natural_key() {
        let mut store = seeded();
        let mut uow = UnitOfWork::begin(&mut store);
        let maker =
            resolve(&mut uow, &ManufacturerCandidate::with_id(RowId::new(99), "sunlu")).unwrap();
        assert_eq!(maker.id, RowId::new(3));
        assert_eq!(maker.name, "SUNLU");
    }

    #[test]
    fn same_key_twice_stages_once() {
        let mut store = seeded();
        let mut uow = UnitOfWork::begin(&mut store);
        let first = resolve(&mut uow, &FilamentColourCandidate::new("Teal")).unwrap();
        let second = resolve(&mut uow, &FilamentColourCandidate::new("  TEAL")).unwrap();
        assert_eq!(first, second);
        assert_eq!(uow.changes().len(), 1);
        assert_eq!(uow.find_all(EntityKind::FilamentColour).unwrap().len(), 18);
    }

    #[test]
    fn invalid_candidate_is_not_staged() {
        let mut store = seeded();
        let mut uow = UnitOfWork::begin(&mut store);
        let err = resolve(&mut uow, &FilamentColourCandidate::new("   ")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref f) if f.has_problem("description")));
        assert!(uow.is_empty());
    }
}
