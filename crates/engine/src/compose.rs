//! Aggregate composition: leaves are resolved before the row that references
//! them is built, so a composed row never carries an unsaved reference.

use chrono::Local;
use tracing::debug;

use gcj_core::{
    CoreError, Entity, Filament, FilamentCandidate, PrintingProject, PrintingProjectCandidate,
    RowId, trimmed, validation,
};
use gcj_storage::Storage;

use crate::error::EngineError;
use crate::resolve::resolve;
use crate::unit_of_work::UnitOfWork;

fn required<'a, T>(value: &'a Option<T>, field: &str) -> Result<&'a T, CoreError> {
    value
        .as_ref()
        .ok_or_else(|| CoreError::InvalidData(format!("{field} missing after validation")))
}

/// Overwrites `filament`'s scalars from `candidate` and re-resolves its
/// manufacturer, colour and type.
fn fill_filament<S: Storage>(
    uow: &mut UnitOfWork<'_, S>,
    filament: &mut Filament,
    candidate: &FilamentCandidate,
) -> Result<(), EngineError> {
    let manufacturer = resolve(uow, required(&candidate.manufacturer, "manufacturer")?)?;
    let colour = resolve(uow, required(&candidate.colour, "colour")?)?;
    let filament_type = resolve(uow, required(&candidate.filament_type, "filament_type")?)?;

    filament.cost_per_weight = candidate.cost_per_weight;
    filament.product_id = trimmed(candidate.product_id.as_deref());
    filament.reorder_link = trimmed(candidate.reorder_link.as_deref());
    filament.manufacturer_id = manufacturer.id;
    filament.filament_colour_id = colour.id;
    filament.filament_type_id = filament_type.id;
    Ok(())
}

/// Stages a new filament built from `candidate`. The caller validates first.
pub fn stage_new_filament<S: Storage>(
    uow: &mut UnitOfWork<'_, S>,
    candidate: &FilamentCandidate,
) -> Result<Filament, EngineError> {
    let mut filament = Filament {
        id: RowId::UNSAVED,
        cost_per_weight: candidate.cost_per_weight,
        product_id: None,
        reorder_link: None,
        manufacturer_id: RowId::UNSAVED,
        filament_colour_id: RowId::UNSAVED,
        filament_type_id: RowId::UNSAVED,
    };
    fill_filament(uow, &mut filament, candidate)?;
    Ok(Filament::try_from(uow.stage_insert(filament.into()))?)
}

/// Reuses the filament `candidate` names by id, or composes a new one.
///
/// Filaments have no natural key: an id of zero always means a new filament.
pub fn resolve_filament<S: Storage>(
    uow: &mut UnitOfWork<'_, S>,
    candidate: &FilamentCandidate,
) -> Result<Filament, EngineError> {
    if !candidate.id.is_unsaved() {
        if let Some(row) = uow.find_by_id(Filament::KIND, candidate.id)? {
            debug!(id = ?candidate.id, "reusing filament");
            return Ok(Filament::try_from(row)?);
        }
        debug!(id = ?candidate.id, "filament id not found, composing a new one");
    }
    validation::validate_filament(candidate)?;
    stage_new_filament(uow, candidate)
}

/// Stages an update of the stored filament `candidate.id`.
pub fn stage_filament_edit<S: Storage>(
    uow: &mut UnitOfWork<'_, S>,
    candidate: &FilamentCandidate,
) -> Result<Filament, EngineError> {
    let mut filament = load::<S, Filament>(uow, candidate.id)?;
    fill_filament(uow, &mut filament, candidate)?;
    uow.stage_update(filament.clone().into())?;
    Ok(filament)
}

fn fill_project<S: Storage>(
    uow: &mut UnitOfWork<'_, S>,
    project: &mut PrintingProject,
    candidate: &PrintingProjectCandidate,
) -> Result<(), EngineError> {
    let submitted = candidate.submitted.unwrap_or(project.submitted);
    validation::validate_project_dates(submitted, candidate.completed)?;

    let customer = resolve(uow, required(&candidate.customer, "customer")?)?;
    let model_design = resolve(uow, required(&candidate.model_design, "model_design")?)?;

    let mut filament_ids = Vec::with_capacity(candidate.filaments.len());
    for filament in &candidate.filaments {
        let id = resolve_filament(uow, filament)?.id;
        if !filament_ids.contains(&id) {
            filament_ids.push(id);
        }
    }

    project.cost = candidate.cost;
    project.submitted = submitted;
    project.completed = candidate.completed;
    project.customer_id = customer.id;
    project.model_design_id = model_design.id;
    project.filament_ids = filament_ids;
    Ok(())
}

/// Stages a new project with its customer, design and filaments resolved
/// in that order. An unset submission date means now.
pub fn stage_new_project<S: Storage>(
    uow: &mut UnitOfWork<'_, S>,
    candidate: &PrintingProjectCandidate,
) -> Result<PrintingProject, EngineError> {
    let mut project = PrintingProject {
        id: RowId::UNSAVED,
        cost: candidate.cost,
        submitted: Local::now().naive_local(),
        completed: None,
        customer_id: RowId::UNSAVED,
        model_design_id: RowId::UNSAVED,
        filament_ids: Vec::new(),
    };
    fill_project(uow, &mut project, candidate)?;
    Ok(PrintingProject::try_from(uow.stage_insert(project.into()))?)
}

/// Stages an update of the stored project `candidate.id`. An unset
/// submission date keeps the stored one.
pub fn stage_project_edit<S: Storage>(
    uow: &mut UnitOfWork<'_, S>,
    candidate: &PrintingProjectCandidate,
) -> Result<PrintingProject, EngineError> {
    let mut project = load::<S, PrintingProject>(uow, candidate.id)?;
    fill_project(uow, &mut project, candidate)?;
    uow.stage_update(project.clone().into())?;
    Ok(project)
}

/// Loads a stored row of `E`'s kind, mapping absence to `NotFound`.
pub(crate) fn load<S: Storage, E: Entity>(
    uow: &UnitOfWork<'_, S>,
    id: RowId,
) -> Result<E, EngineError> {
    let row = if id.is_persisted() { uow.find_by_id(E::KIND, id)? } else { None };
    let row = row.ok_or_else(|| EngineError::not_found(E::KIND, id))?;
    Ok(E::try_from(row)?)
}
