pub mod compose;
pub mod error;
pub mod guard;
pub mod resolve;
pub mod unit_of_work;

pub use error::EngineError;
pub use resolve::resolve;
pub use unit_of_work::UnitOfWork;

use std::collections::BTreeMap;

use tracing::info;

use gcj_core::{
    Customer, CustomerCandidate, Entity, EntityKind, Filament, FilamentCandidate, FilamentColour,
    FilamentColourCandidate, FilamentType, FilamentTypeCandidate, FilamentView, Lookup,
    LookupCandidate, Manufacturer, ManufacturerCandidate, ModelDesign, ModelDesignCandidate,
    PrintingProject, PrintingProjectCandidate, ProjectView, RowId, fold_key, validation,
};
use gcj_storage::{Filter, Storage};

/// The journal's public surface: add, edit, delete and list for every kind.
///
/// Each call runs in its own [`UnitOfWork`] that is committed on success and
/// dropped on any error, so a failed call never leaves partial changes.
pub struct Journal<S: Storage> {
    store: S,
}

macro_rules! lookup_operations {
    ($row:ident, $candidate:ident, $add:ident, $edit:ident, $delete:ident, $get_all:ident) => {
        pub fn $add(&mut self, candidate: &$candidate) -> Result<$row, EngineError> {
            self.add_lookup::<$row>(candidate)
        }

        pub fn $edit(&mut self, candidate: &$candidate) -> Result<$row, EngineError> {
            self.edit_lookup::<$row>(candidate)
        }

        pub fn $delete(&mut self, candidate: &$candidate) -> Result<(), EngineError> {
            self.delete_lookup::<$row>(candidate)
        }

        pub fn $get_all(&self) -> Result<Vec<$row>, EngineError> {
            self.get_all_lookup::<$row>()
        }
    };
}

impl<S: Storage> Journal<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Opens a staging context over the store. Dropping it abandons it.
    pub fn begin(&mut self) -> UnitOfWork<'_, S> {
        UnitOfWork::begin(&mut self.store)
    }

    fn fetch<E: Entity>(&self, id: RowId) -> Result<E, EngineError> {
        let row = self
            .store
            .find_by_id(E::KIND, id)?
            .ok_or_else(|| EngineError::not_found(E::KIND, id))?;
        Ok(E::try_from(row)?)
    }

    fn all<E: Entity>(&self) -> Result<Vec<E>, EngineError> {
        self.store
            .find_all(E::KIND)?
            .into_iter()
            .map(|row| E::try_from(row).map_err(EngineError::from))
            .collect()
    }

    fn all_by_id<E: Entity>(&self) -> Result<BTreeMap<RowId, E>, EngineError> {
        Ok(self.all::<E>()?.into_iter().map(|row| (row.id(), row)).collect())
    }

    // ========================================================================
    // Lookup kinds
    // ========================================================================

    /// Adds a lookup row, or returns the existing row with the same id or
    /// natural key.
    pub fn add_lookup<L: Lookup>(&mut self, candidate: &L::Candidate) -> Result<L, EngineError> {
        candidate.validate()?;
        let mut uow = self.begin();
        let row = resolve(&mut uow, candidate)?;
        let receipt = uow.commit()?;
        let id = receipt.resolve(row.id());
        info!(kind = %L::KIND, id = ?id, created = !receipt.assigned.is_empty(), "added");
        self.fetch(id)
    }

    /// Overwrites the stored row `candidate.id` in place.
    ///
    /// Renaming onto the natural key of a different row is refused.
    pub fn edit_lookup<L: Lookup>(&mut self, candidate: &L::Candidate) -> Result<L, EngineError> {
        candidate.validate()?;
        let id = candidate.id();
        let mut uow = self.begin();
        let mut row = compose::load::<S, L>(&uow, id)?;

        let key = candidate.natural_key();
        let filter = Filter::natural_key(key);
        if uow
            .find_all(L::KIND)?
            .iter()
            .any(|other| other.id() != id && filter.matches(other))
        {
            return Err(EngineError::DuplicateKey { kind: L::KIND, key: key.trim().to_string() });
        }

        row.apply(candidate);
        uow.stage_update(row.into())?;
        uow.commit()?;
        info!(kind = %L::KIND, id = ?id, "edited");
        self.fetch(id)
    }

    /// Deletes the row named by a non-zero id, or by natural key when the id
    /// is zero. A non-zero id that is not stored is `NotFound`.
    pub fn delete_lookup<L: Lookup>(&mut self, candidate: &L::Candidate) -> Result<(), EngineError> {
        let id = candidate.id();
        if !id.is_unsaved() {
            return self.delete(L::KIND, id);
        }
        let key = candidate.natural_key();
        let target = if key.trim().is_empty() {
            None
        } else {
            self.store.find_one(L::KIND, &Filter::natural_key(key))?.map(|row| row.id())
        };
        let target = target.ok_or_else(|| EngineError::not_found(L::KIND, id))?;
        self.delete(L::KIND, target)
    }

    /// Every row of `L`, by natural key ignoring case and then by id.
    pub fn get_all_lookup<L: Lookup>(&self) -> Result<Vec<L>, EngineError> {
        let mut rows = self.all::<L>()?;
        rows.sort_by_cached_key(|row| (fold_key(row.natural_key()), row.id()));
        Ok(rows)
    }

    lookup_operations!(
        Customer,
        CustomerCandidate,
        add_customer,
        edit_customer,
        delete_customer,
        get_all_customers
    );
    lookup_operations!(
        Manufacturer,
        ManufacturerCandidate,
        add_manufacturer,
        edit_manufacturer,
        delete_manufacturer,
        get_all_manufacturers
    );
    lookup_operations!(
        FilamentColour,
        FilamentColourCandidate,
        add_filament_colour,
        edit_filament_colour,
        delete_filament_colour,
        get_all_filament_colours
    );
    lookup_operations!(
        FilamentType,
        FilamentTypeCandidate,
        add_filament_type,
        edit_filament_type,
        delete_filament_type,
        get_all_filament_types
    );
    lookup_operations!(
        ModelDesign,
        ModelDesignCandidate,
        add_model_design,
        edit_model_design,
        delete_model_design,
        get_all_model_designs
    );

    // ========================================================================
    // Filaments
    // ========================================================================

    /// Composes a filament, creating any manufacturer, colour or type it
    /// names that does not exist yet. A candidate naming an existing filament
    /// by id returns that filament unchanged.
    pub fn add_filament(&mut self, candidate: &FilamentCandidate) -> Result<FilamentView, EngineError> {
        validation::validate_filament(candidate)?;
        let mut uow = self.begin();
        let filament = compose::resolve_filament(&mut uow, candidate)?;
        let receipt = uow.commit()?;
        let id = receipt.resolve(filament.id);
        info!(id = ?id, created = !receipt.assigned.is_empty(), "added filament");
        self.filament_view(id)
    }

    pub fn edit_filament(&mut self, candidate: &FilamentCandidate) -> Result<FilamentView, EngineError> {
        validation::validate_filament(candidate)?;
        let mut uow = self.begin();
        let filament = compose::stage_filament_edit(&mut uow, candidate)?;
        uow.commit()?;
        info!(id = ?filament.id, "edited filament");
        self.filament_view(filament.id)
    }

    pub fn delete_filament(&mut self, candidate: &FilamentCandidate) -> Result<(), EngineError> {
        self.delete(EntityKind::Filament, candidate.id)
    }

    /// Filaments by manufacturer, then colour, then id.
    pub fn get_all_filaments(&self) -> Result<Vec<FilamentView>, EngineError> {
        let manufacturers = self.all_by_id::<Manufacturer>()?;
        let colours = self.all_by_id::<FilamentColour>()?;
        let types = self.all_by_id::<FilamentType>()?;

        let mut views = self
            .all::<Filament>()?
            .into_iter()
            .map(|filament| -> Result<FilamentView, EngineError> {
                Ok(FilamentView {
                    manufacturer: pick(&manufacturers, EntityKind::Manufacturer, filament.manufacturer_id)?,
                    colour: pick(&colours, EntityKind::FilamentColour, filament.filament_colour_id)?,
                    filament_type: pick(&types, EntityKind::FilamentType, filament.filament_type_id)?,
                    filament,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        views.sort_by_cached_key(|view| {
            (
                fold_key(&view.manufacturer.name),
                fold_key(&view.colour.description),
                view.filament.id,
            )
        });
        Ok(views)
    }

    pub fn filament_view(&self, id: RowId) -> Result<FilamentView, EngineError> {
        let filament: Filament = self.fetch(id)?;
        Ok(FilamentView {
            manufacturer: self.fetch(filament.manufacturer_id)?,
            colour: self.fetch(filament.filament_colour_id)?,
            filament_type: self.fetch(filament.filament_type_id)?,
            filament,
        })
    }

    // ========================================================================
    // Printing projects
    // ========================================================================

    /// Composes a project, resolving its customer, design and every filament
    /// first. Everything created along the way commits together.
    pub fn add_printing_project(
        &mut self,
        candidate: &PrintingProjectCandidate,
    ) -> Result<ProjectView, EngineError> {
        validation::validate_printing_project(candidate)?;
        let mut uow = self.begin();
        let project = compose::stage_new_project(&mut uow, candidate)?;
        let receipt = uow.commit()?;
        let id = receipt.resolve(project.id);
        info!(id = ?id, created = receipt.assigned.len(), "added printing project");
        self.project_view(id)
    }

    pub fn edit_printing_project(
        &mut self,
        candidate: &PrintingProjectCandidate,
    ) -> Result<ProjectView, EngineError> {
        validation::validate_printing_project(candidate)?;
        let mut uow = self.begin();
        let project = compose::stage_project_edit(&mut uow, candidate)?;
        uow.commit()?;
        info!(id = ?project.id, "edited printing project");
        self.project_view(project.id)
    }

    pub fn delete_printing_project(
        &mut self,
        candidate: &PrintingProjectCandidate,
    ) -> Result<(), EngineError> {
        self.delete(EntityKind::PrintingProject, candidate.id)
    }

    /// Projects by submission date, then id.
    pub fn get_all_printing_projects(&self) -> Result<Vec<ProjectView>, EngineError> {
        let customers = self.all_by_id::<Customer>()?;
        let designs = self.all_by_id::<ModelDesign>()?;
        let filaments: BTreeMap<RowId, FilamentView> = self
            .get_all_filaments()?
            .into_iter()
            .map(|view| (view.filament.id, view))
            .collect();

        let mut projects = self.all::<PrintingProject>()?;
        projects.sort_by_key(|project| (project.submitted, project.id));
        projects
            .into_iter()
            .map(|project| -> Result<ProjectView, EngineError> {
                Ok(ProjectView {
                    customer: pick(&customers, EntityKind::Customer, project.customer_id)?,
                    model_design: pick(&designs, EntityKind::ModelDesign, project.model_design_id)?,
                    filaments: project
                        .filament_ids
                        .iter()
                        .map(|id| pick(&filaments, EntityKind::Filament, *id))
                        .collect::<Result<Vec<_>, _>>()?,
                    project,
                })
            })
            .collect()
    }

    pub fn project_view(&self, id: RowId) -> Result<ProjectView, EngineError> {
        let project: PrintingProject = self.fetch(id)?;
        let filaments = project
            .filament_ids
            .iter()
            .map(|id| self.filament_view(*id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProjectView {
            customer: self.fetch(project.customer_id)?,
            model_design: self.fetch(project.model_design_id)?,
            filaments,
            project,
        })
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Whether `kind` row `id` has no dependents. Missing rows count as deletable.
    pub fn can_delete(&mut self, kind: EntityKind, id: RowId) -> Result<bool, EngineError> {
        let uow = self.begin();
        guard::can_delete(&uow, kind, id)
    }

    /// Removes one row once the referential guard passes, committing at once.
    pub fn delete(&mut self, kind: EntityKind, id: RowId) -> Result<(), EngineError> {
        let mut uow = self.begin();
        if !id.is_persisted() || uow.find_by_id(kind, id)?.is_none() {
            return Err(EngineError::not_found(kind, id));
        }
        guard::ensure_unreferenced(&uow, kind, id)?;
        uow.stage_remove(kind, id)?;
        uow.commit()?;
        info!(%kind, id = ?id, "deleted");
        Ok(())
    }
}

fn pick<T: Clone>(rows: &BTreeMap<RowId, T>, kind: EntityKind, id: RowId) -> Result<T, EngineError> {
    rows.get(&id)
        .cloned()
        .ok_or_else(|| EngineError::not_found(kind, id))
}
