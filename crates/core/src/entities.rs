//! Canonical rows: the single authoritative shape of each persisted entity.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidates::{
    CustomerCandidate, FilamentColourCandidate, FilamentTypeCandidate, LookupCandidate,
    ManufacturerCandidate, ModelDesignCandidate,
};
use crate::error::CoreError;
use crate::ids::RowId;
use crate::kind::EntityKind;

/// Folds a natural key for case-insensitive comparison.
pub fn fold_key(key: &str) -> String {
    key.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: RowId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: RowId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilamentColour {
    pub id: RowId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilamentType {
    pub id: RowId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filament {
    pub id: RowId,
    pub cost_per_weight: Decimal,
    pub product_id: Option<String>,
    pub reorder_link: Option<String>,
    pub manufacturer_id: RowId,
    pub filament_colour_id: RowId,
    pub filament_type_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDesign {
    pub id: RowId,
    pub description: String,
    pub length: Decimal,
    pub summary: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintingProject {
    pub id: RowId,
    pub cost: Decimal,
    pub submitted: NaiveDateTime,
    pub completed: Option<NaiveDateTime>,
    pub customer_id: RowId,
    pub model_design_id: RowId,
    /// Linked filaments, kept free of duplicates.
    pub filament_ids: Vec<RowId>,
}

/// A canonical row of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Row {
    Customer(Customer),
    Manufacturer(Manufacturer),
    FilamentColour(FilamentColour),
    FilamentType(FilamentType),
    Filament(Filament),
    ModelDesign(ModelDesign),
    PrintingProject(PrintingProject),
}

impl Row {
    pub fn kind(&self) -> EntityKind {
        match self {
            Row::Customer(_) => EntityKind::Customer,
            Row::Manufacturer(_) => EntityKind::Manufacturer,
            Row::FilamentColour(_) => EntityKind::FilamentColour,
            Row::FilamentType(_) => EntityKind::FilamentType,
            Row::Filament(_) => EntityKind::Filament,
            Row::ModelDesign(_) => EntityKind::ModelDesign,
            Row::PrintingProject(_) => EntityKind::PrintingProject,
        }
    }

    pub fn id(&self) -> RowId {
        match self {
            Row::Customer(r) => r.id,
            Row::Manufacturer(r) => r.id,
            Row::FilamentColour(r) => r.id,
            Row::FilamentType(r) => r.id,
            Row::Filament(r) => r.id,
            Row::ModelDesign(r) => r.id,
            Row::PrintingProject(r) => r.id,
        }
    }

    pub fn set_id(&mut self, id: RowId) {
        match self {
            Row::Customer(r) => r.id = id,
            Row::Manufacturer(r) => r.id = id,
            Row::FilamentColour(r) => r.id = id,
            Row::FilamentType(r) => r.id = id,
            Row::Filament(r) => r.id = id,
            Row::ModelDesign(r) => r.id = id,
            Row::PrintingProject(r) => r.id = id,
        }
    }

    /// The natural key of a lookup row; `None` for composites.
    pub fn natural_key(&self) -> Option<&str> {
        match self {
            Row::Customer(r) => Some(&r.name),
            Row::Manufacturer(r) => Some(&r.name),
            Row::FilamentColour(r) => Some(&r.description),
            Row::FilamentType(r) => Some(&r.description),
            Row::ModelDesign(r) => Some(&r.description),
            Row::Filament(_) | Row::PrintingProject(_) => None,
        }
    }

    /// Every foreign reference held by this row.
    pub fn references(&self) -> Vec<(EntityKind, RowId)> {
        match self {
            Row::Filament(f) => vec![
                (EntityKind::Manufacturer, f.manufacturer_id),
                (EntityKind::FilamentColour, f.filament_colour_id),
                (EntityKind::FilamentType, f.filament_type_id),
            ],
            Row::PrintingProject(p) => {
                let mut refs = vec![
                    (EntityKind::Customer, p.customer_id),
                    (EntityKind::ModelDesign, p.model_design_id),
                ];
                refs.extend(p.filament_ids.iter().map(|id| (EntityKind::Filament, *id)));
                refs
            }
            Row::Customer(_)
            | Row::Manufacturer(_)
            | Row::FilamentColour(_)
            | Row::FilamentType(_)
            | Row::ModelDesign(_) => Vec::new(),
        }
    }

    /// Rewrites every foreign reference through `map`, stopping at the first error.
    pub fn remap_references<E>(
        &mut self,
        mut map: impl FnMut(EntityKind, RowId) -> Result<RowId, E>,
    ) -> Result<(), E> {
        match self {
            Row::Filament(f) => {
                f.manufacturer_id = map(EntityKind::Manufacturer, f.manufacturer_id)?;
                f.filament_colour_id = map(EntityKind::FilamentColour, f.filament_colour_id)?;
                f.filament_type_id = map(EntityKind::FilamentType, f.filament_type_id)?;
            }
            Row::PrintingProject(p) => {
                p.customer_id = map(EntityKind::Customer, p.customer_id)?;
                p.model_design_id = map(EntityKind::ModelDesign, p.model_design_id)?;
                for id in &mut p.filament_ids {
                    *id = map(EntityKind::Filament, *id)?;
                }
            }
            Row::Customer(_)
            | Row::Manufacturer(_)
            | Row::FilamentColour(_)
            | Row::FilamentType(_)
            | Row::ModelDesign(_) => {}
        }
        Ok(())
    }
}

/// A typed canonical row that converts to and from [`Row`].
pub trait Entity: Sized + Clone + Into<Row> + TryFrom<Row, Error = CoreError> {
    const KIND: EntityKind;

    fn id(&self) -> RowId;
}

/// A reference-data row resolved by its natural key.
pub trait Lookup: Entity {
    type Candidate: LookupCandidate<Row = Self>;

    fn natural_key(&self) -> &str;

    /// Overwrites the scalar fields of this row from `candidate`, keeping the id.
    fn apply(&mut self, candidate: &Self::Candidate);

    fn to_candidate(&self) -> Self::Candidate;
}

macro_rules! row_variant {
    ($name:ident) => {
        impl From<$name> for Row {
            fn from(row: $name) -> Self {
                Row::$name(row)
            }
        }

        impl TryFrom<Row> for $name {
            type Error = CoreError;

            fn try_from(row: Row) -> Result<Self, Self::Error> {
                match row {
                    Row::$name(inner) => Ok(inner),
                    other => Err(CoreError::KindMismatch {
                        expected: EntityKind::$name,
                        found: other.kind(),
                    }),
                }
            }
        }

        impl Entity for $name {
            const KIND: EntityKind = EntityKind::$name;

            fn id(&self) -> RowId {
                self.id
            }
        }
    };
}

row_variant!(Customer);
row_variant!(Manufacturer);
row_variant!(FilamentColour);
row_variant!(FilamentType);
row_variant!(Filament);
row_variant!(ModelDesign);
row_variant!(PrintingProject);

impl Lookup for Customer {
    type Candidate = CustomerCandidate;

    fn natural_key(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, candidate: &CustomerCandidate) {
        self.name = candidate.name.trim().to_string();
    }

    fn to_candidate(&self) -> CustomerCandidate {
        CustomerCandidate::with_id(self.id, self.name.clone())
    }
}

impl Lookup for Manufacturer {
    type Candidate = ManufacturerCandidate;

    fn natural_key(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, candidate: &ManufacturerCandidate) {
        self.name = candidate.name.trim().to_string();
    }

    fn to_candidate(&self) -> ManufacturerCandidate {
        ManufacturerCandidate::with_id(self.id, self.name.clone())
    }
}

impl Lookup for FilamentColour {
    type Candidate = FilamentColourCandidate;

    fn natural_key(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, candidate: &FilamentColourCandidate) {
        self.description = candidate.description.trim().to_string();
    }

    fn to_candidate(&self) -> FilamentColourCandidate {
        FilamentColourCandidate::with_id(self.id, self.description.clone())
    }
}

impl Lookup for FilamentType {
    type Candidate = FilamentTypeCandidate;

    fn natural_key(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, candidate: &FilamentTypeCandidate) {
        self.description = candidate.description.trim().to_string();
    }

    fn to_candidate(&self) -> FilamentTypeCandidate {
        FilamentTypeCandidate::with_id(self.id, self.description.clone())
    }
}

impl Lookup for ModelDesign {
    type Candidate = ModelDesignCandidate;

    fn natural_key(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, candidate: &ModelDesignCandidate) {
        self.description = candidate.description.trim().to_string();
        self.length = candidate.length;
        self.summary = candidate.summary.trim().to_string();
        self.url = trimmed(candidate.url.as_deref());
    }

    fn to_candidate(&self) -> ModelDesignCandidate {
        ModelDesignCandidate {
            id: self.id,
            description: self.description.clone(),
            length: self.length,
            summary: self.summary.clone(),
            url: self.url.clone(),
        }
    }
}

/// Trims optional text, mapping blank values to `None`.
pub fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for FilamentColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl fmt::Display for FilamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl fmt::Display for ModelDesign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
