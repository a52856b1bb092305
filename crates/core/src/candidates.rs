//! Candidate records supplied by callers.
//!
//! A candidate identifies its row by a non-zero id, by its natural key, or
//! both. Composite candidates carry their references as nested candidates so
//! that missing reference data can be created in the same unit of work.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{
    Customer, FilamentColour, FilamentType, Lookup, Manufacturer, ModelDesign, trimmed,
};
use crate::ids::RowId;
use crate::kind::EntityKind;
use crate::validation::{self, Validation};
use crate::views::{FilamentView, ProjectView};

/// Candidate side of a lookup kind.
pub trait LookupCandidate {
    type Row: Lookup;

    fn id(&self) -> RowId;

    fn natural_key(&self) -> &str;

    fn validate(&self) -> Validation;

    /// Builds an unsaved row carrying this candidate's fields.
    fn to_row(&self) -> Self::Row;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCandidate {
    pub id: RowId,
    pub name: String,
}

impl CustomerCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(RowId::UNSAVED, name)
    }

    pub fn with_id(id: RowId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerCandidate {
    pub id: RowId,
    pub name: String,
}

impl ManufacturerCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(RowId::UNSAVED, name)
    }

    pub fn with_id(id: RowId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilamentColourCandidate {
    pub id: RowId,
    pub description: String,
}

impl FilamentColourCandidate {
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_id(RowId::UNSAVED, description)
    }

    pub fn with_id(id: RowId, description: impl Into<String>) -> Self {
        Self { id, description: description.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilamentTypeCandidate {
    pub id: RowId,
    pub description: String,
}

impl FilamentTypeCandidate {
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_id(RowId::UNSAVED, description)
    }

    pub fn with_id(id: RowId, description: impl Into<String>) -> Self {
        Self { id, description: description.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDesignCandidate {
    pub id: RowId,
    pub description: String,
    pub length: Decimal,
    pub summary: String,
    pub url: Option<String>,
}

impl ModelDesignCandidate {
    pub fn new(
        description: impl Into<String>,
        length: Decimal,
        summary: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            id: RowId::UNSAVED,
            description: description.into(),
            length,
            summary: summary.into(),
            url,
        }
    }

    /// A reference to an existing design by id only.
    pub fn by_id(id: RowId) -> Self {
        Self { id, ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilamentCandidate {
    pub id: RowId,
    pub cost_per_weight: Decimal,
    pub product_id: Option<String>,
    pub reorder_link: Option<String>,
    pub manufacturer: Option<ManufacturerCandidate>,
    pub colour: Option<FilamentColourCandidate>,
    pub filament_type: Option<FilamentTypeCandidate>,
}

impl FilamentCandidate {
    pub fn new(
        cost_per_weight: Decimal,
        manufacturer: ManufacturerCandidate,
        colour: FilamentColourCandidate,
        filament_type: FilamentTypeCandidate,
    ) -> Self {
        Self {
            id: RowId::UNSAVED,
            cost_per_weight,
            product_id: None,
            reorder_link: None,
            manufacturer: Some(manufacturer),
            colour: Some(colour),
            filament_type: Some(filament_type),
        }
    }

    /// A reference to an existing filament by id only.
    pub fn by_id(id: RowId) -> Self {
        Self { id, ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintingProjectCandidate {
    pub id: RowId,
    pub cost: Decimal,
    /// Defaults to the current local time when unset.
    pub submitted: Option<NaiveDateTime>,
    pub completed: Option<NaiveDateTime>,
    pub customer: Option<CustomerCandidate>,
    pub model_design: Option<ModelDesignCandidate>,
    pub filaments: Vec<FilamentCandidate>,
}

impl PrintingProjectCandidate {
    pub fn new(
        cost: Decimal,
        customer: CustomerCandidate,
        model_design: ModelDesignCandidate,
        filaments: Vec<FilamentCandidate>,
    ) -> Self {
        Self {
            id: RowId::UNSAVED,
            cost,
            submitted: None,
            completed: None,
            customer: Some(customer),
            model_design: Some(model_design),
            filaments,
        }
    }
}

macro_rules! lookup_candidate {
    ($candidate:ident, $row:ident, $key:ident, $validate:path) => {
        impl LookupCandidate for $candidate {
            type Row = $row;

            fn id(&self) -> RowId {
                self.id
            }

            fn natural_key(&self) -> &str {
                &self.$key
            }

            fn validate(&self) -> Validation {
                $validate(self)
            }

            fn to_row(&self) -> $row {
                let mut row = $row {
                    id: RowId::UNSAVED,
                    $key: String::new(),
                };
                row.apply(self);
                row
            }
        }
    };
}

lookup_candidate!(CustomerCandidate, Customer, name, validation::validate_customer);
lookup_candidate!(ManufacturerCandidate, Manufacturer, name, validation::validate_manufacturer);
lookup_candidate!(
    FilamentColourCandidate,
    FilamentColour,
    description,
    validation::validate_filament_colour
);
lookup_candidate!(
    FilamentTypeCandidate,
    FilamentType,
    description,
    validation::validate_filament_type
);

impl LookupCandidate for ModelDesignCandidate {
    type Row = ModelDesign;

    fn id(&self) -> RowId {
        self.id
    }

    fn natural_key(&self) -> &str {
        &self.description
    }

    fn validate(&self) -> Validation {
        validation::validate_model_design(self)
    }

    fn to_row(&self) -> ModelDesign {
        ModelDesign {
            id: RowId::UNSAVED,
            description: self.description.trim().to_string(),
            length: self.length,
            summary: self.summary.trim().to_string(),
            url: trimmed(self.url.as_deref()),
        }
    }
}

/// A candidate of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Candidate {
    Customer(CustomerCandidate),
    Manufacturer(ManufacturerCandidate),
    FilamentColour(FilamentColourCandidate),
    FilamentType(FilamentTypeCandidate),
    Filament(FilamentCandidate),
    ModelDesign(ModelDesignCandidate),
    PrintingProject(PrintingProjectCandidate),
}

impl Candidate {
    pub fn kind(&self) -> EntityKind {
        match self {
            Candidate::Customer(_) => EntityKind::Customer,
            Candidate::Manufacturer(_) => EntityKind::Manufacturer,
            Candidate::FilamentColour(_) => EntityKind::FilamentColour,
            Candidate::FilamentType(_) => EntityKind::FilamentType,
            Candidate::Filament(_) => EntityKind::Filament,
            Candidate::ModelDesign(_) => EntityKind::ModelDesign,
            Candidate::PrintingProject(_) => EntityKind::PrintingProject,
        }
    }

    pub fn id(&self) -> RowId {
        match self {
            Candidate::Customer(c) => c.id,
            Candidate::Manufacturer(c) => c.id,
            Candidate::FilamentColour(c) => c.id,
            Candidate::FilamentType(c) => c.id,
            Candidate::Filament(c) => c.id,
            Candidate::ModelDesign(c) => c.id,
            Candidate::PrintingProject(c) => c.id,
        }
    }

    pub fn validate(&self) -> Validation {
        match self {
            Candidate::Customer(c) => validation::validate_customer(c),
            Candidate::Manufacturer(c) => validation::validate_manufacturer(c),
            Candidate::FilamentColour(c) => validation::validate_filament_colour(c),
            Candidate::FilamentType(c) => validation::validate_filament_type(c),
            Candidate::Filament(c) => validation::validate_filament(c),
            Candidate::ModelDesign(c) => validation::validate_model_design(c),
            Candidate::PrintingProject(c) => validation::validate_printing_project(c),
        }
    }
}

impl From<&FilamentView> for FilamentCandidate {
    fn from(view: &FilamentView) -> Self {
        Self {
            id: view.filament.id,
            cost_per_weight: view.filament.cost_per_weight,
            product_id: view.filament.product_id.clone(),
            reorder_link: view.filament.reorder_link.clone(),
            manufacturer: Some(view.manufacturer.to_candidate()),
            colour: Some(view.colour.to_candidate()),
            filament_type: Some(view.filament_type.to_candidate()),
        }
    }
}

impl From<&ProjectView> for PrintingProjectCandidate {
    fn from(view: &ProjectView) -> Self {
        Self {
            id: view.project.id,
            cost: view.project.cost,
            submitted: Some(view.project.submitted),
            completed: view.project.completed,
            customer: Some(view.customer.to_candidate()),
            model_design: Some(view.model_design.to_candidate()),
            filaments: view.filaments.iter().map(FilamentCandidate::from).collect(),
        }
    }
}
