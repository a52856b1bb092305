//! Field-level validation of candidates.
//!
//! Validation never touches the store. Every problem on a candidate is
//! reported, including problems on nested candidates that will have to be
//! created (id zero). Nested candidates with a non-zero id are references and
//! are checked later, only if they end up being created.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

use crate::candidates::{
    CustomerCandidate, FilamentCandidate, FilamentColourCandidate, FilamentTypeCandidate,
    ManufacturerCandidate, ModelDesignCandidate, PrintingProjectCandidate,
};
use crate::kind::EntityKind;

pub const CUSTOMER_NAME_MAX: usize = 100;
pub const MANUFACTURER_NAME_MAX: usize = 30;
pub const COLOUR_DESCRIPTION_MAX: usize = 100;
pub const TYPE_DESCRIPTION_MAX: usize = 15;
pub const DESIGN_DESCRIPTION_MAX: usize = 5000;
pub const DESIGN_SUMMARY_MAX: usize = 100;
pub const DESIGN_URL_MAX: usize = 2038;
pub const PRODUCT_ID_MAX: usize = 20;
pub const REORDER_LINK_MAX: usize = 2083;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// All problems found on one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub kind: EntityKind,
    pub problems: Vec<FieldProblem>,
}

impl ValidationFailure {
    pub fn has_problem(&self, field: &str) -> bool {
        self.problems.iter().any(|p| p.field == field)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: ", self.kind.display_name().to_lowercase())?;
        for (i, problem) in self.problems.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

pub type Validation = Result<(), ValidationFailure>;

struct Checker {
    prefix: String,
    problems: Vec<FieldProblem>,
}

impl Checker {
    fn new() -> Self {
        Self { prefix: String::new(), problems: Vec::new() }
    }

    fn field(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn report(&mut self, name: &str, message: impl Into<String>) {
        let field = self.field(name);
        self.problems.push(FieldProblem { field, message: message.into() });
    }

    fn required_text(&mut self, name: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.report(name, "is required");
        } else {
            self.max_len(name, value, max);
        }
    }

    fn optional_text(&mut self, name: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.max_len(name, value, max);
        }
    }

    fn max_len(&mut self, name: &str, value: &str, max: usize) {
        if value.trim().chars().count() > max {
            self.report(name, format!("must be at most {max} characters"));
        }
    }

    fn non_negative(&mut self, name: &str, value: Decimal) {
        if value < Decimal::ZERO {
            self.report(name, "must not be negative");
        }
    }

    fn present<'a, T>(&mut self, name: &str, value: &'a Option<T>) -> Option<&'a T> {
        if value.is_none() {
            self.report(name, "is required");
        }
        value.as_ref()
    }

    /// Runs `check` with field names nested under `name`.
    fn nested(&mut self, name: &str, check: impl FnOnce(&mut Checker)) {
        let nested = format!("{}{}.", self.prefix, name);
        let saved = std::mem::replace(&mut self.prefix, nested);
        check(self);
        self.prefix = saved;
    }

    fn finish(self, kind: EntityKind) -> Validation {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { kind, problems: self.problems })
        }
    }
}

fn check_customer(c: &mut Checker, candidate: &CustomerCandidate) {
    c.required_text("name", &candidate.name, CUSTOMER_NAME_MAX);
}

fn check_manufacturer(c: &mut Checker, candidate: &ManufacturerCandidate) {
    c.required_text("name", &candidate.name, MANUFACTURER_NAME_MAX);
}

fn check_colour(c: &mut Checker, candidate: &FilamentColourCandidate) {
    c.required_text("description", &candidate.description, COLOUR_DESCRIPTION_MAX);
}

fn check_type(c: &mut Checker, candidate: &FilamentTypeCandidate) {
    c.required_text("description", &candidate.description, TYPE_DESCRIPTION_MAX);
}

fn check_design(c: &mut Checker, candidate: &ModelDesignCandidate) {
    c.required_text("description", &candidate.description, DESIGN_DESCRIPTION_MAX);
    c.non_negative("length", candidate.length);
    c.required_text("summary", &candidate.summary, DESIGN_SUMMARY_MAX);
    c.optional_text("url", candidate.url.as_deref(), DESIGN_URL_MAX);
}

fn check_filament(c: &mut Checker, candidate: &FilamentCandidate) {
    c.non_negative("cost_per_weight", candidate.cost_per_weight);
    c.optional_text("product_id", candidate.product_id.as_deref(), PRODUCT_ID_MAX);
    c.optional_text("reorder_link", candidate.reorder_link.as_deref(), REORDER_LINK_MAX);
    if let Some(m) = c.present("manufacturer", &candidate.manufacturer)
        && m.id.is_unsaved()
    {
        c.nested("manufacturer", |c| check_manufacturer(c, m));
    }
    if let Some(colour) = c.present("colour", &candidate.colour)
        && colour.id.is_unsaved()
    {
        c.nested("colour", |c| check_colour(c, colour));
    }
    if let Some(t) = c.present("filament_type", &candidate.filament_type)
        && t.id.is_unsaved()
    {
        c.nested("filament_type", |c| check_type(c, t));
    }
}

fn check_dates(c: &mut Checker, submitted: NaiveDateTime, completed: Option<NaiveDateTime>) {
    if let Some(completed) = completed
        && completed < submitted
    {
        c.report("completed", "must not precede submitted");
    }
}

fn check_project(c: &mut Checker, candidate: &PrintingProjectCandidate) {
    c.non_negative("cost", candidate.cost);
    if let Some(submitted) = candidate.submitted {
        check_dates(c, submitted, candidate.completed);
    }
    if let Some(customer) = c.present("customer", &candidate.customer)
        && customer.id.is_unsaved()
    {
        c.nested("customer", |c| check_customer(c, customer));
    }
    if let Some(design) = c.present("model_design", &candidate.model_design)
        && design.id.is_unsaved()
    {
        c.nested("model_design", |c| check_design(c, design));
    }
    for (i, filament) in candidate.filaments.iter().enumerate() {
        if filament.id.is_unsaved() {
            c.nested(&format!("filaments[{i}]"), |c| check_filament(c, filament));
        }
    }
}

pub fn validate_customer(candidate: &CustomerCandidate) -> Validation {
    let mut c = Checker::new();
    check_customer(&mut c, candidate);
    c.finish(EntityKind::Customer)
}

pub fn validate_manufacturer(candidate: &ManufacturerCandidate) -> Validation {
    let mut c = Checker::new();
    check_manufacturer(&mut c, candidate);
    c.finish(EntityKind::Manufacturer)
}

pub fn validate_filament_colour(candidate: &FilamentColourCandidate) -> Validation {
    let mut c = Checker::new();
    check_colour(&mut c, candidate);
    c.finish(EntityKind::FilamentColour)
}

pub fn validate_filament_type(candidate: &FilamentTypeCandidate) -> Validation {
    let mut c = Checker::new();
    check_type(&mut c, candidate);
    c.finish(EntityKind::FilamentType)
}

pub fn validate_model_design(candidate: &ModelDesignCandidate) -> Validation {
    let mut c = Checker::new();
    check_design(&mut c, candidate);
    c.finish(EntityKind::ModelDesign)
}

pub fn validate_filament(candidate: &FilamentCandidate) -> Validation {
    let mut c = Checker::new();
    check_filament(&mut c, candidate);
    c.finish(EntityKind::Filament)
}

pub fn validate_printing_project(candidate: &PrintingProjectCandidate) -> Validation {
    let mut c = Checker::new();
    check_project(&mut c, candidate);
    c.finish(EntityKind::PrintingProject)
}

/// Checks a project's effective dates once an unset `submitted` has been
/// filled in from the clock or the stored row.
pub fn validate_project_dates(submitted: NaiveDateTime, completed: Option<NaiveDateTime>) -> Validation {
    let mut c = Checker::new();
    check_dates(&mut c, submitted, completed);
    c.finish(EntityKind::PrintingProject)
}
