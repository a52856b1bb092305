use std::fmt;

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use gcj_core::{
    Candidate, CustomerCandidate, EntityKind, FilamentCandidate, FilamentColourCandidate,
    FilamentTypeCandidate, FilamentView, Lookup, ManufacturerCandidate, ModelDesignCandidate,
    PrintingProjectCandidate, ProjectView, RowId, fold_key,
};
use gcj_engine::Journal;
use gcj_storage::Storage;

use crate::Record;

// ============================================================================
// Listing
// ============================================================================

pub fn list<S: Storage>(journal: &Journal<S>, kind: EntityKind) -> Result<String> {
    let lines: Vec<String> = match kind {
        EntityKind::Customer => lookup_lines(journal.get_all_customers()?),
        EntityKind::Manufacturer => lookup_lines(journal.get_all_manufacturers()?),
        EntityKind::FilamentColour => lookup_lines(journal.get_all_filament_colours()?),
        EntityKind::FilamentType => lookup_lines(journal.get_all_filament_types()?),
        EntityKind::ModelDesign => journal
            .get_all_model_designs()?
            .iter()
            .map(|d| format!("{}\t{}\t{}\t{}", d.id, d.description, d.length, d.summary))
            .collect(),
        EntityKind::Filament => journal
            .get_all_filaments()?
            .iter()
            .map(|view| format!("{}\t{}\t{}", view.filament.id, view, view.filament.cost_per_weight))
            .collect(),
        EntityKind::PrintingProject => journal
            .get_all_printing_projects()?
            .iter()
            .map(|view| {
                format!(
                    "{}\t{}\t{}\t{}",
                    view.project.id,
                    view.project.submitted.date(),
                    view,
                    view.project.cost
                )
            })
            .collect(),
    };

    if lines.is_empty() {
        return Ok(format!("no {} rows", kind.display_name().to_lowercase()));
    }
    Ok(lines.join("\n"))
}

fn lookup_lines<L: Lookup + fmt::Display>(rows: Vec<L>) -> Vec<String> {
    rows.iter().map(|row| format!("{}\t{}", row.id(), row)).collect()
}

// ============================================================================
// Add / edit
// ============================================================================

pub fn add<S: Storage>(journal: &mut Journal<S>, record: Record) -> Result<String> {
    let candidate = candidate(journal, RowId::UNSAVED, record)?;
    Ok(match candidate {
        Candidate::Customer(c) => saved(&journal.add_customer(&c)?),
        Candidate::Manufacturer(c) => saved(&journal.add_manufacturer(&c)?),
        Candidate::FilamentColour(c) => saved(&journal.add_filament_colour(&c)?),
        Candidate::FilamentType(c) => saved(&journal.add_filament_type(&c)?),
        Candidate::ModelDesign(c) => saved(&journal.add_model_design(&c)?),
        Candidate::Filament(c) => filament_saved(&journal.add_filament(&c)?),
        Candidate::PrintingProject(c) => project_saved(&journal.add_printing_project(&c)?),
    })
}

pub fn edit<S: Storage>(journal: &mut Journal<S>, id: i64, record: Record) -> Result<String> {
    let candidate = candidate(journal, RowId::new(id), record)?;
    Ok(match candidate {
        Candidate::Customer(c) => saved(&journal.edit_customer(&c)?),
        Candidate::Manufacturer(c) => saved(&journal.edit_manufacturer(&c)?),
        Candidate::FilamentColour(c) => saved(&journal.edit_filament_colour(&c)?),
        Candidate::FilamentType(c) => saved(&journal.edit_filament_type(&c)?),
        Candidate::ModelDesign(c) => saved(&journal.edit_model_design(&c)?),
        Candidate::Filament(c) => filament_saved(&journal.edit_filament(&c)?),
        Candidate::PrintingProject(c) => project_saved(&journal.edit_printing_project(&c)?),
    })
}

fn saved<L: Lookup + fmt::Display>(row: &L) -> String {
    format!("{} {}: {}", L::KIND, row.id(), row)
}

fn filament_saved(view: &FilamentView) -> String {
    format!("{} {}: {}", EntityKind::Filament, view.filament.id, view)
}

fn project_saved(view: &ProjectView) -> String {
    format!("{} {}: {}", EntityKind::PrintingProject, view.project.id, view)
}

/// Builds the candidate for `record`, carrying `id`.
fn candidate<S: Storage>(journal: &Journal<S>, id: RowId, record: Record) -> Result<Candidate> {
    Ok(match record {
        Record::Customer { name } => Candidate::Customer(CustomerCandidate::with_id(id, name)),
        Record::Manufacturer { name } => {
            Candidate::Manufacturer(ManufacturerCandidate::with_id(id, name))
        }
        Record::Colour { description } => {
            Candidate::FilamentColour(FilamentColourCandidate::with_id(id, description))
        }
        Record::Type { description } => {
            Candidate::FilamentType(FilamentTypeCandidate::with_id(id, description))
        }
        Record::Design { description, length, summary, url } => {
            Candidate::ModelDesign(ModelDesignCandidate {
                id,
                ..ModelDesignCandidate::new(description, length, summary, url)
            })
        }
        Record::Filament {
            cost,
            manufacturer,
            colour,
            filament_type,
            product_id,
            reorder_link,
        } => Candidate::Filament(FilamentCandidate {
            id,
            product_id,
            reorder_link,
            ..FilamentCandidate::new(
                cost,
                ManufacturerCandidate::new(manufacturer),
                FilamentColourCandidate::new(colour),
                FilamentTypeCandidate::new(filament_type),
            )
        }),
        Record::Project {
            cost,
            customer,
            design,
            filaments,
            submitted,
            completed,
        } => Candidate::PrintingProject(PrintingProjectCandidate {
            id,
            submitted: submitted.map(start_of_day),
            completed: completed.map(start_of_day),
            ..PrintingProjectCandidate::new(
                cost,
                CustomerCandidate::new(customer),
                existing_design(journal, &design)?,
                filaments
                    .into_iter()
                    .map(|f| FilamentCandidate::by_id(RowId::new(f)))
                    .collect(),
            )
        }),
    })
}

/// A design named by id, or by description ignoring case. Projects never
/// create designs from the command line since a design needs a summary.
fn existing_design<S: Storage>(journal: &Journal<S>, design: &str) -> Result<ModelDesignCandidate> {
    if let Ok(id) = design.trim().parse::<i64>() {
        return Ok(ModelDesignCandidate::by_id(RowId::new(id)));
    }
    let key = fold_key(design);
    match journal
        .get_all_model_designs()?
        .into_iter()
        .find(|d| fold_key(&d.description) == key)
    {
        Some(found) => Ok(ModelDesignCandidate::by_id(found.id)),
        None => bail!("model design \"{}\" not found; add it with `gcj add design`", design.trim()),
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// ============================================================================
// Delete
// ============================================================================

pub fn delete<S: Storage>(journal: &mut Journal<S>, kind: EntityKind, id: i64) -> Result<String> {
    let id = RowId::new(id);
    journal.delete(kind, id)?;
    Ok(format!("deleted {kind} {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcj_storage::SqliteStorage;
    use rust_decimal::Decimal;

    fn seeded() -> Journal<SqliteStorage> {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store.seed_reference_data().unwrap();
        Journal::new(store)
    }

    fn design_record() -> Record {
        Record::Design {
            description: "Benchy".into(),
            length: Decimal::new(95, 0),
            summary: "Tug boat".into(),
            url: None,
        }
    }

    #[test]
    fn add_reports_the_saved_row() {
        let mut journal = seeded();
        let message = add(&mut journal, Record::Colour { description: " teal ".into() }).unwrap();
        assert_eq!(message, "Filament Colour 18: teal");

        let again = add(&mut journal, Record::Colour { description: "WHITE".into() }).unwrap();
        assert_eq!(again, "Filament Colour 2: White");
    }

    #[test]
    fn project_names_an_existing_design() {
        let mut journal = seeded();
        add(&mut journal, design_record()).unwrap();

        let project = Record::Project {
            cost: Decimal::new(1250, 2),
            customer: "Ada".into(),
            design: "benchy".into(),
            filaments: vec![1, 1],
            submitted: NaiveDate::from_ymd_opt(2025, 5, 1),
            completed: None,
        };
        let message = add(&mut journal, project).unwrap();
        assert_eq!(message, "Printing Project 1: Benchy for Ada Elegoo PLA (White)");

        let listed = list(&journal, EntityKind::PrintingProject).unwrap();
        assert_eq!(listed, "1\t2025-05-01\tBenchy for Ada Elegoo PLA (White)\t12.50");
    }

    #[test]
    fn project_with_unknown_design_is_refused() {
        let mut journal = seeded();
        let project = Record::Project {
            cost: Decimal::ONE,
            customer: "Ada".into(),
            design: "Vase".into(),
            filaments: vec![],
            submitted: None,
            completed: None,
        };
        let err = add(&mut journal, project).unwrap_err();
        assert!(err.to_string().contains("\"Vase\" not found"));
        assert_eq!(list(&journal, EntityKind::Customer).unwrap(), "no customer rows");
    }

    #[test]
    fn edit_and_delete_by_id() {
        let mut journal = seeded();
        add(&mut journal, Record::Customer { name: "Eve".into() }).unwrap();

        let message = edit(&mut journal, 1, Record::Customer { name: "Evelyn".into() }).unwrap();
        assert_eq!(message, "Customer 1: Evelyn");

        assert_eq!(delete(&mut journal, EntityKind::Customer, 1).unwrap(), "deleted Customer 1");
        assert!(delete(&mut journal, EntityKind::Customer, 1).is_err());
    }

    #[test]
    fn refused_delete_carries_the_conflict() {
        let mut journal = seeded();
        let err = delete(&mut journal, EntityKind::FilamentColour, 2).unwrap_err();
        assert_eq!(err.to_string(), "Filament Colour 2 is in use by Filament 1");
    }
}
