use chrono::{Local, NaiveDate, NaiveDateTime};

use gcj_core::{
    CustomerCandidate, EntityKind, FilamentCandidate, PrintingProjectCandidate, RowId,
};
use gcj_engine::EngineError;
use gcj_harness::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|day| day.and_hms_opt(10, 0, 0))
        .unwrap()
}

// ============================================================================
// Filaments
// ============================================================================

#[test]
fn filament_reuses_existing_lookups() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let view = t.journal.add_filament(&filament(cents(2199), "ELEGOO", "red", "petg"))?;
    assert_eq!(view.manufacturer.id, RowId::new(1));
    assert_eq!(view.colour.id, RowId::new(3));
    assert_eq!(view.filament_type.id, RowId::new(3));
    assert_eq!(view.to_string(), "Elegoo PETG (Red)");

    assert_eq!(t.count(EntityKind::Manufacturer)?, 7);
    assert_eq!(t.count(EntityKind::FilamentColour)?, 17);
    assert_eq!(t.count(EntityKind::FilamentType)?, 6);
    assert_eq!(t.count(EntityKind::Filament)?, 3);
    Ok(())
}

#[test]
fn filament_optional_text_is_trimmed_and_blank_dropped() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let candidate = FilamentCandidate {
        product_id: Some("  SKU-42 ".into()),
        reorder_link: Some("   ".into()),
        ..filament(cents(1800), "Polymaker", "Orange", "PLA")
    };
    let view = t.journal.add_filament(&candidate)?;
    assert_eq!(view.filament.product_id.as_deref(), Some("SKU-42"));
    assert_eq!(view.filament.reorder_link, None);
    Ok(())
}

#[test]
fn edit_filament_re_resolves_references() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let candidate = FilamentCandidate {
        id: RowId::new(1),
        ..filament(cents(2100), "Elegoo", "Teal", "PLA")
    };
    let view = t.journal.edit_filament(&candidate)?;
    assert_eq!(view.filament.id, RowId::new(1));
    assert_eq!(view.colour.description, "Teal");
    assert_eq!(view.filament.cost_per_weight, cents(2100));

    assert_eq!(t.count(EntityKind::Filament)?, 2);
    assert_eq!(t.count(EntityKind::FilamentColour)?, 18);
    Ok(())
}

#[test]
fn edit_of_missing_filament_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let candidate = FilamentCandidate {
        id: RowId::new(99),
        ..filament(cents(2100), "Elegoo", "Teal", "PLA")
    };
    let result = t.journal.edit_filament(&candidate);
    assert!(matches!(
        result,
        Err(EngineError::NotFound { kind: EntityKind::Filament, id }) if id == RowId::new(99)
    ));
    // Teal would have been created by the edit; it must not exist.
    assert_eq!(t.count(EntityKind::FilamentColour)?, 17);
    Ok(())
}

#[test]
fn filaments_list_by_manufacturer_then_colour() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;
    t.journal.add_filament(&filament(cents(2999), "Bambu Lab", "Red", "PLA"))?;

    let listed: Vec<String> = t
        .journal
        .get_all_filaments()?
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(listed, ["Bambu Lab PLA (Red)", "Elegoo PLA (Black)", "Elegoo PLA (White)"]);
    Ok(())
}

// ============================================================================
// Printing projects
// ============================================================================

#[test]
fn project_filaments_form_a_set() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let view = t.journal.add_printing_project(&project(
        cents(900),
        "Ada",
        "Benchy",
        vec![
            FilamentCandidate::by_id(RowId::new(1)),
            FilamentCandidate::by_id(RowId::new(2)),
            FilamentCandidate::by_id(RowId::new(1)),
        ],
    ))?;
    assert_eq!(view.project.filament_ids, vec![RowId::new(1), RowId::new(2)]);
    assert_eq!(view.to_string(), "Benchy for Ada Elegoo PLA (Black)/Elegoo PLA (White)");
    Ok(())
}

#[test]
fn project_filaments_keep_their_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let view = t.journal.add_printing_project(&project(
        cents(900),
        "Ada",
        "Benchy",
        vec![FilamentCandidate::by_id(RowId::new(2)), FilamentCandidate::by_id(RowId::new(1))],
    ))?;
    let expected = vec![RowId::new(2), RowId::new(1)];
    assert_eq!(view.project.filament_ids, expected);
    assert_eq!(t.journal.project_view(view.project.id)?.project.filament_ids, expected);
    assert_eq!(t.journal.get_all_printing_projects()?[0].project.filament_ids, expected);
    Ok(())
}

#[test]
fn filament_named_by_id_is_reused_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let by_id = FilamentCandidate {
        id: RowId::new(2),
        ..filament(cents(1), "Esun", "Pink", "TPU")
    };
    let view = t.journal.add_printing_project(&project(cents(900), "Ada", "Benchy", vec![by_id]))?;

    let reused = &view.filaments[0];
    assert_eq!(reused.filament.id, RowId::new(2));
    assert_eq!(reused.filament.cost_per_weight, cents(1995));
    assert_eq!(reused.colour.description, "Black");
    assert_eq!(t.count(EntityKind::Filament)?, 2);
    assert_eq!(t.count(EntityKind::FilamentColour)?, 17);
    Ok(())
}

#[test]
fn submitted_defaults_to_now() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let before = Local::now().naive_local();
    let view = t.journal.add_printing_project(&project(cents(500), "Ada", "Benchy", vec![]))?;
    let after = Local::now().naive_local();

    assert!(view.project.submitted >= before && view.project.submitted <= after);
    assert_eq!(view.project.completed, None);
    assert!(view.filaments.is_empty());
    Ok(())
}

#[test]
fn completed_before_submitted_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let candidate = PrintingProjectCandidate {
        submitted: Some(date(2025, 10, 19)),
        completed: Some(date(2025, 10, 1)),
        ..project(cents(500), "Ada", "Benchy", vec![])
    };
    let Err(EngineError::Validation(failure)) = t.journal.add_printing_project(&candidate) else {
        panic!("completed before submitted accepted");
    };
    assert!(failure.has_problem("completed"));
    assert_eq!(t.count(EntityKind::Customer)?, 0);
    Ok(())
}

#[test]
fn completed_is_checked_against_a_defaulted_submission() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let candidate = PrintingProjectCandidate {
        completed: Some(date(2020, 1, 1)),
        ..project(cents(500), "Ada", "Benchy", vec![])
    };
    let Err(EngineError::Validation(failure)) = t.journal.add_printing_project(&candidate) else {
        panic!("completed before the default submission accepted");
    };
    assert!(failure.has_problem("completed"));
    assert_eq!(t.count(EntityKind::Customer)?, 0);
    assert_eq!(t.count(EntityKind::ModelDesign)?, 0);
    assert_eq!(t.commits()?, 0);
    Ok(())
}

#[test]
fn completed_is_checked_against_the_stored_submission() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;
    let original = t.journal.add_printing_project(&PrintingProjectCandidate {
        submitted: Some(date(2025, 3, 1)),
        ..project(cents(900), "Ada", "Benchy", vec![])
    })?;

    let result = t.journal.edit_printing_project(&PrintingProjectCandidate {
        id: original.project.id,
        completed: Some(date(2025, 2, 1)),
        ..project(cents(1100), "Grace", "Benchy", vec![])
    });
    let Err(EngineError::Validation(failure)) = result else {
        panic!("completed before the stored submission accepted");
    };
    assert!(failure.has_problem("completed"));

    let stored = t.journal.project_view(original.project.id)?;
    assert_eq!(stored.project, original.project);
    assert_eq!(t.count(EntityKind::Customer)?, 1);
    Ok(())
}

#[test]
fn nested_problems_carry_their_path() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let candidate = project(
        cents(500),
        "",
        "Benchy",
        vec![
            FilamentCandidate::by_id(RowId::new(1)),
            filament(cents(100), "Esun", " ", "PLA"),
        ],
    );
    let Err(EngineError::Validation(failure)) = t.journal.add_printing_project(&candidate) else {
        panic!("invalid nested candidates accepted");
    };
    assert!(failure.has_problem("customer.name"));
    assert!(failure.has_problem("filaments[1].colour.description"));
    assert_eq!(failure.problems.len(), 2);

    assert_eq!(t.count(EntityKind::Customer)?, 0);
    assert_eq!(t.count(EntityKind::ModelDesign)?, 0);
    assert_eq!(t.commits()?, 0);
    Ok(())
}

#[test]
fn store_failure_propagates_and_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;
    let candidate = project(
        cents(3000),
        "Ada",
        "Benchy",
        vec![filament(cents(2500), "Creality", "Teal", "PETG")],
    );

    t.fail_commits(true);
    let result = t.journal.add_printing_project(&candidate);
    assert!(matches!(result, Err(EngineError::Storage(_))));
    assert_eq!(t.journal.store().rejected(), 1);
    assert_eq!(t.count(EntityKind::Customer)?, 0);
    assert_eq!(t.count(EntityKind::FilamentColour)?, 17);
    assert_eq!(t.count(EntityKind::Filament)?, 2);

    t.fail_commits(false);
    let view = t.journal.add_printing_project(&candidate)?;
    assert_eq!(view.filaments[0].colour.description, "Teal");
    assert_eq!(t.commits()?, 1);
    Ok(())
}

#[test]
fn edit_project_keeps_id_and_replaces_references() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;
    let original = t.journal.add_printing_project(&PrintingProjectCandidate {
        submitted: Some(date(2025, 3, 1)),
        ..project(cents(900), "Ada", "Benchy", vec![FilamentCandidate::by_id(RowId::new(1))])
    })?;

    let edited = t.journal.edit_printing_project(&PrintingProjectCandidate {
        id: original.project.id,
        completed: Some(date(2025, 3, 4)),
        customer: Some(CustomerCandidate::new("Grace")),
        filaments: vec![FilamentCandidate::by_id(RowId::new(2))],
        ..project(cents(1100), "ignored", "Benchy", vec![])
    })?;

    assert_eq!(edited.project.id, original.project.id);
    assert_eq!(edited.project.cost, cents(1100));
    // An unset submission date keeps the stored one.
    assert_eq!(edited.project.submitted, date(2025, 3, 1));
    assert_eq!(edited.project.completed, Some(date(2025, 3, 4)));
    assert_eq!(edited.customer.name, "Grace");
    assert_eq!(edited.model_design.id, original.model_design.id);
    assert_eq!(edited.project.filament_ids, vec![RowId::new(2)]);

    assert_eq!(t.journal.get_all_printing_projects()?.len(), 1);
    // The previous customer is left in place.
    assert_eq!(t.count(EntityKind::Customer)?, 2);
    Ok(())
}

#[test]
fn edit_of_missing_project_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let result = t.journal.edit_printing_project(&project(cents(1), "Ada", "Benchy", vec![]));
    assert!(matches!(
        result,
        Err(EngineError::NotFound { kind: EntityKind::PrintingProject, .. })
    ));
    assert_eq!(t.count(EntityKind::Customer)?, 0);
    Ok(())
}

#[test]
fn projects_list_by_submission_date() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;
    for (design, day) in [("Vase", 20), ("Benchy", 2), ("Gear", 11)] {
        t.journal.add_printing_project(&PrintingProjectCandidate {
            submitted: Some(date(2025, 6, day)),
            ..project(cents(100), "Ada", design, vec![])
        })?;
    }

    let designs: Vec<String> = t
        .journal
        .get_all_printing_projects()?
        .into_iter()
        .map(|view| view.model_design.description)
        .collect();
    assert_eq!(designs, ["Benchy", "Gear", "Vase"]);
    assert_eq!(t.count(EntityKind::Customer)?, 1);
    Ok(())
}

#[test]
fn project_view_converts_back_into_a_candidate() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;
    let view = t.journal.add_printing_project(&PrintingProjectCandidate {
        submitted: Some(date(2025, 4, 2)),
        ..project(cents(800), "Ada", "Benchy", vec![FilamentCandidate::by_id(RowId::new(2))])
    })?;

    let mut candidate = PrintingProjectCandidate::from(&view);
    candidate.completed = Some(date(2025, 4, 3));
    let edited = t.journal.edit_printing_project(&candidate)?;

    assert_eq!(edited.project.submitted, date(2025, 4, 2));
    assert_eq!(edited.project.completed, Some(date(2025, 4, 3)));
    assert_eq!(edited.filaments, view.filaments);
    assert_eq!(t.count(EntityKind::Customer)?, 1);
    assert_eq!(t.count(EntityKind::Filament)?, 2);
    Ok(())
}
