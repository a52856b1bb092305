use gcj_core::{EntityKind, Filament, FilamentColour, Row, RowId};
use gcj_engine::{EngineError, resolve};
use gcj_harness::*;
use gcj_storage::{Change, Storage, StorageError};

// ============================================================================
// Reopening the database file
// ============================================================================

#[test]
fn committed_work_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, path) = temp_db()?;
    let project_id = {
        let mut t = TestJournal::open(&path)?;
        let view = t.journal.add_printing_project(&project(
            cents(2750),
            "Ada",
            "Benchy",
            vec![filament(cents(1995), "Prusa", "Galaxy Black", "PLA")],
        ))?;
        view.project.id
    };

    let t = TestJournal::open(&path)?;
    let projects = t.journal.get_all_printing_projects()?;
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].project.id, project_id);
    assert_eq!(projects[0].project.cost, cents(2750));
    assert_eq!(projects[0].to_string(), "Benchy for Ada Prusa PLA (Galaxy Black)");
    assert_eq!(t.commits()?, 1);
    Ok(())
}

#[test]
fn abandoned_work_is_absent_after_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, path) = temp_db()?;
    {
        let mut t = TestJournal::open(&path)?;
        let mut uow = t.journal.begin();
        resolve(&mut uow, &colour("Teal"))?;
        resolve(&mut uow, &manufacturer("Prusa"))?;
        assert_eq!(uow.changes().len(), 2);
    }

    let t = TestJournal::open(&path)?;
    assert_eq!(t.count(EntityKind::FilamentColour)?, 0);
    assert_eq!(t.count(EntityKind::Manufacturer)?, 0);
    assert_eq!(t.commits()?, 0);
    Ok(())
}

// ============================================================================
// Atomic commit
// ============================================================================

#[test]
fn rejected_change_set_rolls_back_entirely() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    let mut uow = t.journal.begin();
    let teal = resolve(&mut uow, &colour("Teal"))?;
    // Manufacturer 404 does not exist; the foreign key rejects the insert.
    uow.stage_insert(
        Filament {
            id: RowId::UNSAVED,
            cost_per_weight: cents(100),
            product_id: None,
            reorder_link: None,
            manufacturer_id: RowId::new(404),
            filament_colour_id: teal.id,
            filament_type_id: RowId::new(1),
        }
        .into(),
    );
    let result = uow.commit();
    assert!(matches!(
        result,
        Err(EngineError::Storage(StorageError::ConstraintViolation(_)))
    ));

    assert_eq!(t.count(EntityKind::FilamentColour)?, 17);
    assert_eq!(t.count(EntityKind::Filament)?, 2);
    assert_eq!(t.commits()?, 0);
    Ok(())
}

// ============================================================================
// Commit log
// ============================================================================

#[test]
fn commit_log_records_each_unit_of_work() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestJournal::seeded()?;

    t.journal.add_filament_colour(&colour("Teal"))?;
    t.journal.add_filament_colour(&colour("teal"))?;
    t.journal.edit_filament_colour(&gcj_core::FilamentColourCandidate::with_id(
        RowId::new(18),
        "Deep Teal",
    ))?;
    t.journal.delete_filament_colour(&colour("deep teal"))?;

    let log = t.journal.store().commit_log()?;
    // The second add found the existing row and committed nothing.
    assert_eq!(log.len(), 3);
    assert!(matches!(
        &log[0].change_set.changes[..],
        [Change::Insert(Row::FilamentColour(FilamentColour { description, .. }))] if description == "Teal"
    ));
    assert!(matches!(
        &log[1].change_set.changes[..],
        [Change::Update(Row::FilamentColour(FilamentColour { id, .. }))] if *id == RowId::new(18)
    ));
    assert!(matches!(
        &log[2].change_set.changes[..],
        [Change::Remove { kind: EntityKind::FilamentColour, id }] if *id == RowId::new(18)
    ));
    assert!(log.windows(2).all(|w| w[0].committed_at <= w[1].committed_at));
    Ok(())
}
