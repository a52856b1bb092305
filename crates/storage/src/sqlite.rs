use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

use gcj_core::{
    Customer, EntityKind, Filament, FilamentColour, FilamentType, Manufacturer, ModelDesign,
    PrintingProject, Row, RowId, UnitOfWorkId, fold_key,
};

use crate::error::StorageError;
use crate::schema::{SEED_COLOURS, SEED_FILAMENTS, SEED_MANUFACTURERS, SEED_TYPES};
use crate::traits::{Change, ChangeSet, CommitReceipt, CommitRecord, Filter, Storage};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Installs the stock colours, types, manufacturers and filaments.
    ///
    /// Only an empty store is seeded; returns whether anything was written.
    pub fn seed_reference_data(&mut self) -> Result<bool, StorageError> {
        let tx = self.conn.transaction()?;
        let existing: i64 = tx.query_row(
            "SELECT (SELECT COUNT(*) FROM manufacturers) + (SELECT COUNT(*) FROM filament_colours)
                  + (SELECT COUNT(*) FROM filament_types) + (SELECT COUNT(*) FROM filaments)",
            [],
            |row| row.get(0),
        )?;
        if existing > 0 {
            debug!(existing, "reference data already present, not seeding");
            return Ok(false);
        }

        for (id, description) in SEED_COLOURS {
            tx.execute(
                "INSERT INTO filament_colours (id, description, folded_key) VALUES (?1, ?2, ?3)",
                params![id, description, fold_key(description)],
            )?;
        }
        for (id, description) in SEED_TYPES {
            tx.execute(
                "INSERT INTO filament_types (id, description, folded_key) VALUES (?1, ?2, ?3)",
                params![id, description, fold_key(description)],
            )?;
        }
        for (id, name) in SEED_MANUFACTURERS {
            tx.execute(
                "INSERT INTO manufacturers (id, name, folded_key) VALUES (?1, ?2, ?3)",
                params![id, name, fold_key(name)],
            )?;
        }
        for (id, manufacturer, colour, filament_type, cost) in SEED_FILAMENTS {
            tx.execute(
                "INSERT INTO filaments (id, cost_per_weight, manufacturer_id, filament_colour_id, filament_type_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, cost, manufacturer, colour, filament_type],
            )?;
        }
        tx.commit()?;

        info!(
            colours = SEED_COLOURS.len(),
            types = SEED_TYPES.len(),
            manufacturers = SEED_MANUFACTURERS.len(),
            filaments = SEED_FILAMENTS.len(),
            "seeded reference data"
        );
        Ok(true)
    }
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Customer => "customers",
        EntityKind::Manufacturer => "manufacturers",
        EntityKind::FilamentColour => "filament_colours",
        EntityKind::FilamentType => "filament_types",
        EntityKind::Filament => "filaments",
        EntityKind::ModelDesign => "model_designs",
        EntityKind::PrintingProject => "printing_projects",
    }
}

fn columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Customer | EntityKind::Manufacturer => "id, name",
        EntityKind::FilamentColour | EntityKind::FilamentType => "id, description",
        EntityKind::ModelDesign => "id, description, length, summary, url",
        EntityKind::Filament => {
            "id, cost_per_weight, product_id, reorder_link, manufacturer_id, filament_colour_id, filament_type_id"
        }
        EntityKind::PrintingProject => {
            "id, cost, submitted, completed, customer_id, model_design_id"
        }
    }
}

/// WHERE clause selecting rows of `kind` that reference a `target` row bound to ?1.
fn reference_clause(kind: EntityKind, target: EntityKind) -> Option<&'static str> {
    match (kind, target) {
        (EntityKind::Filament, EntityKind::Manufacturer) => Some("WHERE manufacturer_id = ?1"),
        (EntityKind::Filament, EntityKind::FilamentColour) => {
            Some("WHERE filament_colour_id = ?1")
        }
        (EntityKind::Filament, EntityKind::FilamentType) => Some("WHERE filament_type_id = ?1"),
        (EntityKind::PrintingProject, EntityKind::Customer) => Some("WHERE customer_id = ?1"),
        (EntityKind::PrintingProject, EntityKind::ModelDesign) => {
            Some("WHERE model_design_id = ?1")
        }
        (EntityKind::PrintingProject, EntityKind::Filament) => Some(
            "WHERE id IN (SELECT project_id FROM printing_project_filaments WHERE filament_id = ?1)",
        ),
        _ => None,
    }
}

fn decimal_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn id_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<RowId> {
    row.get::<_, i64>(idx).map(RowId::new)
}

fn read_row(kind: EntityKind, row: &rusqlite::Row) -> rusqlite::Result<Row> {
    let id = id_at(row, 0)?;
    Ok(match kind {
        EntityKind::Customer => Customer { id, name: row.get(1)? }.into(),
        EntityKind::Manufacturer => Manufacturer { id, name: row.get(1)? }.into(),
        EntityKind::FilamentColour => FilamentColour { id, description: row.get(1)? }.into(),
        EntityKind::FilamentType => FilamentType { id, description: row.get(1)? }.into(),
        EntityKind::ModelDesign => ModelDesign {
            id,
            description: row.get(1)?,
            length: decimal_at(row, 2)?,
            summary: row.get(3)?,
            url: row.get(4)?,
        }
        .into(),
        EntityKind::Filament => Filament {
            id,
            cost_per_weight: decimal_at(row, 1)?,
            product_id: row.get(2)?,
            reorder_link: row.get(3)?,
            manufacturer_id: id_at(row, 4)?,
            filament_colour_id: id_at(row, 5)?,
            filament_type_id: id_at(row, 6)?,
        }
        .into(),
        // Filament links are loaded separately from the join table.
        EntityKind::PrintingProject => PrintingProject {
            id,
            cost: decimal_at(row, 1)?,
            submitted: row.get(2)?,
            completed: row.get(3)?,
            customer_id: id_at(row, 4)?,
            model_design_id: id_at(row, 5)?,
            filament_ids: Vec::new(),
        }
        .into(),
    })
}

fn load_filament_links(conn: &Connection, row: &mut Row) -> Result<(), StorageError> {
    if let Row::PrintingProject(project) = row {
        let mut stmt = conn.prepare_cached(
            "SELECT filament_id FROM printing_project_filaments WHERE project_id = ?1 ORDER BY position",
        )?;
        project.filament_ids = stmt
            .query_map(params![project.id.get()], |r| id_at(r, 0))?
            .collect::<Result<Vec<_>, _>>()?;
    }
    Ok(())
}

fn select_rows(
    conn: &Connection,
    kind: EntityKind,
    clause: &str,
    limit: Option<usize>,
    args: impl rusqlite::Params,
) -> Result<Vec<Row>, StorageError> {
    let mut sql = format!("SELECT {} FROM {} {clause} ORDER BY id", columns(kind), table(kind));
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query_map(args, |r| read_row(kind, r))?
        .collect::<Result<Vec<_>, _>>()?;
    for row in &mut rows {
        load_filament_links(conn, row)?;
    }
    Ok(rows)
}

fn link_filaments(tx: &Transaction, project: &PrintingProject, id: RowId) -> Result<(), StorageError> {
    tx.execute(
        "DELETE FROM printing_project_filaments WHERE project_id = ?1",
        params![id.get()],
    )?;
    for (position, filament_id) in project.filament_ids.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO printing_project_filaments (project_id, filament_id, position)
             VALUES (?1, ?2, ?3)",
            params![id.get(), filament_id.get(), position as i64],
        )?;
    }
    Ok(())
}

fn insert_row(tx: &Transaction, row: &Row) -> Result<RowId, StorageError> {
    match row {
        Row::Customer(c) => tx.execute(
            "INSERT INTO customers (name, folded_key) VALUES (?1, ?2)",
            params![c.name, fold_key(&c.name)],
        )?,
        Row::Manufacturer(m) => tx.execute(
            "INSERT INTO manufacturers (name, folded_key) VALUES (?1, ?2)",
            params![m.name, fold_key(&m.name)],
        )?,
        Row::FilamentColour(c) => tx.execute(
            "INSERT INTO filament_colours (description, folded_key) VALUES (?1, ?2)",
            params![c.description, fold_key(&c.description)],
        )?,
        Row::FilamentType(t) => tx.execute(
            "INSERT INTO filament_types (description, folded_key) VALUES (?1, ?2)",
            params![t.description, fold_key(&t.description)],
        )?,
        Row::ModelDesign(d) => tx.execute(
            "INSERT INTO model_designs (description, folded_key, length, summary, url) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![d.description, fold_key(&d.description), d.length.to_string(), d.summary, d.url],
        )?,
        Row::Filament(f) => tx.execute(
            "INSERT INTO filaments (cost_per_weight, product_id, reorder_link, manufacturer_id, filament_colour_id, filament_type_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                f.cost_per_weight.to_string(),
                f.product_id,
                f.reorder_link,
                f.manufacturer_id.get(),
                f.filament_colour_id.get(),
                f.filament_type_id.get(),
            ],
        )?,
        Row::PrintingProject(p) => tx.execute(
            "INSERT INTO printing_projects (cost, submitted, completed, customer_id, model_design_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                p.cost.to_string(),
                p.submitted,
                p.completed,
                p.customer_id.get(),
                p.model_design_id.get(),
            ],
        )?,
    };
    let id = RowId::new(tx.last_insert_rowid());
    if let Row::PrintingProject(project) = row {
        link_filaments(tx, project, id)?;
    }
    Ok(id)
}

fn update_row(tx: &Transaction, row: &Row) -> Result<(), StorageError> {
    let id = row.id().get();
    let changed = match row {
        Row::Customer(c) => tx.execute(
            "UPDATE customers SET name = ?1, folded_key = ?2 WHERE id = ?3",
            params![c.name, fold_key(&c.name), id],
        )?,
        Row::Manufacturer(m) => tx.execute(
            "UPDATE manufacturers SET name = ?1, folded_key = ?2 WHERE id = ?3",
            params![m.name, fold_key(&m.name), id],
        )?,
        Row::FilamentColour(c) => tx.execute(
            "UPDATE filament_colours SET description = ?1, folded_key = ?2 WHERE id = ?3",
            params![c.description, fold_key(&c.description), id],
        )?,
        Row::FilamentType(t) => tx.execute(
            "UPDATE filament_types SET description = ?1, folded_key = ?2 WHERE id = ?3",
            params![t.description, fold_key(&t.description), id],
        )?,
        Row::ModelDesign(d) => tx.execute(
            "UPDATE model_designs SET description = ?1, folded_key = ?2, length = ?3, summary = ?4, url = ?5 WHERE id = ?6",
            params![d.description, fold_key(&d.description), d.length.to_string(), d.summary, d.url, id],
        )?,
        Row::Filament(f) => tx.execute(
            "UPDATE filaments SET cost_per_weight = ?1, product_id = ?2, reorder_link = ?3, manufacturer_id = ?4, filament_colour_id = ?5, filament_type_id = ?6 WHERE id = ?7",
            params![
                f.cost_per_weight.to_string(),
                f.product_id,
                f.reorder_link,
                f.manufacturer_id.get(),
                f.filament_colour_id.get(),
                f.filament_type_id.get(),
                id,
            ],
        )?,
        Row::PrintingProject(p) => tx.execute(
            "UPDATE printing_projects SET cost = ?1, submitted = ?2, completed = ?3, customer_id = ?4, model_design_id = ?5 WHERE id = ?6",
            params![
                p.cost.to_string(),
                p.submitted,
                p.completed,
                p.customer_id.get(),
                p.model_design_id.get(),
                id,
            ],
        )?,
    };
    if changed == 0 {
        return Err(StorageError::NotFound { kind: row.kind(), id: row.id() });
    }
    if let Row::PrintingProject(project) = row {
        link_filaments(tx, project, row.id())?;
    }
    Ok(())
}

fn remove_row(tx: &Transaction, kind: EntityKind, id: RowId) -> Result<(), StorageError> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", table(kind));
    if tx.execute(&sql, params![id.get()])? == 0 {
        return Err(StorageError::NotFound { kind, id });
    }
    Ok(())
}

fn apply_change(
    tx: &Transaction,
    change: &Change,
    assigned: &mut BTreeMap<RowId, RowId>,
) -> Result<(), StorageError> {
    match change {
        Change::Insert(staged) => {
            if staged.id().is_persisted() {
                return Err(StorageError::ConstraintViolation(format!(
                    "insert of {} that already has id {}",
                    staged.kind(),
                    staged.id()
                )));
            }
            let mut row = staged.clone();
            remap_provisional(&mut row, assigned)?;
            let id = insert_row(tx, &row)?;
            if staged.id().is_provisional() {
                assigned.insert(staged.id(), id);
            }
        }
        Change::Update(staged) => {
            if !staged.id().is_persisted() {
                return Err(StorageError::ConstraintViolation(format!(
                    "update of {} without a stored id",
                    staged.kind()
                )));
            }
            let mut row = staged.clone();
            remap_provisional(&mut row, assigned)?;
            update_row(tx, &row)?;
        }
        Change::Remove { kind, id } => {
            if !id.is_persisted() {
                return Err(StorageError::ConstraintViolation(format!(
                    "remove of {kind} without a stored id"
                )));
            }
            remove_row(tx, *kind, *id)?;
        }
    }
    Ok(())
}

fn remap_provisional(row: &mut Row, assigned: &BTreeMap<RowId, RowId>) -> Result<(), StorageError> {
    row.remap_references(|kind, id| {
        if id.is_persisted() {
            Ok(id)
        } else {
            assigned.get(&id).copied().ok_or_else(|| {
                StorageError::ConstraintViolation(format!("unresolved {kind} reference {id:?}"))
            })
        }
    })
}

fn constraint_error(err: StorageError, change: &Change) -> StorageError {
    match err {
        StorageError::Sqlite(rusqlite::Error::SqliteFailure(failure, message))
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let verb = match change {
                Change::Insert(_) => "insert",
                Change::Update(_) => "update",
                Change::Remove { .. } => "remove",
            };
            StorageError::ConstraintViolation(format!(
                "{verb} {}: {}",
                change.kind(),
                message.unwrap_or_else(|| failure.to_string())
            ))
        }
        other => other,
    }
}

fn read_commit(row: &rusqlite::Row) -> Result<CommitRecord, StorageError> {
    let uow_bytes: Vec<u8> = row.get(0)?;
    let committed_at: DateTime<Utc> = row.get(1)?;
    let payload: Vec<u8> = row.get(2)?;
    let checksum: Vec<u8> = row.get(3)?;

    let unit_of_work_id = UnitOfWorkId::from_bytes(to_array::<16>(uow_bytes, "unit_of_work_id")?);
    let checksum = to_array::<32>(checksum, "checksum")?;
    if *blake3::hash(&payload).as_bytes() != checksum {
        return Err(StorageError::ChecksumMismatch(unit_of_work_id));
    }
    let change_set = ChangeSet::from_msgpack(&payload)?;
    Ok(CommitRecord { unit_of_work_id, committed_at, change_set })
}

impl Storage for SqliteStorage {
    fn find_by_id(&self, kind: EntityKind, id: RowId) -> Result<Option<Row>, StorageError> {
        Ok(select_rows(&self.conn, kind, "WHERE id = ?1", Some(1), params![id.get()])?
            .into_iter()
            .next())
    }

    fn find_one(&self, kind: EntityKind, filter: &Filter) -> Result<Option<Row>, StorageError> {
        let rows = match filter {
            Filter::NaturalKey(folded) => {
                if !kind.is_lookup() {
                    return Ok(None);
                }
                select_rows(&self.conn, kind, "WHERE folded_key = ?1", Some(1), params![folded])?
            }
            Filter::References { target, id } => match reference_clause(kind, *target) {
                Some(clause) => select_rows(&self.conn, kind, clause, Some(1), params![id.get()])?,
                None => return Ok(None),
            },
        };
        Ok(rows.into_iter().next())
    }

    fn find_all(&self, kind: EntityKind) -> Result<Vec<Row>, StorageError> {
        select_rows(&self.conn, kind, "", None, [])
    }

    fn commit(&mut self, changes: &ChangeSet) -> Result<CommitReceipt, StorageError> {
        let tx = self.conn.transaction()?;
        let mut assigned = BTreeMap::new();

        for change in &changes.changes {
            apply_change(&tx, change, &mut assigned).map_err(|e| constraint_error(e, change))?;
        }

        let payload = changes.to_msgpack()?;
        let checksum = blake3::hash(&payload);
        tx.execute(
            "INSERT INTO commit_log (unit_of_work_id, committed_at, change_count, payload, checksum) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                changes.unit_of_work_id.as_bytes().as_slice(),
                Utc::now(),
                changes.changes.len() as i64,
                payload,
                checksum.as_bytes().as_slice(),
            ],
        )?;
        tx.commit()?;

        debug!(
            unit_of_work = %changes.unit_of_work_id,
            changes = changes.changes.len(),
            inserted = assigned.len(),
            "committed change set"
        );
        Ok(CommitReceipt { unit_of_work_id: changes.unit_of_work_id, assigned })
    }

    fn commit_log(&self) -> Result<Vec<CommitRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT unit_of_work_id, committed_at, payload, checksum FROM commit_log ORDER BY rowid",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(read_commit(row)?);
        }
        Ok(records)
    }
}
