//! Staging context for one resolution or composition pass.
//!
//! Staged rows are visible to reads through the same unit of work and
//! nowhere else. Nothing reaches the store until [`UnitOfWork::commit`];
//! dropping an uncommitted unit of work discards everything it staged.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use gcj_core::{EntityKind, Row, RowId, UnitOfWorkId};
use gcj_storage::{Change, ChangeSet, CommitReceipt, Filter, Storage};

use crate::error::EngineError;

type Key = (EntityKind, RowId);

/// Persisted rows sort first by id; staged inserts follow in staging order,
/// matching the ids they will be assigned.
fn visibility_order(id: RowId) -> (bool, i64) {
    if id.is_provisional() {
        (true, -id.get())
    } else {
        (false, id.get())
    }
}

pub struct UnitOfWork<'s, S: Storage> {
    id: UnitOfWorkId,
    store: &'s mut S,
    staged: BTreeMap<Key, Row>,
    removed: BTreeSet<Key>,
    changes: Vec<Change>,
    next_provisional: i64,
    committed: bool,
}

impl<'s, S: Storage> UnitOfWork<'s, S> {
    pub fn begin(store: &'s mut S) -> Self {
        let id = UnitOfWorkId::new();
        debug!(unit_of_work = %id, "began unit of work");
        Self {
            id,
            store,
            staged: BTreeMap::new(),
            removed: BTreeSet::new(),
            changes: Vec::new(),
            next_provisional: -1,
            committed: false,
        }
    }

    pub fn id(&self) -> UnitOfWorkId {
        self.id
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn shadows(&self, key: &Key) -> bool {
        self.staged.contains_key(key) || self.removed.contains(key)
    }

    fn staged_of(&self, kind: EntityKind) -> impl Iterator<Item = &Row> {
        self.staged
            .range((kind, RowId::new(i64::MIN))..=(kind, RowId::new(i64::MAX)))
            .map(|(_, row)| row)
    }

    pub fn find_by_id(&self, kind: EntityKind, id: RowId) -> Result<Option<Row>, EngineError> {
        let key = (kind, id);
        if self.removed.contains(&key) {
            return Ok(None);
        }
        if let Some(row) = self.staged.get(&key) {
            return Ok(Some(row.clone()));
        }
        if !id.is_persisted() {
            return Ok(None);
        }
        Ok(self.store.find_by_id(kind, id)?)
    }

    /// First visible row of `kind` matching `filter`, staged rows included.
    pub fn find_one(&self, kind: EntityKind, filter: &Filter) -> Result<Option<Row>, EngineError> {
        let stored = match self.store.find_one(kind, filter)? {
            Some(row) if self.shadows(&(kind, row.id())) => self
                .store
                .find_all(kind)?
                .into_iter()
                .find(|row| !self.shadows(&(kind, row.id())) && filter.matches(row)),
            found => found,
        };
        let staged = self
            .staged_of(kind)
            .filter(|row| filter.matches(row))
            .min_by_key(|row| visibility_order(row.id()))
            .cloned();

        Ok(match (stored, staged) {
            (Some(a), Some(b)) => {
                if visibility_order(a.id()) <= visibility_order(b.id()) {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (a, b) => a.or(b),
        })
    }

    /// Every visible row of `kind`, persisted rows by id and then staged inserts.
    pub fn find_all(&self, kind: EntityKind) -> Result<Vec<Row>, EngineError> {
        let mut rows: Vec<Row> = self
            .store
            .find_all(kind)?
            .into_iter()
            .filter(|row| !self.shadows(&(kind, row.id())))
            .collect();
        rows.extend(self.staged_of(kind).cloned());
        rows.sort_by_key(|row| visibility_order(row.id()));
        Ok(rows)
    }

    /// Stages `row` for insertion under a fresh provisional id and returns it.
    pub fn stage_insert(&mut self, mut row: Row) -> Row {
        let id = RowId::new(self.next_provisional);
        self.next_provisional -= 1;
        row.set_id(id);
        debug!(unit_of_work = %self.id, kind = %row.kind(), id = ?id, "staged insert");
        self.staged.insert((row.kind(), id), row.clone());
        self.changes.push(Change::Insert(row.clone()));
        row
    }

    pub fn stage_update(&mut self, row: Row) -> Result<(), EngineError> {
        let key = (row.kind(), row.id());
        if self.find_by_id(key.0, key.1)?.is_none() {
            return Err(EngineError::not_found(key.0, key.1));
        }

        if key.1.is_provisional() {
            // Still an insert as far as the store is concerned.
            for change in &mut self.changes {
                if matches!(change, Change::Insert(staged) if (staged.kind(), staged.id()) == key) {
                    *change = Change::Insert(row.clone());
                }
            }
        } else {
            self.changes.retain(
                |change| !matches!(change, Change::Update(staged) if (staged.kind(), staged.id()) == key),
            );
            self.changes.push(Change::Update(row.clone()));
        }
        debug!(unit_of_work = %self.id, kind = %key.0, id = ?key.1, "staged update");
        self.staged.insert(key, row);
        Ok(())
    }

    pub fn stage_remove(&mut self, kind: EntityKind, id: RowId) -> Result<(), EngineError> {
        let key = (kind, id);
        if self.find_by_id(kind, id)?.is_none() {
            return Err(EngineError::not_found(kind, id));
        }

        self.staged.remove(&key);
        self.changes.retain(|change| match change {
            Change::Insert(row) | Change::Update(row) => (row.kind(), row.id()) != key,
            Change::Remove { .. } => true,
        });
        if id.is_persisted() {
            self.removed.insert(key);
            self.changes.push(Change::Remove { kind, id });
        }
        debug!(unit_of_work = %self.id, kind = %kind, id = ?id, "staged remove");
        Ok(())
    }

    /// Durably applies everything staged, all or nothing.
    pub fn commit(mut self) -> Result<CommitReceipt, EngineError> {
        self.committed = true;
        if self.changes.is_empty() {
            debug!(unit_of_work = %self.id, "nothing staged, skipping commit");
            return Ok(CommitReceipt { unit_of_work_id: self.id, assigned: BTreeMap::new() });
        }

        let change_set = ChangeSet {
            unit_of_work_id: self.id,
            changes: std::mem::take(&mut self.changes),
        };
        let receipt = self.store.commit(&change_set)?;
        info!(
            unit_of_work = %self.id,
            changes = change_set.changes.len(),
            inserted = receipt.assigned.len(),
            "unit of work committed"
        );
        Ok(receipt)
    }
}

impl<S: Storage> Drop for UnitOfWork<'_, S> {
    fn drop(&mut self) {
        if !self.committed && !self.changes.is_empty() {
            debug!(
                unit_of_work = %self.id,
                discarded = self.changes.len(),
                "unit of work abandoned"
            );
        }
    }
}
