use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gcj_core::{EntityKind, Row, RowId, UnitOfWorkId, fold_key};

use crate::error::StorageError;

/// Row predicates the store can answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Case-insensitive equality on a lookup row's natural key.
    NaturalKey(String),
    /// Rows holding a reference to `target` row `id`.
    References { target: EntityKind, id: RowId },
}

impl Filter {
    pub fn natural_key(key: &str) -> Self {
        Self::NaturalKey(fold_key(key))
    }

    pub fn references(target: EntityKind, id: RowId) -> Self {
        Self::References { target, id }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::NaturalKey(folded) => row.natural_key().is_some_and(|key| fold_key(key) == *folded),
            Self::References { target, id } => row
                .references()
                .iter()
                .any(|(kind, ref_id)| kind == target && ref_id == id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Row with an unsaved or provisional id.
    Insert(Row),
    Update(Row),
    Remove { kind: EntityKind, id: RowId },
}

impl Change {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Insert(row) | Self::Update(row) => row.kind(),
            Self::Remove { kind, .. } => *kind,
        }
    }
}

/// Everything one unit of work staged, in staging order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub unit_of_work_id: UnitOfWorkId,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn to_msgpack(&self) -> Result<Vec<u8>, StorageError> {
        rmp_serde::to_vec(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, StorageError> {
        rmp_serde::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub unit_of_work_id: UnitOfWorkId,
    /// Provisional id -> store-assigned id, for every insert in the change set.
    pub assigned: BTreeMap<RowId, RowId>,
}

impl CommitReceipt {
    /// Maps a provisional id to its durable id; other ids pass through.
    pub fn resolve(&self, id: RowId) -> RowId {
        self.assigned.get(&id).copied().unwrap_or(id)
    }
}

#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub unit_of_work_id: UnitOfWorkId,
    pub committed_at: DateTime<Utc>,
    pub change_set: ChangeSet,
}

pub trait Storage {
    fn find_by_id(&self, kind: EntityKind, id: RowId) -> Result<Option<Row>, StorageError>;

    /// First row of `kind` (lowest id) matching `filter`.
    fn find_one(&self, kind: EntityKind, filter: &Filter) -> Result<Option<Row>, StorageError>;

    /// All rows of `kind`, ordered by id.
    fn find_all(&self, kind: EntityKind) -> Result<Vec<Row>, StorageError>;

    /// Durably applies every change in `changes`, or none of them.
    fn commit(&mut self, changes: &ChangeSet) -> Result<CommitReceipt, StorageError>;

    fn commit_log(&self) -> Result<Vec<CommitRecord>, StorageError>;
}
