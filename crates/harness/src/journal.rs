use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tempfile::TempDir;

use gcj_core::{
    CustomerCandidate, EntityKind, FilamentCandidate, FilamentColourCandidate,
    FilamentTypeCandidate, ManufacturerCandidate, ModelDesignCandidate, PrintingProjectCandidate,
};
use gcj_engine::Journal;
use gcj_storage::{SqliteStorage, Storage, StorageError};

use crate::failing::FailingStorage;

pub struct TestJournal {
    pub journal: Journal<FailingStorage<SqliteStorage>>,
}

impl TestJournal {
    /// An empty in-memory journal with no reference data.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::wrap(SqliteStorage::open_in_memory()?))
    }

    /// An in-memory journal holding the stock colours, types, manufacturers
    /// and filaments.
    pub fn seeded() -> Result<Self, StorageError> {
        let mut storage = SqliteStorage::open_in_memory()?;
        storage.seed_reference_data()?;
        Ok(Self::wrap(storage))
    }

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self::wrap(SqliteStorage::open(path)?))
    }

    fn wrap(storage: SqliteStorage) -> Self {
        Self { journal: Journal::new(FailingStorage::new(storage)) }
    }

    /// Makes every following store commit fail until switched off again.
    pub fn fail_commits(&mut self, fail: bool) {
        self.journal.store_mut().fail_commits(fail);
    }

    /// Durable row count for `kind`.
    pub fn count(&self, kind: EntityKind) -> Result<usize, StorageError> {
        Ok(self.journal.store().find_all(kind)?.len())
    }

    /// Number of committed units of work.
    pub fn commits(&self) -> Result<usize, StorageError> {
        Ok(self.journal.store().commit_log()?.len())
    }
}

/// A database path inside a fresh temporary directory, removed with the guard.
pub fn temp_db() -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("gCodeJournal.db");
    Ok((dir, path))
}

// ============================================================================
// Candidate builders
// ============================================================================

/// Cost from a whole number of cents.
pub fn cents(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}

pub fn customer(name: &str) -> CustomerCandidate {
    CustomerCandidate::new(name)
}

pub fn manufacturer(name: &str) -> ManufacturerCandidate {
    ManufacturerCandidate::new(name)
}

pub fn colour(description: &str) -> FilamentColourCandidate {
    FilamentColourCandidate::new(description)
}

pub fn filament_type(description: &str) -> FilamentTypeCandidate {
    FilamentTypeCandidate::new(description)
}

pub fn design(description: &str) -> ModelDesignCandidate {
    ModelDesignCandidate::new(description, Decimal::new(120, 0), "Test print", None)
}

pub fn filament(cost: Decimal, maker: &str, colour_name: &str, kind: &str) -> FilamentCandidate {
    FilamentCandidate::new(cost, manufacturer(maker), colour(colour_name), filament_type(kind))
}

pub fn project(
    cost: Decimal,
    customer_name: &str,
    design_name: &str,
    filaments: Vec<FilamentCandidate>,
) -> PrintingProjectCandidate {
    PrintingProjectCandidate::new(cost, customer(customer_name), design(design_name), filaments)
}
