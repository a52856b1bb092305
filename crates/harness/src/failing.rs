use gcj_core::{EntityKind, Row, RowId};
use gcj_storage::{ChangeSet, CommitReceipt, CommitRecord, Filter, Storage, StorageError};

/// Store wrapper that can be told to reject commits, for exercising
/// store-failure paths.
pub struct FailingStorage<S> {
    inner: S,
    fail_commits: bool,
    rejected: usize,
}

impl<S: Storage> FailingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, fail_commits: false, rejected: 0 }
    }

    pub fn fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }

    /// Commits refused so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Storage> Storage for FailingStorage<S> {
    fn find_by_id(&self, kind: EntityKind, id: RowId) -> Result<Option<Row>, StorageError> {
        self.inner.find_by_id(kind, id)
    }

    fn find_one(&self, kind: EntityKind, filter: &Filter) -> Result<Option<Row>, StorageError> {
        self.inner.find_one(kind, filter)
    }

    fn find_all(&self, kind: EntityKind) -> Result<Vec<Row>, StorageError> {
        self.inner.find_all(kind)
    }

    fn commit(&mut self, changes: &ChangeSet) -> Result<CommitReceipt, StorageError> {
        if self.fail_commits {
            self.rejected += 1;
            return Err(StorageError::ConstraintViolation(format!(
                "injected failure for unit of work {}",
                changes.unit_of_work_id
            )));
        }
        self.inner.commit(changes)
    }

    fn commit_log(&self) -> Result<Vec<CommitRecord>, StorageError> {
        self.inner.commit_log()
    }
}
