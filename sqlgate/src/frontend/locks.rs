//! Table locks held by a session.

use std::sync::Arc;

use super::Error;
use crate::catalog::Table;

/// Which table the session is waiting on and from which task.
/// Recorded for inspection only; there is no deadlock detection.
#[derive(Clone)]
pub struct LockWait {
    pub table: Arc<dyn Table>,
    pub task: String,
}

impl std::fmt::Debug for LockWait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockWait")
            .field("table", &self.table.name())
            .field("task", &self.task)
            .finish()
    }
}

/// Tables this session currently holds locks on, in acquisition order.
///
/// Append-only during a transaction; cleared in full at transaction end.
#[derive(Default)]
pub struct Locks {
    locks: Vec<Arc<dyn Table>>,
    wait_for: Option<LockWait>,
}

impl std::fmt::Debug for Locks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .locks
            .iter()
            .map(|table| table.name())
            .collect::<Vec<_>>();
        f.debug_struct("Locks").field("tables", &names).finish()
    }
}

impl Locks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lock on the given table. Locking a table twice without
    /// an intervening unlock is a caller bug.
    pub fn add(&mut self, table: Arc<dyn Table>) -> Result<(), Error> {
        if self.locks.iter().any(|held| Arc::ptr_eq(held, &table)) {
            return Err(Error::Internal(format!(
                "table \"{}\" is already locked by this session",
                table.name()
            )));
        }
        self.locks.push(table);

        Ok(())
    }

    /// Forget a single lock.
    pub fn unlock(&mut self, table: &Arc<dyn Table>) {
        self.locks.retain(|held| !Arc::ptr_eq(held, table));
    }

    /// Release every held lock through the table's own unlock hook and
    /// clear the set. Called only at transaction end.
    pub fn unlock_all(&mut self, session_id: u64) {
        for table in &self.locks {
            table.unlock(session_id);
        }
        self.locks.clear();
    }

    /// Snapshot of the held locks.
    pub fn tables(&self) -> Vec<Arc<dyn Table>> {
        self.locks.clone()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn set_wait_for(&mut self, wait: Option<LockWait>) {
        self.wait_for = wait;
    }

    pub fn wait_for(&self) -> Option<&LockWait> {
        self.wait_for.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frontend::test::TestTable;

    #[test]
    fn test_unlock_all_empties_the_set() {
        let mut locks = Locks::new();
        let one = TestTable::new("one");
        let two = TestTable::new("two");

        locks.add(one.clone()).unwrap();
        locks.add(two.clone()).unwrap();
        assert_eq!(locks.len(), 2);

        locks.unlock_all(1);

        assert!(locks.is_empty());
        assert_eq!(one.unlocks(), 1);
        assert_eq!(two.unlocks(), 1);
    }

    #[test]
    fn test_double_lock_fails_fast() {
        let mut locks = Locks::new();
        let table = TestTable::new("orders");

        locks.add(table.clone()).unwrap();
        let err = locks.add(table.clone()).unwrap_err();

        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_relock_after_unlock() {
        let mut locks = Locks::new();
        let table = TestTable::new("orders");

        locks.add(table.clone()).unwrap();
        let handle: Arc<dyn Table> = table.clone();
        locks.unlock(&handle);
        locks.add(table.clone()).unwrap();

        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_same_name_different_table_is_fine() {
        let mut locks = Locks::new();
        // Identity is the handle, not the name.
        locks.add(TestTable::new("t")).unwrap();
        locks.add(TestTable::new("t")).unwrap();

        assert_eq!(locks.len(), 2);
    }
}
