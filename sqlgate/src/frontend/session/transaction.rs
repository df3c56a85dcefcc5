//! Transaction boundaries.

use super::Session;
use crate::frontend::{Error, Savepoint};

impl Session {
    /// Begin an explicit transaction: auto-commit is suspended until the
    /// transaction ends.
    pub fn begin(&mut self) {
        self.auto_commit_at_transaction_end = true;
        self.auto_commit = false;
    }

    /// Disable or re-enable commit and rollback. Returns the old flag.
    pub fn set_commit_or_rollback_disabled(&mut self, disabled: bool) -> bool {
        let old = self.commit_or_rollback_disabled;
        self.commit_or_rollback_disabled = disabled;
        old
    }

    pub fn transaction_name(&self) -> Option<&str> {
        self.transaction_name.as_deref()
    }

    pub fn set_transaction_name(&mut self, name: &str) {
        self.transaction_name = Some(name.to_owned());
    }

    fn check_commit_rollback(&self) -> Result<(), Error> {
        if self.commit_or_rollback_disabled && !self.locks.is_empty() {
            return Err(Error::CommitRollbackNotAllowed);
        }
        Ok(())
    }

    /// Commit the current transaction.
    ///
    /// If the statement was not a data definition statement, temporary
    /// tables marked drop- or truncate-on-commit are cleaned up as well.
    ///
    /// The cross-shard part of the commit is best-effort, not atomic:
    /// shard connections are committed sequentially in the order they
    /// were first acquired, and once any shard has committed, a later
    /// shard's failure leaves the transaction partially applied. On the
    /// first failure the remaining shards are rolled back and the
    /// failure is returned; locks and savepoints are released either
    /// way, so the session stays usable.
    pub async fn commit(&mut self, ddl: bool) -> Result<(), Error> {
        self.check_commit_rollback()?;
        self.transaction_name = None;
        self.transaction_start = None;
        if self.contains_uncommitted() {
            // Commit local bookkeeping even if rollback is not possible
            // (create/drop table and so on).
            self.catalog.commit_local(self.id)?;
            self.set_all_committed();
        }
        if !self.temporary_lobs.is_empty() {
            for value in &self.temporary_lobs {
                if !value.linked() {
                    value.close();
                }
            }
            self.temporary_lobs.clear();
        }
        if !ddl {
            // Keep temp tables across a create/drop statement.
            self.clean_temp_tables(false)?;
            self.restore_auto_commit();
        }
        self.end_transaction();

        self.shards.commit_all().await?;

        Ok(())
    }

    /// Fully roll back the current transaction.
    ///
    /// Every shard connection is rolled back, all of them attempted
    /// regardless of earlier failures; the first failure is surfaced
    /// after the rest have been tried.
    pub async fn rollback(&mut self) -> Result<(), Error> {
        self.check_commit_rollback()?;
        self.transaction_name = None;
        if !self.locks.is_empty() {
            // Local metadata changes survive a rollback of data changes.
            self.catalog.commit_local(self.id)?;
            self.set_all_committed();
        }
        self.clean_temp_tables(false)?;
        self.restore_auto_commit();
        self.end_transaction();

        self.shards.rollback_all().await?;

        Ok(())
    }

    fn restore_auto_commit(&mut self) {
        if self.auto_commit_at_transaction_end {
            self.auto_commit = true;
            self.auto_commit_at_transaction_end = false;
        }
    }

    fn end_transaction(&mut self) {
        if self
            .unlink_lobs
            .as_ref()
            .map(|unlink| !unlink.is_empty())
            .unwrap_or(false)
        {
            // Lobs can only be unlinked once the commit record is
            // written.
            self.unlink_lobs = None;
        }
        self.unlock_all();
    }

    fn unlock_all(&mut self) {
        self.locks.unlock_all(self.id);
        // Savepoints lose meaning once the locks are gone.
        self.savepoints = None;
    }

    pub(super) fn clean_temp_tables(&mut self, close_session: bool) -> Result<(), Error> {
        let dropped = self.temp.clean_tables(&self.catalog, self.id, close_session)?;
        self.modification_id += dropped as u64;
        Ok(())
    }

    /// Create a savepoint at the current position.
    pub fn set_savepoint(&mut self) -> Savepoint {
        let log_index = self.next_log_index();
        Savepoint {
            log_index,
            transaction_savepoint: log_index,
        }
    }

    /// Create a named savepoint linked to the current position.
    pub fn add_savepoint(&mut self, name: &str) -> Result<Savepoint, Error> {
        let exists = self
            .savepoints
            .as_ref()
            .map(|savepoints| savepoints.contains(name))
            .unwrap_or(false);
        if exists {
            return Err(Error::SavepointAlreadyExists(name.to_owned()));
        }

        let log_index = self.next_log_index();
        let savepoint = Savepoint {
            log_index,
            transaction_savepoint: log_index,
        };
        self.savepoints
            .get_or_insert_with(|| self.catalog.new_name_map())
            .insert(name, savepoint);

        Ok(savepoint)
    }

    pub fn savepoint_names(&self) -> Vec<String> {
        self.savepoints
            .as_ref()
            .map(|savepoints| savepoints.names())
            .unwrap_or_default()
    }

    /// Roll back to the named savepoint.
    pub fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), Error> {
        self.check_commit_rollback()?;
        let savepoint = self
            .savepoints
            .as_ref()
            .and_then(|savepoints| savepoints.get(name).copied())
            .ok_or_else(|| Error::InvalidSavepoint(name.to_owned()))?;
        self.rollback_to(&savepoint, false);

        Ok(())
    }

    /// Discard every savepoint recorded after the given one.
    ///
    /// Only local bookkeeping is trimmed: shard-side data changes made
    /// after the savepoint are not undone.
    pub fn rollback_to(&mut self, savepoint: &Savepoint, _trim_to_size: bool) {
        let index = savepoint.log_index;
        if let Some(savepoints) = self.savepoints.as_mut() {
            savepoints.retain(|_, kept| kept.log_index <= index);
        }
    }

    fn next_log_index(&mut self) -> u64 {
        self.log_index += 1;
        self.log_index
    }

    /// Prepare the current transaction for later resolution. This
    /// session model does not support two-phase commit.
    pub fn prepare_commit(&mut self, _transaction_name: &str) -> Result<(), Error> {
        Err(Error::Unsupported("two-phase commit"))
    }

    /// Commit or roll back the transaction with the given name. Only the
    /// current transaction can match; prepared transactions do not exist.
    pub async fn set_prepared_transaction(
        &mut self,
        transaction_name: &str,
        commit: bool,
    ) -> Result<(), Error> {
        if self.transaction_name.as_deref() == Some(transaction_name) {
            if commit {
                self.commit(false).await
            } else {
                self.rollback().await
            }
        } else {
            Ok(())
        }
    }
}
