//! Session state and accessors.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::{IsolationLevel, LogPosition, Session};
use crate::catalog::{Constraint, Index, Table, Value};
use crate::frontend::{Error, LockWait, Procedure, TemporaryResult};

impl Session {
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn set_auto_commit(&mut self, auto_commit: bool) {
        self.auto_commit = auto_commit;
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn allow_literals(&self) -> bool {
        self.allow_literals
    }

    pub fn set_allow_literals(&mut self, allow: bool) {
        self.allow_literals = allow;
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn set_isolation(&mut self, isolation: IsolationLevel) {
        self.isolation = isolation;
    }

    pub fn current_schema(&self) -> &str {
        &self.current_schema
    }

    pub fn set_current_schema(&mut self, name: &str) {
        self.modification_id += 1;
        self.current_schema = name.to_owned();
    }

    pub fn schema_search_path(&self) -> Option<&[String]> {
        self.schema_search_path.as_deref()
    }

    pub fn set_schema_search_path(&mut self, schemas: Vec<String>) {
        self.modification_id += 1;
        self.schema_search_path = Some(schemas);
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Set the query timeout, clamped to the configured maximum.
    pub fn set_query_timeout(&mut self, timeout: Duration) {
        let max = Duration::from_millis(self.catalog.general().max_query_timeout);
        let timeout = if !max.is_zero() && (timeout > max || timeout.is_zero()) {
            max
        } else {
            timeout
        };
        self.query_timeout = timeout;
        // An old deadline would otherwise still apply.
        self.cancel.disarm();
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub fn set_lock_timeout(&mut self, timeout: Duration) {
        self.lock_timeout = timeout;
    }

    /// Slow this session's statements down by the given amount at every
    /// cooperative check point.
    pub fn set_throttle(&mut self, throttle: Duration) {
        self.cancel.set_throttle(throttle);
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Set a session variable. Assigning NULL removes it. The previous
    /// value is closed in case it is a lob.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.modification_id += 1;
        let variables = self
            .variables
            .get_or_insert_with(|| self.catalog.new_name_map());
        let old = if value.is_null() {
            variables.remove(name)
        } else {
            variables.insert(name, value)
        };
        if let Some(old) = old {
            old.close();
        }
    }

    /// Value of the given variable; NULL if it is not set.
    pub fn variable(&self, name: &str) -> Value {
        self.variables
            .as_ref()
            .and_then(|variables| variables.get(name).cloned())
            .unwrap_or(Value::Null)
    }

    /// Names of the variables set on this session, in insertion order.
    pub fn variable_names(&self) -> Vec<String> {
        self.variables
            .as_ref()
            .map(|variables| variables.names())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Procedures
    // ------------------------------------------------------------------

    pub fn add_procedure(&mut self, procedure: Procedure) {
        let name = procedure.name().to_owned();
        let procedures = self
            .procedures
            .get_or_insert_with(|| self.catalog.new_name_map());
        procedures.insert(&name, procedure);
    }

    pub fn remove_procedure(&mut self, name: &str) {
        if let Some(procedures) = self.procedures.as_mut() {
            procedures.remove(name);
        }
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.as_ref()?.get(name)
    }

    // ------------------------------------------------------------------
    // Temporary objects
    // ------------------------------------------------------------------

    pub fn find_local_temp_table(&self, name: &str) -> Option<Arc<dyn Table>> {
        self.temp.find_table(name)
    }

    pub fn local_temp_tables(&self) -> Vec<Arc<dyn Table>> {
        self.temp.tables()
    }

    pub fn add_local_temp_table(&mut self, table: Arc<dyn Table>) -> Result<(), Error> {
        self.temp.add_table(&self.catalog, table)?;
        self.modification_id += 1;
        Ok(())
    }

    pub fn remove_local_temp_table(&mut self, table: &Arc<dyn Table>) {
        self.modification_id += 1;
        self.temp.remove_table(&self.catalog, self.id, table);
    }

    pub fn find_local_temp_index(&self, name: &str) -> Option<Arc<dyn Index>> {
        self.temp.find_index(name)
    }

    pub fn add_local_temp_index(&mut self, index: Arc<dyn Index>) -> Result<(), Error> {
        self.temp.add_index(&self.catalog, index)
    }

    pub fn remove_local_temp_index(&mut self, index: &Arc<dyn Index>) {
        self.temp.remove_index(&self.catalog, self.id, index);
    }

    pub fn find_local_temp_constraint(&self, name: &str) -> Option<Arc<dyn Constraint>> {
        self.temp.find_constraint(name)
    }

    pub fn add_local_temp_constraint(&mut self, constraint: Arc<dyn Constraint>) -> Result<(), Error> {
        self.temp.add_constraint(&self.catalog, constraint)
    }

    pub fn remove_local_temp_constraint(&mut self, constraint: &Arc<dyn Constraint>) {
        self.temp.remove_constraint(&self.catalog, self.id, constraint);
    }

    // ------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------

    /// Add a lock for the given table. The table is unlocked on commit
    /// or rollback.
    pub fn add_lock(&mut self, table: Arc<dyn Table>) -> Result<(), Error> {
        self.locks.add(table)
    }

    /// Unlock just this table.
    pub fn unlock(&mut self, table: &Arc<dyn Table>) {
        self.locks.unlock(table);
    }

    /// Snapshot of the tables this session holds locks on.
    pub fn locks(&self) -> Vec<Arc<dyn Table>> {
        self.locks.tables()
    }

    /// Record which table this session is waiting on. Diagnostics only.
    pub fn set_wait_for_lock(&mut self, table: Arc<dyn Table>, task: &str) {
        self.locks.set_wait_for(Some(LockWait {
            table,
            task: task.to_owned(),
        }));
    }

    pub fn clear_wait_for_lock(&mut self) {
        self.locks.set_wait_for(None);
    }

    pub fn wait_for_lock(&self) -> Option<&LockWait> {
        self.locks.wait_for()
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn set_last_identity(&mut self, value: Value) {
        self.last_scope_identity = value.clone();
        self.last_identity = value;
    }

    pub fn last_identity(&self) -> &Value {
        &self.last_identity
    }

    pub fn set_last_scope_identity(&mut self, value: Value) {
        self.last_scope_identity = value;
    }

    pub fn last_scope_identity(&self) -> &Value {
        &self.last_scope_identity
    }

    // ------------------------------------------------------------------
    // Lobs and temporary results
    // ------------------------------------------------------------------

    /// Keep a temporary lob alive until the transaction commits.
    pub fn add_temporary_lob(&mut self, value: Value) {
        self.temporary_lobs.push(value);
    }

    /// Remember that the lob must be unlinked from its row at commit.
    pub fn unlink_at_commit(&mut self, value: Value) -> Result<(), Error> {
        if !value.linked() {
            return Err(Error::Internal("value is not linked".into()));
        }
        let unlink = self
            .unlink_lobs
            .get_or_insert_with(|| self.catalog.new_name_map());
        unlink.insert(&value.to_string(), value);

        Ok(())
    }

    /// Do not unlink this lob at commit any longer.
    pub fn unlink_at_commit_stop(&mut self, value: &Value) {
        if let Some(unlink) = self.unlink_lobs.as_mut() {
            unlink.remove(&value.to_string());
        }
    }

    /// Remember the result set and close it when the statement ends.
    /// References at most 100 result sets to bound memory.
    pub fn add_temporary_result(&mut self, result: Arc<dyn TemporaryResult>) {
        if !result.needs_close() {
            return;
        }
        if self.temporary_results.len() < 100 {
            self.temporary_results.push(result);
        }
    }

    // ------------------------------------------------------------------
    // Counters and log positions
    // ------------------------------------------------------------------

    /// Incremented on every catalog-visible mutation by this session.
    pub fn modification_id(&self) -> u64 {
        self.modification_id
    }

    pub fn next_object_id(&mut self) -> u64 {
        let id = self.object_id;
        self.object_id += 1;
        id
    }

    /// System-generated identifier that does not occur within the given
    /// SQL statement. No letters: generated identifiers must not be
    /// case sensitive.
    pub fn next_system_identifier(&mut self, sql: &str) -> String {
        loop {
            let identifier = format!("_{}", self.system_identifier);
            self.system_identifier += 1;
            if !sql.contains(&identifier) {
                return identifier;
            }
        }
    }

    /// Called when a log entry for this session is written. Keeps the
    /// first position in the log that is not yet committed.
    pub fn add_log_pos(&mut self, log: u64, pos: u64) {
        if self.first_uncommitted.is_none() {
            self.first_uncommitted = Some(LogPosition { log, pos });
        }
    }

    pub fn first_uncommitted(&self) -> Option<LogPosition> {
        self.first_uncommitted
    }

    /// The session has local changes that are not yet committed.
    pub fn contains_uncommitted(&self) -> bool {
        self.first_uncommitted.is_some()
    }

    /// Called after the local log has written the commit entry.
    pub(crate) fn set_all_committed(&mut self) {
        self.first_uncommitted = None;
    }

    /// Identifier of the current local transaction state.
    pub fn transaction_id(&self) -> Value {
        match self.first_uncommitted {
            Some(position) => {
                Value::Text(format!("{}-{}-{}", position.log, position.pos, self.id))
            }
            None => Value::Text(format!("-1--1-{}", self.id)),
        }
    }

    // ------------------------------------------------------------------
    // Timestamps
    // ------------------------------------------------------------------

    pub fn session_start(&self) -> SystemTime {
        self.session_start
    }

    /// When the current transaction started; latched on first read.
    pub fn transaction_start(&mut self) -> SystemTime {
        *self.transaction_start.get_or_insert_with(SystemTime::now)
    }
}
