//! Session-local temporary objects.
//!
//! Three independent name → object registries (tables, indexes,
//! constraints), created lazily on first write. Removal and destructive
//! cleanup always happen under the catalog's structural lock so they
//! never race catalog-wide operations.

use std::sync::Arc;

use super::Error;
use crate::catalog::{Catalog, Constraint, Index, NameMap, Table};

#[derive(Default)]
pub struct TempObjects {
    tables: Option<NameMap<Arc<dyn Table>>>,
    indexes: Option<NameMap<Arc<dyn Index>>>,
    constraints: Option<NameMap<Arc<dyn Constraint>>>,
}

impl std::fmt::Debug for TempObjects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempObjects")
            .field("tables", &self.tables.as_ref().map(|t| t.len()).unwrap_or(0))
            .field(
                "indexes",
                &self.indexes.as_ref().map(|i| i.len()).unwrap_or(0),
            )
            .field(
                "constraints",
                &self.constraints.as_ref().map(|c| c.len()).unwrap_or(0),
            )
            .finish()
    }
}

impl TempObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_table(&self, name: &str) -> Option<Arc<dyn Table>> {
        self.tables.as_ref()?.get(name).cloned()
    }

    /// Temporary tables in insertion order.
    pub fn tables(&self) -> Vec<Arc<dyn Table>> {
        self.tables
            .as_ref()
            .map(|tables| tables.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn add_table(&mut self, catalog: &Catalog, table: Arc<dyn Table>) -> Result<(), Error> {
        let tables = self.tables.get_or_insert_with(|| catalog.new_name_map());
        if tables.contains(table.name()) {
            return Err(Error::TableAlreadyExists(table.name().to_owned()));
        }
        let name = table.name().to_owned();
        tables.insert(&name, table);

        Ok(())
    }

    /// Drop the table and remove it from the registry.
    pub fn remove_table(&mut self, catalog: &Catalog, session_id: u64, table: &Arc<dyn Table>) {
        if let Some(tables) = self.tables.as_mut() {
            tables.remove(table.name());
        }
        let _structural = catalog.structural_lock();
        table.remove_children_and_resources(session_id);
    }

    pub fn find_index(&self, name: &str) -> Option<Arc<dyn Index>> {
        self.indexes.as_ref()?.get(name).cloned()
    }

    pub fn add_index(&mut self, catalog: &Catalog, index: Arc<dyn Index>) -> Result<(), Error> {
        let indexes = self.indexes.get_or_insert_with(|| catalog.new_name_map());
        if indexes.contains(index.name()) {
            return Err(Error::IndexAlreadyExists(index.name().to_owned()));
        }
        let name = index.name().to_owned();
        indexes.insert(&name, index);

        Ok(())
    }

    pub fn remove_index(&mut self, catalog: &Catalog, session_id: u64, index: &Arc<dyn Index>) {
        if let Some(indexes) = self.indexes.as_mut() {
            indexes.remove(index.name());
            let _structural = catalog.structural_lock();
            index.remove_children_and_resources(session_id);
        }
    }

    pub fn find_constraint(&self, name: &str) -> Option<Arc<dyn Constraint>> {
        self.constraints.as_ref()?.get(name).cloned()
    }

    pub fn add_constraint(
        &mut self,
        catalog: &Catalog,
        constraint: Arc<dyn Constraint>,
    ) -> Result<(), Error> {
        let constraints = self
            .constraints
            .get_or_insert_with(|| catalog.new_name_map());
        if constraints.contains(constraint.name()) {
            return Err(Error::ConstraintAlreadyExists(constraint.name().to_owned()));
        }
        let name = constraint.name().to_owned();
        constraints.insert(&name, constraint);

        Ok(())
    }

    pub fn remove_constraint(
        &mut self,
        catalog: &Catalog,
        session_id: u64,
        constraint: &Arc<dyn Constraint>,
    ) {
        if let Some(constraints) = self.constraints.as_mut() {
            constraints.remove(constraint.name());
            let _structural = catalog.structural_lock();
            constraint.remove_children_and_resources(session_id);
        }
    }

    /// Drop or truncate temporary tables per their on-commit policy.
    ///
    /// Takes a snapshot first so the registry can be mutated while the
    /// loop runs. Returns the number of tables dropped; every drop is a
    /// catalog-visible modification. Dropping while the session closes
    /// commits local bookkeeping immediately so recovery cannot
    /// resurrect the table.
    pub fn clean_tables(
        &mut self,
        catalog: &Catalog,
        session_id: u64,
        close_session: bool,
    ) -> Result<usize, Error> {
        let Some(tables) = self.tables.as_mut() else {
            return Ok(0);
        };
        if tables.is_empty() {
            return Ok(0);
        }

        let snapshot: Vec<_> = tables.values().cloned().collect();
        let mut dropped = 0;

        let _structural = catalog.structural_lock();
        for table in snapshot {
            if close_session || table.on_commit_drop() {
                tables.remove(table.name());
                table.remove_children_and_resources(session_id);
                dropped += 1;
                if close_session {
                    catalog.commit_local(session_id)?;
                }
            } else if table.on_commit_truncate() {
                table.truncate(session_id);
            }
        }

        Ok(dropped)
    }
}
