//! Traits implemented by catalog objects a session holds on to.
//!
//! The objects themselves live in the shared catalog; sessions only keep
//! handles. Any method that releases resources or structurally mutates
//! the object is called with the catalog's structural lock held.

/// A named object owned by the shared catalog.
pub trait SchemaObject: Send + Sync {
    /// The object's name, unique within its registry.
    fn name(&self) -> &str;

    /// Release the object's children and backing resources.
    ///
    /// Callers hold the catalog's structural lock for the duration of
    /// this call.
    fn remove_children_and_resources(&self, session_id: u64);
}

/// A table handle.
pub trait Table: SchemaObject {
    /// The table is dropped when the transaction commits.
    fn on_commit_drop(&self) -> bool {
        false
    }

    /// The table's rows are discarded when the transaction commits.
    fn on_commit_truncate(&self) -> bool {
        false
    }

    /// Discard the table's rows, keeping its definition. Called with the
    /// catalog's structural lock held.
    fn truncate(&self, session_id: u64);

    /// Release a lock the given session holds on this table.
    fn unlock(&self, session_id: u64);
}

/// An index handle.
pub trait Index: SchemaObject {}

/// A constraint handle.
pub trait Constraint: SchemaObject {}
