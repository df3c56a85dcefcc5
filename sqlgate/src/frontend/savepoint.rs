//! Savepoints.

/// A named position in the session's uncommitted work.
///
/// Rolling back to a savepoint discards the savepoints recorded after
/// it. It does not undo shard-side data changes made after the
/// savepoint; only local bookkeeping is trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Savepoint {
    /// Session log index at the time the savepoint was taken.
    pub log_index: u64,

    /// Opaque transaction savepoint token.
    pub transaction_savepoint: u64,
}
