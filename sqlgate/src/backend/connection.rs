//! Physical shard connections.

use async_trait::async_trait;

use super::Error;

/// One open connection to a backend data store.
///
/// A connection is owned by exactly one session. It is driven through
/// commit or rollback at every transaction boundary and closed when the
/// session closes; the underlying socket belongs to an external pool.
#[async_trait]
pub trait ShardConnection: Send {
    /// Commit the connection's current transaction.
    async fn commit(&mut self) -> Result<(), Error>;

    /// Roll back the connection's current transaction.
    async fn rollback(&mut self) -> Result<(), Error>;

    /// Set the connection's auto-commit flag.
    async fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), Error>;

    /// The connection's current auto-commit flag.
    fn auto_commit(&self) -> bool;

    /// Close the connection, returning it to its pool.
    async fn close(&mut self) -> Result<(), Error>;
}

impl std::fmt::Debug for dyn ShardConnection + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardConnection")
            .field("auto_commit", &self.auto_commit())
            .finish()
    }
}

/// Factory for connections to one shard, registered with the catalog
/// under the shard's identifier.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ShardConnection>, Error>;
}

impl std::fmt::Debug for dyn ConnectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSource").finish_non_exhaustive()
    }
}
