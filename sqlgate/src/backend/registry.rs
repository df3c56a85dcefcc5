//! Per-session shard connection registry.

use indexmap::IndexMap;

use tracing::{debug, warn};

use super::{Error, ShardConnection};
use crate::catalog::Catalog;

/// Open connections to every shard this session has touched, in the
/// order they were first acquired.
///
/// At most one open connection exists per shard. Entries are created on
/// first access and retained across transactions; they are only closed
/// when the session closes.
#[derive(Default)]
pub struct ShardConnections {
    pub(super) connections: IndexMap<String, Box<dyn ShardConnection>>,
}

impl std::fmt::Debug for ShardConnections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardConnections")
            .field("shards", &self.shards())
            .finish()
    }
}

impl ShardConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection to the given shard, opening one on first access.
    ///
    /// A newly opened connection's auto-commit flag is synchronized with
    /// the session's.
    pub async fn get(
        &mut self,
        catalog: &Catalog,
        shard: &str,
        auto_commit: bool,
    ) -> Result<&mut dyn ShardConnection, Error> {
        if !self.connections.contains_key(shard) {
            let source = catalog.connection_source(shard)?;
            let mut connection = source.connect().await?;
            if connection.auto_commit() != auto_commit {
                connection.set_auto_commit(auto_commit).await?;
            }
            debug!("connected to shard \"{}\"", shard);
            self.connections.insert(shard.to_owned(), connection);
        }

        Ok(self.connections.get_mut(shard).unwrap().as_mut())
    }

    /// Shard identifiers in acquisition order.
    pub fn shards(&self) -> Vec<&str> {
        self.connections.keys().map(|shard| shard.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every connection and clear the registry. Best-effort:
    /// failures are logged, never raised, so session teardown always
    /// completes.
    pub async fn close_all(&mut self) {
        for (shard, connection) in self.connections.iter_mut() {
            if let Err(err) = connection.close().await {
                warn!("error closing connection to shard \"{}\": {}", shard, err);
            }
        }
        self.connections.clear();
    }
}

#[cfg(test)]
mod test {
    use super::super::test::MockSource;
    use super::*;
    use crate::frontend::test::test_catalog;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_one_connection_per_shard() {
        let catalog = test_catalog();
        let source = Arc::new(MockSource::new());
        catalog.add_shard("alpha", source.clone());

        let mut connections = ShardConnections::new();
        connections.get(&catalog, "alpha", true).await.unwrap();
        connections.get(&catalog, "alpha", true).await.unwrap();

        assert_eq!(connections.len(), 1);
        assert_eq!(source.connects(), 1);
    }

    #[tokio::test]
    async fn test_acquisition_order() {
        let catalog = test_catalog();
        for shard in ["beta", "alpha", "gamma"] {
            catalog.add_shard(shard, Arc::new(MockSource::new()));
        }

        let mut connections = ShardConnections::new();
        connections.get(&catalog, "beta", true).await.unwrap();
        connections.get(&catalog, "alpha", true).await.unwrap();
        connections.get(&catalog, "gamma", true).await.unwrap();
        connections.get(&catalog, "alpha", true).await.unwrap();

        assert_eq!(connections.shards(), vec!["beta", "alpha", "gamma"]);
    }

    #[tokio::test]
    async fn test_auto_commit_synchronized() {
        let catalog = test_catalog();
        let source = Arc::new(MockSource::new());
        catalog.add_shard("alpha", source.clone());

        let mut connections = ShardConnections::new();
        // Mock connections start with auto-commit on.
        connections.get(&catalog, "alpha", false).await.unwrap();

        assert_eq!(source.calls.set_auto_commit(), 1);
    }

    #[tokio::test]
    async fn test_unknown_shard() {
        let catalog = test_catalog();
        let mut connections = ShardConnections::new();

        let err = connections.get(&catalog, "nowhere", true).await.unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[tokio::test]
    async fn test_close_all_best_effort() {
        crate::logger();

        let catalog = test_catalog();
        let failing = Arc::new(MockSource::new().fail_close());
        let healthy = Arc::new(MockSource::new());
        catalog.add_shard("alpha", failing.clone());
        catalog.add_shard("beta", healthy.clone());

        let mut connections = ShardConnections::new();
        connections.get(&catalog, "alpha", true).await.unwrap();
        connections.get(&catalog, "beta", true).await.unwrap();

        connections.close_all().await;

        assert!(connections.is_empty());
        assert_eq!(failing.calls.close(), 1);
        assert_eq!(healthy.calls.close(), 1);
    }
}
