//! Cross-shard commit and rollback.
//!
//! This is a best-effort protocol, not an atomic commit. Shards are
//! committed sequentially in acquisition order; once any shard has
//! committed, a later shard's commit failure leaves the transaction
//! partially applied. On the first commit failure every remaining shard
//! is rolled back instead of committed, and the first failure is
//! surfaced to the caller. There is no two-phase commit.

use std::fmt::Write;

use tracing::{debug, error};

use super::{Error, ShardConnections};

impl ShardConnections {
    /// Commit every shard connection in acquisition order.
    ///
    /// On the first failure, the remaining connections are rolled back;
    /// their errors are collected, never re-raised. Already-committed
    /// shards stay committed.
    pub async fn commit_all(&mut self) -> Result<(), Error> {
        let mut failed: Option<(String, Error)> = None;
        let mut others: Vec<(String, Error)> = vec![];
        let mut trail = String::new();

        for (shard, connection) in self.connections.iter_mut() {
            if failed.is_none() {
                match connection.commit().await {
                    Ok(()) => {
                        let _ = write!(trail, "\ncommit shard {} transaction succeeded", shard);
                    }
                    Err(err) => {
                        let _ = write!(trail, "\ncommit shard {} transaction failed", shard);
                        failed = Some((shard.clone(), err));
                    }
                }
            } else {
                // After an unsuccessful commit the remaining connections
                // must be rolled back.
                match connection.rollback().await {
                    Ok(()) => {
                        let _ = write!(trail, "\nrollback shard {} transaction succeeded", shard);
                    }
                    Err(err) => {
                        let _ = write!(trail, "\nrollback shard {} transaction failed", shard);
                        others.push((shard.clone(), err));
                    }
                }
            }
        }

        match failed {
            None => {
                if !trail.is_empty() {
                    debug!("committed {} shard transaction(s):{}", self.len(), trail);
                }
                Ok(())
            }
            Some((shard, source)) => {
                error!("cross-shard commit failed on \"{}\":{}", shard, trail);
                Err(Error::CommitFailed {
                    shard,
                    source: Box::new(source),
                    others,
                })
            }
        }
    }

    /// Roll back every shard connection.
    ///
    /// All connections are attempted regardless of earlier failures; the
    /// first failure is surfaced once every shard has been tried.
    pub async fn rollback_all(&mut self) -> Result<(), Error> {
        let mut failed: Option<(String, Error)> = None;
        let mut others: Vec<(String, Error)> = vec![];

        for (shard, connection) in self.connections.iter_mut() {
            if let Err(err) = connection.rollback().await {
                if failed.is_none() {
                    failed = Some((shard.clone(), err));
                } else {
                    others.push((shard.clone(), err));
                }
            }
        }

        match failed {
            None => Ok(()),
            Some((shard, source)) => {
                error!("cross-shard rollback failed on \"{}\": {}", shard, source);
                Err(Error::RollbackFailed {
                    shard,
                    source: Box::new(source),
                    others,
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::test::MockSource;
    use super::*;
    use crate::frontend::test::test_catalog;
    use std::sync::Arc;

    async fn registry(sources: &[(&str, Arc<MockSource>)]) -> ShardConnections {
        let catalog = test_catalog();
        let mut connections = ShardConnections::new();
        for (shard, source) in sources {
            catalog.add_shard(shard, source.clone());
            connections.get(&catalog, shard, false).await.unwrap();
        }
        connections
    }

    #[tokio::test]
    async fn test_commit_all_success() {
        let one = Arc::new(MockSource::new());
        let two = Arc::new(MockSource::new());
        let mut connections = registry(&[("shard_1", one.clone()), ("shard_2", two.clone())]).await;

        connections.commit_all().await.unwrap();

        assert_eq!(one.calls.commit(), 1);
        assert_eq!(two.calls.commit(), 1);
        assert_eq!(one.calls.rollback(), 0);
        assert_eq!(two.calls.rollback(), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back_the_rest() {
        crate::logger();

        let one = Arc::new(MockSource::new());
        let two = Arc::new(MockSource::new().fail_commit());
        let three = Arc::new(MockSource::new());
        let mut connections = registry(&[
            ("shard_1", one.clone()),
            ("shard_2", two.clone()),
            ("shard_3", three.clone()),
        ])
        .await;

        let err = connections.commit_all().await.unwrap_err();

        // Shard 1 committed and stays committed.
        assert_eq!(one.calls.commit(), 1);
        assert_eq!(one.calls.rollback(), 0);
        // Shard 2's commit failed.
        assert_eq!(two.calls.commit(), 1);
        // Shard 3 was rolled back, not committed.
        assert_eq!(three.calls.commit(), 0);
        assert_eq!(three.calls.rollback(), 1);

        match err {
            Error::CommitFailed { shard, source, others } => {
                assert_eq!(shard, "shard_2");
                assert!(source.to_string().contains("commit refused"));
                assert!(others.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_commit_failure_collects_rollback_errors() {
        let one = Arc::new(MockSource::new().fail_commit());
        let two = Arc::new(MockSource::new().fail_rollback());
        let mut connections = registry(&[("shard_1", one.clone()), ("shard_2", two.clone())]).await;

        let err = connections.commit_all().await.unwrap_err();

        assert_eq!(two.calls.rollback(), 1);
        match err {
            Error::CommitFailed { shard, others, .. } => {
                assert_eq!(shard, "shard_1");
                assert_eq!(others.len(), 1);
                assert_eq!(others[0].0, "shard_2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rollback_all_attempts_every_shard() {
        let one = Arc::new(MockSource::new().fail_rollback());
        let two = Arc::new(MockSource::new().fail_rollback());
        let mut connections = registry(&[("shard_1", one.clone()), ("shard_2", two.clone())]).await;

        let err = connections.rollback_all().await.unwrap_err();

        // Both shards were attempted.
        assert_eq!(one.calls.rollback(), 1);
        assert_eq!(two.calls.rollback(), 1);

        // The first shard's error is the one surfaced.
        match err {
            Error::RollbackFailed { shard, others, .. } => {
                assert_eq!(shard, "shard_1");
                assert_eq!(others.len(), 1);
                assert_eq!(others[0].0, "shard_2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rollback_all_success() {
        let one = Arc::new(MockSource::new());
        let mut connections = registry(&[("shard_1", one.clone())]).await;

        connections.rollback_all().await.unwrap();
        assert_eq!(one.calls.rollback(), 1);
    }
}
