//! Backend errors.

use thiserror::Error;

/// Backend error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(String),

    #[error("catalog: {0}")]
    Catalog(#[from] crate::catalog::Error),

    /// Cross-shard commit failed. Shards committed before `shard` stay
    /// committed; shards after it were rolled back. `others` keeps the
    /// raw errors from those rollback attempts for diagnostics.
    #[error("commit failed on shard \"{shard}\": {source}")]
    CommitFailed {
        shard: String,
        #[source]
        source: Box<Error>,
        others: Vec<(String, Error)>,
    },

    /// Cross-shard rollback failed. Every shard was attempted; `source`
    /// is the first failure, `others` the rest.
    #[error("rollback failed on shard \"{shard}\": {source}")]
    RollbackFailed {
        shard: String,
        #[source]
        source: Box<Error>,
        others: Vec<(String, Error)>,
    },
}
