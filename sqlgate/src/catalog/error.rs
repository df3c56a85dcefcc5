//! Catalog errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown shard \"{0}\"")]
    UnknownShard(String),

    #[error("session {0} is not registered")]
    SessionNotFound(u64),
}
