//! Frontend errors.

use thiserror::Error;

/// Session error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("table \"{0}\" already exists")]
    TableAlreadyExists(String),

    #[error("index \"{0}\" already exists")]
    IndexAlreadyExists(String),

    #[error("constraint \"{0}\" already exists")]
    ConstraintAlreadyExists(String),

    #[error("savepoint \"{0}\" already exists")]
    SavepointAlreadyExists(String),

    #[error("savepoint \"{0}\" is invalid")]
    InvalidSavepoint(String),

    #[error("commit or rollback is not allowed right now")]
    CommitRollbackNotAllowed,

    #[error("statement was canceled")]
    StatementCanceled,

    #[error("session is closed")]
    SessionClosed,

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("invalid value \"{value}\" for \"{setting}\"")]
    InvalidValue {
        setting: &'static str,
        value: String,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("parser: {0}")]
    Parser(String),

    #[error("{0}")]
    Backend(#[from] crate::backend::Error),

    #[error("catalog: {0}")]
    Catalog(#[from] crate::catalog::Error),
}
