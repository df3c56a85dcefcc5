//! Client-facing session layer.

pub mod cancel;
pub mod error;
pub mod locks;
pub mod result;
pub mod savepoint;
pub mod session;
pub mod statement;
pub mod statement_cache;
pub mod temp_objects;

pub use cancel::{CancelHandle, Cancellation};
pub use error::Error;
pub use locks::{LockWait, Locks};
pub use result::TemporaryResult;
pub use savepoint::Savepoint;
pub use session::{IsolationLevel, LogPosition, Session};
pub use statement::{Procedure, Statement, StatementParser};
pub use statement_cache::StatementCache;
pub use temp_objects::TempObjects;
