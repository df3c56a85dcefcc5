//! Shard-facing side of a session: physical connections to backend data
//! stores and the cross-shard transaction protocol.

pub mod connection;
pub mod error;
pub mod registry;
#[cfg(test)]
pub mod test;
pub mod transaction;

pub use connection::{ConnectionSource, ShardConnection};
pub use error::Error;
pub use registry::ShardConnections;
