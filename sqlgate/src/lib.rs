//! Session and transaction coordination for a sharded SQL gateway.
//!
//! One [`frontend::Session`] exists per logical client connection. The
//! session opens connections to backend shards lazily, tracks the locks
//! and temporary objects the client accumulates, and drives every shard
//! it touched through a best-effort commit or rollback protocol at
//! transaction boundaries.

pub mod backend;
pub mod catalog;
pub mod frontend;

pub use catalog::Catalog;
pub use frontend::Session;

/// Initialize test logging. Safe to call more than once.
pub fn logger() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
