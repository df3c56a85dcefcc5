//! The shared catalog: the one coarse synchronization point between
//! sessions.
//!
//! Every structural mutation of a shared object (dropping or truncating
//! a table, removing an index or constraint) happens under the catalog's
//! [`structural_lock`](Catalog::structural_lock). The catalog also hands
//! out shard connection sources, assigns session ids, and durably
//! commits each session's local bookkeeping.

pub mod error;
pub mod name_map;
pub mod object;
pub mod value;

pub use error::Error;
pub use name_map::NameMap;
pub use object::{Constraint, Index, SchemaObject, Table};
pub use value::{LobValue, Value};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::backend::ConnectionSource;
use crate::frontend::{Session, StatementParser};
use sqlgate_config::General;

/// Default schema for new sessions.
pub const SCHEMA_MAIN: &str = "PUBLIC";

/// What the catalog knows about a connected session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub user: String,
    pub connected_at: SystemTime,
}

pub struct Catalog {
    me: Weak<Catalog>,
    general: General,
    parser: Arc<dyn StatementParser>,
    shards: DashMap<String, Arc<dyn ConnectionSource>>,
    sessions: DashMap<u64, SessionEntry>,
    structural: Mutex<()>,
    next_session_id: AtomicU64,
    committed: AtomicU64,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("shards", &self.shards.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl Catalog {
    pub fn new(general: General, parser: Arc<dyn StatementParser>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            general,
            parser,
            shards: DashMap::new(),
            sessions: DashMap::new(),
            structural: Mutex::new(()),
            next_session_id: AtomicU64::new(0),
            committed: AtomicU64::new(0),
        })
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn parser(&self) -> &Arc<dyn StatementParser> {
        &self.parser
    }

    /// Register a shard connection source under its identifier.
    pub fn add_shard(&self, shard: &str, source: Arc<dyn ConnectionSource>) {
        self.shards.insert(shard.to_owned(), source);
    }

    /// Connection source for the given shard.
    pub fn connection_source(&self, shard: &str) -> Result<Arc<dyn ConnectionSource>, Error> {
        self.shards
            .get(shard)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::UnknownShard(shard.to_owned()))
    }

    /// Take the catalog's structural lock.
    ///
    /// The guard must not be held across an await point.
    pub fn structural_lock(&self) -> MutexGuard<'_, ()> {
        self.structural.lock()
    }

    /// Create a new session for the given user.
    pub fn create_session(&self, user: &str) -> Session {
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sessions.insert(
            id,
            SessionEntry {
                user: user.to_owned(),
                connected_at: SystemTime::now(),
            },
        );
        debug!("session {} created for \"{}\"", id, user);

        // A method call proves at least one strong reference exists.
        let catalog = self.me.upgrade().unwrap();
        Session::new(catalog, id, user)
    }

    /// Deregister a session. Called by the session itself during close.
    pub fn remove_session(&self, id: u64) {
        if self.sessions.remove(&id).is_some() {
            debug!("session {} removed", id);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Connected sessions, for inspection.
    pub fn sessions(&self) -> Vec<(u64, SessionEntry)> {
        self.sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Durably commit the session's local bookkeeping.
    ///
    /// Local metadata changes (temp table drops, DDL-like operations)
    /// go through here so recovery never resurrects them. Must not take
    /// the structural lock: callers may already hold it.
    pub fn commit_local(&self, session_id: u64) -> Result<(), Error> {
        if !self.sessions.contains_key(&session_id) {
            return Err(Error::SessionNotFound(session_id));
        }
        let seq = self.committed.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("local commit {} for session {}", seq, session_id);

        Ok(())
    }

    /// Number of local commits issued so far.
    pub fn local_commits(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    /// New name map following catalog iteration-order conventions.
    pub fn new_name_map<V>(&self) -> NameMap<V> {
        NameMap::new()
    }
}
