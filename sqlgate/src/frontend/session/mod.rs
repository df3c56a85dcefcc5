//! A session represents one client's connection to the gateway.
//!
//! The session owns every per-client resource: shard connections, table
//! locks, temporary objects, savepoints, the statement cache and the
//! cancellation supervisor. Entry points that mutate transaction state
//! take `&mut self`; one logical client drives a session at a time.

mod state;
mod transaction;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use super::{
    CancelHandle, Cancellation, Error, Locks, Procedure, Savepoint, Statement, StatementCache,
    TempObjects, TemporaryResult,
};
use crate::backend::{ShardConnection, ShardConnections};
use crate::catalog::{Catalog, NameMap, Value, SCHEMA_MAIN};

static SERIAL: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(0));

fn next_serial() -> u64 {
    SERIAL.fetch_add(1, Ordering::SeqCst)
}

/// Position of a log entry in the session's local transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogPosition {
    pub log: u64,
    pub pos: u64,
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for IsolationLevel {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_uppercase().as_str() {
            "READ UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
            "READ COMMITTED" => Ok(IsolationLevel::ReadCommitted),
            "REPEATABLE READ" => Ok(IsolationLevel::RepeatableRead),
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(Error::InvalidValue {
                setting: "transaction isolation",
                value: value.to_owned(),
            }),
        }
    }
}

pub struct Session {
    serial: u64,
    id: u64,
    catalog: Arc<Catalog>,
    user: String,

    auto_commit: bool,
    auto_commit_at_transaction_end: bool,
    commit_or_rollback_disabled: bool,
    closed: bool,
    read_only: bool,
    allow_literals: bool,
    isolation: IsolationLevel,

    current_schema: String,
    schema_search_path: Option<Vec<String>>,
    transaction_name: Option<String>,

    query_timeout: Duration,
    lock_timeout: Duration,

    last_identity: Value,
    last_scope_identity: Value,

    first_uncommitted: Option<LogPosition>,
    modification_id: u64,
    object_id: u64,
    system_identifier: u64,
    log_index: u64,

    session_start: SystemTime,
    transaction_start: Option<SystemTime>,

    savepoints: Option<NameMap<Savepoint>>,
    variables: Option<NameMap<Value>>,
    procedures: Option<NameMap<Procedure>>,

    temp: TempObjects,
    locks: Locks,
    statements: StatementCache,
    shards: ShardConnections,
    cancel: Cancellation,
    current_statement: Option<Arc<dyn Statement>>,

    temporary_lobs: Vec<Value>,
    unlink_lobs: Option<NameMap<Value>>,
    temporary_results: Vec<Arc<dyn TemporaryResult>>,
}

impl Session {
    pub(crate) fn new(catalog: Arc<Catalog>, id: u64, user: &str) -> Self {
        let general = catalog.general();
        let query_timeout = Duration::from_millis(general.default_query_timeout);
        let lock_timeout = Duration::from_millis(general.default_lock_timeout);
        let statements = StatementCache::new(general.query_cache_size);
        let cancel = Cancellation::new(Duration::from_millis(general.throttle_grace));

        Self {
            serial: next_serial(),
            id,
            catalog,
            user: user.to_owned(),
            auto_commit: true,
            auto_commit_at_transaction_end: false,
            commit_or_rollback_disabled: false,
            closed: false,
            read_only: false,
            allow_literals: false,
            isolation: IsolationLevel::default(),
            current_schema: SCHEMA_MAIN.to_owned(),
            schema_search_path: None,
            transaction_name: None,
            query_timeout,
            lock_timeout,
            last_identity: Value::Bigint(0),
            last_scope_identity: Value::Bigint(0),
            first_uncommitted: None,
            modification_id: 0,
            object_id: 0,
            system_identifier: 0,
            log_index: 0,
            session_start: SystemTime::now(),
            transaction_start: None,
            savepoints: None,
            variables: None,
            procedures: None,
            temp: TempObjects::new(),
            locks: Locks::new(),
            statements,
            shards: ShardConnections::new(),
            cancel,
            current_statement: None,
            temporary_lobs: vec![],
            unlink_lobs: None,
            temporary_results: vec![],
        }
    }

    /// Catalog-assigned session id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Process-unique serial number.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    /// Parse and prepare the given SQL statement, consulting the
    /// statement cache first.
    pub fn prepare(&mut self, sql: &str) -> Result<Arc<dyn Statement>, Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        if let Some(statement) = self.statements.get(sql) {
            return Ok(statement);
        }
        let statement = self.catalog.parser().compile(sql)?;
        self.statements.put(sql, statement.clone());

        Ok(statement)
    }

    /// Connection to the given shard, opened on first use and retained
    /// for the life of the session.
    pub async fn shard_connection(&mut self, shard: &str) -> Result<&mut dyn ShardConnection, Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        Ok(self
            .shards
            .get(&self.catalog, shard, self.auto_commit)
            .await?)
    }

    /// Shards this session holds connections to, in acquisition order.
    pub fn shards(&self) -> Vec<&str> {
        self.shards.shards()
    }

    /// Close the session, releasing every resource.
    ///
    /// Idempotent: teardown runs once. Best-effort: failures closing
    /// individual shard connections are logged, never raised, so
    /// catalog cleanup always runs.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.shards.close_all().await;
        if let Err(err) = self.clean_temp_tables(true) {
            warn!("error cleaning temporary tables on close: {}", err);
        }
        self.catalog.remove_session(self.id);
        self.closed = true;
        debug!("session {} closed", self.id);
    }

    /// Cancel the currently executing statement. The next cooperative
    /// check fails with [`Error::StatementCanceled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle other tasks can use to cancel this session's current
    /// statement.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.handle()
    }

    /// Cooperative cancellation check point; applies throttling first.
    /// Long-running operations call this at their loop heads.
    pub async fn check_canceled(&mut self) -> Result<(), Error> {
        self.cancel.check().await
    }

    /// Wait out the session's throttle, if one is configured.
    pub async fn throttle(&mut self) {
        self.cancel.throttle().await;
    }

    /// Set the statement about to execute. Arms the query deadline when
    /// a timeout is configured.
    pub fn set_current_statement(&mut self, statement: Option<Arc<dyn Statement>>) {
        if statement.is_some() && !self.query_timeout.is_zero() {
            self.cancel.set_current_statement(self.query_timeout);
        }
        self.current_statement = statement;
    }

    pub fn current_statement(&self) -> Option<&Arc<dyn Statement>> {
        self.current_statement.as_ref()
    }

    /// When the current statement started executing.
    pub fn current_statement_start(&self) -> Option<tokio::time::Instant> {
        self.cancel.statement_start()
    }

    /// Mark the statement as completed; closes temporary result sets.
    pub fn end_statement(&mut self) {
        self.current_statement = None;
        self.close_temporary_results();
    }

    fn close_temporary_results(&mut self) {
        for result in self.temporary_results.drain(..) {
            result.close();
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} (user: {})", self.serial, self.user)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("auto_commit", &self.auto_commit)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::test::MockSource;
    use crate::frontend::test::{test_catalog, test_catalog_with, TestParser, TestResult};
    use sqlgate_config::General;

    fn catalog_and_parser() -> (Arc<Catalog>, Arc<TestParser>) {
        let parser = Arc::new(TestParser::default());
        let catalog = Catalog::new(General::default(), parser.clone());
        (catalog, parser)
    }

    #[test]
    fn test_prepare_uses_cache() {
        let (catalog, parser) = catalog_and_parser();
        let mut session = catalog.create_session("alice");

        session.prepare("SELECT 1").unwrap();
        session.prepare("SELECT 1").unwrap();

        assert_eq!(parser.compiles(), 1);
    }

    #[test]
    fn test_prepare_with_cache_disabled() {
        let parser = Arc::new(TestParser::default());
        let catalog = Catalog::new(
            General {
                query_cache_size: 0,
                ..General::default()
            },
            parser.clone(),
        );
        let mut session = catalog.create_session("alice");

        session.prepare("SELECT 1").unwrap();
        session.prepare("SELECT 1").unwrap();

        assert_eq!(parser.compiles(), 2);
    }

    #[test]
    fn test_prepare_on_closed_session() {
        let catalog = test_catalog();
        let mut session = catalog.create_session("alice");
        session.closed = true;

        let err = session.prepare("SELECT 1").unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
    }

    #[test]
    fn test_parser_errors_propagate() {
        let catalog = test_catalog();
        let mut session = catalog.create_session("alice");

        let err = session.prepare("SYNTAX ERROR").unwrap_err();
        assert!(matches!(err, Error::Parser(_)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        crate::logger();

        let catalog = test_catalog();
        let source = Arc::new(MockSource::new());
        catalog.add_shard("alpha", source.clone());

        let mut session = catalog.create_session("alice");
        session.shard_connection("alpha").await.unwrap();
        assert_eq!(catalog.session_count(), 1);

        session.close().await;
        session.close().await;

        assert!(session.closed());
        // Teardown ran once.
        assert_eq!(source.calls.close(), 1);
        assert_eq!(catalog.session_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_session_refuses_connections() {
        let catalog = test_catalog();
        let mut session = catalog.create_session("alice");

        session.close().await;

        let err = session.shard_connection("alpha").await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
    }

    #[tokio::test]
    async fn test_cancel_handle() {
        let catalog = test_catalog();
        let mut session = catalog.create_session("alice");

        session.check_canceled().await.unwrap();

        let handle = session.cancel_handle();
        handle.cancel();

        let err = session.check_canceled().await.unwrap_err();
        assert!(matches!(err, Error::StatementCanceled));
        session.check_canceled().await.unwrap();
    }

    #[tokio::test]
    async fn test_query_timeout_arms_deadline() {
        let catalog = test_catalog_with(General {
            default_query_timeout: 50,
            ..General::default()
        });
        let mut session = catalog.create_session("alice");
        let statement = session.prepare("SELECT 1").unwrap();

        session.set_current_statement(Some(statement));
        session.check_canceled().await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        let err = session.check_canceled().await.unwrap_err();
        assert!(matches!(err, Error::StatementCanceled));
        // Fires exactly once.
        session.check_canceled().await.unwrap();
    }

    #[test]
    fn test_end_statement_closes_results() {
        let catalog = test_catalog();
        let mut session = catalog.create_session("alice");

        let tracked = TestResult::new(true);
        let untracked = TestResult::new(false);
        session.add_temporary_result(tracked.clone());
        session.add_temporary_result(untracked.clone());

        session.end_statement();

        assert_eq!(tracked.closes(), 1);
        assert_eq!(untracked.closes(), 0);
    }

    #[test]
    fn test_display() {
        let catalog = test_catalog();
        let session = catalog.create_session("alice");
        assert_eq!(
            session.to_string(),
            format!("#{} (user: alice)", session.serial())
        );
    }
}
