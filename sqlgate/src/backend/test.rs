//! Test doubles for shard connections.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{ConnectionSource, Error, ShardConnection};

/// Call counters shared between a mock source and its connections.
#[derive(Default, Debug)]
pub struct Calls {
    commit: AtomicUsize,
    rollback: AtomicUsize,
    set_auto_commit: AtomicUsize,
    close: AtomicUsize,
}

impl Calls {
    pub fn commit(&self) -> usize {
        self.commit.load(Ordering::SeqCst)
    }

    pub fn rollback(&self) -> usize {
        self.rollback.load(Ordering::SeqCst)
    }

    pub fn set_auto_commit(&self) -> usize {
        self.set_auto_commit.load(Ordering::SeqCst)
    }

    pub fn close(&self) -> usize {
        self.close.load(Ordering::SeqCst)
    }
}

pub struct MockConnection {
    calls: Arc<Calls>,
    auto_commit: bool,
    fail_commit: bool,
    fail_rollback: bool,
    fail_close: bool,
}

#[async_trait]
impl ShardConnection for MockConnection {
    async fn commit(&mut self) -> Result<(), Error> {
        self.calls.commit.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit {
            Err(Error::Backend("commit refused".into()))
        } else {
            Ok(())
        }
    }

    async fn rollback(&mut self) -> Result<(), Error> {
        self.calls.rollback.fetch_add(1, Ordering::SeqCst);
        if self.fail_rollback {
            Err(Error::Backend("rollback refused".into()))
        } else {
            Ok(())
        }
    }

    async fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), Error> {
        self.calls.set_auto_commit.fetch_add(1, Ordering::SeqCst);
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(Error::Backend("close refused".into()))
        } else {
            Ok(())
        }
    }
}

/// Mock connection source. Connections it hands out start with
/// auto-commit on and share its call counters.
pub struct MockSource {
    pub calls: Arc<Calls>,
    connects: AtomicUsize,
    fail_commit: bool,
    fail_rollback: bool,
    fail_close: bool,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            connects: AtomicUsize::new(0),
            fail_commit: false,
            fail_rollback: false,
            fail_close: false,
        }
    }

    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn fail_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Number of connections handed out.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionSource for MockSource {
    async fn connect(&self) -> Result<Box<dyn ShardConnection>, Error> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            calls: self.calls.clone(),
            auto_commit: true,
            fail_commit: self.fail_commit,
            fail_rollback: self.fail_rollback,
            fail_close: self.fail_close,
        }))
    }
}
