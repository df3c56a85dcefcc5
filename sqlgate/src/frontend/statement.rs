//! Compiled statements and the parser seam.

use std::sync::Arc;

use super::Error;

/// A compiled statement produced by the external SQL compiler.
pub trait Statement: Send + Sync {
    /// The SQL text this statement was compiled from.
    fn sql(&self) -> &str;

    /// The statement can be executed again without recompiling.
    fn can_reuse(&self) -> bool;

    /// Reset bound parameter state ahead of reuse. After this call the
    /// statement must be indistinguishable from a fresh compile.
    fn reuse(&self);

    /// The statement may be kept in the session's statement cache.
    fn cacheable(&self) -> bool;
}

impl std::fmt::Debug for dyn Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql())
            .finish()
    }
}

/// The external SQL parser/compiler.
pub trait StatementParser: Send + Sync {
    fn compile(&self, sql: &str) -> Result<Arc<dyn Statement>, Error>;
}

/// A statement stored under a name for repeated execution.
#[derive(Clone)]
pub struct Procedure {
    name: String,
    statement: Arc<dyn Statement>,
}

impl Procedure {
    pub fn new(name: &str, statement: Arc<dyn Statement>) -> Self {
        Self {
            name: name.to_owned(),
            statement,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn statement(&self) -> &Arc<dyn Statement> {
        &self.statement
    }
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.name)
            .field("sql", &self.statement.sql())
            .finish()
    }
}
