//! SQL values a session holds on to between statements.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

static NEXT_LOB_ID: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(0));

/// A large-object payload whose backing storage outlives a single
/// statement. Linked lobs belong to a persisted row; unlinked ones are
/// temporary and are closed at commit.
#[derive(Debug)]
pub struct LobValue {
    id: u64,
    linked: AtomicBool,
    closed: AtomicBool,
}

impl LobValue {
    /// New, unlinked lob.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_LOB_ID.fetch_add(1, Ordering::SeqCst),
            linked: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The lob belongs to a persisted row.
    pub fn linked(&self) -> bool {
        self.linked.load(Ordering::SeqCst)
    }

    pub fn set_linked(&self, linked: bool) {
        self.linked.store(linked, Ordering::SeqCst);
    }

    /// Release the lob's backing storage.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A SQL value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Bigint(i64),
    Double(f64),
    Text(String),
    Lob(Arc<LobValue>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value's backing storage belongs to a persisted row.
    pub fn linked(&self) -> bool {
        match self {
            Value::Lob(lob) => lob.linked(),
            _ => false,
        }
    }

    /// Close backing resources, if any.
    pub fn close(&self) {
        if let Value::Lob(lob) = self {
            lob.close();
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(true) => write!(f, "TRUE"),
            Value::Boolean(false) => write!(f, "FALSE"),
            Value::Bigint(value) => write!(f, "{}", value),
            Value::Double(value) => write!(f, "{}", value),
            Value::Text(value) => write!(f, "'{}'", value.replace('\'', "''")),
            Value::Lob(lob) => write!(f, "lob:{}", lob.id()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Bigint(a), Value::Bigint(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Lob(a), Value::Lob(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Bigint(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bigint(0).is_null());
        assert_eq!(Value::default(), Value::Null);
    }

    #[test]
    fn test_lob_close() {
        let lob = LobValue::new();
        let value = Value::Lob(lob.clone());

        assert!(!value.linked());
        value.close();
        assert!(lob.closed());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bigint(42).to_string(), "42");
        assert_eq!(Value::Text("o'clock".into()).to_string(), "'o''clock'");
    }

    #[test]
    fn test_lob_ids_unique() {
        let a = LobValue::new();
        let b = LobValue::new();
        assert_ne!(a.id(), b.id());
    }
}
