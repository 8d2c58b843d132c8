use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    LockPoisoned(&'static str),
    ConcurrentWrite {
        id: String,
        expected: u64,
        actual: u64,
    },
    Serialization {
        id: String,
        message: String,
    },
    NoSuchRecord(u64),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::ConcurrentWrite {
                id,
                expected,
                actual,
            } => write!(
                f,
                "concurrent write detected for aggregate {} (expected version {}, got {})",
                id, expected, actual
            ),
            StoreError::Serialization { id, message } => {
                write!(f, "failed to serialize aggregate {}: {}", id, message)
            }
            StoreError::NoSuchRecord(id) => write!(f, "no outbox record with id {}", id),
        }
    }
}

impl std::error::Error for StoreError {}
