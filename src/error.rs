use std::fmt;
use std::io;
use std::path::PathBuf;

/// Unified error type for the store.
///
/// Absence of a key is never an error — lookups return `Option`. Errors
/// are reserved for I/O failures, corruption, and protocol violations
/// (closed handle, nested transaction, and so on).
#[derive(Debug)]
pub enum Error {
    /// IO error from disk operations.
    Io(io::Error),
    /// Data corruption detected (CRC mismatch, bad format, etc).
    Corruption(String),
    /// A required argument was missing or malformed (empty path, empty key).
    InvalidArgument(String),
    /// The store directory is already open in another handle.
    Locked(PathBuf),
    /// Operation attempted on a closed handle.
    Closed,
    /// `begin_transaction` called while a transaction is already active.
    NestedTransaction,
    /// `commit` or `rollback` called with no active transaction.
    NoActiveTransaction,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Corruption(msg) => write!(f, "Corruption: {msg}"),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Error::Locked(path) => write!(f, "Store is locked: {}", path.display()),
            Error::Closed => write!(f, "Handle is closed"),
            Error::NestedTransaction => write!(f, "A transaction is already active"),
            Error::NoActiveTransaction => write!(f, "No transaction is active"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Result type alias used throughout the store.
pub type Result<T> = std::result::Result<T, Error>;
