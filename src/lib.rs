//! # burrow
//!
//! An embeddable, ordered, transactional key-value store.
//!
//! Keys and values are opaque byte strings; keys are unique and totally
//! ordered byte-lexicographically. A [`Store`] handle owns one store
//! directory for the duration of an open..close session and offers:
//!
//! - durable `put`/`get`/`delete`/`clear` against committed state,
//! - ordered ascending/descending cursors from any start key,
//! - transactions: buffered mutations applied atomically on commit or
//!   discarded on rollback, with overlay-aware reads and iteration.
//!
//! ## Durability model
//! Committed work is an append-only log of CRC-framed batch records;
//! a whole transaction is one record, so a crash can never apply half a
//! commit. Reads and scans are served from an in-memory ordered index
//! rebuilt by replaying the log at open.

pub mod cursor;
pub mod engine;
pub mod error;
pub mod log;
pub mod store;
mod txn;
pub mod types;

// Public re-exports for the top-level API
pub use cursor::Cursor;
pub use engine::Options;
pub use error::{Error, Result};
pub use log::SyncPolicy;
pub use store::Store;
pub use types::{Direction, Key, Value};
