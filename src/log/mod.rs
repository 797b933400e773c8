//! The on-disk representation: CRC-framed batch records in append-only
//! generation files. The log *is* the durable store — recovery rebuilds
//! the in-memory index by replaying it in order.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::LogReader;
pub use record::{Batch, Op};
pub use writer::LogWriter;

/// Controls when the log is fsync'd to disk.
///
/// Trade-off: durability vs throughput.
///   - EveryWrite: zero data loss, but each committed record waits for disk
///   - EveryNWrites: batched durability, lose up to N commits on crash
///   - Never: the OS decides; fastest, widest loss window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync after every committed record. Safest, slowest. The default.
    EveryWrite,
    /// fsync every N committed records. Batched durability.
    EveryNWrites(usize),
    /// Never fsync explicitly; leave flushing to the OS page cache.
    Never,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy::EveryWrite
    }
}
