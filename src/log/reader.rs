use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::log::record::Batch;

/// Reads batch records from a log file for recovery.
///
/// Loads the whole file into memory, then iterates record by record.
/// If a record fails its CRC, iteration stops — it was a partial write
/// from a crash, and all preceding records are valid. The iterator
/// exposes how far it got so the engine can truncate the torn tail
/// before appending again (stale bytes after the tail would otherwise
/// hide every later record from the next replay).
pub struct LogReader {
    data: Vec<u8>,
}

impl LogReader {
    /// Open a log file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(LogReader { data })
    }

    /// Total length of the file in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterator over all valid batches from the start of the file.
    pub fn iter(&self) -> BatchIterator<'_> {
        BatchIterator {
            data: &self.data,
            offset: 0,
        }
    }
}

/// Iterator over log batches. Yields batches until EOF or the first
/// corrupt record, whichever comes first.
pub struct BatchIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl BatchIterator<'_> {
    /// Byte offset of the last valid record boundary reached so far.
    /// After the iterator returns `None`, anything past this offset is
    /// a torn tail (or nothing, if the whole file was valid).
    pub fn offset(&self) -> u64 {
        self.offset as u64
    }
}

impl Iterator for BatchIterator<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        match Batch::decode(&self.data[self.offset..]) {
            Ok((batch, consumed)) => {
                self.offset += consumed;
                Some(batch)
            }
            Err(_) => None,
        }
    }
}
