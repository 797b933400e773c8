use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::log::record::Batch;
use crate::log::SyncPolicy;

/// Appends batch records to a log generation file.
///
/// Every committed batch must be durable before it's acknowledged to
/// the caller (under the default sync policy). Two layers of buffering:
///   BufWriter.flush()  → Rust buffer → OS page cache
///   file.sync_all()    → OS page cache → physical disk
///
/// A failed append must not leave its bytes behind: garbage past the
/// last acknowledged boundary would make every later record a torn
/// tail at the next recovery, and a retained buffer could land a
/// record whose caller was told it failed. On error the file is rolled
/// back to the last acknowledged record boundary; if that rollback
/// itself fails, the writer refuses all further work.
pub struct LogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    offset: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
    failed: bool,
}

impl LogWriter {
    /// Open a log file for appending. `offset` is the current valid
    /// length of the file (0 for a fresh file; the last valid record
    /// boundary after recovery truncation).
    pub fn open(path: &Path, offset: u64, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(LogWriter {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            offset,
            sync_policy,
            writes_since_sync: 0,
            failed: false,
        })
    }

    /// Append a batch record. Depending on the policy, fsyncs before
    /// returning — only then is the batch durable. On failure the
    /// record's bytes are rolled back; either way the committed prefix
    /// of the file stays intact.
    pub fn append(&mut self, batch: &Batch) -> Result<()> {
        if self.failed {
            return Err(disabled());
        }
        let encoded = batch.encode()?;
        match self.write_durable(&encoded) {
            Ok(()) => {
                self.offset += encoded.len() as u64;
                Ok(())
            }
            Err(e) => {
                if self.rewind().is_err() {
                    self.failed = true;
                }
                Err(e.into())
            }
        }
    }

    fn write_durable(&mut self, encoded: &[u8]) -> io::Result<()> {
        self.writer.write_all(encoded)?;
        self.writer.flush()?;
        self.writes_since_sync += 1;

        match self.sync_policy {
            SyncPolicy::EveryWrite => {
                self.writer.get_ref().sync_all()?;
                self.writes_since_sync = 0;
            }
            SyncPolicy::EveryNWrites(n) => {
                if self.writes_since_sync >= n {
                    self.writer.get_ref().sync_all()?;
                    self.writes_since_sync = 0;
                }
            }
            SyncPolicy::Never => {}
        }

        Ok(())
    }

    /// Roll the file back to the last acknowledged record boundary.
    /// The failed record's bytes may be split between the buffer and
    /// the file; the fresh handle discards the buffer and the truncate
    /// removes whatever reached the file.
    fn rewind(&mut self) -> io::Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        // The old writer flushes once more on drop; that must happen
        // before the truncate so its bytes are removed too.
        drop(std::mem::replace(&mut self.writer, BufWriter::new(file)));
        self.writer.get_ref().set_len(self.offset)?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_sync = 0;
        Ok(())
    }

    /// Force fsync. Ensures all buffered records are durable.
    pub fn sync(&mut self) -> Result<()> {
        if self.failed {
            return Err(disabled());
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_sync = 0;
        Ok(())
    }

    /// Current file offset (bytes written so far).
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

fn disabled() -> Error {
    Error::Io(io::Error::other(
        "log writer disabled by an unrecoverable write failure",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::record::Op;
    use crate::log::LogReader;

    #[test]
    fn rewind_restores_the_boundary_so_later_appends_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000001.log");

        let first = Batch::single(Op::put(&b"safe"[..], &b"1"[..]));
        let mut writer = LogWriter::open(&path, 0, SyncPolicy::EveryWrite).unwrap();
        writer.append(&first).unwrap();

        // Partial bytes of a failed record land past the boundary.
        let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
        raw.write_all(&[0xDE, 0xAD, 0xBE]).unwrap();
        drop(raw);

        writer.rewind().unwrap();

        let second = Batch::single(Op::put(&b"after"[..], &b"2"[..]));
        writer.append(&second).unwrap();
        drop(writer);

        // Without the rewind, `second` would sit behind garbage and be
        // discarded as a torn tail on replay.
        let reader = LogReader::open(&path).unwrap();
        let replayed: Vec<Batch> = reader.iter().collect();
        assert_eq!(replayed, vec![first.clone(), second.clone()]);
        assert_eq!(
            reader.len(),
            (first.encoded_size() + second.encoded_size()) as u64
        );
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn unrecoverable_append_failure_is_sticky() {
        // Writes to /dev/full fail with ENOSPC, and the rollback's
        // truncate fails on a character device, so the writer shuts
        // down instead of accepting appends it cannot keep safe.
        let path = Path::new("/dev/full");
        let mut writer = LogWriter::open(path, 0, SyncPolicy::EveryWrite).unwrap();
        let batch = Batch::single(Op::put(&b"key"[..], &b"val"[..]));

        assert!(writer.append(&batch).is_err());
        assert!(writer.append(&batch).is_err());
        assert!(writer.sync().is_err());
    }

    #[test]
    fn every_n_writes_policy_syncs_on_the_nth_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000001.log");
        let mut writer = LogWriter::open(&path, 0, SyncPolicy::EveryNWrites(3)).unwrap();
        let batch = Batch::single(Op::put(&b"k"[..], &b"v"[..]));

        writer.append(&batch).unwrap();
        writer.append(&batch).unwrap();
        assert_eq!(writer.writes_since_sync, 2);

        writer.append(&batch).unwrap();
        assert_eq!(writer.writes_since_sync, 0);

        writer.append(&batch).unwrap();
        assert_eq!(writer.writes_since_sync, 1);
        writer.sync().unwrap();
        assert_eq!(writer.writes_since_sync, 0);
    }
}
