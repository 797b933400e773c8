//! The physical store: a directory of append-only log generations plus
//! an in-memory ordered index rebuilt from them at open.
//!
//! Every committed mutation is one CRC-framed batch record in the
//! active generation. The index (`BTreeMap`) serves reads and ordered
//! scans; the log serves durability and recovery. Compaction rewrites
//! the live index into a fresh generation and deletes the old files.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::log::{Batch, LogReader, LogWriter, Op, SyncPolicy};
use crate::types::{Direction, Key, Value};

const LOCK_FILE: &str = "LOCK";
const LOG_EXTENSION: &str = "log";

/// Ops per snapshot record during compaction. Bounds the size of any
/// single record in a compacted generation.
const COMPACTION_CHUNK_OPS: usize = 1024;

/// Tuning knobs for a store.
#[derive(Debug, Clone)]
pub struct Options {
    /// When committed records are fsync'd. `EveryWrite` (the default)
    /// makes every non-transactional mutation and every commit durable
    /// before the call returns.
    pub sync_policy: SyncPolicy,
    /// Obsolete log bytes that must accumulate before a mutation
    /// triggers compaction (dead bytes must also exceed live bytes).
    /// 0 disables automatic compaction.
    pub compaction_threshold: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sync_policy: SyncPolicy::EveryWrite,
            compaction_threshold: 4 * 1024 * 1024,
        }
    }
}

/// Advisory single-writer lock on a store directory.
///
/// Created with `create_new` at open, removed at close (or on Drop).
/// After a hard crash the leftover file must be removed manually.
struct LockFile {
    path: PathBuf,
    released: bool,
}

impl LockFile {
    fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(LockFile {
                path,
                released: false,
            }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::Locked(dir.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Committed state plus byte accounting for compaction decisions.
#[derive(Default)]
struct Index {
    map: BTreeMap<Key, Value>,
    /// Bytes of key+value data currently live.
    live_bytes: u64,
    /// Bytes of key+value data made obsolete by overwrites and deletes.
    dead_bytes: u64,
}

impl Index {
    fn apply(&mut self, op: Op) {
        match op {
            Op::Put { key, value } => {
                let key_len = key.len() as u64;
                let value_len = value.len() as u64;
                if let Some(old) = self.map.insert(key, value) {
                    // The replaced pair's bytes are now garbage in the log.
                    let old_size = key_len + old.len() as u64;
                    self.live_bytes -= old_size;
                    self.dead_bytes += old_size;
                }
                self.live_bytes += key_len + value_len;
            }
            Op::Delete { key } => {
                if let Some(old) = self.map.remove(&key) {
                    let size = (key.len() + old.len()) as u64;
                    self.live_bytes -= size;
                    self.dead_bytes += size;
                }
            }
            Op::Clear => {
                self.dead_bytes += self.live_bytes;
                self.live_bytes = 0;
                self.map.clear();
            }
        }
    }
}

/// The storage engine: owns the directory, the lock, the active log
/// generation, and the committed index.
pub struct Engine {
    dir: PathBuf,
    options: Options,
    lock: LockFile,
    writer: LogWriter,
    active_gen: u64,
    index: Index,
}

impl Engine {
    /// Open (creating if absent) the store at `dir` and replay its log
    /// generations into the index.
    pub fn open(dir: &Path, options: Options) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let lock = LockFile::acquire(dir)?;

        let gens = list_generations(dir)?;
        let active_gen = gens.last().copied().unwrap_or(1);

        let mut index = Index::default();
        let mut batches = 0u64;
        let mut tail_offset = 0u64;
        for (i, generation) in gens.iter().enumerate() {
            let path = generation_path(dir, *generation);
            let reader = LogReader::open(&path)?;
            let mut iter = reader.iter();
            for batch in iter.by_ref() {
                batches += 1;
                for op in batch.ops {
                    index.apply(op);
                }
            }
            let valid = iter.offset();
            if valid < reader.len() {
                if i + 1 == gens.len() {
                    // Torn tail from a crash mid-write. Everything before
                    // it is valid; cut it off so appends start at a clean
                    // record boundary.
                    tracing::warn!(
                        generation = *generation,
                        valid,
                        len = reader.len(),
                        "truncating torn log tail"
                    );
                    let file = OpenOptions::new().write(true).open(&path)?;
                    file.set_len(valid)?;
                    file.sync_all()?;
                } else {
                    return Err(Error::Corruption(format!(
                        "corrupt record in sealed log generation {}",
                        generation
                    )));
                }
            }
            tail_offset = valid;
        }

        let writer = LogWriter::open(
            &generation_path(dir, active_gen),
            tail_offset,
            options.sync_policy,
        )?;

        tracing::debug!(
            dir = %dir.display(),
            generations = gens.len(),
            batches,
            records = index.map.len(),
            "opened store"
        );

        Ok(Engine {
            dir: dir.to_path_buf(),
            options,
            lock,
            writer,
            active_gen,
            index,
        })
    }

    /// Committed lookup. No side effects.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.index.map.get(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.map.contains_key(key)
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.index.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.map.is_empty()
    }

    /// Durably apply a batch: one log record (all ops or none survive a
    /// crash), then the index. If the log write fails, committed state
    /// is unchanged.
    pub fn apply(&mut self, batch: Batch) -> Result<()> {
        self.writer.append(&batch)?;
        for op in batch.ops {
            self.index.apply(op);
        }
        self.maybe_compact()
    }

    /// Ordered view of committed records, optionally starting at a key
    /// (inclusive bound toward the direction of travel).
    pub fn range(
        &self,
        direction: Direction,
        start: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (&Key, &Value)> + '_> {
        match direction {
            Direction::Ascending => {
                let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match start {
                    Some(s) => (Bound::Included(s), Bound::Unbounded),
                    None => (Bound::Unbounded, Bound::Unbounded),
                };
                Box::new(self.index.map.range::<[u8], _>(bounds))
            }
            Direction::Descending => {
                let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match start {
                    Some(s) => (Bound::Unbounded, Bound::Included(s)),
                    None => (Bound::Unbounded, Bound::Unbounded),
                };
                Box::new(self.index.map.range::<[u8], _>(bounds).rev())
            }
        }
    }

    fn maybe_compact(&mut self) -> Result<()> {
        let threshold = self.options.compaction_threshold;
        if threshold == 0 {
            return Ok(());
        }
        if self.index.dead_bytes >= threshold && self.index.dead_bytes >= self.index.live_bytes {
            self.compact()?;
        }
        Ok(())
    }

    /// Rewrite the live index into a fresh generation and delete the
    /// old files. The old generation is only removed AFTER the new one
    /// is fully written and fsync'd — removing it earlier loses data.
    pub fn compact(&mut self) -> Result<()> {
        let next_gen = self.active_gen + 1;
        let path = generation_path(&self.dir, next_gen);

        // Snapshot writes are batched without per-record fsync; one
        // sync at the end seals the generation.
        let mut writer = LogWriter::open(&path, 0, SyncPolicy::Never)?;
        let mut batch = Batch { ops: Vec::new() };
        for (key, value) in &self.index.map {
            batch.ops.push(Op::Put {
                key: key.clone(),
                value: value.clone(),
            });
            if batch.ops.len() >= COMPACTION_CHUNK_OPS {
                writer.append(&batch)?;
                batch.ops.clear();
            }
        }
        if !batch.ops.is_empty() {
            writer.append(&batch)?;
        }
        writer.sync()?;
        let sealed_offset = writer.offset();
        drop(writer);
        sync_dir(&self.dir)?;

        // The new generation is durable; retire the old ones.
        for generation in list_generations(&self.dir)? {
            if generation != next_gen {
                fs::remove_file(generation_path(&self.dir, generation))?;
            }
        }
        sync_dir(&self.dir)?;

        self.writer = LogWriter::open(&path, sealed_offset, self.options.sync_policy)?;
        self.active_gen = next_gen;
        tracing::debug!(
            generation = next_gen,
            reclaimed = self.index.dead_bytes,
            live = self.index.live_bytes,
            "compacted log"
        );
        self.index.dead_bytes = 0;
        Ok(())
    }

    /// Force everything buffered down to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.sync()
    }

    /// Sync and release the store. Data written before a clean close is
    /// recoverable by the next open of the same path.
    pub fn close(mut self) -> Result<()> {
        self.writer.sync()?;
        self.lock.release()?;
        Ok(())
    }
}

fn generation_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{:06}.{}", generation, LOG_EXTENSION))
}

/// Generation numbers present in the directory, ascending.
fn list_generations(dir: &Path) -> Result<Vec<u64>> {
    let mut gens = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Ok(generation) = stem.parse::<u64>() {
                gens.push(generation);
            }
        }
    }
    gens.sort_unstable();
    Ok(gens)
}

fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}
