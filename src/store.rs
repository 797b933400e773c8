//! The caller-facing session object.
//!
//! A [`Store`] binds one open session to one store directory. All data
//! operations route either straight to the engine or, while a
//! transaction is active, through the transaction overlay. Closing the
//! handle (explicitly or on Drop) rolls back any open transaction,
//! syncs, and releases the directory lock; the data stays on disk.

use std::path::Path;

use crate::cursor::Cursor;
use crate::engine::{Engine, Options};
use crate::error::{Error, Result};
use crate::log::{Batch, Op};
use crate::txn::{Overlay, Visibility};
use crate::types::{Direction, Key, Value};

struct Inner {
    engine: Engine,
    txn: Option<Overlay>,
}

/// An open session against one store path.
///
/// # Example
///
/// ```no_run
/// use burrow::{Direction, Store};
///
/// let mut store = Store::open("/tmp/mydb")?;
/// store.put(b"key1", b"val1")?;
/// assert_eq!(store.get(b"key1")?, Some(b"val1".to_vec()));
/// for (key, value) in store.cursor(Direction::Ascending, None)? {
///     println!("{:?} = {:?}", key, value);
/// }
/// store.close()?;
/// # Ok::<(), burrow::Error>(())
/// ```
pub struct Store {
    /// `None` once closed. Every data operation on a closed handle
    /// fails with [`Error::Closed`].
    inner: Option<Inner>,
}

impl Store {
    /// Open the store at `path` with default options, creating it if
    /// absent. Fails with `InvalidArgument` on an empty path and with
    /// `Locked` if another handle has the store open. After a hard
    /// crash the leftover `LOCK` file must be removed manually.
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        Store::open_with(path, Options::default())
    }

    /// Open with explicit options.
    pub fn open_with(path: impl AsRef<Path>, options: Options) -> Result<Store> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("store path is empty".into()));
        }
        let engine = Engine::open(path, options)?;
        Ok(Store {
            inner: Some(Inner { engine, txn: None }),
        })
    }

    /// Scoped open: runs `body` with an open handle and closes it on
    /// every exit path, returning the body's result. If the body fails,
    /// its error is propagated (a close error is reported only when the
    /// body succeeded).
    pub fn with<P, T, F>(path: P, body: F) -> Result<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Store) -> Result<T>,
    {
        let mut store = Store::open(path)?;
        let result = body(&mut store);
        match result {
            Ok(value) => {
                store.close()?;
                Ok(value)
            }
            Err(e) => {
                let _ = store.close();
                Err(e)
            }
        }
    }

    fn inner(&self) -> Result<&Inner> {
        self.inner.as_ref().ok_or(Error::Closed)
    }

    fn inner_mut(&mut self) -> Result<&mut Inner> {
        self.inner.as_mut().ok_or(Error::Closed)
    }

    /// Look up the value for `key`. Absence is `None`, not an error.
    /// With a transaction active, pending writes win over committed
    /// state.
    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        let inner = self.inner()?;
        if let Some(overlay) = &inner.txn {
            match overlay.get(key) {
                Visibility::Found(value) => return Ok(Some(value.clone())),
                Visibility::Deleted => return Ok(None),
                Visibility::Unknown => {}
            }
        }
        Ok(inner.engine.get(key).cloned())
    }

    /// Insert or overwrite the record for `key`. Outside a transaction
    /// the write is durable before this returns (under the default sync
    /// policy); inside one it is buffered until commit.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key is empty".into()));
        }
        let Inner { engine, txn } = self.inner_mut()?;
        match txn {
            Some(overlay) => {
                overlay.put(key.to_vec(), value.to_vec());
                Ok(())
            }
            None => engine.apply(Batch::single(Op::put(key, value))),
        }
    }

    /// Remove the record for `key`, returning its prior value. Deleting
    /// an absent key returns `None`; it is not an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<Option<Value>> {
        let Inner { engine, txn } = self.inner_mut()?;
        match txn {
            Some(overlay) => {
                let prior = match overlay.get(key) {
                    Visibility::Found(value) => Some(value.clone()),
                    Visibility::Deleted => None,
                    Visibility::Unknown => engine.get(key).cloned(),
                };
                if prior.is_some() {
                    overlay.delete(key.to_vec());
                }
                Ok(prior)
            }
            None => {
                let prior = engine.get(key).cloned();
                if prior.is_some() {
                    engine.apply(Batch::single(Op::delete(key)))?;
                }
                Ok(prior)
            }
        }
    }

    /// Remove every record.
    pub fn clear(&mut self) -> Result<()> {
        let Inner { engine, txn } = self.inner_mut()?;
        match txn {
            Some(overlay) => {
                overlay.clear();
                Ok(())
            }
            None => engine.apply(Batch::single(Op::Clear)),
        }
    }

    /// Number of records currently visible (committed state adjusted by
    /// the active transaction's pending writes, if any).
    pub fn len(&self) -> Result<usize> {
        let inner = self.inner()?;
        Ok(match &inner.txn {
            None => inner.engine.len(),
            Some(overlay) if overlay.is_cleared() => overlay.put_count(),
            Some(overlay) => {
                let mut count = inner.engine.len();
                for (key, value) in overlay.writes() {
                    match (value.is_some(), inner.engine.contains(key)) {
                        (true, false) => count += 1,
                        (false, true) => count -= 1,
                        _ => {}
                    }
                }
                count
            }
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Ordered iteration over visible records. Ascending starts at the
    /// smallest key ≥ `start` (or the smallest overall); descending at
    /// the largest key ≤ `start` (or the largest overall). The returned
    /// cursor is lazy and one-shot; call again for a fresh sequence.
    pub fn cursor(&self, direction: Direction, start: Option<&[u8]>) -> Result<Cursor<'_>> {
        let inner = self.inner()?;
        let overlay: Box<dyn Iterator<Item = (&Key, &Option<Value>)> + '_> = match &inner.txn {
            Some(overlay) => overlay.range(direction, start),
            None => Box::new(std::iter::empty()),
        };
        let committed: Box<dyn Iterator<Item = (&Key, &Value)> + '_> = match &inner.txn {
            // A pending clear hides all committed records.
            Some(overlay) if overlay.is_cleared() => Box::new(std::iter::empty()),
            _ => inner.engine.range(direction, start),
        };
        Ok(Cursor::new(committed, overlay, direction))
    }

    /// Ascending cursor over the whole store.
    pub fn iter(&self) -> Result<Cursor<'_>> {
        self.cursor(Direction::Ascending, None)
    }

    /// Start a transaction. Fails with `NestedTransaction` if one is
    /// already active on this handle; the active transaction's buffered
    /// state is left untouched.
    pub fn begin_transaction(&mut self) -> Result<()> {
        let inner = self.inner_mut()?;
        if inner.txn.is_some() {
            return Err(Error::NestedTransaction);
        }
        inner.txn = Some(Overlay::new());
        Ok(())
    }

    /// Whether a transaction is active on this handle.
    pub fn in_transaction(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.txn.is_some())
    }

    /// Atomically apply the active transaction's buffered mutations:
    /// all of them become durable, or (on engine failure) none do and
    /// committed state is unchanged. Either way the transaction ends;
    /// a failed commit is not retried.
    pub fn commit(&mut self) -> Result<()> {
        let inner = self.inner_mut()?;
        let overlay = inner.txn.take().ok_or(Error::NoActiveTransaction)?;
        let batch = overlay.into_batch();
        if batch.ops.is_empty() {
            return Ok(());
        }
        inner.engine.apply(batch)
    }

    /// Discard the active transaction's buffered mutations. Committed
    /// state is untouched.
    pub fn rollback(&mut self) -> Result<()> {
        let inner = self.inner_mut()?;
        inner.txn.take().ok_or(Error::NoActiveTransaction)?;
        Ok(())
    }

    /// Scoped transaction: begins, runs `body`, commits if it returns
    /// `Ok`, rolls back and re-propagates the original error if it
    /// returns `Err`. The body must not commit or roll back itself.
    pub fn transaction<T, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T>,
    {
        self.begin_transaction()?;
        match body(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.rollback();
                Err(e)
            }
        }
    }

    /// Rewrite the log down to live data. Normally automatic; exposed
    /// for callers that want to reclaim space at a quiet moment.
    pub fn compact(&mut self) -> Result<()> {
        self.inner_mut()?.engine.compact()
    }

    /// Force everything buffered down to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.inner_mut()?.engine.sync()
    }

    /// Close the handle: roll back any active transaction, sync, and
    /// release the store. A second close is a no-op. The data remains
    /// on disk for the next open.
    pub fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            // Dropping the overlay is the rollback.
            Some(inner) => inner.engine.close(),
            None => Ok(()),
        }
    }

    /// Whether this handle has been closed. Always safe to call.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
