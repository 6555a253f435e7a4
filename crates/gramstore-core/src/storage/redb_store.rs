//! # redb-backed Key-Value Storage
//!
//! A disk-backed ordered byte store using the redb embedded database.
//!
//! redb provides:
//! - ACID transactions (every `put`/`batch_put` is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! All records live in a single `&[u8] -> &[u8]` table so that the byte order
//! of keys, and therefore every prefix scan, is controlled by the key codec.

use crate::kv::{KvPair, KvStore, RangeScan};
use crate::primitives::SCAN_PAGE_SIZE;
use crate::GramError;
use redb::{Database, ReadableDatabase, TableDefinition};
use std::collections::VecDeque;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// The single ordered table holding metadata, token and count records.
const KV: TableDefinition<&[u8], &[u8]> = TableDefinition::new("kv");

/// A disk-backed ordered store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Location of the database file.
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GramError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(|e| GramError::Storage(e.to_string()))?;

        // Create the table up front so read transactions never miss it.
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| GramError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(KV)
                .map_err(|e| GramError::Storage(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| GramError::Storage(e.to_string()))?;
        }

        Ok(Self { db, path })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<bool, GramError> {
        self.db
            .compact()
            .map_err(|e| GramError::Storage(e.to_string()))
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GramError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| GramError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(KV)
            .map_err(|e| GramError::Storage(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| GramError::Storage(e.to_string()))?
            .map(|v| v.value().to_vec());
        Ok(value)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GramError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| GramError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(KV)
                .map_err(|e| GramError::Storage(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| GramError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| GramError::Storage(e.to_string()))?;
        Ok(())
    }

    fn batch_put(&mut self, batch: &[KvPair]) -> Result<(), GramError> {
        if batch.is_empty() {
            return Ok(());
        }

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| GramError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(KV)
                .map_err(|e| GramError::Storage(e.to_string()))?;
            for (key, value) in batch {
                table
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(|e| GramError::Storage(e.to_string()))?;
            }
        }
        // An uncommitted transaction is rolled back when dropped, so an
        // early return above leaves the store untouched.
        write_txn
            .commit()
            .map_err(|e| GramError::Storage(e.to_string()))?;
        Ok(())
    }

    fn range_scan(&self, low: &[u8], high: Option<&[u8]>) -> Result<RangeScan<'_>, GramError> {
        if high.is_some_and(|high| high <= low) {
            return Ok(Box::new(std::iter::empty()));
        }

        Ok(Box::new(PagedRange {
            db: &self.db,
            cursor: Bound::Included(low.to_vec()),
            high: high.map(<[u8]>::to_vec),
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }
}

// =============================================================================
// PAGED RANGE
// =============================================================================

/// Lazy range iterator that reads `SCAN_PAGE_SIZE` entries per read
/// transaction and resumes after the last key it returned.
///
/// Writes need `&mut RedbStore`, so no write can land between pages while
/// this iterator borrows the store.
struct PagedRange<'a> {
    db: &'a Database,
    cursor: Bound<Vec<u8>>,
    high: Option<Vec<u8>>,
    buffer: VecDeque<KvPair>,
    exhausted: bool,
}

impl PagedRange<'_> {
    fn fill(&mut self) -> Result<(), GramError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| GramError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(KV)
            .map_err(|e| GramError::Storage(e.to_string()))?;

        let lower: Bound<&[u8]> = self.cursor.as_ref().map(Vec::as_slice);
        let upper: Bound<&[u8]> = self
            .high
            .as_deref()
            .map_or(Bound::Unbounded, Bound::Excluded);

        let range = table
            .range::<&[u8]>((lower, upper))
            .map_err(|e| GramError::Storage(e.to_string()))?;
        for entry in range.take(SCAN_PAGE_SIZE) {
            let (key, value) = entry.map_err(|e| GramError::Storage(e.to_string()))?;
            self.buffer
                .push_back((key.value().to_vec(), value.value().to_vec()));
        }

        if self.buffer.len() < SCAN_PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some((last, _)) = self.buffer.back() {
            self.cursor = Bound::Excluded(last.clone());
        }
        Ok(())
    }
}

impl Iterator for PagedRange<'_> {
    type Item = Result<KvPair, GramError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
