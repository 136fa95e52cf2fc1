use std::{ops::Range, path::PathBuf, sync::Arc};

use itertools::Itertools;
use rocksdb::{DB, Options, ReadOptions, WriteBatch};
use tracing::{debug, info};

use crate::error::Error;

use super::{
    encdec::{Decode, Encode},
    table::{Table, TableIterator},
};

pub type RawKey = Vec<u8>;

/// Handle on the embedded ordered store. Cheap to clone; the single logical
/// writer and any number of readers share one handle.
#[derive(Clone)]
pub struct StorageHandler {
    db: Arc<DB>,
}

impl StorageHandler {
    pub fn open(path: PathBuf) -> Result<Self, Error> {
        info!("opening db at '{}'", path.display());

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);

        let db = DB::open(&db_opts, path)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Point lookup. Absence is a normal result, not an error.
    pub fn get<T>(&self, key: &T::Key) -> Result<Option<T::Value>, Error>
    where
        T: Table,
    {
        let encoded_key = T::encode_key(key);

        debug!("fetching {}", hex::encode(&encoded_key));

        self.db
            .get(encoded_key)?
            .map(|bytes| T::Value::decode_all(&bytes).map_err(Into::into))
            .transpose()
    }

    /// Batched point lookup, preserving the association between each key and
    /// its (possibly absent) value.
    pub fn multi_get<T>(&self, keys: Vec<T::Key>) -> Result<Vec<(T::Key, Option<T::Value>)>, Error>
    where
        T: Table,
    {
        let encoded_keys = keys.iter().map(|key| T::encode_key(key)).collect::<Vec<_>>();

        let fetched = self.db.multi_get(&encoded_keys);

        let mut out = Vec::with_capacity(keys.len());

        for (key, value) in keys.into_iter().zip_eq(fetched) {
            let value = match value? {
                Some(bytes) => Some(T::Value::decode_all(&bytes)?),
                None => None,
            };

            out.push((key, value));
        }

        Ok(out)
    }

    /// Opens an atomic batch. Mutations buffer in the handle and become
    /// visible all-or-nothing at `commit`.
    pub fn atomic(&self) -> AtomicBatch {
        AtomicBatch {
            db: self.db.clone(),
            batch: WriteBatch::default(),
        }
    }

    /// Forward traversal over `[range.start, range.end)`, decoding each
    /// entry. The iterator observes a snapshot taken at creation and none of
    /// the effects of uncommitted batches.
    pub fn iter<T>(&self, range: Range<RawKey>) -> TableIterator<'_, T>
    where
        T: Table,
    {
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(range);

        let inner = self.db.iterator_opt(rocksdb::IteratorMode::Start, read_opts);

        TableIterator::new(inner)
    }
}

/// Buffered multi-key mutation, committed all-or-nothing and ordered after
/// prior commits on the same store.
pub struct AtomicBatch {
    db: Arc<DB>,
    batch: WriteBatch,
}

impl AtomicBatch {
    pub fn set<T>(&mut self, key: &T::Key, value: &T::Value)
    where
        T: Table,
    {
        let encoded_key = T::encode_key(key);

        debug!("setting {}", hex::encode(&encoded_key));

        self.batch.put(encoded_key, value.encode());
    }

    pub fn delete<T>(&mut self, key: &T::Key)
    where
        T: Table,
    {
        let encoded_key = T::encode_key(key);

        debug!("deleting {}", hex::encode(&encoded_key));

        self.batch.delete(encoded_key);
    }

    pub fn commit(self) -> Result<(), Error> {
        self.db.write(self.batch)?;

        Ok(())
    }
}
