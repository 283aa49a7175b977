pub(crate) mod review;

use std::{marker::PhantomData, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use sled::{Db, Tree};

const REVIEW_PARTITION: &str = "reviews";

#[derive(Clone)]
pub(crate) struct Database {
    db: Db,
    review_partition: Tree,
}

impl Database {
    pub(crate) fn connect(path: &Path) -> Result<Database> {
        let db = sled::open(path)
            .with_context(|| format!("cannot open database at {}", path.display()))?;
        let review_partition = db.open_tree(REVIEW_PARTITION)?;
        Ok(Database {
            db,
            review_partition,
        })
    }

    /// Monotonic record id; big-endian encoding keeps key order equal to
    /// insertion order.
    fn next_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    fn insert<T: Serialize>(id: u64, value: &T, partition: &Tree) -> Result<()> {
        partition.insert(id.to_be_bytes(), bincode::serialize(value)?)?;
        Ok(())
    }
}

/// Decode a stored key/value pair into a domain value.
pub(crate) trait TryFromKeyValue: Sized {
    fn try_from_key_value(key: &[u8], value: &[u8]) -> Result<Self>;
}

pub(crate) fn parse_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| anyhow::anyhow!("invalid key in database: {key:02x?}"))?;
    Ok(u64::from_be_bytes(bytes))
}

pub(crate) struct Iter<T> {
    inner: sled::Iter,
    _marker: PhantomData<T>,
}

impl<T> Iter<T> {
    fn new(inner: sled::Iter) -> Self {
        Iter {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: TryFromKeyValue> Iterator for Iter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| {
            let (key, value) = item.context("failed to read database")?;
            T::try_from_key_value(&key, &value)
        })
    }
}

impl<T: TryFromKeyValue> DoubleEndedIterator for Iter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|item| {
            let (key, value) = item.context("failed to read database")?;
            T::try_from_key_value(&key, &value)
        })
    }
}
