use std::{marker::PhantomData, ops::Range};

use rocksdb::DB;

use crate::error::Error;

use super::encdec::{Decode, Encode, EncodeBuilder, prefix_key_range};

/// A typed index table. Every key the table writes starts with its one-byte
/// tag, so each table owns one contiguous, mutually disjoint key range and
/// forward iteration over that range visits keys in tuple order.
pub trait Table {
    /// Tag byte prefixed to every key of this table.
    const TAG: u8;
    /// Prefix bytes to strip before decoding a stored key.
    const PREFIX_LEN: usize = 1;
    /// Key type for the table.
    type Key: Encode + Decode;
    /// Value type for the table.
    type Value: Encode + Decode;

    /// Encodes the full key including the table tag.
    fn encode_key(key: &Self::Key) -> Vec<u8> {
        EncodeBuilder::new().append(&Self::TAG).append(key).build()
    }

    /// Encodes an iteration range with optional start and end bounds, both
    /// relative to the table's keyspace. A missing bound falls back to the
    /// edge of the table's own range.
    fn encode_range(start: Option<&impl Encode>, to: Option<&impl Encode>) -> Range<Vec<u8>> {
        let table_range = prefix_key_range(&[Self::TAG]);

        let start_key = match start {
            Some(start) => EncodeBuilder::new().append(&Self::TAG).append(start).build(),
            None => table_range.start,
        };

        let end_key = match to {
            Some(to) => EncodeBuilder::new().append(&Self::TAG).append(to).build(),
            None => table_range.end,
        };

        start_key..end_key
    }

    /// Range covering every key whose leading components equal `partial`.
    fn encode_prefix_range(partial: &impl Encode) -> Range<Vec<u8>> {
        let prefix = EncodeBuilder::new().append(&Self::TAG).append(partial).build();

        prefix_key_range(&prefix)
    }
}

#[macro_export]
macro_rules! define_table {
    {
        name: $name:ident,
        tag: $tag:expr,
        key: $key_type:ty,
        value: $value_type:ty
    } => {
        pub struct $name;

        impl $crate::storage::table::Table for $name {
            const TAG: u8 = $tag as u8;
            type Key = $key_type;
            type Value = $value_type;
        }
    };
}

type RocksIterator<'a> = rocksdb::DBIteratorWithThreadMode<'a, DB>;

pub struct TableIterator<'a, T>(RocksIterator<'a>, PhantomData<T>);

impl<'a, T> TableIterator<'a, T> {
    pub fn new(inner: RocksIterator<'a>) -> Self {
        Self(inner, Default::default())
    }
}

impl<T> Iterator for TableIterator<'_, T>
where
    T: Table,
{
    type Item = Result<(T::Key, T::Value), Error>;

    fn next(&mut self) -> Option<Result<(T::Key, T::Value), Error>> {
        match self.0.next() {
            Some(Ok((key, value))) => {
                let key_out = match T::Key::decode_all(&key[T::PREFIX_LEN..]) {
                    Ok(k) => k,
                    Err(e) => return Some(Err(e.into())),
                };

                let value_out = match T::Value::decode_all(&value[..]) {
                    Ok(v) => v,
                    Err(e) => return Some(Err(e.into())),
                };

                Some(Ok((key_out, value_out)))
            }
            Some(Err(err)) => Some(Err(err.into())),
            None => None,
        }
    }
}
