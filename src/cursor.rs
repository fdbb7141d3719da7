//! External iteration over a `ChainedHashMap`.
//!
//! Entries are visited bucket by bucket in ascending index, and within a
//! bucket newest first. That order is only meaningful between mutations:
//! growing the table reassigns every entry to a new bucket and position.
//!
//! A [`Cursor`] borrows its table shared, so the table cannot be mutated
//! while one is alive. Dropping the cursor releases it.

use crate::chain;
use crate::chained_hash_map::{ChainedHashMap, Entry};
use crate::hash::BuildAdditiveHasher;
use core::hash::BuildHasher;
use core::iter::FusedIterator;

/// A position in a table: a bucket index plus a cursor in that bucket's
/// chain. Either positioned on a live entry or exhausted.
pub struct Cursor<'a, V, S = BuildAdditiveHasher> {
    map: &'a ChainedHashMap<V, S>,
    bucket: usize,
    chain: chain::Cursor<'a, Entry<V>>,
}

impl<'a, V, S> Cursor<'a, V, S>
where
    S: BuildHasher,
{
    /// Positions a cursor on the first entry of `map`, or exhausted if
    /// the map is empty.
    pub fn new(map: &'a ChainedHashMap<V, S>) -> Self {
        let chain = map.buckets()[0].cursor(map.entries());
        let mut cursor = Self {
            map,
            bucket: 0,
            chain,
        };
        cursor.skip_exhausted();
        cursor
    }

    // Moves past empty or finished chains until positioned or out of buckets.
    fn skip_exhausted(&mut self) {
        while self.chain.at_end() {
            self.bucket += 1;
            match self.map.buckets().get(self.bucket) {
                Some(next) if next.is_empty() => continue,
                Some(next) => self.chain = next.cursor(self.map.entries()),
                None => return,
            }
        }
    }

    /// Steps to the next entry; returns whether the cursor is still
    /// positioned. Advancing an exhausted cursor is a no-op.
    pub fn advance(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.chain.advance();
        self.skip_exhausted();
        !self.at_end()
    }

    pub fn at_end(&self) -> bool {
        self.chain.at_end()
    }

    /// Key under the cursor, `None` once exhausted.
    pub fn current(&self) -> Option<&'a [u8]> {
        self.chain.current().map(|e| &*e.key)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.chain.current().map(|e| &e.value)
    }

    pub fn entry(&self) -> Option<(&'a [u8], &'a V)> {
        self.chain.current().map(|e| (&*e.key, &e.value))
    }

    /// Index of the bucket the cursor is in; equals the table's capacity
    /// once exhausted.
    pub fn bucket(&self) -> usize {
        if self.at_end() {
            self.map.capacity()
        } else {
            self.bucket
        }
    }
}

/// Iterator over `(key, value)` pairs in cursor order.
pub struct Iter<'a, V, S = BuildAdditiveHasher> {
    cursor: Cursor<'a, V, S>,
    remaining: usize,
}

impl<'a, V, S> Iter<'a, V, S>
where
    S: BuildHasher,
{
    pub(crate) fn new(map: &'a ChainedHashMap<V, S>) -> Self {
        Self {
            cursor: Cursor::new(map),
            remaining: map.len(),
        }
    }
}

impl<'a, V, S> Iterator for Iter<'a, V, S>
where
    S: BuildHasher,
{
    type Item = (&'a [u8], &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.cursor.entry()?;
        self.cursor.advance();
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V, S: BuildHasher> ExactSizeIterator for Iter<'_, V, S> {}

impl<V, S: BuildHasher> FusedIterator for Iter<'_, V, S> {}
