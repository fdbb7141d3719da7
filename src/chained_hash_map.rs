//! ChainedHashMap: byte-string keys over separately chained buckets.

use crate::chain::{Arena, Chain, Position};
use crate::cursor::{Cursor, Iter};
use crate::error::Error;
use crate::hash::BuildAdditiveHasher;
use core::fmt;
use core::hash::{BuildHasher, Hasher};
use core::mem;

/// Bucket count of a table created without an explicit capacity.
pub const DEFAULT_CAPACITY: usize = 5;

/// Factor by which the bucket count grows once the load limit is reached.
pub const GROWTH_FACTOR: usize = 5;

// Maximum load factor 0.7, kept as a ratio so the check never truncates.
const MAX_LOAD_NUM: u128 = 7;
const MAX_LOAD_DEN: u128 = 10;

/// Callback that receives every value the table discards on its own:
/// the old value of a replacing insert, and every value left at `clear`,
/// `destroy` or drop. Values handed back by `remove` never reach it.
pub type Destructor<V> = Box<dyn FnMut(V)>;

pub(crate) struct Entry<V> {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: V,
}

/// A map from byte-string keys to values, resolving collisions by
/// separate chaining.
///
/// Each bucket is a chain whose newest entry sits at the front. Inserting
/// a new key that would bring the load factor to 0.7 or more first grows
/// the bucket array by [`GROWTH_FACTOR`] and rehashes every entry. The
/// table never shrinks.
///
/// Keys are copied on insert, so the caller's buffer can be reused right
/// away. Values are moved in and owned by the table until `remove` hands
/// them back or the table discards them through its [`Destructor`]
/// (or plain `Drop` when none is configured).
pub struct ChainedHashMap<V, S = BuildAdditiveHasher> {
    hasher: S,
    buckets: Vec<Chain>,
    entries: Arena<Entry<V>>,
    len: usize,
    destructor: Option<Destructor<V>>,
}

/// Creation-time configuration for a [`ChainedHashMap`].
pub struct Builder<V, S = BuildAdditiveHasher> {
    capacity: usize,
    hasher: S,
    destructor: Option<Destructor<V>>,
}

impl<V> Builder<V> {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            hasher: BuildAdditiveHasher,
            destructor: None,
        }
    }
}

impl<V> Default for Builder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> Builder<V, S>
where
    S: BuildHasher,
{
    /// Initial bucket count. Zero is raised to one.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Bucket hash function.
    pub fn hasher<T: BuildHasher>(self, hasher: T) -> Builder<V, T> {
        Builder {
            capacity: self.capacity,
            hasher,
            destructor: self.destructor,
        }
    }

    pub fn destructor<F>(mut self, f: F) -> Self
    where
        F: FnMut(V) + 'static,
    {
        self.destructor = Some(Box::new(f));
        self
    }

    /// Allocates the initial bucket array.
    pub fn build(self) -> Result<ChainedHashMap<V, S>, Error> {
        let buckets = alloc_buckets(self.capacity)?;
        tracing::trace!(capacity = self.capacity, "created chained hash map");
        Ok(ChainedHashMap {
            hasher: self.hasher,
            buckets,
            entries: Arena::with_key(),
            len: 0,
            destructor: self.destructor,
        })
    }
}

impl<V> ChainedHashMap<V> {
    pub fn new() -> Self {
        Self::with_parts(BuildAdditiveHasher, None)
    }

    /// Creates a table that passes every value it discards to `f`.
    pub fn with_destructor<F>(f: F) -> Self
    where
        F: FnMut(V) + 'static,
    {
        Self::with_parts(BuildAdditiveHasher, Some(Box::new(f)))
    }

    pub fn builder() -> Builder<V> {
        Builder::new()
    }
}

impl<V> Default for ChainedHashMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> ChainedHashMap<V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_parts(hasher, None)
    }

    fn with_parts(hasher: S, destructor: Option<Destructor<V>>) -> Self {
        Self {
            hasher,
            buckets: vec![Chain::new(); DEFAULT_CAPACITY],
            entries: Arena::with_key(),
            len: 0,
            destructor,
        }
    }

    /// Bucket of `key` under the current bucket count.
    fn bucket_index(&self, key: &[u8]) -> usize {
        let mut h = self.hasher.build_hasher();
        h.write(key);
        (h.finish() % self.buckets.len() as u64) as usize
    }

    fn find_in(&self, index: usize, key: &[u8]) -> Option<Position> {
        self.buckets[index].find(&self.entries, |e| &*e.key == key)
    }

    fn locate(&self, key: &[u8]) -> Option<(usize, Position)> {
        let index = self.bucket_index(key);
        self.find_in(index, key).map(|pos| (index, pos))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets; always at least one.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// Stores `value` under `key`.
    ///
    /// If the key is present its value is replaced in place: the old value
    /// goes to the destructor and the length is unchanged. Otherwise the
    /// key is copied and a new entry is linked at the front of its bucket,
    /// growing the table first if the new entry would reach the load limit.
    ///
    /// On error the table is left exactly as it was and `value` is dropped.
    pub fn insert<Q>(&mut self, key: &Q, value: V) -> Result<(), Error>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        if let Some((_, pos)) = self.locate(key) {
            let old = mem::replace(&mut pos.item_mut(&mut self.entries).value, value);
            self.discard(old);
            return Ok(());
        }

        let owned = copy_key(key)?;
        reserve_nodes(&mut self.entries, 1)?;
        if self.at_load_limit() {
            self.grow()?;
        }
        let index = self.bucket_index(key);
        self.buckets[index].push_front(&mut self.entries, Entry { key: owned, value });
        self.len += 1;
        Ok(())
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let (_, pos) = self.locate(key.as_ref())?;
        Some(&pos.item(&self.entries).value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let (_, pos) = self.locate(key.as_ref())?;
        Some(&mut pos.item_mut(&mut self.entries).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        self.locate(key.as_ref()).is_some()
    }

    /// Unlinks `key` and hands its value back to the caller.
    ///
    /// The destructor is not run: ownership of the value moves out.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let (index, pos) = self.locate(key.as_ref())?;
        let entry = self.buckets[index].remove_at(&mut self.entries, pos)?;
        self.len -= 1;
        Some(entry.value)
    }

    /// Discards every entry through the destructor, keeping the bucket count.
    pub fn clear(&mut self) {
        let Self {
            buckets,
            entries,
            destructor,
            len,
            ..
        } = self;
        // `len` drops with every unlink, so a panicking destructor leaves
        // it equal to what the chains still hold.
        for chain in buckets.iter_mut() {
            while let Some(entry) = chain.pop_front(entries) {
                *len -= 1;
                if let Some(d) = destructor.as_mut() {
                    d(entry.value);
                }
            }
        }
    }

    /// Tears the table down, running the destructor on every remaining value.
    ///
    /// Equivalent to dropping the table.
    pub fn destroy(self) {
        drop(self);
    }

    /// External cursor positioned on the first entry in bucket order.
    pub fn cursor(&self) -> Cursor<'_, V, S> {
        Cursor::new(self)
    }

    pub fn iter(&self) -> Iter<'_, V, S> {
        Iter::new(self)
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub(crate) fn buckets(&self) -> &[Chain] {
        &self.buckets
    }

    pub(crate) fn entries(&self) -> &Arena<Entry<V>> {
        &self.entries
    }

    fn discard(&mut self, value: V) {
        if let Some(d) = self.destructor.as_mut() {
            d(value);
        }
    }

    fn at_load_limit(&self) -> bool {
        (self.len as u128 + 1) * MAX_LOAD_DEN >= self.capacity() as u128 * MAX_LOAD_NUM
    }

    /// Multiplies the bucket count by `GROWTH_FACTOR` and relinks every
    /// node under the new count. Nodes are moved, never freed, so nothing
    /// reaches the destructor and the only allocation is the new array.
    fn grow(&mut self) -> Result<(), Error> {
        let old_capacity = self.capacity();
        let new_capacity = grown_capacity(old_capacity)?;
        let fresh = alloc_buckets(new_capacity).inspect_err(|e| {
            tracing::warn!(old_capacity, new_capacity, error = %e, "bucket array growth failed");
        })?;

        // From here on bucket_index sees the new count.
        let mut old = mem::replace(&mut self.buckets, fresh);
        for chain in old.iter_mut() {
            while let Some(node) = chain.unlink_front(&mut self.entries) {
                let index = self.bucket_index(&self.entries[node].item.key);
                self.buckets[index].link_front(&mut self.entries, node);
            }
        }

        debug_assert_eq!(self.chained_len(), self.len);
        tracing::debug!(old_capacity, new_capacity, len = self.len, "rehashed bucket array");
        Ok(())
    }

    /// Sum of all chain lengths; equals `len` whenever the table is consistent.
    pub(crate) fn chained_len(&self) -> usize {
        self.buckets.iter().map(Chain::len).sum()
    }
}

impl<V, S> Drop for ChainedHashMap<V, S> {
    fn drop(&mut self) {
        if self.destructor.is_none() {
            return;
        }
        let Self {
            buckets,
            entries,
            destructor,
            ..
        } = self;
        if let Some(d) = destructor.as_mut() {
            for chain in buckets.iter_mut() {
                chain.clear(entries, |entry| d(entry.value));
            }
        }
    }
}

impl<'a, V, S> IntoIterator for &'a ChainedHashMap<V, S>
where
    S: BuildHasher,
{
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: fmt::Debug, S: BuildHasher> fmt::Debug for ChainedHashMap<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (String::from_utf8_lossy(k), v)))
            .finish()
    }
}

fn grown_capacity(capacity: usize) -> Result<usize, Error> {
    capacity
        .checked_mul(GROWTH_FACTOR)
        .ok_or(Error::CapacityOverflow(capacity))
}

fn alloc_buckets(capacity: usize) -> Result<Vec<Chain>, Error> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(capacity)?;
    buckets.resize(capacity, Chain::new());
    Ok(buckets)
}

fn reserve_nodes<T>(arena: &mut Arena<T>, additional: usize) -> Result<(), Error> {
    arena.try_reserve(additional)?;
    Ok(())
}

fn copy_key(key: &[u8]) -> Result<Box<[u8]>, Error> {
    let mut owned = Vec::new();
    owned.try_reserve_exact(key.len())?;
    owned.extend_from_slice(key);
    Ok(owned.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::BuildDjb2Hasher;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // every key lands in bucket 0
    }

    fn recording<V: 'static>() -> (Rc<RefCell<Vec<V>>>, impl FnMut(V) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |v| sink.borrow_mut().push(v))
    }

    /// Invariant: the stored count always equals the sum of chain lengths.
    #[test]
    fn len_matches_chains_through_growth() {
        let mut m = ChainedHashMap::new();
        for i in 0..200u32 {
            m.insert(&format!("key{i}"), i).unwrap();
            assert_eq!(m.len(), m.chained_len());
            assert_eq!(m.len(), m.entries.len());
        }
        for i in (0..200u32).step_by(3) {
            assert_eq!(m.remove(&format!("key{i}")), Some(i));
            assert_eq!(m.len(), m.chained_len());
        }
    }

    /// Invariant: bucket_index stays within the live bucket count.
    #[test]
    fn bucket_index_is_in_range() {
        let mut m: ChainedHashMap<()> = ChainedHashMap::new();
        for i in 0..100 {
            let key = format!("k{i}");
            assert!(m.bucket_index(key.as_bytes()) < m.capacity());
            m.insert(&key, ()).unwrap();
        }
    }

    /// Invariant: entries sit in the bucket their hash selects under the
    /// current bucket count, including after a rehash.
    #[test]
    fn entries_live_in_their_hashed_bucket() {
        let mut m = ChainedHashMap::new();
        for i in 0..50u8 {
            m.insert(&[i, i.wrapping_mul(7)], i).unwrap();
        }
        for (index, chain) in m.buckets().iter().enumerate() {
            let mut c = chain.cursor(m.entries());
            while let Some(e) = c.current() {
                assert_eq!(m.bucket_index(&e.key), index);
                c.advance();
            }
        }
    }

    /// Invariant: the load limit counts the entry about to be inserted.
    #[test]
    fn growth_happens_before_reaching_load_limit() {
        let mut m = ChainedHashMap::new();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            m.insert(k, i).unwrap();
        }
        assert_eq!(m.capacity(), DEFAULT_CAPACITY);
        m.insert("d", 3).unwrap();
        assert_eq!(m.capacity(), DEFAULT_CAPACITY * GROWTH_FACTOR);
        assert!(m.load_factor() < 0.7);
    }

    /// Invariant: replacing never grows the table even at the limit.
    #[test]
    fn replace_does_not_grow() {
        let mut m = ChainedHashMap::new();
        for k in ["a", "b", "c"] {
            m.insert(k, 0).unwrap();
        }
        for _ in 0..10 {
            m.insert("a", 1).unwrap();
        }
        assert_eq!(m.capacity(), DEFAULT_CAPACITY);
        assert_eq!(m.len(), 3);
    }

    /// Invariant: rehashing moves entries; the destructor never sees them.
    #[test]
    fn growth_does_not_run_destructor() {
        let (log, sink) = recording::<u32>();
        let mut m = ChainedHashMap::with_destructor(sink);
        for i in 0..100u32 {
            m.insert(&i.to_le_bytes(), i).unwrap();
        }
        assert!(m.capacity() > DEFAULT_CAPACITY);
        assert!(log.borrow().is_empty());
    }

    /// Invariant: a one-bucket table grows before its first entry lands.
    #[test]
    fn single_bucket_table_grows_on_first_insert() {
        let mut m = ChainedHashMap::<i32>::builder().capacity(0).build().unwrap();
        assert_eq!(m.capacity(), 1);
        m.insert("x", 1).unwrap();
        assert_eq!(m.capacity(), GROWTH_FACTOR);
        assert_eq!(m.get("x"), Some(&1));
    }

    /// Invariant: with every key colliding, lookups still resolve by equality
    /// and the newest entry is at the chain front.
    #[test]
    fn collisions_resolve_by_key_equality() {
        let mut m: ChainedHashMap<i32, ConstBuildHasher> =
            ChainedHashMap::with_hasher(ConstBuildHasher);
        m.insert("a", 1).unwrap();
        m.insert("b", 2).unwrap();
        m.insert("c", 3).unwrap();
        assert_eq!(m.get("a"), Some(&1));
        assert_eq!(m.get("b"), Some(&2));
        assert_eq!(m.get("c"), Some(&3));

        let front = m.buckets()[0].cursor(m.entries()).current().unwrap();
        assert_eq!(&*front.key, b"c");

        assert_eq!(m.remove("b"), Some(2));
        assert_eq!(m.get("a"), Some(&1));
        assert_eq!(m.get("c"), Some(&3));
        assert_eq!(m.chained_len(), 2);
    }

    /// Invariant: growth that cannot be sized or allocated is reported
    /// as an error instead of aborting.
    #[test]
    fn growth_failures_are_errors() {
        assert!(matches!(
            grown_capacity(usize::MAX / 2),
            Err(Error::CapacityOverflow(n)) if n == usize::MAX / 2
        ));
        assert_eq!(grown_capacity(5).unwrap(), 25);
        assert!(matches!(
            alloc_buckets(usize::MAX / 8),
            Err(Error::AllocationFailure(_))
        ));
        assert!(matches!(
            copy_key(&[]).map(|k| k.len()),
            Ok(0)
        ));
    }

    /// Invariant: node arena growth that cannot be allocated is an error
    /// and leaves the arena untouched; reserving on insert keeps counts aligned.
    #[test]
    fn node_reservation_failures_are_errors() {
        let mut arena: Arena<Entry<i32>> = Arena::with_key();
        assert!(matches!(
            reserve_nodes(&mut arena, usize::MAX),
            Err(Error::AllocationFailure(_))
        ));
        assert_eq!(arena.len(), 0);

        let mut m = ChainedHashMap::new();
        m.insert("a", 1).unwrap();
        assert_eq!(m.len(), m.entries.len());
    }

    /// Invariant: a destructor panicking halfway through `clear` leaves
    /// `len` equal to the entries still chained.
    #[test]
    fn clear_keeps_len_in_step_when_destructor_panics() {
        let mut m = ChainedHashMap::with_destructor(|v: u32| {
            if v == 3 {
                panic!("destructor refused {v}");
            }
        });
        for i in 0..6u32 {
            m.insert(&format!("p{i}"), i).unwrap();
        }
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| m.clear()));
        assert!(res.is_err(), "expected the destructor panic to surface");
        assert_eq!(m.len(), m.chained_len());
        assert_eq!(m.len(), m.entries.len());
        assert_eq!(m.iter().len(), m.iter().count());
        assert!(!m.contains_key("p3"));

        // Finishing the clear once the destructor no longer panics.
        m.destructor = None;
        m.clear();
        assert_eq!(m.len(), 0);
        assert_eq!(m.chained_len(), 0);
    }

    /// Invariant: get_mut edits the stored value in place.
    #[test]
    fn get_mut_updates_value() {
        let mut m = ChainedHashMap::new();
        m.insert("n", 1).unwrap();
        *m.get_mut("n").unwrap() += 41;
        assert_eq!(m.get("n"), Some(&42));
        assert!(m.get_mut("missing").is_none());
    }

    /// Invariant: clear discards through the destructor and keeps capacity.
    #[test]
    fn clear_runs_destructor_and_keeps_capacity() {
        let (log, sink) = recording::<u32>();
        let mut m = ChainedHashMap::with_destructor(sink);
        for i in 0..10u32 {
            m.insert(&i.to_be_bytes(), i).unwrap();
        }
        let cap = m.capacity();
        m.clear();
        assert_eq!(m.len(), 0);
        assert_eq!(m.chained_len(), 0);
        assert_eq!(m.capacity(), cap);
        let mut seen = log.borrow().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        m.insert("again", 99).unwrap();
        assert_eq!(m.get("again"), Some(&99));
    }

    #[test]
    fn djb2_hasher_builds_working_table() {
        let mut m = ChainedHashMap::<usize>::builder()
            .hasher(BuildDjb2Hasher)
            .capacity(3)
            .build()
            .unwrap();
        for i in 0..64 {
            m.insert(&format!("djb{i}"), i).unwrap();
        }
        for i in 0..64 {
            assert_eq!(m.get(&format!("djb{i}")), Some(&i));
        }
        assert_eq!(m.len(), 64);
    }

    #[test]
    fn debug_renders_keys_as_text() {
        let mut m = ChainedHashMap::new();
        m.insert("k", 1).unwrap();
        assert_eq!(format!("{:?}", m), r#"{"k": 1}"#);
    }
}
